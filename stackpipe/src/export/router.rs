//! Round-robin assignment of threads to output streams

use log::debug;
use std::collections::HashMap;
use std::io::Write;

use stackpipe_common::{OutputRecord, STOP_SENTINEL};

use crate::domain::{PipelineError, Tid};

/// Routes records to output streams, one stream per thread for the whole run.
///
/// The first time a thread ID is seen it takes the stream under the cursor and
/// the cursor advances; later records for that thread always go to the same
/// stream, whichever process they are reported under.
#[derive(Debug)]
pub struct StreamRouter<W: Write> {
    streams: Vec<W>,
    next: usize,
    assignments: HashMap<Tid, usize>,
}

impl<W: Write> StreamRouter<W> {
    /// # Errors
    /// Returns [`PipelineError::NoOutputs`] if `streams` is empty
    pub fn new(streams: Vec<W>) -> Result<Self, PipelineError> {
        if streams.is_empty() {
            return Err(PipelineError::NoOutputs);
        }
        Ok(Self { streams, next: 0, assignments: HashMap::new() })
    }

    #[must_use]
    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    /// Index of the stream assigned to `tid`, assigning one on first sight.
    pub fn stream_for(&mut self, tid: Tid) -> usize {
        let streams = self.streams.len();
        let next = &mut self.next;

        *self.assignments.entry(tid).or_insert_with(|| {
            let index = *next;
            *next = (index + 1) % streams;
            debug!("{tid} assigned to stream {index}");
            index
        })
    }

    /// Write `record` as one line to stream `index` and flush it.
    ///
    /// # Errors
    /// Returns an error if serialisation or the write fails
    fn emit(&mut self, index: usize, record: &OutputRecord) -> Result<(), PipelineError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let Some(stream) = self.streams.get_mut(index) else {
            return Err(PipelineError::UnknownStream(index));
        };
        stream
            .write_all(&line)
            .and_then(|()| stream.flush())
            .map_err(|source| PipelineError::StreamWrite { index, source })
    }

    /// Route `record` to the stream of `tid`, returning the stream index.
    ///
    /// # Errors
    /// Returns an error if the write fails
    pub fn route(&mut self, tid: Tid, record: &OutputRecord) -> Result<usize, PipelineError> {
        let index = self.stream_for(tid);
        self.emit(index, record)?;
        Ok(index)
    }

    /// Terminate every stream with the stop sentinel and hand them back.
    ///
    /// # Errors
    /// Returns an error if a write fails
    pub fn finish(mut self) -> Result<Vec<W>, PipelineError> {
        for (index, stream) in self.streams.iter_mut().enumerate() {
            writeln!(stream, "{STOP_SENTINEL}")
                .and_then(|()| stream.flush())
                .map_err(|source| PipelineError::StreamWrite { index, source })?;
        }
        Ok(self.streams)
    }
}
