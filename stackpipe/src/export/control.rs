//! Control channel: bootstrap configuration in, shutdown reports out

use log::{info, warn};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use stackpipe_common::{ControlMessage, FilterSettings, STOP_SENTINEL};

use crate::domain::{ConnectError, PipelineError};

/// Read bootstrap messages until the stop sentinel (or end of input),
/// returning the filter settings if any were sent.
///
/// Unknown message types are skipped. A later `filter_settings` message
/// replaces an earlier one.
///
/// # Errors
/// Returns an error if reading fails or a line is not valid JSON
pub fn read_bootstrap<R: BufRead>(reader: R) -> Result<Option<FilterSettings>, ConnectError> {
    let mut settings = None;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();

        if line == STOP_SENTINEL {
            break;
        }
        if line.is_empty() {
            continue;
        }

        let message: Value = serde_json::from_str(line)?;
        match message.get("type").and_then(Value::as_str) {
            Some("filter_settings") => {
                if let ControlMessage::FilterSettings { data } = serde_json::from_value(message)? {
                    info!("Received filter settings: {data:?}");
                    settings = Some(data);
                }
            }
            other => warn!("Ignoring control message of type {other:?}"),
        }
    }

    Ok(settings)
}

/// Writing side of the control channel.
#[derive(Debug)]
pub struct ControlChannel<W: Write> {
    writer: W,
}

impl<W: Write> ControlChannel<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Send one message as a JSON line.
    ///
    /// # Errors
    /// Returns an error if serialisation or the write fails
    pub fn send(&mut self, message: &ControlMessage) -> Result<(), PipelineError> {
        serde_json::to_writer(&mut self.writer, message)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Send the `sources` report: module path → offsets exercised.
    ///
    /// # Errors
    /// Returns an error if the write fails
    pub fn send_sources(&mut self, data: BTreeMap<String, Vec<String>>) -> Result<(), PipelineError> {
        self.send(&ControlMessage::Sources { data })
    }

    /// Send the list of symbol maps that never became available.
    ///
    /// # Errors
    /// Returns an error if the write fails
    pub fn send_missing_maps(&mut self, data: Vec<String>) -> Result<(), PipelineError> {
        self.send(&ControlMessage::MissingSymbolMaps { data })
    }

    /// Send the stop sentinel and hand back the writer.
    ///
    /// # Errors
    /// Returns an error if the write fails
    pub fn finish(mut self) -> Result<W, PipelineError> {
        writeln!(self.writer, "{STOP_SENTINEL}")?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}
