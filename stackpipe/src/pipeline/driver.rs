//! Per-sample orchestration and shutdown reporting

use log::{debug, info};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use stackpipe_common::{EncodedFrame, OutputRecord, SampleEvent};

use crate::dictionary::SymbolDictionary;
use crate::domain::types::parse_event_type;
use crate::domain::{EventKind, Pid, PipelineError, Tid};
use crate::export::{write_dictionary, ControlChannel, StreamRouter};
use crate::filtering::{passthrough, CallchainFilter, FilteredFrame};
use crate::symbolization::FrameResolver;

/// Lifecycle of a [`PipelineDriver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Before `begin`
    Idle,
    /// Processing samples
    Running,
    /// `end` in progress
    Draining,
    /// Finished; no further calls are valid
    Closed,
}

impl PipelineState {
    fn name(self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Running => "running",
            PipelineState::Draining => "draining",
            PipelineState::Closed => "closed",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a finished run produced, plus the connections for the caller to close.
#[derive(Debug)]
pub struct RunSummary<W, C> {
    pub samples: usize,
    pub distinct_symbols: usize,
    pub event_kind: Option<EventKind>,
    pub artifact: Option<PathBuf>,
    pub missing_maps: Vec<String>,
    pub outputs: Vec<W>,
    pub control: Option<C>,
}

/// Drives the resolve → filter → encode → route pipeline for every sample.
///
/// `W` is the output stream type, `C` the control channel writer.
#[derive(Debug)]
pub struct PipelineDriver<W: Write, C: Write> {
    state: PipelineState,
    artifact_dir: PathBuf,
    resolver: FrameResolver,
    dictionary: SymbolDictionary,
    filter: Option<CallchainFilter>,
    router: Option<StreamRouter<W>>,
    control: Option<ControlChannel<C>>,
    event_kind: Option<EventKind>,
    samples: usize,
}

impl<W: Write, C: Write> PipelineDriver<W, C> {
    /// Create an idle driver writing its artifact into `artifact_dir`.
    pub fn new(artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            state: PipelineState::Idle,
            artifact_dir: artifact_dir.into(),
            resolver: FrameResolver::new(),
            dictionary: SymbolDictionary::new(),
            filter: None,
            router: None,
            control: None,
            event_kind: None,
            samples: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    #[must_use]
    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    fn expect_state(&self, expected: PipelineState, operation: &'static str) -> Result<(), PipelineError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(PipelineError::InvalidState { operation, state: self.state.name() })
        }
    }

    /// Idle → Running: take the output streams, the control channel writer
    /// and the filter received at bootstrap.
    ///
    /// # Errors
    /// Returns an error if not idle or if `outputs` is empty
    pub fn begin(
        &mut self,
        outputs: Vec<W>,
        control: Option<C>,
        filter: Option<CallchainFilter>,
    ) -> Result<(), PipelineError> {
        self.expect_state(PipelineState::Idle, "begin")?;

        let router = StreamRouter::new(outputs)?;
        info!(
            "Pipeline running with {} output stream(s), filter {}",
            router.stream_count(),
            if filter.is_some() { "enabled" } else { "disabled" }
        );

        self.router = Some(router);
        self.control = control.map(ControlChannel::new);
        self.filter = filter;
        self.state = PipelineState::Running;
        Ok(())
    }

    /// Process one sample: resolve, filter, encode and emit it.
    ///
    /// # Errors
    /// Returns an error if not running, if the filter's classifier fails, or
    /// if the record cannot be written
    pub fn process_sample(&mut self, sample: &SampleEvent) -> Result<(), PipelineError> {
        self.expect_state(PipelineState::Running, "process a sample")?;

        let event_type = parse_event_type(&sample.ev_name);
        if self.event_kind.is_none() {
            let kind = EventKind::from_event_type(event_type);
            info!("Overall event kind: {kind}");
            self.event_kind = Some(kind);
        }

        let resolved = self.resolver.resolve_chain(&sample.callchain);
        let callchain = match self.filter.as_mut() {
            Some(filter) => {
                // Filtered chains get their codes innermost first
                let filtered = filter.apply(resolved)?;
                let mut encoded: Vec<_> =
                    filtered.iter().rev().map(|frame| self.encode(frame)).collect();
                encoded.reverse();
                encoded
            }
            None => passthrough(resolved).iter().map(|frame| self.encode(frame)).collect(),
        };

        let record = OutputRecord {
            event_type: event_type.to_string(),
            pid: sample.pid.to_string(),
            tid: sample.tid.to_string(),
            time: sample.time,
            period: sample.period,
            callchain,
        };

        let Some(router) = self.router.as_mut() else {
            return Err(PipelineError::InvalidState { operation: "route a sample", state: "running" });
        };
        let stream = router.route(Tid(sample.tid), &record)?;
        debug!("Sample {} {} → stream {stream}", Pid(sample.pid), Tid(sample.tid));

        self.samples += 1;
        Ok(())
    }

    fn encode(&mut self, frame: &FilteredFrame) -> EncodedFrame {
        let (name, module) = frame.key();
        (self.dictionary.code_for(name, module), frame.offset().to_string())
    }

    /// Running → Draining → Closed: stop the output streams, write the
    /// dictionary artifact and send the shutdown reports.
    ///
    /// # Errors
    /// Returns an error if not running or if a write fails
    pub fn end(&mut self) -> Result<RunSummary<W, C>, PipelineError> {
        self.expect_state(PipelineState::Running, "end")?;
        self.state = PipelineState::Draining;

        let outputs = match self.router.take() {
            Some(router) => router.finish()?,
            None => Vec::new(),
        };

        let mut artifact = None;
        if let Some(kind) = &self.event_kind {
            artifact = Some(write_dictionary(&self.artifact_dir, kind, &self.dictionary)?);

            let sources = self.resolver.sources().to_report();
            match self.control.as_mut() {
                Some(control) => control.send_sources(sources)?,
                None => info!("Sources: {sources:?}"),
            }
        }

        let missing_maps = self.resolver.close_maps();
        let control = match self.control.take() {
            Some(mut control) => {
                control.send_missing_maps(missing_maps.clone())?;
                Some(control.finish()?)
            }
            None => {
                info!("Missing symbol maps: {missing_maps:?}");
                None
            }
        };

        // Stops an external classifier process
        self.filter = None;
        self.state = PipelineState::Closed;
        info!("Pipeline closed after {} samples", self.samples);

        Ok(RunSummary {
            samples: self.samples,
            distinct_symbols: self.dictionary.len(),
            event_kind: self.event_kind.clone(),
            artifact,
            missing_maps,
            outputs,
            control,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackpipe_common::RawFrame;
    use tempfile::TempDir;

    type TestDriver = PipelineDriver<Vec<u8>, Vec<u8>>;

    fn sample(ev_name: &str, tid: u32, callchain: Vec<RawFrame>) -> SampleEvent {
        SampleEvent { ev_name: ev_name.to_string(), pid: 1, tid, time: 10, period: 1, callchain }
    }

    fn sym_frame(ip: u64, sym: &str) -> RawFrame {
        RawFrame { ip, sym: Some(sym.to_string()), ..RawFrame::default() }
    }

    #[test]
    fn test_sample_before_begin_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut driver = TestDriver::new(dir.path());

        let err = driver.process_sample(&sample("cycles", 1, Vec::new())).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidState { state: "idle", .. }));
        assert!(driver.end().is_err());
    }

    #[test]
    fn test_lifecycle_states() {
        let dir = TempDir::new().unwrap();
        let mut driver = TestDriver::new(dir.path());
        assert_eq!(driver.state(), PipelineState::Idle);

        driver.begin(vec![Vec::new()], None, None).unwrap();
        assert_eq!(driver.state(), PipelineState::Running);
        assert!(driver.begin(vec![Vec::new()], None, None).is_err());

        driver.end().unwrap();
        assert_eq!(driver.state(), PipelineState::Closed);
        assert!(driver.process_sample(&sample("cycles", 1, Vec::new())).is_err());
        assert!(driver.end().is_err());
    }

    #[test]
    fn test_begin_requires_outputs() {
        let dir = TempDir::new().unwrap();
        let mut driver = TestDriver::new(dir.path());

        assert!(matches!(driver.begin(Vec::new(), None, None), Err(PipelineError::NoOutputs)));
        assert_eq!(driver.state(), PipelineState::Idle);
    }

    #[test]
    fn test_record_is_outermost_first_and_encoded() {
        let dir = TempDir::new().unwrap();
        let mut driver = TestDriver::new(dir.path());
        driver.begin(vec![Vec::new()], None, None).unwrap();

        let chain = vec![sym_frame(0x10, "inner"), sym_frame(0x20, "outer"), sym_frame(0x30, "inner")];
        driver.process_sample(&sample("cycles/period=100/", 7, chain)).unwrap();

        let summary = driver.end().unwrap();
        let out = String::from_utf8(summary.outputs[0].clone()).unwrap();
        let record: OutputRecord = serde_json::from_str(out.lines().next().unwrap()).unwrap();

        assert_eq!(record.event_type, "cycles");
        assert_eq!(record.tid, "7");
        let offsets: Vec<&str> = record.callchain.iter().map(|(_, off)| off.as_str()).collect();
        assert_eq!(offsets, vec!["0x30", "0x20", "0x10"]);
        // Same symbol, same code
        assert_eq!(record.callchain[0].0, record.callchain[2].0);
        assert_ne!(record.callchain[0].0, record.callchain[1].0);
        assert_eq!(summary.distinct_symbols, 2);
    }

    fn first_record(summary: &RunSummary<Vec<u8>, Vec<u8>>) -> OutputRecord {
        let out = String::from_utf8(summary.outputs[0].clone()).unwrap();
        serde_json::from_str(out.lines().next().unwrap()).unwrap()
    }

    #[test]
    fn test_unfiltered_codes_assigned_outermost_first() {
        let dir = TempDir::new().unwrap();
        let mut driver = TestDriver::new(dir.path());
        driver.begin(vec![Vec::new()], None, None).unwrap();

        let chain = vec![sym_frame(1, "inner"), sym_frame(2, "outer")];
        driver.process_sample(&sample("cycles", 1, chain)).unwrap();

        let record = first_record(&driver.end().unwrap());
        let codes: Vec<&str> = record.callchain.iter().map(|(code, _)| code.as_str()).collect();
        assert_eq!(codes, vec![" ", "!"]);
        assert_eq!(record.callchain[0].1, "0x2");
    }

    #[test]
    fn test_filtered_codes_assigned_innermost_first() {
        let dir = TempDir::new().unwrap();
        let settings = stackpipe_common::FilterSettings::Deny {
            conditions: vec![vec!["SYM ^middle$".to_string()]],
            mark: true,
        };
        let filter = CallchainFilter::from_settings(&settings, "python3").unwrap();
        let mut driver = TestDriver::new(dir.path());
        driver.begin(vec![Vec::new()], None, Some(filter)).unwrap();

        let chain = vec![sym_frame(1, "inner"), sym_frame(2, "middle"), sym_frame(3, "outer")];
        driver.process_sample(&sample("cycles", 1, chain)).unwrap();

        // inner → " ", cut → "!", outer → "\""
        let record = first_record(&driver.end().unwrap());
        let codes: Vec<&str> = record.callchain.iter().map(|(code, _)| code.as_str()).collect();
        assert_eq!(codes, vec!["\"", "!", " "]);
    }

    #[test]
    fn test_event_kind_fixed_by_first_sample() {
        let dir = TempDir::new().unwrap();
        let mut driver = TestDriver::new(dir.path());
        driver.begin(vec![Vec::new()], Some(Vec::new()), None).unwrap();

        driver.process_sample(&sample("task-clock", 1, vec![sym_frame(1, "a")])).unwrap();
        driver.process_sample(&sample("cycles", 1, vec![sym_frame(1, "a")])).unwrap();

        let summary = driver.end().unwrap();
        assert_eq!(summary.event_kind.as_ref().map(EventKind::as_str), Some("walltime"));
        assert_eq!(summary.artifact, Some(dir.path().join("walltime_callchains.json")));

        let out = String::from_utf8(summary.outputs[0].clone()).unwrap();
        let second: OutputRecord = serde_json::from_str(out.lines().nth(1).unwrap()).unwrap();
        assert_eq!(second.event_type, "cycles");
    }

    #[test]
    fn test_no_samples_means_no_artifact_or_sources() {
        let dir = TempDir::new().unwrap();
        let mut driver = TestDriver::new(dir.path());
        driver.begin(vec![Vec::new()], Some(Vec::new()), None).unwrap();

        let summary = driver.end().unwrap();
        assert!(summary.artifact.is_none());
        assert!(!dir.path().join("walltime_callchains.json").exists());

        let control = String::from_utf8(summary.control.unwrap()).unwrap();
        let lines: Vec<&str> = control.lines().collect();
        assert_eq!(lines, vec![r#"{"type":"missing_symbol_maps","data":[]}"#, "<STOP>"]);
    }
}
