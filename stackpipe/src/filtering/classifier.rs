//! Frame classifiers: per-frame keep/reject decisions for a whole callchain.
//!
//! Built-in allow/deny rule sets and user-supplied external scripts sit
//! behind the same [`FrameClassifier`] trait, selected once from the filter
//! settings received at bootstrap.

use log::{debug, info};
use serde_json::Value;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use super::rules::RuleSet;
use crate::domain::FilterError;
use crate::symbolization::ResolvedFrame;

/// Decides, per frame, whether it is kept.
pub trait FrameClassifier {
    /// One verdict per frame of `chain` (innermost first), `true` = keep.
    ///
    /// # Errors
    /// Returns an error if the classifier cannot produce a verdict; this is
    /// fatal for the run
    fn classify(&mut self, chain: &[ResolvedFrame]) -> Result<Vec<bool>, FilterError>;
}

/// Whether frames matching the rule set are kept or dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleMode {
    Allow,
    Deny,
}

/// Classifier backed by an allow or deny [`RuleSet`].
#[derive(Debug, Clone)]
pub struct RuleClassifier {
    rules: RuleSet,
    mode: RuleMode,
}

impl RuleClassifier {
    #[must_use]
    pub fn new(rules: RuleSet, mode: RuleMode) -> Self {
        Self { rules, mode }
    }
}

impl FrameClassifier for RuleClassifier {
    fn classify(&mut self, chain: &[ResolvedFrame]) -> Result<Vec<bool>, FilterError> {
        Ok(chain
            .iter()
            .map(|frame| {
                let matched = self.rules.matches(frame);
                match self.mode {
                    RuleMode::Allow => matched,
                    RuleMode::Deny => !matched,
                }
            })
            .collect())
    }
}

/// Line the external process prints once `setup()` has returned
pub const READY_LINE: &str = "ready";

/// Runs a user script exposing `setup()` and `process(chain) -> list[bool]`.
///
/// The script's own prints go to stderr so stdout only carries verdicts. A
/// result that is not a list (a tuple would serialise as an array) is sent as
/// an object so it is rejected.
const PYTHON_DRIVER: &str = r"
import importlib.util, json, sys
out = sys.stdout
sys.stdout = sys.stderr
spec = importlib.util.spec_from_file_location('module', sys.argv[1])
module = importlib.util.module_from_spec(spec)
sys.modules['module'] = module
spec.loader.exec_module(module)
module.setup()
out.write('ready\n')
out.flush()
for line in sys.stdin:
    chain = tuple((tuple(sym), off) for sym, off in json.loads(line))
    result = module.process(chain)
    if not isinstance(result, list):
        result = {'not_a_list': repr(type(result))}
    out.write(json.dumps(result) + '\n')
    out.flush()
";

/// Classifier delegating to an external process over JSON lines.
///
/// For every callchain one line `[[[name, module], offset], ...]` (innermost
/// first) is written to the process's stdin and one JSON line is read back,
/// which must be a list holding one boolean per frame.
#[derive(Debug)]
pub struct ExternalClassifier {
    name: String,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl ExternalClassifier {
    /// Load a Python filter script with `interpreter` and run its `setup()`.
    ///
    /// # Errors
    /// Returns an error if the interpreter cannot be started or the script
    /// fails to load or set up
    pub fn python(interpreter: &str, script: &Path) -> Result<Self, FilterError> {
        let mut command = Command::new(interpreter);
        command.arg("-c").arg(PYTHON_DRIVER).arg(script);
        Self::spawn(command, script.display().to_string())
    }

    /// Start any program speaking the classifier protocol.
    ///
    /// The program must print [`READY_LINE`] before the first callchain is sent.
    ///
    /// # Errors
    /// Returns an error if the program cannot be started or exits before
    /// announcing it is ready
    pub fn spawn(mut command: Command, name: impl Into<String>) -> Result<Self, FilterError> {
        let name = name.into();
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .map(BufReader::new)
            .ok_or_else(|| FilterError::ClassifierFailed(format!("{name}: no stdout")))?;

        let mut classifier = Self { name, child, stdin, stdout };

        let line = classifier.read_reply()?;
        if line.trim() != READY_LINE {
            return Err(FilterError::ClassifierFailed(format!(
                "{}: expected \"{READY_LINE}\", got \"{}\"",
                classifier.name,
                line.trim()
            )));
        }

        info!("Frame classifier {} ready", classifier.name);
        Ok(classifier)
    }

    fn read_reply(&mut self) -> Result<String, FilterError> {
        let mut line = String::new();
        if self.stdout.read_line(&mut line)? == 0 {
            return Err(FilterError::ClassifierFailed(format!("{} exited", self.name)));
        }
        Ok(line)
    }
}

/// Validate a classifier reply: a list of exactly `expected` booleans.
///
/// # Errors
/// [`FilterError::NotAList`] for a non-list or a list of the wrong length,
/// [`FilterError::NonBoolean`] for the first non-boolean element
pub fn parse_verdicts(reply: &Value, expected: usize) -> Result<Vec<bool>, FilterError> {
    let items = reply
        .as_array()
        .filter(|items| items.len() == expected)
        .ok_or(FilterError::NotAList { expected })?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| item.as_bool().ok_or(FilterError::NonBoolean(i)))
        .collect()
}

impl FrameClassifier for ExternalClassifier {
    fn classify(&mut self, chain: &[ResolvedFrame]) -> Result<Vec<bool>, FilterError> {
        let request: Vec<((&str, &str), &str)> = chain
            .iter()
            .map(|f| ((f.name.as_str(), f.module.as_str()), f.offset.as_str()))
            .collect();

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| FilterError::ClassifierFailed(format!("{} closed", self.name)))?;
        serde_json::to_writer(&mut *stdin, &request)?;
        stdin.write_all(b"\n")?;
        stdin.flush()?;

        let reply = self.read_reply()?;
        let reply: Value = serde_json::from_str(&reply)?;
        parse_verdicts(&reply, chain.len())
    }
}

impl Drop for ExternalClassifier {
    fn drop(&mut self) {
        // EOF on stdin ends the driver loop
        drop(self.stdin.take());
        match self.child.wait() {
            Ok(status) => debug!("Frame classifier {} exited: {status}", self.name),
            Err(e) => debug!("Frame classifier {} could not be reaped: {e}", self.name),
        }
    }
}
