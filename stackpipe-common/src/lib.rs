//! # Shared Wire Types (Host Engine ↔ Pipeline ↔ Consumers)
//!
//! Defines the serialisable structures exchanged at the pipeline's edges. All
//! types are plain serde structs so downstream consumers can decode the same
//! lines the pipeline writes.
//!
//! ## Key Types
//!
//! - [`SampleEvent`] - One sample as delivered by the host profiler engine
//! - [`RawFrame`] - One already-unwound callchain frame
//! - [`OutputRecord`] - The compact record written to an output stream
//! - [`ControlMessage`] - Messages on the control channel (both directions)
//! - [`FilterSettings`] - Callchain filter configuration received at bootstrap

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

// ============================================================================
// Protocol Constants
// ============================================================================

/// Terminates a stream: written last on every output connection and on the
/// control channel, and ends the bootstrap messages sent to the pipeline.
pub const STOP_SENTINEL: &str = "<STOP>";

/// Greeting written when a pipe connection is opened.
pub const CONNECT_GREETING: &str = "connect";

/// Display name used for the marker that replaces filtered-out frames.
pub const CUT_MARKER: &str = "(cut)";

// ============================================================================
// Sample Input
// ============================================================================

/// One frame of a sampled callchain.
///
/// Frames arrive already unwound; every field except the instruction pointer
/// is optional because the host engine only fills in what it could resolve.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFrame {
    /// Instruction pointer
    pub ip: u64,
    /// Static symbol name, if the host engine resolved one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sym: Option<String>,
    /// Path of the module (binary, library or symbol-map file) containing `ip`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dso: Option<String>,
    /// Offset of `ip` relative to the start of `dso`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dso_off: Option<u64>,
}

/// One sample delivered by the host engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleEvent {
    /// Full event name, e.g. `task-clock/period=10000/`
    pub ev_name: String,
    pub pid: u32,
    pub tid: u32,
    /// Timestamp in nanoseconds
    pub time: u64,
    pub period: u64,
    /// Callchain, innermost frame first
    #[serde(default)]
    pub callchain: Vec<RawFrame>,
}

// ============================================================================
// Stream Output
// ============================================================================

/// A `(dictionary code, offset)` pair as written in [`OutputRecord::callchain`].
pub type EncodedFrame = (String, String);

/// Compact per-sample record written to an output stream, one per line.
///
/// Serialises as `{"type":"sample","event_type":...,"pid":"..","tid":"..",...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "sample")]
pub struct OutputRecord {
    pub event_type: String,
    pub pid: String,
    pub tid: String,
    pub time: u64,
    pub period: u64,
    /// Outermost frame first
    pub callchain: Vec<EncodedFrame>,
}

// ============================================================================
// Control Channel
// ============================================================================

/// Callchain filter configuration, as received in a `filter_settings` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FilterSettings {
    /// Keep frames matching at least one rule-group
    Allow {
        conditions: Vec<Vec<String>>,
        #[serde(default)]
        mark: bool,
    },
    /// Drop frames matching at least one rule-group
    Deny {
        conditions: Vec<Vec<String>>,
        #[serde(default)]
        mark: bool,
    },
    /// Delegate the decision to an external script exposing `setup()` and
    /// `process(chain)`
    Python {
        script: PathBuf,
        #[serde(default)]
        mark: bool,
    },
}

impl FilterSettings {
    /// Whether consecutive rejected frames collapse into a cut marker.
    #[must_use]
    pub fn mark(&self) -> bool {
        match self {
            FilterSettings::Allow { mark, .. }
            | FilterSettings::Deny { mark, .. }
            | FilterSettings::Python { mark, .. } => *mark,
        }
    }
}

/// Messages carried by the control channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Bootstrap: filter configuration for the run
    FilterSettings { data: FilterSettings },
    /// Shutdown: module path → module offsets (hex) exercised during the run
    Sources { data: BTreeMap<String, Vec<String>> },
    /// Shutdown: symbol-map files that never became available
    MissingSymbolMaps { data: Vec<String> },
}
