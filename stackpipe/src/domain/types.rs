//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers prevent common bugs like passing a TID where a
//! PID is expected, and make function signatures more expressive.

use std::fmt;

/// Process ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID:{}", self.0)
    }
}

/// Thread ID
///
/// Output streams are assigned per thread ID, so this is the routing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tid(pub u32);

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TID:{}", self.0)
    }
}

/// Owner of a `perf-<id>.map` symbol-map file
///
/// The numeric part of the file name, normally the PID of the process whose
/// JIT wrote the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MapOwnerId(pub u64);

impl fmt::Display for MapOwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "perf-{}.map", self.0)
    }
}

/// Overall event kind of a run
///
/// Derived once from the first sample. Wall-clock-like events
/// (`task-clock`, `offcpu-time`) fold into `walltime`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKind(String);

/// Event names folded into [`EventKind::WALLTIME`]
const WALLTIME_EVENTS: [&str; 2] = ["task-clock", "offcpu-time"];

impl EventKind {
    pub const WALLTIME: &'static str = "walltime";

    /// Normalise the event type of a sample (see [`parse_event_type`]).
    #[must_use]
    pub fn from_event_type(event_type: &str) -> Self {
        if WALLTIME_EVENTS.contains(&event_type) {
            Self(Self::WALLTIME.to_string())
        } else {
            Self(event_type.to_string())
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the dictionary artifact written for this kind
    #[must_use]
    pub fn artifact_name(&self) -> String {
        format!("{}_callchains.json", self.0)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strip modifiers from a host event name: everything from the first `/`.
///
/// `cycles/period=1000/` → `cycles`
#[must_use]
pub fn parse_event_type(ev_name: &str) -> &str {
    ev_name.split('/').next().unwrap_or(ev_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pid_tid_display() {
        assert_eq!(Pid(1234).to_string(), "PID:1234");
        assert_eq!(Tid(7).to_string(), "TID:7");
    }

    #[test]
    fn test_parse_event_type() {
        assert_eq!(parse_event_type("cycles/period=1000/"), "cycles");
        assert_eq!(parse_event_type("cache-misses"), "cache-misses");
    }

    #[test]
    fn test_walltime_folding() {
        assert_eq!(EventKind::from_event_type("task-clock").as_str(), "walltime");
        assert_eq!(EventKind::from_event_type("offcpu-time").as_str(), "walltime");
        assert_eq!(EventKind::from_event_type("cycles").as_str(), "cycles");
    }

    #[test]
    fn test_artifact_name() {
        assert_eq!(
            EventKind::from_event_type("task-clock").artifact_name(),
            "walltime_callchains.json"
        );
    }

    #[test]
    fn test_map_owner_display() {
        assert_eq!(MapOwnerId(42).to_string(), "perf-42.map");
    }
}
