//! Raw callchain frame → `(display name, module path)` resolution

use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use stackpipe_common::RawFrame;

use super::demangle::demangle;
use super::perf_map::SymbolMapCache;
use crate::domain::MapOwnerId;

/// A frame after symbol resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFrame {
    /// Never empty; `[0x...]` when nothing resolved
    pub name: String,
    /// Module path, empty when the frame had none
    pub module: String,
    /// Module offset for regular modules, the instruction pointer otherwise
    pub offset: String,
}

impl ResolvedFrame {
    pub fn new(name: impl Into<String>, module: impl Into<String>, offset: impl Into<String>) -> Self {
        Self { name: name.into(), module: module.into(), offset: offset.into() }
    }
}

/// Owner id of a `perf-<id>.map` module path, `None` for any other module.
#[must_use]
pub fn perf_map_owner(dso: &str) -> Option<MapOwnerId> {
    let file_name = Path::new(dso).file_name()?.to_str()?;
    let id = file_name.strip_prefix("perf-")?.strip_suffix(".map")?;

    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    id.parse().ok().map(MapOwnerId)
}

/// Module offsets exercised during the run, per module path.
#[derive(Debug, Default)]
pub struct SourceUsage {
    offsets: BTreeMap<String, BTreeSet<u64>>,
}

impl SourceUsage {
    pub fn record(&mut self, module: &str, offset: u64) {
        self.offsets.entry(module.to_string()).or_default().insert(offset);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// `module path → ["0x..", ...]`, offsets ascending
    #[must_use]
    pub fn to_report(&self) -> BTreeMap<String, Vec<String>> {
        self.offsets
            .iter()
            .map(|(module, offsets)| {
                (module.clone(), offsets.iter().map(|off| format!("{off:#x}")).collect())
            })
            .collect()
    }
}

/// Resolves raw frames, owning the symbol-map cache and the source usage.
#[derive(Debug, Default)]
pub struct FrameResolver {
    maps: SymbolMapCache,
    sources: SourceUsage,
}

impl FrameResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve one frame.
    ///
    /// Name precedence:
    /// 1. JIT frames (`perf-<id>.map` module): demangled static symbol, then
    ///    the symbol map
    /// 2. the static symbol as delivered
    /// 3. `[<module path>]` for regular modules
    /// 4. `[<instruction pointer>]`
    pub fn resolve(&mut self, frame: &RawFrame) -> ResolvedFrame {
        let sym = frame.sym.as_deref().filter(|s| !s.is_empty());
        let mut offset = format!("{:#x}", frame.ip);
        let mut resolved = None;
        let mut module_label = None;

        if let Some(dso) = frame.dso.as_deref() {
            if let Some(owner) = perf_map_owner(dso) {
                resolved = match sym {
                    Some(sym) => Some(demangle(sym).into_owned()),
                    None => self.maps.resolve(owner, Path::new(dso), frame.ip),
                };
                if resolved.is_none() {
                    debug!("Unresolved JIT address {:#x} in {dso}", frame.ip);
                }
            } else {
                if let Some(dso_off) = frame.dso_off {
                    self.sources.record(dso, dso_off);
                    offset = format!("{dso_off:#x}");
                }
                module_label = Some(format!("[{dso}]"));
            }
        }

        let name = resolved
            .or_else(|| sym.map(str::to_string))
            .or(module_label)
            .unwrap_or_else(|| format!("[{:#x}]", frame.ip));

        ResolvedFrame { name, module: frame.dso.clone().unwrap_or_default(), offset }
    }

    pub fn resolve_chain(&mut self, chain: &[RawFrame]) -> Vec<ResolvedFrame> {
        chain.iter().map(|frame| self.resolve(frame)).collect()
    }

    #[must_use]
    pub fn sources(&self) -> &SourceUsage {
        &self.sources
    }

    /// Close all symbol maps, returning the paths of those never found.
    pub fn close_maps(&mut self) -> Vec<String> {
        self.maps.close().into_iter().map(|path| path.display().to_string()).collect()
    }
}
