//! Incremental `perf-<id>.map` symbol-map cache
//!
//! JIT compilers (V8, the JVM with perf-map-agent, CPython 3.12+ ...) describe
//! the code they generate by appending lines to `/tmp/perf-<pid>.map`:
//!
//! ```text
//! 7f3c2a001000 40 LazyCompile:*fib /tmp/fib.js:1
//! 7f3c2a001040 1c8 Builtin:ArgumentsAdaptorTrampoline
//! ```
//!
//! The file keeps growing while samples are being processed, so it is parsed
//! lazily and only as far as a lookup needs. Entries read together form one
//! batch, sorted by start address; batches are searched oldest first with a
//! binary search each. A lookup that misses every batch reads further only
//! while the file has data ready, so a map that is still being written never
//! stalls the caller.

use log::{debug, warn};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

use crate::domain::MapOwnerId;

use super::demangle::demangle;

/// One `<hex start> <hex length> <name>` line of a symbol map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub start: u64,
    pub len: u64,
    /// Demangled name
    pub name: String,
}

impl MapEntry {
    /// Check if an address falls within this entry's range
    #[must_use]
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr - self.start < self.len
    }
}

fn parse_hex(field: &str) -> Option<u64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u64::from_str_radix(field, 16).ok()
}

/// Parse one symbol-map line. Returns `None` for malformed lines.
#[must_use]
pub fn parse_map_line(line: &str) -> Option<MapEntry> {
    let line = line.trim();
    let (start, rest) = line.split_once(char::is_whitespace)?;
    let (len, name) = rest.trim_start().split_once(char::is_whitespace)?;
    let name = name.trim_start();

    if name.is_empty() {
        return None;
    }

    Some(MapEntry { start: parse_hex(start)?, len: parse_hex(len)?, name: demangle(name).into_owned() })
}

/// Search sorted, non-overlapping entries for the one containing `addr`.
fn search_batch(batch: &[MapEntry], addr: u64) -> Option<&MapEntry> {
    let idx = batch.partition_point(|entry| entry.start <= addr);
    idx.checked_sub(1).map(|i| &batch[i]).filter(|entry| entry.contains(addr))
}

/// Non-blocking check whether `file` has data ready to be read.
#[allow(unsafe_code)]
fn poll_readable(file: &File) -> bool {
    let mut pfd = libc::pollfd { fd: file.as_raw_fd(), events: libc::POLLIN, revents: 0 };
    // SAFETY: `pfd` is a valid, exclusively borrowed pollfd and nfds is 1.
    let ready = unsafe { libc::poll(&mut pfd, 1, 0) };
    ready > 0 && (pfd.revents & libc::POLLIN) != 0
}

/// An open symbol map and everything parsed from it so far.
#[derive(Debug)]
pub struct SymbolMap {
    path: PathBuf,
    reader: BufReader<File>,
    /// Bytes of a line whose terminating newline has not been written yet
    pending: Vec<u8>,
    /// Lines consumed so far, for diagnostics
    line_no: usize,
    batches: Vec<Vec<MapEntry>>,
}

impl SymbolMap {
    /// Open the map at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            pending: Vec::new(),
            line_no: 0,
            batches: Vec::new(),
        })
    }

    /// Number of batches cached so far
    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Resolve `addr`, reading more of the file if the cached batches miss.
    pub fn lookup(&mut self, addr: u64) -> Option<String> {
        if let Some(entry) = self.batches.iter().find_map(|batch| search_batch(batch, addr)) {
            return Some(entry.name.clone());
        }

        self.read_ahead(addr)
    }

    fn read_ahead(&mut self, addr: u64) -> Option<String> {
        let mut fresh = Vec::new();
        let mut found = None;

        while self.data_available() {
            let line = match self.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read {}: {e}", self.path.display());
                    break;
                }
            };
            self.line_no += 1;

            let parsed = std::str::from_utf8(&line).ok().and_then(parse_map_line);
            let Some(entry) = parsed else {
                warn!("Line {}, {}: incorrect syntax, ignoring.", self.line_no, self.path.display());
                continue;
            };

            if entry.contains(addr) {
                found = Some(entry.name.clone());
                fresh.push(entry);
                break;
            }
            fresh.push(entry);
        }

        if !fresh.is_empty() {
            debug!("{}: cached batch of {} entries", self.path.display(), fresh.len());
            fresh.sort_by_key(|entry| entry.start);
            self.batches.push(fresh);
        }

        found
    }

    fn data_available(&self) -> bool {
        !self.reader.buffer().is_empty() || poll_readable(self.reader.get_ref())
    }

    /// Next complete line, or `None` if only a partial line (or nothing) is
    /// available right now.
    fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        self.reader.read_until(b'\n', &mut self.pending)?;

        if self.pending.ends_with(b"\n") {
            let line = std::mem::take(&mut self.pending);
            Ok(Some(line))
        } else {
            Ok(None)
        }
    }
}

#[derive(Debug)]
enum MapSlot {
    /// The map did not exist at first lookup; never retried
    Missing(PathBuf),
    Open(SymbolMap),
}

/// Symbol maps keyed by owner, opened lazily on first lookup.
#[derive(Debug, Default)]
pub struct SymbolMapCache {
    maps: BTreeMap<MapOwnerId, MapSlot>,
}

impl SymbolMapCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `addr` through the symbol map of `owner`, stored at `path`.
    ///
    /// Returns `None` if the map is missing, if no entry covers `addr`, or if
    /// the covering entry has not been written yet.
    pub fn resolve(&mut self, owner: MapOwnerId, path: &Path, addr: u64) -> Option<String> {
        let slot = self.maps.entry(owner).or_insert_with(|| match SymbolMap::open(path) {
            Ok(map) => {
                debug!("Opened symbol map {}", path.display());
                MapSlot::Open(map)
            }
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!("Cannot open symbol map {}: {e}", path.display());
                }
                MapSlot::Missing(path.to_path_buf())
            }
        });

        match slot {
            MapSlot::Missing(_) => None,
            MapSlot::Open(map) => map.lookup(addr),
        }
    }

    /// Paths of maps that did not exist when first looked up
    #[must_use]
    pub fn missing_maps(&self) -> Vec<PathBuf> {
        self.maps
            .values()
            .filter_map(|slot| match slot {
                MapSlot::Missing(path) => Some(path.clone()),
                MapSlot::Open(_) => None,
            })
            .collect()
    }

    /// Close every open map, returning the paths of the missing ones.
    pub fn close(&mut self) -> Vec<PathBuf> {
        let missing = self.missing_maps();
        self.maps.clear();
        missing
    }
}
