//! # Frame Symbolization
//!
//! Frames arrive from the host profiler already unwound, and usually with a
//! static symbol and module attached. What is left to do here is turning each
//! frame into a stable `(display name, module path)` pair that the dictionary
//! can compress.
//!
//! ## The JIT Problem
//!
//! Code produced at run time by a JIT compiler has no static symbol: the
//! profiler only sees an address inside an anonymous executable mapping,
//! attributed to a pseudo-module named `perf-<pid>.map`. The JIT describes its
//! code in that file, one `<start> <length> <name>` line per function, and it
//! keeps appending to it while the profiled program runs.
//!
//! ```text
//! 1. Sample arrives with frame ip=0x7f3c2a001010, dso=/tmp/perf-4242.map
//! 2. Cached batches for owner 4242 searched (binary search per batch)
//! 3. Miss → read further lines while the file has data ready
//!    7f3c2a001000 40 LazyCompile:*fib /tmp/fib.js:1   ← contains ip, stop
//! 4. Lines read are sorted and cached as a new batch
//! 5. Display name: "LazyCompile:*fib /tmp/fib.js:1"
//! ```
//!
//! A map that does not exist at first lookup is never retried; it is reported
//! at shutdown instead.
//!
//! ## Regular Modules
//!
//! For frames in ordinary binaries and libraries the offset inside the module
//! replaces the absolute address, and every `(module, offset)` seen is recorded
//! so the consumer learns which parts of which binaries were exercised.
//!
//! ## Module Structure
//!
//! - **`perf_map`**: incremental symbol-map reader and per-owner cache
//! - **`frame_resolver`**: name precedence rules and source usage
//! - **`demangle`**: Rust and C++ demangling without parameter lists

pub mod demangle;
pub mod frame_resolver;
pub mod perf_map;

pub use demangle::demangle;
pub use frame_resolver::{perf_map_owner, FrameResolver, ResolvedFrame, SourceUsage};
pub use perf_map::{parse_map_line, MapEntry, SymbolMap, SymbolMapCache};
