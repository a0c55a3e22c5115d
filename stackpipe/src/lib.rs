//! # stackpipe - Sampled Callchain Post-Processing
//!
//! stackpipe sits between a sampling profiler's event dispatcher and the
//! consumers that build call trees out of its samples. For every sample it
//! resolves the callchain to symbol names (including JIT code described by
//! `perf-<pid>.map` files), optionally filters frames, compresses symbols into
//! short dictionary codes and streams one compact record to one of several
//! consumer connections.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Host Profiler Engine                           │
//! │          (one callback per sample, frames already unwound)      │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ SampleEvent
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   stackpipe (This Crate)                        │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │Symbolization │──▶│  Filtering   │──▶│  Dictionary  │         │
//! │  │ (perf maps)  │   │ (allow/deny) │   │ (code gen)   │         │
//! │  └──────────────┘   └──────────────┘   └──────┬───────┘         │
//! │                                               ▼                 │
//! │                                        ┌──────────────┐         │
//! │                                        │    Export    │         │
//! │                                        │ (round robin)│         │
//! │                                        └──────┬───────┘         │
//! └───────────────────────────────────────────────┼─────────────────┘
//!                                                 │ JSON lines
//!                         ┌───────────────────────┼──────────────┐
//!                         ▼                       ▼              ▼
//!                    stream 0                stream 1  ...  control channel
//! ```
//!
//! ## Module Structure
//!
//! - [`symbolization`]: raw frame → `(display name, module path)`, incremental
//!   `perf-<pid>.map` parsing, demangling
//! - [`filtering`]: allow/deny rule-groups, external classifier scripts, cut
//!   markers
//! - [`dictionary`]: compact code generation and the symbol dictionary
//! - [`export`]: output connections, per-thread round-robin routing, control
//!   channel, dictionary artifact
//! - [`pipeline`]: the per-sample driver and its begin/end lifecycle
//! - [`cli`]: command-line configuration
//! - [`domain`]: core domain types (Pid, Tid, `EventKind`) and errors
//!
//! ## Typical Usage
//!
//! ```bash
//! # Two TCP consumers, samples from a file
//! stackpipe --outputs 'tcp 127.0.0.1_5000 127.0.0.1_5001' --input samples.jsonl
//!
//! # Launched by a frontend with inherited pipes
//! STACKPIPE_SERV_CONNECT='pipe 5_6' STACKPIPE_CONNECT='pipe 3_4' stackpipe
//! ```

pub mod cli;
pub mod dictionary;
pub mod domain;
pub mod export;
pub mod filtering;
pub mod pipeline;
pub mod symbolization;
