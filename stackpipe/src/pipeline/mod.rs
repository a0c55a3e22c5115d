//! # Pipeline Driver
//!
//! Orchestrates every stage for each incoming sample and owns shutdown:
//!
//! ```text
//!            begin                       end
//!   Idle ───────────▶ Running ───────────────▶ Draining ──▶ Closed
//!                      │  ▲
//!                      └──┘ process_sample:
//!                           resolve frames → filter → encode → route
//! ```
//!
//! On `end` every output stream receives `<STOP>`; if any sample was seen the
//! dictionary artifact is written and the sources report sent; the list of
//! missing symbol maps is always sent, followed by `<STOP>` on the control
//! channel.

pub mod driver;

pub use driver::{PipelineDriver, PipelineState, RunSummary};
