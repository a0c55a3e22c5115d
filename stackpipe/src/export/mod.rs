//! Record output
//!
//! This module writes everything the pipeline produces:
//! - Per-sample records on the output streams, routed round-robin per thread
//! - Bootstrap settings and shutdown reports on the control channel
//! - The dictionary artifact at shutdown

pub mod artifact;
pub mod connection;
pub mod control;
pub mod router;

pub use artifact::write_dictionary;
pub use connection::{parse_endpoints, Connection, Endpoint};
pub use control::{read_bootstrap, ControlChannel};
pub use router::StreamRouter;
