//! # Symbol Dictionary Compression
//!
//! The same few hundred symbols recur across thousands of samples and every
//! callchain depth. Instead of repeating `(symbol, module)` strings in every
//! output record, each distinct pair is replaced by a short code:
//!
//! ```text
//! ("tokio::runtime::park", "/usr/bin/app")  →  " "
//! ("main", "/usr/bin/app")                  →  "!"
//! ...
//! (96th distinct pair)                      →  "  "
//! ```
//!
//! The reverse mapping (code → pair) is written once at shutdown so consumers
//! can expand the records again.
//!
//! ## Module Structure
//!
//! - **`codegen`**: mixed-radix counter over printable ASCII producing codes
//! - **`symbol_dict`**: append-only `(name, module)` ↔ code bijection

pub mod codegen;
pub mod symbol_dict;

pub use codegen::CodeGenerator;
pub use symbol_dict::{SymbolDictionary, SymbolKey};
