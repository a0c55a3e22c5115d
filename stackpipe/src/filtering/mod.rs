//! # Callchain Filtering
//!
//! Users can restrict which frames reach the output, either with allow/deny
//! rules or with their own classifier script:
//!
//! ```text
//! allow [["SYM foo"]], mark=true
//!
//! input (innermost first):   a        foo       b
//! verdicts:                  reject   keep      reject
//! collapsed:                 (cut)    foo       (cut)
//! output (outermost first):  (cut)    foo       (cut)
//! ```
//!
//! Consecutive rejected frames collapse into one `(cut)` marker when marking is
//! enabled, and vanish otherwise. Output is always outermost first, filtered or
//! not.
//!
//! ## Module Structure
//!
//! - **`rules`**: `SYM`/`EXEC`/`ANY` conditions, rule-groups and rule sets
//! - **`classifier`**: the [`FrameClassifier`] capability and its variants
//! - **`callchain_filter`**: verdict application, cut collapsing, reordering

pub mod callchain_filter;
pub mod classifier;
pub mod rules;

pub use callchain_filter::{passthrough, CallchainFilter, FilteredFrame};
pub use classifier::{ExternalClassifier, FrameClassifier, RuleClassifier, RuleMode};
pub use rules::{Condition, RuleGroup, RuleSet};
