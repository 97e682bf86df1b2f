//! Embeddable streaming line filter reproducing GNU grep's matching
//! semantics: multi-pattern OR matching with ignore-case, invert-match,
//! whole-word, and whole-line refinement, applied to a byte stream one
//! line at a time.
//!
//! ```no_run
//! use std::io::Read;
//! use linegrep::{Grep, MatchOptions, PatternSet};
//!
//! # fn main() -> linegrep::GrepResult<()> {
//! let patterns = PatternSet::new("").with_regexps(["foo", "bar"]);
//! let options = MatchOptions::new().ignore_case();
//!
//! let mut out = String::new();
//! Grep::from_parts(patterns, options)
//!     .filter(std::io::stdin())?
//!     .read_to_string(&mut out)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod errors;
pub mod filter;
pub mod pattern;

pub use config::MatchOptions;
pub use errors::{GrepError, GrepResult};
pub use filter::{Grep, LineMatcher, MatcherSet, MatchReader};
pub use pattern::PatternSet;
