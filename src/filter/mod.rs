//! Line filtering: pattern compilation, boundary refinement, and the
//! streaming engine that applies the composite matcher to an input byte
//! stream one line at a time.

pub mod engine;
pub mod matcher;

pub use engine::{Grep, MatchReader};
pub use matcher::{compile, LineMatcher, MatcherSet};
