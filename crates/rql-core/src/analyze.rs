//! Type solutions and variable annotations.

mod annotate;
pub use annotate::annotate;

mod solve;
pub use solve::{solve, solve_select};

use indexmap::IndexMap;

/// Types already known for some variables, typically resolved from eid
/// literals.
pub type KnownTypes = IndexMap<String, String>;
