//! Common imports for test files
//!
//! `use tests::prelude::*;`

pub use crate::{args, exec, insert, RqlTest, EXTERN};

pub use crate::assert_eq_unordered;

pub use rql::{Args, Description, Value};
pub use std_util::{assert_err, assert_ok};
