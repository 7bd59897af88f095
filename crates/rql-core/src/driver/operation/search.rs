use super::Operation;
use crate::{
    driver::VarMap,
    stmt::{Args, Union},
};

/// Evaluate a union of selects. SQL sources translate it with the SQL
/// generator.
#[derive(Debug, Clone)]
pub struct Search {
    pub union: Union,

    pub args: Args,

    /// Variables and relations read from temporary tables
    pub var_map: VarMap,

    /// When set, the translation may be cached under this key and reused
    /// with different args.
    pub cache_key: Option<String>,
}

impl From<Search> for Operation {
    fn from(value: Search) -> Self {
        Self::Search(value)
    }
}
