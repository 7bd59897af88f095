use crate::engine::{plan::Step, SourceId};

use rql_core::{driver::VarMap, stmt};

/// A search sent to one source.
#[derive(Debug, Clone)]
pub(crate) struct Query {
    pub(crate) source: SourceId,

    pub(crate) union: stmt::Union,

    /// Variables and relations read from temporary tables
    pub(crate) var_map: VarMap,

    /// Key for reusing the generated SQL
    pub(crate) cache_key: Option<String>,
}

#[derive(Debug)]
pub(crate) struct Fetch {
    /// Queries whose rows are staged
    pub(crate) queries: Vec<Query>,

    /// Destination table; rows of the step's children are staged too
    pub(crate) table: String,
}

impl Query {
    pub(crate) fn new(source: SourceId, union: stmt::Union, var_map: VarMap) -> Query {
        // Staged tables change between executions
        let cache_key = var_map.is_empty().then(|| cache_key(&union));
        Query {
            source,
            union,
            var_map,
            cache_key,
        }
    }
}

/// Text of the union followed by the solutions of each select: two selects
/// with the same text may be typed differently.
fn cache_key(union: &stmt::Union) -> String {
    let mut key = union.to_string();
    for select in &union.selects {
        key.push_str(" |");
        for solution in &select.solutions {
            key.push(' ');
            key.push_str(&solution.to_string());
        }
    }
    key
}

impl From<Fetch> for Step {
    fn from(value: Fetch) -> Self {
        Step::Fetch(value)
    }
}
