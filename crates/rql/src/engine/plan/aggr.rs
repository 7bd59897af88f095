use crate::engine::plan::{Query, Step};

/// Final query over rows staged by the step's children. Runs on the system
/// source, which holds the temporary tables.
#[derive(Debug)]
pub(crate) struct Aggr {
    pub(crate) query: Query,
}

impl From<Aggr> for Step {
    fn from(value: Aggr) -> Self {
        Step::Aggr(value)
    }
}
