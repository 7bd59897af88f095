use crate::engine::plan::{Query, Step};

#[derive(Debug)]
pub(crate) struct OneFetch {
    /// Run in order; rows are concatenated
    pub(crate) queries: Vec<Query>,
}

impl From<OneFetch> for Step {
    fn from(value: OneFetch) -> Self {
        Step::OneFetch(value)
    }
}
