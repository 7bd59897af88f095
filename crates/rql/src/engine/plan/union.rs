use crate::engine::plan::Step;

#[derive(Debug)]
pub(crate) struct Union {
    pub(crate) limit: Option<u64>,

    /// Rows skipped across all children
    pub(crate) offset: u64,
}

/// Runs its `Fetch` children; returns no rows.
#[derive(Debug)]
pub(crate) struct UnionFetch;

impl From<Union> for Step {
    fn from(value: Union) -> Self {
        Step::Union(value)
    }
}

impl From<UnionFetch> for Step {
    fn from(value: UnionFetch) -> Self {
        Step::UnionFetch(value)
    }
}
