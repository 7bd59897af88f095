use crate::engine::plan::Step;

/// Deletes the entities whose eids the child returns.
#[derive(Debug)]
pub(crate) struct DeleteEntities;

/// Deletes the `(from, to)` instances the child returns.
#[derive(Debug)]
pub(crate) struct DeleteRelations {
    pub(crate) rtype: String,
}

impl From<DeleteEntities> for Step {
    fn from(value: DeleteEntities) -> Self {
        Step::DeleteEntities(value)
    }
}

impl From<DeleteRelations> for Step {
    fn from(value: DeleteRelations) -> Self {
        Step::DeleteRelations(value)
    }
}
