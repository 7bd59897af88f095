use super::Operation;
use crate::stmt::Eid;

/// Deletes entities together with every relation instance referencing them.
#[derive(Debug, Clone)]
pub struct DeleteEntities {
    /// (eid, entity type)
    pub entities: Vec<(Eid, String)>,
}

impl From<DeleteEntities> for Operation {
    fn from(value: DeleteEntities) -> Self {
        Self::DeleteEntities(value)
    }
}
