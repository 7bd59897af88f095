use super::Operation;
use crate::stmt::Eid;

/// Stores `(from, to)` instances of a relation. Inlined relations set the
/// subject's column.
#[derive(Debug, Clone)]
pub struct InsertRelations {
    pub rtype: String,
    pub pairs: Vec<(Eid, Eid)>,
}

#[derive(Debug, Clone)]
pub struct DeleteRelations {
    pub rtype: String,
    pub pairs: Vec<(Eid, Eid)>,
}

impl From<InsertRelations> for Operation {
    fn from(value: InsertRelations) -> Self {
        Self::InsertRelations(value)
    }
}

impl From<DeleteRelations> for Operation {
    fn from(value: DeleteRelations) -> Self {
        Self::DeleteRelations(value)
    }
}
