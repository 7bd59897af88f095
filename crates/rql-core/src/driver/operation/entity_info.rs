use super::Operation;
use crate::stmt::Eid;

/// Responds with one `(eid, type, source)` row per known eid. Unknown eids
/// are omitted.
#[derive(Debug, Clone)]
pub struct EntityInfo {
    pub eids: Vec<Eid>,
}

impl From<EntityInfo> for Operation {
    fn from(value: EntityInfo) -> Self {
        Self::EntityInfo(value)
    }
}
