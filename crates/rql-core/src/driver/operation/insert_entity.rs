use super::Operation;
use crate::stmt::{Eid, Value};

use indexmap::IndexMap;

#[derive(Debug, Clone)]
pub struct InsertEntity {
    pub etype: String,

    pub eid: Eid,

    /// Attribute and inlined relation values by name
    pub attrs: IndexMap<String, Value>,
}

impl From<InsertEntity> for Operation {
    fn from(value: InsertEntity) -> Self {
        Self::InsertEntity(value)
    }
}
