use super::Operation;
use crate::stmt::{Eid, Value};

use indexmap::IndexMap;

#[derive(Debug, Clone)]
pub struct UpdateEntity {
    pub etype: String,

    pub eid: Eid,

    /// Changed attribute and inlined relation values by name
    pub attrs: IndexMap<String, Value>,
}

impl From<UpdateEntity> for Operation {
    fn from(value: UpdateEntity) -> Self {
        Self::UpdateEntity(value)
    }
}
