use super::Operation;

/// Allocates an eid, recording the entity type and owning source. Responds
/// with one row holding the eid.
#[derive(Debug, Clone)]
pub struct CreateEntity {
    pub etype: String,

    /// URI of the source storing the entity
    pub source: String,
}

impl From<CreateEntity> for Operation {
    fn from(value: CreateEntity) -> Self {
        Self::CreateEntity(value)
    }
}
