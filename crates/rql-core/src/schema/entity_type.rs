use super::Permissions;

#[derive(Debug, Clone)]
pub struct EntityType {
    pub name: String,

    pub permissions: Permissions,

    /// Full-text indexed attributes
    pub fulltext: Vec<String>,
}
