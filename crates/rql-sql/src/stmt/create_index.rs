use super::*;

#[derive(Debug, Clone)]
pub struct CreateIndex {
    pub name: Name,

    /// Indexed table
    pub on: Name,

    pub columns: Vec<Name>,

    pub unique: bool,
}

impl Statement {
    pub fn create_index(name: impl Into<Name>, on: impl Into<Name>, columns: Vec<String>) -> Self {
        CreateIndex {
            name: name.into(),
            on: on.into(),
            columns: columns.into_iter().map(Name::from).collect(),
            unique: false,
        }
        .into()
    }
}

impl From<CreateIndex> for Statement {
    fn from(value: CreateIndex) -> Self {
        Self::CreateIndex(value)
    }
}
