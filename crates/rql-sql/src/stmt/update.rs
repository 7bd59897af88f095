use super::*;

#[derive(Debug, Clone)]
pub struct Update {
    pub table: Name,
    pub assignments: Vec<(Name, Value)>,
    pub filters: Vec<Filter>,
}

impl Statement {
    pub fn update(
        table: impl Into<Name>,
        assignments: impl IntoIterator<Item = (String, Value)>,
        filters: Vec<Filter>,
    ) -> Self {
        Update {
            table: table.into(),
            assignments: assignments
                .into_iter()
                .map(|(column, value)| (Name::from(column), value))
                .collect(),
            filters,
        }
        .into()
    }
}

impl From<Update> for Statement {
    fn from(value: Update) -> Self {
        Self::Update(value)
    }
}
