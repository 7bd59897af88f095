use super::*;

#[derive(Debug, Clone)]
pub struct Delete {
    pub table: Name,
    pub filters: Vec<Filter>,
}

impl Statement {
    pub fn delete(table: impl Into<Name>, filters: Vec<Filter>) -> Self {
        Delete {
            table: table.into(),
            filters,
        }
        .into()
    }
}

impl From<Delete> for Statement {
    fn from(value: Delete) -> Self {
        Self::Delete(value)
    }
}
