use super::*;

/// Plain row lookup, `SELECT columns FROM table WHERE filters`.
#[derive(Debug, Clone)]
pub struct Select {
    pub table: Name,
    pub columns: Vec<Name>,
    pub filters: Vec<Filter>,
}

impl Statement {
    pub fn select<S: AsRef<str>>(table: impl Into<Name>, columns: &[S], filters: Vec<Filter>) -> Self {
        Select {
            table: table.into(),
            columns: columns.iter().map(|c| Name::from(c.as_ref())).collect(),
            filters,
        }
        .into()
    }
}

impl From<Select> for Statement {
    fn from(value: Select) -> Self {
        Self::Select(value)
    }
}
