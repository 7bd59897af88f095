use super::*;

/// `INSERT INTO table (columns) VALUES (..), (..)`
#[derive(Debug, Clone)]
pub struct Insert {
    pub table: Name,
    pub columns: Vec<Name>,
    pub rows: Vec<Vec<Value>>,
}

impl Statement {
    pub fn insert<S: AsRef<str>>(
        table: impl Into<Name>,
        columns: &[S],
        rows: Vec<Vec<Value>>,
    ) -> Self {
        Insert {
            table: table.into(),
            columns: columns.iter().map(|c| Name::from(c.as_ref())).collect(),
            rows,
        }
        .into()
    }
}

impl From<Insert> for Statement {
    fn from(value: Insert) -> Self {
        Self::Insert(value)
    }
}
