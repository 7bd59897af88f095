use crate::stmt::Row;

#[derive(Debug)]
pub struct Response {
    pub rows: Rows,
}

#[derive(Debug)]
pub enum Rows {
    /// Number of rows impacted by the operation
    Count(u64),

    /// Operation result
    Values(Vec<Row>),
}

impl Response {
    pub fn count(count: u64) -> Self {
        Self {
            rows: Rows::Count(count),
        }
    }

    pub fn values(rows: Vec<Row>) -> Self {
        Self {
            rows: Rows::Values(rows),
        }
    }

    pub fn empty() -> Self {
        Self::values(vec![])
    }
}

impl Rows {
    pub fn is_count(&self) -> bool {
        matches!(self, Self::Count(_))
    }

    pub fn is_values(&self) -> bool {
        matches!(self, Self::Values(_))
    }

    /// Rows of a value response. A count response has no rows.
    pub fn into_values(self) -> Vec<Row> {
        match self {
            Self::Values(rows) => rows,
            Self::Count(_) => vec![],
        }
    }

    pub fn into_count(self) -> u64 {
        match self {
            Self::Count(count) => count,
            Self::Values(rows) => rows.len() as u64,
        }
    }
}
