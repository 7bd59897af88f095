use rql_core::stmt::{Row, Value};

/// Rows returned by [`Session::execute`](crate::Session::execute).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub rows: Vec<Row>,

    /// Type of each column, when requested
    pub description: Option<Description>,
}

/// Type names of result columns: entity types for eid columns, attribute
/// types (`String`, `Int`, ...) otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Description {
    /// Every row has the same column types
    Uniform(Vec<String>),

    /// Column types of each row, when a union or an ambiguous variable
    /// mixes types
    PerRow(Vec<Vec<String>>),
}

impl ResultSet {
    pub fn new(rows: Vec<Row>) -> ResultSet {
        ResultSet {
            rows,
            description: None,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of column `index`, one per row.
    pub fn column(&self, index: usize) -> Vec<&Value> {
        self.rows.iter().filter_map(|row| row.get(index)).collect()
    }

    /// Types of row `index`.
    pub fn row_types(&self, index: usize) -> Option<&[String]> {
        match self.description.as_ref()? {
            Description::Uniform(types) => Some(types),
            Description::PerRow(rows) => rows.get(index).map(Vec::as_slice),
        }
    }
}
