use super::Operation;
use crate::stmt::Row;

#[derive(Debug, Clone)]
pub struct CreateTempTable {
    pub name: String,
    pub columns: Vec<TempColumn>,
}

/// A staging table column. Columns are named `C0`, `C1`, ... in definition
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempColumn {
    pub name: String,

    /// Entity type (the column holds eids) or attribute type name
    pub ty: String,
}

#[derive(Debug, Clone)]
pub struct DropTempTable {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct InsertRows {
    pub table: String,
    pub rows: Vec<Row>,
}

impl From<CreateTempTable> for Operation {
    fn from(value: CreateTempTable) -> Self {
        Self::CreateTempTable(value)
    }
}

impl From<DropTempTable> for Operation {
    fn from(value: DropTempTable) -> Self {
        Self::DropTempTable(value)
    }
}

impl From<InsertRows> for Operation {
    fn from(value: InsertRows) -> Self {
        Self::InsertRows(value)
    }
}
