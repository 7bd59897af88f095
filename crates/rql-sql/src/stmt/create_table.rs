use super::*;

#[derive(Debug, Clone)]
pub struct CreateTable {
    /// Name of the table
    pub name: Name,

    /// Column definitions
    pub columns: Vec<ColumnDef>,

    /// Lives for the connection only
    pub temporary: bool,
}

impl Statement {
    pub fn create_table(name: impl Into<Name>, columns: Vec<ColumnDef>) -> Self {
        CreateTable {
            name: name.into(),
            columns,
            temporary: false,
        }
        .into()
    }

    /// Creates a temporary table used to stage intermediate results.
    pub fn create_temp_table(name: impl Into<Name>, columns: Vec<ColumnDef>) -> Self {
        CreateTable {
            name: name.into(),
            columns,
            temporary: true,
        }
        .into()
    }
}

impl From<CreateTable> for Statement {
    fn from(value: CreateTable) -> Self {
        Self::CreateTable(value)
    }
}
