mod column_def;
pub use column_def::ColumnDef;

mod create_index;
pub use create_index::CreateIndex;

mod create_table;
pub use create_table::CreateTable;

mod delete;
pub use delete::Delete;

mod drop_table;
pub use drop_table::DropTable;

mod filter;
pub use filter::Filter;

mod insert;
pub use insert::Insert;

mod name;
pub use name::Name;

mod select;
pub use select::Select;

mod ty;
pub use ty::Type;

mod update;
pub use update::Update;

pub use rql_core::stmt::Value;

/// Statements run against the physical layout: table management and the
/// row-level writes of the entity store. Queries are produced by the
/// [`Generator`](crate::Generator).
#[derive(Debug, Clone)]
pub enum Statement {
    CreateIndex(CreateIndex),
    CreateTable(CreateTable),
    Delete(Delete),
    DropTable(DropTable),
    Insert(Insert),
    Select(Select),
    Update(Update),
}

impl Statement {
    pub fn is_ddl(&self) -> bool {
        matches!(
            self,
            Statement::CreateIndex(_) | Statement::CreateTable(_) | Statement::DropTable(_)
        )
    }

    pub fn is_select(&self) -> bool {
        matches!(self, Statement::Select(_))
    }
}
