mod create_entity;
pub use create_entity::CreateEntity;

mod delete_entities;
pub use delete_entities::DeleteEntities;

mod entity_info;
pub use entity_info::EntityInfo;

mod insert_entity;
pub use insert_entity::InsertEntity;

mod relations;
pub use relations::{DeleteRelations, InsertRelations};

mod search;
pub use search::Search;

mod temp_table;
pub use temp_table::{CreateTempTable, DropTempTable, InsertRows, TempColumn};

mod transaction;
pub use transaction::Transaction;

mod update_entity;
pub use update_entity::UpdateEntity;

#[derive(Debug, Clone)]
pub enum Operation {
    /// Run a syntax tree search, returning rows
    Search(Search),

    /// Create a staging table (idempotent)
    CreateTempTable(CreateTempTable),

    /// Drop a staging table
    DropTempTable(DropTempTable),

    /// Stage rows into a temporary table
    InsertRows(InsertRows),

    /// Allocate an eid and record the owning source. System source only.
    CreateEntity(CreateEntity),

    /// Store a new entity with its attributes and inlined relations
    InsertEntity(InsertEntity),

    /// Store relation instances
    InsertRelations(InsertRelations),

    /// Change attributes and inlined relations of an entity
    UpdateEntity(UpdateEntity),

    /// Bulk delete entities with their relations
    DeleteEntities(DeleteEntities),

    /// Bulk delete relation instances
    DeleteRelations(DeleteRelations),

    /// Type and owning source of eids. System source only.
    EntityInfo(EntityInfo),

    /// Execute a transaction lifecycle op
    Transaction(Transaction),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Search(_) => "search",
            Self::CreateTempTable(_) => "create_temp_table",
            Self::DropTempTable(_) => "drop_temp_table",
            Self::InsertRows(_) => "insert_rows",
            Self::CreateEntity(_) => "create_entity",
            Self::InsertEntity(_) => "insert_entity",
            Self::InsertRelations(_) => "insert_relations",
            Self::UpdateEntity(_) => "update_entity",
            Self::DeleteEntities(_) => "delete_entities",
            Self::DeleteRelations(_) => "delete_relations",
            Self::EntityInfo(_) => "entity_info",
            Self::Transaction(_) => "transaction",
        }
    }
}
