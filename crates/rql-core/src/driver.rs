mod response;
pub use response::{Response, Rows};

pub mod operation;
pub use operation::Operation;

mod support;
pub use support::Support;

mod var_map;
pub use var_map::{ColumnRef, StagedRelation, VarMap};

use crate::{async_trait, schema::Schema};

use std::{fmt::Debug, sync::Arc};

/// A backing store able to answer part or all of a query.
///
/// One source of a repository is the *system* source: it allocates eids,
/// records which source owns each entity and hosts temporary tables.
#[async_trait]
pub trait Source: Debug + Send + Sync + 'static {
    /// Identifies the source in the `entities` table.
    fn uri(&self) -> &str;

    /// Entity types and relations the source stores.
    fn support(&self) -> &Support;

    /// Register the schema with the source, creating missing tables.
    async fn register_schema(&mut self, schema: &Arc<Schema>) -> crate::Result<()>;

    /// Execute an operation.
    async fn exec(&self, op: Operation) -> crate::Result<Response>;
}
