mod value;
pub(crate) use value::Value;

mod write;

use lru::LruCache;
use parking_lot::Mutex;
use rql_core::{
    async_trait,
    driver::{
        operation::{CreateTempTable, EntityInfo, InsertRows, Operation, Search, Transaction},
        Response, Source, Support,
    },
    err,
    schema::Schema,
    stmt::{self, Args, Row},
    Error, Result,
};
use rql_sql::{
    layout,
    stmt::{ColumnDef, Filter, Type},
    Flavor, Generated, Generator, Param, Serializer,
};
use rusqlite::Connection;
use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
};
use url::Url;

/// Rows staged per `INSERT` statement.
const INSERT_BATCH: usize = 100;

/// A source backed by a SQLite database.
///
/// By default the source stores every entity type and relation and can act
/// as the system source. Restrict it with [`Sqlite::with_support`] to use it
/// as an external source.
pub struct Sqlite {
    uri: String,

    support: Support,

    schema: Option<Arc<Schema>>,

    connection: Mutex<Connection>,

    /// Generated SQL by cache key
    sql_cache: Option<Mutex<LruCache<String, Arc<Generated>>>>,
}

#[derive(Debug)]
enum Location {
    File(PathBuf),
    InMemory,
}

impl Sqlite {
    /// Open a SQLite source from a connection URL: `sqlite::memory:` or
    /// `sqlite:<path>`.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url_str = url.into();
        let url = Url::parse(&url_str).map_err(Error::backend)?;

        if url.scheme() != "sqlite" {
            return Err(err!(
                "connection URL does not have a `sqlite` scheme; url={url_str}"
            ));
        }

        let location = if url.path() == ":memory:" {
            Location::InMemory
        } else {
            Location::File(PathBuf::from(url.path()))
        };
        Self::connect(location)
    }

    /// Create an in-memory SQLite source
    pub fn in_memory() -> Result<Self> {
        Self::connect(Location::InMemory)
    }

    /// Open a SQLite database at the specified file path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::connect(Location::File(path.as_ref().to_path_buf()))
    }

    fn connect(location: Location) -> Result<Self> {
        let (connection, uri) = match &location {
            Location::InMemory => (Connection::open_in_memory(), "sqlite::memory:".to_string()),
            Location::File(path) => (Connection::open(path), format!("sqlite:{}", path.display())),
        };

        Ok(Self {
            uri,
            support: Support::system(),
            schema: None,
            connection: Mutex::new(connection.map_err(Error::backend)?),
            sql_cache: NonZeroUsize::new(256).map(|cap| Mutex::new(LruCache::new(cap))),
        })
    }

    /// Identify the source as `uri` in the `entities` table.
    pub fn with_name(self, uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..self
        }
    }

    /// Restrict the entity types and relations the source stores.
    pub fn with_support(self, support: Support) -> Self {
        Self { support, ..self }
    }

    /// Number of generated statements kept for reuse; `0` disables the
    /// cache.
    pub fn with_cache_capacity(self, capacity: usize) -> Self {
        Self {
            sql_cache: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            ..self
        }
    }

    fn schema(&self) -> Result<&Schema> {
        match &self.schema {
            Some(schema) => Ok(schema),
            None => Err(err!("schema not registered with source {}", self.uri)),
        }
    }
}

impl std::fmt::Debug for Sqlite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sqlite")
            .field("uri", &self.uri)
            .field("support", &self.support)
            .finish()
    }
}

#[async_trait]
impl Source for Sqlite {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn support(&self) -> &Support {
        &self.support
    }

    async fn register_schema(&mut self, schema: &Arc<Schema>) -> Result<()> {
        {
            let connection = self.connection.lock();

            let existing: Option<String> = connection
                .query_row(
                    "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [layout::ENTITIES],
                    |row| row.get(0),
                )
                .map(Some)
                .or_else(|err| match err {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    err => Err(Error::backend(err)),
                })?;

            if existing.is_none() {
                let support = &self.support;
                let statements = layout::create_schema(
                    schema,
                    |etype| support.supports_entity(etype),
                    |rtype| support.supports_relation(rtype),
                );
                for stmt in &statements {
                    execute(&connection, stmt)?;
                }
                tracing::debug!(source = %self.uri, tables = statements.len(), "created schema");
            }
        }

        self.schema = Some(schema.clone());
        Ok(())
    }

    async fn exec(&self, op: Operation) -> Result<Response> {
        tracing::trace!(source = %self.uri, op = op.name(), "exec");

        match op {
            Operation::Search(op) => self.search(op),
            Operation::CreateTempTable(op) => self.create_temp_table(op),
            Operation::DropTempTable(op) => {
                let connection = self.connection.lock();
                execute(
                    &connection,
                    &rql_sql::Statement::drop_table_if_exists(op.name),
                )?;
                Ok(Response::count(0))
            }
            Operation::InsertRows(op) => self.insert_rows(op),
            Operation::CreateEntity(op) => {
                let connection = self.connection.lock();
                let stmt = rql_sql::Statement::insert(
                    layout::ENTITIES,
                    &["type", "source"],
                    vec![vec![stmt::Value::from(op.etype), stmt::Value::from(op.source)]],
                );
                execute(&connection, &stmt)?;
                let eid = connection.last_insert_rowid();
                Ok(Response::values(vec![vec![stmt::Value::I64(eid)]]))
            }
            Operation::InsertEntity(op) => {
                let connection = self.connection.lock();
                write::insert_entity(&connection, self.schema()?, op)
            }
            Operation::InsertRelations(op) => {
                let connection = self.connection.lock();
                write::insert_relations(&connection, self.schema()?, &self.support, op)
            }
            Operation::UpdateEntity(op) => {
                let connection = self.connection.lock();
                write::update_entity(&connection, self.schema()?, op)
            }
            Operation::DeleteEntities(op) => {
                let connection = self.connection.lock();
                write::delete_entities(&connection, self.schema()?, &self.support, op)
            }
            Operation::DeleteRelations(op) => {
                let connection = self.connection.lock();
                write::delete_relations(&connection, self.schema()?, &self.support, op)
            }
            Operation::EntityInfo(op) => self.entity_info(op),
            Operation::Transaction(op) => {
                let connection = self.connection.lock();
                let sql = Serializer::sqlite().serialize_transaction(&op);
                connection.execute(&sql, []).map_err(Error::backend)?;
                if op == Transaction::Start {
                    tracing::trace!(source = %self.uri, "transaction started");
                }
                Ok(Response::count(0))
            }
        }
    }
}

impl Sqlite {
    fn search(&self, op: Search) -> Result<Response> {
        let cached = match (&op.cache_key, &self.sql_cache) {
            (Some(key), Some(cache)) => cache.lock().get(key).cloned(),
            _ => None,
        };

        let generated = match cached {
            Some(generated) => generated,
            None => {
                let generator = Generator::new(self.schema()?, Flavor::Sqlite);
                let generated = Arc::new(generator.generate(&op.union, &op.args, &op.var_map)?);

                if let (Some(key), Some(cache)) = (&op.cache_key, &self.sql_cache) {
                    if generated.cacheable {
                        cache.lock().put(key.clone(), generated.clone());
                    }
                }
                generated
            }
        };

        let params = resolve(&generated.params, &op.args)?;
        let connection = self.connection.lock();
        let rows = query(&connection, &generated.sql, &params, &generated.columns)?;
        Ok(Response::values(rows))
    }

    fn create_temp_table(&self, op: CreateTempTable) -> Result<Response> {
        let columns = op
            .columns
            .iter()
            .map(|column| ColumnDef::new(&column.name, Type::from_term_type(&column.ty)))
            .collect();

        let connection = self.connection.lock();
        execute(
            &connection,
            &rql_sql::Statement::create_temp_table(op.name, columns),
        )?;
        Ok(Response::count(0))
    }

    fn insert_rows(&self, op: InsertRows) -> Result<Response> {
        let Some(width) = op.rows.first().map(Vec::len) else {
            return Ok(Response::count(0));
        };
        let columns: Vec<String> = (0..width).map(|i| format!("C{i}")).collect();

        let connection = self.connection.lock();
        let mut count = 0;
        for chunk in op.rows.chunks(INSERT_BATCH) {
            let stmt = rql_sql::Statement::insert(&op.table, &columns, chunk.to_vec());
            count += execute(&connection, &stmt)?;
        }
        Ok(Response::count(count as u64))
    }

    fn entity_info(&self, op: EntityInfo) -> Result<Response> {
        if op.eids.is_empty() {
            return Ok(Response::empty());
        }

        let stmt = rql_sql::Statement::select(
            layout::ENTITIES,
            &["eid", "type", "source"],
            vec![Filter::any_of("eid", op.eids.into_iter().map(stmt::Value::I64))],
        );

        let connection = self.connection.lock();
        let rows = select(&connection, &stmt, &["Int", "String", "String"])?;
        Ok(Response::values(rows))
    }
}

/// Serializes and runs a statement, returning the number of changed rows.
pub(crate) fn execute(connection: &Connection, stmt: &rql_sql::Statement) -> Result<usize> {
    let mut params: Vec<Param> = vec![];
    let sql = Serializer::sqlite().serialize(stmt, &mut params);
    let params = resolve(&params, &Args::new())?;

    tracing::trace!(%sql, "execute");

    connection
        .prepare_cached(&sql)
        .and_then(|mut prepared| prepared.execute(rusqlite::params_from_iter(params.iter())))
        .map_err(|err| Error::backend(err).context(err!("failed statement: {sql}")))
}

/// Serializes and runs a row lookup.
pub(crate) fn select(
    connection: &Connection,
    stmt: &rql_sql::Statement,
    columns: &[&str],
) -> Result<Vec<Row>> {
    let mut params: Vec<Param> = vec![];
    let sql = Serializer::sqlite().serialize(stmt, &mut params);
    let params = resolve(&params, &Args::new())?;
    let columns: Vec<String> = columns.iter().map(|ty| ty.to_string()).collect();
    query(connection, &sql, &params, &columns)
}

fn query(connection: &Connection, sql: &str, params: &[Value], columns: &[String]) -> Result<Vec<Row>> {
    tracing::trace!(%sql, params = params.len(), "query");

    let failed = |err: rusqlite::Error| Error::backend(err).context(err!("failed statement: {sql}"));

    let mut stmt = connection.prepare_cached(sql).map_err(failed)?;
    let width = stmt.column_count();
    let mut rows = stmt
        .query(rusqlite::params_from_iter(params.iter()))
        .map_err(failed)?;

    let mut ret = vec![];
    while let Some(row) = rows.next().map_err(failed)? {
        let mut items = Vec::with_capacity(width);
        for index in 0..width {
            let ty = columns.get(index).map(String::as_str).unwrap_or("Any");
            items.push(Value::from_sql(row, index, ty)?.into_inner());
        }
        ret.push(items);
    }
    Ok(ret)
}

fn resolve(params: &[Param], args: &Args) -> Result<Vec<Value>> {
    params
        .iter()
        .map(|param| param.resolve(args).map(Value::from))
        .collect()
}
