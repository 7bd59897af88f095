use crate::{
    engine::{Engine, Querier, SolutionOrder},
    Principal, Session,
};

use rql_core::{
    bail, err,
    schema::Schema,
    stmt::{Args, Value},
    Result, Source,
};
use std::{collections::HashSet, fmt, sync::Arc};

/// Number of solved statements kept by default.
const DEFAULT_CACHE_CAPACITY: usize = 300;

/// A schema and the sources storing its entities.
#[derive(Clone)]
pub struct Repository {
    engine: Arc<Engine>,
}

pub struct Builder {
    schema: Option<Arc<Schema>>,

    system: Option<Box<dyn Source>>,

    sources: Vec<Box<dyn Source>>,

    cache_capacity: usize,

    order: SolutionOrder,
}

impl Repository {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.engine.schema
    }

    /// URIs of the registered sources, the system source first.
    pub fn source_uris(&self) -> Vec<&str> {
        self.engine.sources.iter().map(|source| source.uri()).collect()
    }

    /// Opens a session acting on behalf of `principal`.
    pub fn session(&self, principal: Principal) -> Session {
        Session::new(self.engine.clone(), principal)
    }

    /// Opens a session bypassing every permission check.
    pub fn internal_session(&self) -> Session {
        self.session(Principal::internal())
    }

    /// Inserts a `CWUser` and returns the principal acting as that user.
    pub async fn create_user<I>(&self, login: &str, groups: I) -> Result<Principal>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut session = self.internal_session();
        let args = Args::from([("login".to_string(), Value::from(login))]);

        let res = match session
            .execute("INSERT CWUser U: U login %(login)s", args, false)
            .await
        {
            Ok(res) => res,
            Err(err) => {
                session.rollback().await?;
                return Err(err);
            }
        };
        session.commit().await?;

        let eid = res
            .rows
            .first()
            .and_then(|row| row.first())
            .ok_or_else(|| err!("user {login} was not created"))?
            .to_eid()?;
        tracing::debug!(login, eid, "created user");
        Ok(Principal::new(eid, login, groups))
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("sources", &self.source_uris())
            .finish()
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            schema: None,
            system: None,
            sources: vec![],
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            order: SolutionOrder::default(),
        }
    }
}

impl Builder {
    pub fn schema(&mut self, schema: impl Into<Arc<Schema>>) -> &mut Self {
        self.schema = Some(schema.into());
        self
    }

    /// The source allocating eids and hosting temporary tables.
    pub fn system_source(&mut self, source: impl Source) -> &mut Self {
        self.system = Some(Box::new(source));
        self
    }

    /// Adds an external source.
    pub fn source(&mut self, source: impl Source) -> &mut Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Number of solved statements to cache; `0` disables the cache.
    pub fn cache_capacity(&mut self, capacity: usize) -> &mut Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn solution_order(&mut self, order: SolutionOrder) -> &mut Self {
        self.order = order;
        self
    }

    pub async fn build(&mut self) -> Result<Repository> {
        let Some(schema) = self.schema.take() else {
            bail!("no schema specified");
        };
        let Some(system) = self.system.take() else {
            bail!("no system source specified");
        };
        if !system.support().system {
            bail!("source {} cannot be the system source", system.uri());
        }

        let mut sources = vec![system];
        sources.append(&mut self.sources);

        let mut uris = HashSet::new();
        for source in &sources[1..] {
            if source.support().system {
                bail!("source {} is a second system source", source.uri());
            }
        }
        for source in &sources {
            if !uris.insert(source.uri().to_string()) {
                bail!("duplicate source uri {}", source.uri());
            }
        }

        for source in &mut sources {
            source.register_schema(&schema).await?;
            tracing::debug!(uri = source.uri(), "registered schema");
        }

        Ok(Repository {
            engine: Arc::new(Engine {
                schema,
                sources,
                querier: Querier::new(self.cache_capacity),
                order: self.order,
            }),
        })
    }
}
