mod describe;
mod exec;

mod order;
pub use order::SolutionOrder;

mod plan;

mod planner;
use planner::Planner;

mod querier;
pub use querier::CacheKey;
pub(crate) use querier::Querier;

mod security;

mod store;

use crate::{Principal, ResultSet};

use async_recursion::async_recursion;
use indexmap::IndexMap;
use rql_core::{
    analyze::KnownTypes,
    driver::operation::{EntityInfo, Transaction},
    err,
    schema::Schema,
    stmt::{Args, CmpOp, Eid, Expr, Node, Statement, Value},
    Error, Result, Source,
};
use std::sync::Arc;

/// Index of a source in [`Engine::sources`]. The system source is always
/// first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct SourceId(pub(crate) usize);

impl SourceId {
    pub(crate) const SYSTEM: SourceId = SourceId(0);

    pub(crate) fn is_system(self) -> bool {
        self == Self::SYSTEM
    }
}

/// Where an entity is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EntityLocation {
    pub(crate) etype: String,
    pub(crate) source: SourceId,
}

pub(crate) struct Engine {
    pub(crate) schema: Arc<Schema>,

    /// Registered sources, the system source first
    pub(crate) sources: Vec<Box<dyn Source>>,

    pub(crate) querier: Querier,

    pub(crate) order: SolutionOrder,
}

/// State shared by the planning and execution of one statement.
pub(crate) struct Cx<'a> {
    pub(crate) engine: &'a Engine,

    pub(crate) principal: &'a Principal,

    /// Source new entities are stored in, when it supports their type
    pub(crate) write_source: Option<SourceId>,
}

impl Engine {
    pub(crate) fn system(&self) -> &dyn Source {
        &*self.sources[SourceId::SYSTEM.0]
    }

    pub(crate) fn source(&self, id: SourceId) -> &dyn Source {
        &*self.sources[id.0]
    }

    pub(crate) fn source_ids(&self) -> impl Iterator<Item = SourceId> {
        (0..self.sources.len()).map(SourceId)
    }

    pub(crate) fn source_by_uri(&self, uri: &str) -> Option<SourceId> {
        self.sources
            .iter()
            .position(|source| source.uri() == uri)
            .map(SourceId)
    }

    pub(crate) fn is_multi_source(&self) -> bool {
        self.sources.len() > 1
    }

    /// Runs an RQL statement on behalf of `principal`.
    pub(crate) async fn exec(
        &self,
        principal: &Principal,
        write_source: Option<SourceId>,
        rql: &str,
        args: Args,
        describe: bool,
    ) -> Result<ResultSet> {
        let (normalized, parsed) = self.querier.parse(rql)?;

        let known = match self.known_types(&parsed, &args).await {
            Ok(known) => known,
            Err(err) if err.is_unknown_eid() && parsed.is_select() => {
                tracing::debug!(%err, "select restricted to an unknown eid");
                return Ok(ResultSet {
                    rows: vec![],
                    description: describe.then(|| crate::Description::Uniform(vec![])),
                });
            }
            Err(err) => return Err(err),
        };

        let key = CacheKey::new(normalized, &known);
        let solved = self.querier.solve(&self.schema, key, &parsed, &known)?;

        let cx = Cx {
            engine: self,
            principal,
            write_source,
        };

        let plan = Planner::new(&cx, args).build_plan(Statement::clone(&solved))?;
        tracing::debug!(rql, %plan, "planned");

        let rows = cx.exec_plan(&plan).await?;
        let description = if describe {
            Some(cx.describe(&plan.result, &rows).await?)
        } else {
            None
        };

        Ok(ResultSet { rows, description })
    }

    /// Types of the variables bound to an eid by a top-level `V eid <n>`
    /// relation.
    async fn known_types(&self, stmt: &Statement, args: &Args) -> Result<KnownTypes> {
        let mut bound: Vec<(String, Eid)> = vec![];

        let mut collect = |node: &Node| {
            for conjunct in node.conjuncts() {
                let Node::Relation(rel) = conjunct else {
                    continue;
                };
                if rel.rtype != "eid" || rel.op != CmpOp::Eq {
                    continue;
                }
                let eid = match &rel.object {
                    Expr::Value(value) => value.to_eid().ok(),
                    Expr::Arg(name) => args.get(name).and_then(|value| value.to_eid().ok()),
                    _ => None,
                };
                if let Some(eid) = eid {
                    bound.push((rel.subject.clone(), eid));
                }
            }
        };

        match stmt {
            Statement::Select(union) => {
                for select in &union.selects {
                    if let Some(restriction) = &select.restriction {
                        collect(restriction);
                    }
                }
            }
            stmt => {
                if let Some(restriction) = stmt.restriction() {
                    collect(restriction);
                }
            }
        }

        let mut known = KnownTypes::new();
        if bound.is_empty() {
            return Ok(known);
        }

        let info = self
            .entity_info(bound.iter().map(|(_, eid)| *eid).collect())
            .await?;
        for (var, eid) in bound {
            let Some(location) = info.get(&eid) else {
                return Err(Error::unknown_eid(eid));
            };
            known.entry(var).or_insert_with(|| location.etype.clone());
        }
        Ok(known)
    }

    /// Type and owning source of each known eid. Unknown eids are omitted.
    pub(crate) async fn entity_info(&self, eids: Vec<Eid>) -> Result<IndexMap<Eid, EntityLocation>> {
        let mut ret = IndexMap::new();
        if eids.is_empty() {
            return Ok(ret);
        }

        let rows = self
            .system()
            .exec(EntityInfo { eids }.into())
            .await?
            .rows
            .into_values();

        for row in rows {
            let [eid, etype, uri] = &row[..] else {
                return Err(err!("malformed entity info row: {row:?}"));
            };
            let (Some(etype), Some(uri)) = (etype.as_str(), uri.as_str()) else {
                return Err(err!("malformed entity info row: {row:?}"));
            };
            let source = self
                .source_by_uri(uri)
                .ok_or_else(|| err!("entity {eid} is stored in unknown source {uri}"))?;
            ret.insert(
                eid.to_eid()?,
                EntityLocation {
                    etype: etype.to_string(),
                    source,
                },
            );
        }
        Ok(ret)
    }

    /// Sends a transaction command to every source.
    pub(crate) async fn transaction(&self, op: Transaction) -> Result<()> {
        let mut ret = Ok(());
        for source in &self.sources {
            if let Err(err) = source.exec(op.into()).await {
                tracing::warn!(source = source.uri(), ?op, %err, "transaction command failed");
                // Every source still receives the command
                if ret.is_ok() {
                    ret = Err(err);
                }
            }
        }
        ret
    }
}

impl Cx<'_> {
    /// Runs a select with every permission granted.
    ///
    /// Write steps check permissions with it while the statement runs.
    #[async_recursion]
    pub(crate) async fn internal_query(&self, rql: &str, args: Args) -> Result<Vec<Vec<Value>>> {
        let internal = Principal::internal();
        let res = self.engine.exec(&internal, None, rql, args, false).await?;
        Ok(res.rows)
    }
}
