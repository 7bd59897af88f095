use super::{select::Placed, Planner};
use crate::engine::{
    plan::{Aggr, Fetch, Intersect, OneFetch, Query, StepId, UnionFetch},
    Engine, SourceId,
};

use indexmap::IndexMap;
use rql_core::{
    analyze,
    driver::{operation::TempColumn, StagedRelation, VarMap},
    schema::Schema,
    stmt::{self, CmpOp, Compare, Expr, Node, Relation, RelationCx, Select, Solution},
    Error, Result,
};

/// Which sources hold the entities and relations of a select.
struct Routing<'a> {
    engine: &'a Engine,
    schema: &'a Schema,
}

/// Entity variables staged together by one fetch.
#[derive(Debug)]
struct StagedGroup {
    sources: Vec<SourceId>,

    /// Staged variables in column order: entity variables first
    columns: Vec<String>,

    /// Restrictions evaluated by the fetch
    pushed: Vec<Node>,

    /// Planner variables and how to type them
    fresh: Vec<(String, Fresh)>,
}

#[derive(Debug)]
enum Fresh {
    /// Same type as another variable
    Alias(String),

    /// Value of `subject rtype`
    Attribute { subject: String, rtype: String },
}

#[derive(Debug, Default)]
struct Split {
    groups: Vec<StagedGroup>,

    /// Group of each staged entity variable
    staged: IndexMap<String, usize>,

    /// Group staging each attribute variable
    attrs: IndexMap<String, usize>,

    /// Conditions the final query checks on staged columns
    compares: Vec<Node>,
}

/// Relation instances staged from external sources.
#[derive(Debug)]
struct Cross {
    subject: String,
    rtype: String,
    object: String,
    sources: Vec<SourceId>,

    /// Every use of the relation is negated
    negated: bool,
}

impl Planner<'_> {
    /// Places a select over the sources holding its data: on one source when
    /// possible, spread over several when it reads a single entity variable,
    /// split into staged fetches and a final query otherwise.
    pub(super) fn place_multi(&mut self, select: Select) -> Result<Placed> {
        let routing = Routing {
            engine: self.cx.engine,
            schema: self.schema(),
        };

        let var_sources: IndexMap<String, Vec<SourceId>> = entity_vars(routing.schema, &select)
            .into_iter()
            .map(|var| {
                let sources = routing.var_sources(&select, &var);
                (var, sources)
            })
            .collect();

        let mut stored: Vec<(Relation, RelationCx, Vec<SourceId>)> = vec![];
        if let Some(restriction) = &select.restriction {
            restriction.for_each_relation(&mut |rel, cx| {
                if is_stored(routing.schema, &rel.rtype) {
                    stored.push((rel.clone(), cx, routing.relation_sources(&select, rel)));
                }
            });
        }

        let mut all: Vec<SourceId> = var_sources
            .values()
            .flatten()
            .chain(stored.iter().flat_map(|(_, _, sources)| sources))
            .copied()
            .collect();
        all.sort();
        all.dedup();

        match all[..] {
            [] => return Ok(Placed::Selects(vec![(SourceId::SYSTEM, select)])),
            [source] => return Ok(Placed::Selects(vec![(source, select)])),
            _ => {}
        }

        if var_sources.len() == 1 && stored.is_empty() {
            let mut ret = vec![];
            for source in var_sources.values().flatten() {
                if let Some(part) = routing.restrict(&select, *source) {
                    ret.push((*source, part));
                }
            }
            tracing::trace!(sources = ret.len(), "select spread over sources");
            return Ok(Placed::Selects(ret));
        }

        self.split(select, &routing, var_sources, &stored)
    }

    fn split(
        &mut self,
        mut select: Select,
        routing: &Routing<'_>,
        var_sources: IndexMap<String, Vec<SourceId>>,
        stored: &[(Relation, RelationCx, Vec<SourceId>)],
    ) -> Result<Placed> {
        let schema = routing.schema;

        // Variables linked by a relation a single external source stores
        // are fetched together from that source
        let mut groups: Vec<(Vec<String>, Vec<SourceId>)> = var_sources
            .into_iter()
            .map(|(var, sources)| (vec![var], sources))
            .collect();
        for (rel, cx, sources) in stored {
            if cx.scope != 0 || cx.negated || cx.in_or || rel.is_optional() {
                continue;
            }
            let [source] = sources[..] else {
                continue;
            };
            let Some(object) = rel.object_var() else {
                continue;
            };
            if source.is_system() {
                continue;
            }
            let (Some(a), Some(b)) = (group_of(&groups, &rel.subject), group_of(&groups, object)) else {
                continue;
            };
            if !groups[a].1.contains(&source) || !groups[b].1.contains(&source) {
                continue;
            }

            let (keep, other) = (a.min(b), a.max(b));
            if keep != other {
                let (vars, _) = groups.remove(other);
                groups[keep].0.extend(vars);
            }
            groups[keep].1 = vec![source];
        }

        // Variables only the system source holds stay in the final query
        let mut split = Split::default();
        for (vars, sources) in groups {
            if sources == [SourceId::SYSTEM] {
                continue;
            }
            let index = split.groups.len();
            for var in &vars {
                split.staged.insert(var.clone(), index);
            }
            split.groups.push(StagedGroup {
                sources,
                columns: vars,
                pushed: vec![],
                fresh: vec![],
            });
        }

        let conjuncts = match select.restriction.take() {
            Some(Node::And(nodes)) => nodes,
            Some(node) => vec![node],
            None => vec![],
        };
        let mut remaining = vec![];
        for node in conjuncts {
            let target = node.as_relation().and_then(|rel| split.push_target(schema, rel));
            match (target, node) {
                (Some(index), Node::Relation(rel)) => self.push_down(&mut split, schema, index, rel),
                (_, node) => remaining.push(node),
            }
        }

        let mut nodes = Vec::with_capacity(remaining.len());
        for node in remaining {
            nodes.push(self.stage_nested(&mut split, schema, node)?);
        }
        let restriction = Node::and(nodes.into_iter().chain(split.compares.drain(..)));

        let cross = cross_relations(routing, &select, &split, restriction.as_ref())?;

        let mut var_map = VarMap::default();
        let mut fetches = vec![];
        for group in &split.groups {
            let mut fetch = Select::new(
                group.columns.iter().map(Expr::var).collect(),
                Node::and(group.pushed.iter().cloned()),
            );
            fetch.solutions = fetch_solutions(schema, &select.solutions, &fetch.defined_vars(), &group.fresh);
            analyze::annotate(schema, &mut fetch);

            let (table, id) = self.stage(routing, &fetch, &group.sources);
            fetches.push(id);
            for (i, var) in group.columns.iter().enumerate() {
                var_map.insert(var, &table, format!("C{i}"));
            }
        }

        // One table per source for a negated relation the final query can
        // check source by source
        let negated: Vec<usize> = cross
            .iter()
            .enumerate()
            .filter(|(_, rel)| rel.negated && rel.sources.len() > 1)
            .map(|(i, _)| i)
            .collect();
        let intersect = match negated[..] {
            [i] if !select.needs_materialization() => Some(i),
            _ => None,
        };

        let mut present = vec![];
        for (i, rel) in cross.iter().enumerate() {
            let rel_select = rel.select(schema, &select.solutions);
            if Some(i) == intersect {
                for source in &rel.sources {
                    let (table, id) = self.stage(routing, &rel_select, &[*source]);
                    fetches.push(id);
                    present.push(rel.staged(table));
                }
            } else {
                let (table, id) = self.stage(routing, &rel_select, &rel.sources);
                fetches.push(id);
                var_map.relations.push(rel.staged(table));
            }
        }

        tracing::debug!(
            groups = split.groups.len(),
            relations = cross.len(),
            intersect = intersect.is_some(),
            "select split across sources"
        );

        let union_fetch = self.plan.push(UnionFetch, fetches);
        select.restriction = restriction;
        analyze::annotate(schema, &mut select);

        if present.is_empty() {
            let materialize = select.needs_materialization() || select.has_limit();
            let query = Query::new(SourceId::SYSTEM, stmt::Union::single(select), var_map);
            let id = if materialize {
                self.plan.push(Aggr { query }, vec![union_fetch])
            } else {
                self.plan.push(
                    OneFetch {
                        queries: vec![query],
                    },
                    vec![union_fetch],
                )
            };
            return Ok(Placed::Step(id));
        }

        let limit = select.limit.take();
        let offset = std::mem::take(&mut select.offset);

        let mut children = vec![];
        for (i, staged) in present.into_iter().enumerate() {
            let mut var_map = var_map.clone();
            var_map.relations.push(staged);
            let query = Query::new(SourceId::SYSTEM, stmt::Union::single(select.clone()), var_map);
            // The first final query stages every table
            let deps = if i == 0 { vec![union_fetch] } else { vec![] };
            children.push(self.plan.push(
                OneFetch {
                    queries: vec![query],
                },
                deps,
            ));
        }
        Ok(Placed::Step(self.plan.push(Intersect { limit, offset }, children)))
    }

    fn push_down(&mut self, split: &mut Split, schema: &Schema, index: usize, mut rel: Relation) {
        if schema.is_attribute(&rel.rtype) {
            if let Some(var) = rel.object_var().map(str::to_string) {
                match split.attrs.get(&var) {
                    Some(owner) if *owner == index => {}
                    Some(_) => {
                        // Staged by another group: compared by the final query
                        let fresh = self.fresh_var("A");
                        rel.object = Expr::var(&fresh);
                        split.compares.push(Node::Compare(Compare {
                            lhs: Expr::var(&fresh),
                            op: CmpOp::Eq,
                            rhs: Expr::var(&var),
                        }));
                        let group = &mut split.groups[index];
                        group.columns.push(fresh.clone());
                        group.fresh.push((fresh, Fresh::Alias(var)));
                    }
                    None => {
                        split.attrs.insert(var.clone(), index);
                        split.groups[index].columns.push(var);
                    }
                }
            }
        }
        split.groups[index].pushed.push(Node::Relation(rel));
    }

    /// Replaces attribute relations of staged variables the fetches could not
    /// evaluate by comparisons over extra staged columns.
    fn stage_nested(&mut self, split: &mut Split, schema: &Schema, node: Node) -> Result<Node> {
        match node {
            Node::And(nodes) => Ok(Node::And(self.stage_all(split, schema, nodes)?)),
            Node::Or(nodes) => Ok(Node::Or(self.stage_all(split, schema, nodes)?)),
            Node::Not(scope, inner) => Ok(Node::Not(
                scope,
                Box::new(self.stage_nested(split, schema, *inner)?),
            )),
            Node::Exists(scope, inner) => Ok(Node::Exists(
                scope,
                Box::new(self.stage_nested(split, schema, *inner)?),
            )),
            Node::Relation(rel) => {
                let Some(&index) = split.staged.get(&rel.subject) else {
                    return Ok(Node::Relation(rel));
                };
                if rel.rtype == "has_text" {
                    return Err(Error::query(format!(
                        "full-text search on {} must be a top-level restriction when its entities are fetched from several sources",
                        rel.subject
                    )));
                }
                if !schema.is_attribute(&rel.rtype) {
                    return Ok(Node::Relation(rel));
                }

                let fresh = self.fresh_var("A");
                let group = &mut split.groups[index];
                group.pushed.push(Node::Relation(Relation::new(
                    &rel.subject,
                    &rel.rtype,
                    Expr::var(&fresh),
                )));
                group.columns.push(fresh.clone());
                group.fresh.push((
                    fresh.clone(),
                    Fresh::Attribute {
                        subject: rel.subject,
                        rtype: rel.rtype,
                    },
                ));

                Ok(Node::Compare(Compare {
                    lhs: Expr::var(fresh),
                    op: rel.op,
                    rhs: rel.object,
                }))
            }
            node @ Node::Compare(_) => Ok(node),
        }
    }

    fn stage_all(&mut self, split: &mut Split, schema: &Schema, nodes: Vec<Node>) -> Result<Vec<Node>> {
        nodes
            .into_iter()
            .map(|node| self.stage_nested(split, schema, node))
            .collect()
    }

    /// Fetch staging the rows `select` returns on each of `sources` into a
    /// new temporary table.
    fn stage(&mut self, routing: &Routing<'_>, select: &Select, sources: &[SourceId]) -> (String, StepId) {
        let table = self.plan.add_temp_table(temp_columns(routing.schema, select));

        let mut queries = vec![];
        for source in sources {
            if let Some(part) = routing.restrict(select, *source) {
                queries.push(Query::new(*source, stmt::Union::single(part), VarMap::default()));
            }
        }

        let id = self.plan.push(
            Fetch {
                queries,
                table: table.clone(),
            },
            vec![],
        );
        (table, id)
    }
}

impl Split {
    /// Group whose fetch evaluates a top-level relation.
    fn push_target(&self, schema: &Schema, rel: &Relation) -> Option<usize> {
        let index = *self.staged.get(&rel.subject)?;

        if schema.is_attribute(&rel.rtype) {
            let pushable =
                rel.object.vars().is_empty() || (rel.op == CmpOp::Eq && rel.object_var().is_some());
            return pushable.then_some(index);
        }

        let local = rel
            .object
            .vars()
            .iter()
            .all(|var| self.staged.get(var) == Some(&index));
        if Schema::is_pseudo(&rel.rtype) {
            return local.then_some(index);
        }
        (local && !rel.is_optional() && rel.object_var().is_some()).then_some(index)
    }
}

impl Cross {
    fn staged(&self, table: String) -> StagedRelation {
        StagedRelation {
            subject: self.subject.clone(),
            rtype: self.rtype.clone(),
            object: self.object.clone(),
            table,
            from: "C0".to_string(),
            to: "C1".to_string(),
        }
    }

    /// `Any S, O WHERE S rtype O`
    fn select(&self, schema: &Schema, solutions: &[Solution]) -> Select {
        let mut select = Select::new(
            vec![Expr::var(&self.subject), Expr::var(&self.object)],
            Some(Node::Relation(Relation::new(
                &self.subject,
                &self.rtype,
                Expr::var(&self.object),
            ))),
        );
        let vars = [self.subject.as_str(), self.object.as_str()];
        for solution in solutions {
            let projected = solution.project(&vars);
            if !select.solutions.contains(&projected) {
                select.solutions.push(projected);
            }
        }
        analyze::annotate(schema, &mut select);
        select
    }
}

impl Routing<'_> {
    fn entity_sources(&self, etype: &str) -> Vec<SourceId> {
        self.engine
            .source_ids()
            .filter(|id| self.engine.source(*id).support().supports_entity(etype))
            .collect()
    }

    /// Sources storing `rtype` instances between entities of the given
    /// types. Inlined relations live with their subject, others with both
    /// ends when they share a source, else on the system source.
    fn route(&self, rtype: &str, subject: &str, object: Option<&str>) -> Vec<SourceId> {
        let inlined = self.schema.relation(rtype).is_some_and(|rel| rel.inlined);
        let stores = |id: SourceId| self.engine.source(id).support().supports_relation(rtype);

        let subjects = self.entity_sources(subject);
        let objects: Vec<SourceId> = match object {
            Some(etype) => self.entity_sources(etype),
            None => self.engine.source_ids().collect(),
        };

        let mut ret = vec![];
        for s1 in &subjects {
            for s2 in &objects {
                let source = if (inlined || s1 == s2) && stores(*s1) {
                    *s1
                } else if stores(SourceId::SYSTEM) {
                    SourceId::SYSTEM
                } else {
                    continue;
                };
                if !ret.contains(&source) {
                    ret.push(source);
                }
            }
        }
        ret.sort();
        ret
    }

    fn var_sources(&self, select: &Select, var: &str) -> Vec<SourceId> {
        let fulltext = select.restriction.as_ref().is_some_and(|node| {
            node.relations()
                .iter()
                .any(|rel| rel.rtype == "has_text" && rel.subject == var)
        });

        let mut ret: Vec<SourceId> = vec![];
        for etype in select.var_types(var) {
            for id in self.entity_sources(&etype) {
                if ret.contains(&id) || (fulltext && !self.engine.source(id).support().fulltext) {
                    continue;
                }
                ret.push(id);
            }
        }
        ret.sort();
        ret
    }

    fn relation_sources(&self, select: &Select, rel: &Relation) -> Vec<SourceId> {
        let mut ret = vec![];
        for solution in &select.solutions {
            let Some(subject) = solution.get(&rel.subject) else {
                continue;
            };
            let object = rel.object_var().and_then(|var| solution.get(var));
            for id in self.route(&rel.rtype, subject, object) {
                if !ret.contains(&id) {
                    ret.push(id);
                }
            }
        }
        ret.sort();
        ret
    }

    /// `select` restricted to the solutions `source` answers alone.
    fn restrict(&self, select: &Select, source: SourceId) -> Option<Select> {
        let support = self.engine.source(source).support();
        let vars = entity_vars(self.schema, select);
        let relations: Vec<&Relation> = select
            .restriction
            .as_ref()
            .map(Node::relations)
            .unwrap_or_default()
            .into_iter()
            .filter(|rel| is_stored(self.schema, &rel.rtype))
            .collect();

        let solutions: Vec<Solution> = select
            .solutions
            .iter()
            .filter(|solution| {
                let entities = vars.iter().all(|var| {
                    solution
                        .get(var)
                        .map_or(true, |etype| support.supports_entity(etype))
                });
                let stored = relations.iter().all(|rel| match solution.get(&rel.subject) {
                    Some(subject) => {
                        let object = rel.object_var().and_then(|var| solution.get(var));
                        self.route(&rel.rtype, subject, object).contains(&source)
                    }
                    None => true,
                });
                entities && stored
            })
            .cloned()
            .collect();

        if solutions.is_empty() {
            return None;
        }
        let mut ret = select.clone();
        ret.solutions = solutions;
        analyze::annotate(self.schema, &mut ret);
        Some(ret)
    }
}

/// Stored relations of the final query touching staged variables whose
/// instances live outside the system source.
fn cross_relations(
    routing: &Routing<'_>,
    select: &Select,
    split: &Split,
    restriction: Option<&Node>,
) -> Result<Vec<Cross>> {
    let schema = routing.schema;
    let mut ret: Vec<Cross> = vec![];
    let mut error = None;

    if let Some(node) = restriction {
        node.for_each_relation(&mut |rel, cx| {
            if !is_stored(schema, &rel.rtype) {
                return;
            }
            let Some(object) = rel.object_var() else {
                return;
            };
            let subject_staged = split.staged.contains_key(&rel.subject);
            if !subject_staged && !split.staged.contains_key(object) {
                return;
            }

            let sources = routing.relation_sources(select, rel);
            let inlined = schema.relation(&rel.rtype).is_some_and(|def| def.inlined);
            if sources.iter().all(|source| source.is_system()) && !(inlined && subject_staged) {
                return;
            }
            if rel.is_optional() {
                error.get_or_insert_with(|| {
                    Error::query(format!(
                        "optional relation `{}` can not join entities of several sources",
                        rel.rtype
                    ))
                });
                return;
            }

            let existing = ret
                .iter_mut()
                .find(|c| c.subject == rel.subject && c.rtype == rel.rtype && c.object == object);
            match existing {
                Some(cross) => cross.negated &= cx.negated,
                None => ret.push(Cross {
                    subject: rel.subject.clone(),
                    rtype: rel.rtype.clone(),
                    object: object.to_string(),
                    sources,
                    negated: cx.negated,
                }),
            }
        });
    }

    match error {
        Some(err) => Err(err),
        None => Ok(ret),
    }
}

/// Solutions of a fetch: the select's solutions restricted to the fetched
/// variables, with planner variables typed.
fn fetch_solutions(
    schema: &Schema,
    solutions: &[Solution],
    vars: &[String],
    fresh: &[(String, Fresh)],
) -> Vec<Solution> {
    let mut ret: Vec<Solution> = vec![];
    for solution in solutions {
        let mut projected = solution.project(vars);
        for (var, kind) in fresh {
            let ty = match kind {
                Fresh::Alias(other) => solution.get(other),
                Fresh::Attribute { subject, rtype } => solution
                    .get(subject)
                    .and_then(|etype| schema.attribute(etype, rtype))
                    .map(|def| def.object.as_str()),
            };
            if let Some(ty) = ty {
                projected.insert(var.clone(), ty);
            }
        }
        if !ret.contains(&projected) {
            ret.push(projected);
        }
    }
    ret
}

fn temp_columns(schema: &Schema, select: &Select) -> Vec<TempColumn> {
    let solution = select.solutions.first().cloned().unwrap_or_default();
    select
        .selection
        .iter()
        .enumerate()
        .map(|(i, expr)| TempColumn {
            name: format!("C{i}"),
            ty: select.term_type(schema, &solution, expr),
        })
        .collect()
}

/// Variables standing for entities.
fn entity_vars(schema: &Schema, select: &Select) -> Vec<String> {
    select
        .vars
        .values()
        .filter(|info| info.is_entity())
        .filter(|info| {
            let types = select.var_types(&info.name);
            !types.is_empty() && types.iter().all(|ty| schema.entity(ty).is_some())
        })
        .map(|info| info.name.clone())
        .collect()
}

/// Relations stored in relation tables or entity columns.
fn is_stored(schema: &Schema, rtype: &str) -> bool {
    !Schema::is_pseudo(rtype) && !schema.is_attribute(rtype)
}

fn group_of(groups: &[(Vec<String>, Vec<SourceId>)], var: &str) -> Option<usize> {
    groups.iter().position(|(vars, _)| vars.iter().any(|v| v == var))
}
