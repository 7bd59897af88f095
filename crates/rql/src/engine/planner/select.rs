use super::Planner;
use crate::engine::{
    plan::{self, OneFetch, Query, ResultTypes, StepId},
    security::{self, Rewritten},
    SourceId,
};

use rql_core::{
    analyze,
    driver::VarMap,
    stmt::{self, CmpOp, Expr, Node, Relation, Select},
    Error, Result,
};

/// Where a select runs.
pub(super) enum Placed {
    /// Selects each answered by one source, rows concatenated
    Selects(Vec<(SourceId, Select)>),

    /// A step tree staging partial results
    Step(StepId),
}

impl Planner<'_> {
    pub(super) fn plan_select(&mut self, union: stmt::Union) -> Result<Vec<StepId>> {
        let mut result = vec![];
        let mut secured = Vec::with_capacity(union.selects.len());

        for select in union.selects {
            let parts = self.secure(select.clone())?;
            result.extend(parts.iter().cloned());
            secured.push((select, parts));
        }

        // One source answers the whole union in a single query
        let single = !self.cx.engine.is_multi_source()
            && secured.len() > 1
            && secured.iter().all(|(_, parts)| parts.len() == 1);

        let root = if single {
            let selects = secured.into_iter().flat_map(|(_, parts)| parts).collect();
            let query = Query::new(SourceId::SYSTEM, stmt::Union::new(selects), VarMap::default());
            self.plan.push(OneFetch { queries: vec![query] }, vec![])
        } else {
            let mut children = vec![];
            for (select, parts) in secured {
                children.push(self.select_step(&select, parts)?);
            }
            if children.len() == 1 {
                children[0]
            } else {
                self.plan.push(
                    plan::Union {
                        limit: None,
                        offset: 0,
                    },
                    children,
                )
            }
        };

        self.plan.result = ResultTypes::Selects(result);
        Ok(vec![root])
    }

    /// Parts of `select` restricted to what the principal may read.
    pub(super) fn secure(&mut self, select: Select) -> Result<Vec<Select>> {
        let schema = self.schema();
        let parts = self.rewriter.rewrite(select, &mut self.plan.args)?;

        let mut ret = Vec::with_capacity(parts.len());
        for Rewritten {
            mut select,
            narrowed,
        } in parts
        {
            if !narrowed.is_empty() {
                for (var, types) in narrowed {
                    let scope = select.var(&var).map_or(0, |info| info.scope);
                    let restriction = Node::Relation(type_restriction(&var, &types));
                    security::add_to_scope(&mut select, scope, restriction);
                }
                analyze::annotate(schema, &mut select);
            }
            self.cx.engine.order.apply(&mut select.solutions);
            ret.push(select);
        }
        Ok(ret)
    }

    /// Step returning the rows of `original`, computed from its secured
    /// parts.
    pub(super) fn select_step(&mut self, original: &Select, mut parts: Vec<Select>) -> Result<StepId> {
        let merged = parts.len() > 1 || self.cx.engine.is_multi_source();
        let limited = merged && original.has_limit() && !original.needs_materialization();

        if limited {
            // Each part returns up to the rows the union may keep
            for part in &mut parts {
                part.limit = original.limit.map(|limit| limit + original.offset);
                part.offset = 0;
            }
        }

        let mut selects = vec![];
        let mut steps = vec![];
        for part in parts {
            match self.place(part)? {
                Placed::Selects(placed) => selects.extend(placed),
                Placed::Step(id) => steps.push(id),
            }
        }

        if !limited {
            if steps.is_empty() && selects.len() == 1 {
                return Ok(self.one_fetch(selects));
            }
            if selects.is_empty() && steps.len() == 1 {
                return Ok(steps[0]);
            }
        }

        if original.needs_materialization() {
            if !steps.is_empty() {
                return Err(Error::query(
                    "aggregating, sorting or deduplicating rows of several split selects is not supported",
                ));
            }
            return self.materialize(original, selects);
        }

        let mut children = vec![];
        if limited {
            for placed in selects {
                children.push(self.one_fetch(vec![placed]));
            }
            children.extend(steps);

            return Ok(self.plan.push(
                plan::Union {
                    limit: original.limit,
                    offset: original.offset,
                },
                children,
            ));
        }

        if !selects.is_empty() {
            children.push(self.one_fetch(selects));
        }
        children.extend(steps);
        Ok(self.plan.push(
            plan::Union {
                limit: None,
                offset: 0,
            },
            children,
        ))
    }

    fn place(&mut self, select: Select) -> Result<Placed> {
        if !self.cx.engine.is_multi_source() {
            return Ok(Placed::Selects(vec![(SourceId::SYSTEM, select)]));
        }
        self.place_multi(select)
    }

    pub(super) fn one_fetch(&mut self, selects: Vec<(SourceId, Select)>) -> StepId {
        let queries = selects
            .into_iter()
            .map(|(source, select)| Query::new(source, stmt::Union::single(select), VarMap::default()))
            .collect();
        self.plan.push(OneFetch { queries }, vec![])
    }
}

/// `var is T` or `var is IN(T1, T2...)`.
pub(super) fn type_restriction(var: &str, types: &[String]) -> Relation {
    match types {
        [ty] => Relation::new(var, "is", Expr::EType(ty.clone())),
        types => Relation {
            op: CmpOp::In,
            ..Relation::new(
                var,
                "is",
                Expr::List(types.iter().cloned().map(Expr::EType).collect()),
            )
        },
    }
}
