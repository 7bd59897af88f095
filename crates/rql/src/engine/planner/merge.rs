use super::Planner;
use crate::engine::{
    plan::{Aggr, Fetch, Query, StepId, UnionFetch},
    SourceId,
};

use rql_core::{
    analyze,
    driver::{operation::TempColumn, VarMap},
    stmt::{self, Expr, Select, SortTerm},
    Result,
};

impl Planner<'_> {
    /// Aggregates, sorts or deduplicates the rows of selects answered by
    /// several sources: each source stages its rows, then a final query runs
    /// over the staged rows on the system source.
    pub(super) fn materialize(
        &mut self,
        original: &Select,
        selects: Vec<(SourceId, Select)>,
    ) -> Result<StepId> {
        let schema = self.schema();

        let decomposable = is_decomposable(original);
        let (partial, mut fin, staged) = if decomposable {
            self.decompose(original)
        } else {
            let vars = original.root_term_vars();
            let partial: Vec<Expr> = vars.iter().map(Expr::var).collect();
            let mut fin = original.clone();
            fin.restriction = None;
            (partial, fin, vars)
        };

        // Column types, from any solution: eids stage as integers whatever
        // their entity type
        let mut columns = Vec::with_capacity(partial.len());
        for (i, expr) in partial.iter().enumerate() {
            let ty = selects
                .iter()
                .flat_map(|(_, select)| select.solutions.first())
                .next()
                .map_or_else(|| "Any".to_string(), |solution| {
                    original.term_type(schema, solution, expr)
                });
            columns.push(TempColumn {
                name: format!("C{i}"),
                ty,
            });
        }
        let agg_types: Vec<(String, Vec<String>)> = staged
            .iter()
            .zip(&partial)
            .filter(|(_, expr)| expr.contains_aggregate())
            .map(|(var, expr)| {
                let types = original
                    .solutions
                    .iter()
                    .map(|solution| original.term_type(schema, solution, expr))
                    .collect();
                (var.clone(), types)
            })
            .collect();
        let table = self.plan.add_temp_table(columns);

        let mut fetches = vec![];
        for (source, select) in selects {
            let mut select = select;
            select.selection = partial.clone();
            if decomposable {
                select.groupby = original.groupby.clone();
            } else {
                select.groupby.clear();
            }
            select.having = None;
            select.orderby.clear();
            select.limit = None;
            select.offset = 0;
            select.distinct = false;
            analyze::annotate(schema, &mut select);

            let query = Query::new(source, stmt::Union::single(select), VarMap::default());
            fetches.push(self.plan.push(
                Fetch {
                    queries: vec![query],
                    table: table.clone(),
                },
                vec![],
            ));
        }
        let union_fetch = self.plan.push(UnionFetch, fetches);

        let mut var_map = VarMap::default();
        for (i, var) in staged.iter().enumerate() {
            var_map.insert(var, &table, format!("C{i}"));
        }

        let mut solutions: Vec<stmt::Solution> = vec![];
        for (i, solution) in original.solutions.iter().enumerate() {
            let mut projected = solution.project(&staged);
            for (var, types) in &agg_types {
                if let Some(ty) = types.get(i) {
                    projected.insert(var.clone(), ty.clone());
                }
            }
            if !solutions.contains(&projected) {
                solutions.push(projected);
            }
        }
        fin.solutions = solutions;
        analyze::annotate(schema, &mut fin);

        let query = Query::new(SourceId::SYSTEM, stmt::Union::single(fin), var_map);
        Ok(self.plan.push(Aggr { query }, vec![union_fetch]))
    }

    /// Partial selection computing each aggregate per source, the final
    /// select merging them, and the staged variables, in column order.
    fn decompose(&mut self, original: &Select) -> (Vec<Expr>, Select, Vec<String>) {
        let mut found: Vec<Expr> = vec![];
        let terms = original
            .selection
            .iter()
            .chain(original.orderby.iter().map(|term| &term.expr));
        for expr in terms {
            expr.walk(&mut |expr| {
                if matches!(expr, Expr::Func(func) if func.is_aggregate()) && !found.contains(expr) {
                    found.push(expr.clone());
                }
            });
        }
        let aggregates: Vec<(Expr, String)> = found
            .into_iter()
            .map(|agg| (agg, self.fresh_var("A")))
            .collect();

        let mut partial = vec![];
        let mut staged = vec![];
        for (agg, var) in &aggregates {
            partial.push(agg.clone());
            staged.push(var.clone());
        }
        for expr in &original.groupby {
            if let Some(var) = expr.as_var() {
                partial.push(expr.clone());
                staged.push(var.to_string());
            }
        }

        let mut fin = Select::new(
            original
                .selection
                .iter()
                .map(|expr| replace_aggregates(expr, &aggregates))
                .collect(),
            None,
        );
        fin.groupby = original.groupby.clone();
        fin.orderby = original
            .orderby
            .iter()
            .map(|term| SortTerm {
                expr: replace_aggregates(&term.expr, &aggregates),
                asc: term.asc,
            })
            .collect();
        fin.limit = original.limit;
        fin.offset = original.offset;

        (partial, fin, staged)
    }
}

/// Aggregates whose per-source results can be merged: no `HAVING`, no
/// `DISTINCT`, every group term a variable, and every selected or sorted
/// term built from aggregates such as `COUNT` or `MAX`, grouped variables
/// and constants.
fn is_decomposable(select: &Select) -> bool {
    if !select.has_aggregate() || select.having.is_some() || select.distinct {
        return false;
    }
    let groups: Vec<&str> = select.groupby.iter().filter_map(Expr::as_var).collect();
    if groups.len() != select.groupby.len() {
        return false;
    }

    select
        .selection
        .iter()
        .chain(select.orderby.iter().map(|term| &term.expr))
        .all(|expr| is_mergeable(expr, &groups))
}

fn is_mergeable(expr: &Expr, groups: &[&str]) -> bool {
    match expr {
        Expr::Func(func) if func.is_aggregate() => {
            func.is_decomposable() && !func.args.iter().any(Expr::contains_aggregate)
        }
        Expr::Func(func) => func.args.iter().all(|arg| is_mergeable(arg, groups)),
        Expr::BinaryOp(op) => is_mergeable(&op.lhs, groups) && is_mergeable(&op.rhs, groups),
        Expr::List(items) => items.iter().all(|item| is_mergeable(item, groups)),
        Expr::Var(var) => groups.contains(&var.as_str()),
        Expr::Value(_) | Expr::Arg(_) | Expr::EType(_) => true,
    }
}

/// `expr` with each aggregate replaced by its merge over the staged partial
/// results, e.g. `COUNT(X)` by `SUM(_A0)`.
fn replace_aggregates(expr: &Expr, aggregates: &[(Expr, String)]) -> Expr {
    if let Some((Expr::Func(func), var)) = aggregates.iter().find(|(agg, _)| agg == expr) {
        return Expr::func(func.merge_name(), vec![Expr::var(var)]);
    }
    match expr {
        Expr::Func(func) => {
            let mut func = func.clone();
            func.args = func
                .args
                .iter()
                .map(|arg| replace_aggregates(arg, aggregates))
                .collect();
            Expr::Func(func)
        }
        Expr::BinaryOp(op) => Expr::binary_op(
            replace_aggregates(&op.lhs, aggregates),
            op.op,
            replace_aggregates(&op.rhs, aggregates),
        ),
        expr => expr.clone(),
    }
}
