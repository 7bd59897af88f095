mod delete;
mod insert;
mod merge;
mod multi;
mod select;
mod update;

use crate::engine::{
    plan::ExecutionPlan,
    security::Rewriter,
    Cx,
};

use rql_core::{
    analyze,
    schema::Schema,
    stmt::{Args, Expr, Node, Select, Solution, Statement},
    Error, Result,
};

/// Builds the execution plan of a solved statement.
pub(crate) struct Planner<'a> {
    cx: &'a Cx<'a>,

    /// Plan under construction
    plan: ExecutionPlan,

    rewriter: Rewriter<'a>,

    /// Suffix of the next variable introduced by the planner
    next_var: usize,
}

impl<'a> Planner<'a> {
    pub(crate) fn new(cx: &'a Cx<'a>, args: Args) -> Planner<'a> {
        Planner {
            cx,
            plan: ExecutionPlan::new(args),
            rewriter: Rewriter::new(&cx.engine.schema, cx.principal),
            next_var: 0,
        }
    }

    fn schema(&self) -> &'a Schema {
        &self.cx.engine.schema
    }

    pub(crate) fn build_plan(mut self, stmt: Statement) -> Result<ExecutionPlan> {
        let roots = match stmt {
            Statement::Select(union) => self.plan_select(union)?,
            Statement::Insert(insert) => self.plan_insert(insert)?,
            Statement::Delete(delete) => self.plan_delete(delete)?,
            Statement::Set(set) => self.plan_set(set)?,
        };

        self.plan.roots = roots;
        tracing::trace!(steps = self.plan.steps.len(), plan = %self.plan, "plan built");
        Ok(self.plan)
    }

    fn fresh_var(&mut self, prefix: &str) -> String {
        let name = format!("_{prefix}{}", self.next_var);
        self.next_var += 1;
        name
    }

    /// Select of `selection` over the restriction of a write statement,
    /// typed with the statement's solutions.
    fn sub_select(
        &self,
        selection: Vec<Expr>,
        restriction: Option<Node>,
        solutions: &[Solution],
    ) -> Result<Select> {
        let mut select = Select::new(selection, restriction);
        select.distinct = true;

        let vars = select.defined_vars();
        for solution in solutions {
            let projected = solution.project(&vars);
            if !select.solutions.contains(&projected) {
                select.solutions.push(projected);
            }
        }
        if select.solutions.is_empty() {
            return Err(Error::type_resolution("write statement has no solution"));
        }

        analyze::annotate(self.schema(), &mut select);
        Ok(select)
    }
}

/// Fails for relations write statements may not assign: pseudo and computed
/// relations and unknown relation types.
fn check_assignable(schema: &Schema, rtype: &str) -> Result<()> {
    if Schema::is_pseudo(rtype) {
        return Err(Error::query(format!("relation `{rtype}` is read-only")));
    }
    match schema.relation(rtype) {
        None => Err(Error::query(format!("unknown relation `{rtype}`"))),
        Some(rel) if rel.computed => Err(Error::query(format!("relation `{rtype}` is computed"))),
        Some(_) => Ok(()),
    }
}
