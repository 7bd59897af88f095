use super::Planner;
use crate::engine::{
    plan::{DeleteEntities, DeleteRelations, ResultTypes, StepId},
    store::writable_relation,
};

use rql_core::{
    stmt::{self, Expr, Node, Relation, Solution},
    Error, Result,
};

impl Planner<'_> {
    /// One root per deleted relation, then one per deleted entity variable:
    /// relations go before the entities they may reference.
    pub(super) fn plan_delete(&mut self, delete: stmt::Delete) -> Result<Vec<StepId>> {
        let schema = self.schema();
        let mut roots = vec![];
        let mut types = vec![];

        for rel in &delete.main_relations {
            let rtype = writable_relation(schema, &rel.rtype)?;

            let restriction = Node::and(
                delete
                    .restriction
                    .clone()
                    .into_iter()
                    .chain(Some(Node::Relation(rel.clone()))),
            );
            let select = self.sub_select(
                vec![Expr::var(&rel.subject), rel.object.clone()],
                restriction,
                &delete.solutions,
            )?;

            types = select
                .solutions
                .first()
                .map(|solution| {
                    select
                        .selection
                        .iter()
                        .map(|expr| select.term_type(schema, solution, expr))
                        .collect()
                })
                .unwrap_or_default();

            let parts = self.secure(select.clone())?;
            let rows = self.select_step(&select, parts)?;
            roots.push(self.plan.push(
                DeleteRelations {
                    rtype: rtype.name.clone(),
                },
                vec![rows],
            ));
        }

        for (etype, var) in &delete.main_vars {
            let mut restriction = delete.restriction.clone();
            let solutions: Vec<Solution> = if etype == "Any" {
                delete.solutions.clone()
            } else {
                if schema.entity(etype).is_none() {
                    return Err(Error::query(format!("unknown entity type `{etype}`")));
                }
                restriction = Node::and(restriction.into_iter().chain(Some(Node::Relation(
                    Relation::new(var, "is", Expr::EType(etype.clone())),
                ))));
                delete
                    .solutions
                    .iter()
                    .filter(|solution| solution.get(var) == Some(etype.as_str()))
                    .cloned()
                    .collect()
            };

            let select = self.sub_select(vec![Expr::var(var)], restriction, &solutions)?;
            types = vec![etype.clone()];

            let parts = self.secure(select.clone())?;
            let rows = self.select_step(&select, parts)?;
            roots.push(self.plan.push(DeleteEntities, vec![rows]));
        }

        self.plan.result = match roots.len() {
            1 => ResultTypes::Uniform(types),
            _ => ResultTypes::Empty,
        };
        Ok(roots)
    }
}
