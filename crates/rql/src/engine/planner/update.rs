use super::{check_assignable, Planner};
use crate::engine::plan::{Assignment, AssignmentKind, ResultTypes, StepId, Term, Update};

use indexmap::IndexMap;
use rql_core::{
    stmt::{self, CmpOp, Expr, Node},
    Result,
};

impl Planner<'_> {
    pub(super) fn plan_set(&mut self, set: stmt::Set) -> Result<Vec<StepId>> {
        let schema = self.schema();
        let eids = constant_eids(set.restriction.as_ref());

        let mut columns: Vec<Expr> = vec![];
        let mut assignments = Vec::with_capacity(set.main_relations.len());

        for rel in &set.main_relations {
            check_assignable(schema, &rel.rtype)?;

            let kind = match schema.relation(&rel.rtype) {
                Some(def) if def.attribute => AssignmentKind::Attribute,
                Some(def) if def.inlined => AssignmentKind::Inlined,
                _ => AssignmentKind::Relation,
            };

            let subject = match eids.get(&rel.subject) {
                Some(term) => term.clone(),
                None => column(&mut columns, Expr::var(&rel.subject)),
            };
            let value = match (Term::constant(&rel.object), rel.object_var()) {
                (Some(term), _) => term,
                (None, Some(var)) => match eids.get(var) {
                    Some(term) => term.clone(),
                    None => column(&mut columns, Expr::var(var)),
                },
                // computed by the sub-select, e.g. `X age A + 1`
                (None, None) => column(&mut columns, rel.object.clone()),
            };

            assignments.push(Assignment {
                subject,
                rtype: rel.rtype.clone(),
                value,
                kind,
            });
        }

        let subject_type = set
            .main_relations
            .first()
            .and_then(|rel| set.solutions.first().and_then(|solution| solution.get(&rel.subject)))
            .unwrap_or("Any")
            .to_string();

        let mut children = vec![];
        if !columns.is_empty() {
            let select = self.sub_select(columns, set.restriction, &set.solutions)?;
            let parts = self.secure(select.clone())?;
            children.push(self.select_step(&select, parts)?);
        }

        let id = self.plan.push(Update { assignments }, children);
        self.plan.result = ResultTypes::Uniform(vec![subject_type]);
        Ok(vec![id])
    }
}

/// Eids of the variables of a restriction made only of `V eid <constant>`
/// relations. Empty when anything else restricts the statement.
fn constant_eids(restriction: Option<&Node>) -> IndexMap<String, Term> {
    let mut ret = IndexMap::new();
    let Some(restriction) = restriction else {
        return ret;
    };

    for node in restriction.conjuncts() {
        let term = match node {
            Node::Relation(rel) if rel.rtype == "eid" && rel.op == CmpOp::Eq => {
                Term::constant(&rel.object).map(|term| (rel.subject.clone(), term))
            }
            _ => None,
        };
        match term {
            Some((var, term)) => {
                ret.insert(var, term);
            }
            None => return IndexMap::new(),
        }
    }
    ret
}

/// Column of the sub-select holding `expr`.
fn column(columns: &mut Vec<Expr>, expr: Expr) -> Term {
    match columns.iter().position(|column| *column == expr) {
        Some(index) => Term::Fetched(index),
        None => {
            columns.push(expr);
            Term::Fetched(columns.len() - 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rql_core::stmt::{Relation, Value};

    fn eid(var: &str, eid: i64) -> Node {
        Node::Relation(Relation::new(var, "eid", Expr::value(Value::I64(eid))))
    }

    #[test]
    fn eid_only_restrictions() {
        let restriction = Node::and([eid("X", 1), eid("Y", 2)]);
        let eids = constant_eids(restriction.as_ref());
        assert_eq!(eids["X"], Term::Value(Value::I64(1)));
        assert_eq!(eids["Y"], Term::Value(Value::I64(2)));

        let restriction = Node::and([
            eid("X", 1),
            Node::Relation(Relation::new("Y", "nom", Expr::var("N"))),
        ]);
        assert!(constant_eids(restriction.as_ref()).is_empty());
        assert!(constant_eids(None).is_empty());
    }

    #[test]
    fn columns_are_shared() {
        let mut columns = vec![];
        assert_eq!(column(&mut columns, Expr::var("X")), Term::Fetched(0));
        assert_eq!(column(&mut columns, Expr::var("N")), Term::Fetched(1));
        assert_eq!(column(&mut columns, Expr::var("X")), Term::Fetched(0));
    }
}
