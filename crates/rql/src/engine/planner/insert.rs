use super::{check_assignable, Planner};
use crate::engine::plan::{
    self, EntityDef, FetchedTerm, Relations, ResultTypes, StepId, Term, TermKind,
};

use indexmap::IndexMap;
use rql_core::{
    stmt::{self, Expr, Node},
    Error, Result,
};

impl Planner<'_> {
    pub(super) fn plan_insert(&mut self, insert: stmt::Insert) -> Result<Vec<StepId>> {
        let schema = self.schema();

        let mut entities = Vec::with_capacity(insert.main_vars.len());
        for (etype, var) in &insert.main_vars {
            if schema.entity(etype).is_none() {
                return Err(Error::query(format!("unknown entity type `{etype}`")));
            }
            entities.push(EntityDef {
                var: var.clone(),
                etype: etype.clone(),
                attrs: IndexMap::new(),
            });
        }
        let new_vars: Vec<String> = entities.iter().map(|def| def.var.clone()).collect();
        let new = |var: &str| new_vars.iter().position(|v| v == var);

        let bound = insert
            .restriction
            .as_ref()
            .map(Node::vars)
            .unwrap_or_default();
        let mut fetched: Vec<FetchedTerm> = vec![];
        let mut fetch = |var: &str, kind: TermKind| -> Result<Term> {
            if !bound.iter().any(|v| v == var) {
                return Err(Error::query(format!("variable {var} is not bound")));
            }
            Ok(fetched_term(&mut fetched, var, kind))
        };

        let mut relations = vec![];
        for rel in &insert.main_relations {
            check_assignable(schema, &rel.rtype)?;
            let subject = new(&rel.subject);

            if schema.is_attribute(&rel.rtype) {
                let Some(index) = subject else {
                    return Err(Error::query(format!(
                        "attribute `{}` of {} can only be set on an inserted entity",
                        rel.rtype, rel.subject
                    )));
                };
                let value = match (Term::constant(&rel.object), rel.object_var()) {
                    (Some(term), _) => term,
                    (None, Some(var)) => fetch(var, TermKind::Final)?,
                    (None, None) => {
                        return Err(Error::query(format!(
                            "unsupported value for attribute `{}`: {}",
                            rel.rtype, rel.object
                        )))
                    }
                };
                entities[index].attrs.insert(rel.rtype.clone(), value);
                continue;
            }

            let object = rel.object_var().and_then(new);
            if subject.is_none() && object.is_none() {
                return Err(Error::query(format!(
                    "relation `{}` does not involve an inserted entity",
                    rel.rtype
                )));
            }

            let inlined = schema.relation(&rel.rtype).is_some_and(|def| def.inlined);
            if let (Some(index), None, true) = (subject, object, inlined) {
                // stored with the new subject
                let value = match rel.object_var() {
                    Some(var) => fetch(var, TermKind::Final)?,
                    None => constant(&rel.object)?,
                };
                entities[index].attrs.insert(rel.rtype.clone(), value);
                continue;
            }

            let subject = match subject {
                Some(index) => Term::New(index),
                None => fetch(&rel.subject, TermKind::ReverseRelation)?,
            };
            let object = match (object, rel.object_var()) {
                (Some(index), _) => Term::New(index),
                (None, Some(var)) => fetch(var, TermKind::Relation)?,
                (None, None) => constant(&rel.object)?,
            };
            relations.push(plan::RelationDef {
                subject,
                rtype: rel.rtype.clone(),
                object,
            });
        }

        let mut children = vec![];
        if let Some(restriction) = insert.restriction {
            // Without fetched terms, one insertion per row of the restriction
            let selection: Vec<Expr> = if fetched.is_empty() {
                restriction.vars().into_iter().map(Expr::var).collect()
            } else {
                fetched.iter().map(|term| Expr::var(&term.var)).collect()
            };

            let select = self.sub_select(selection, Some(restriction), &insert.solutions)?;
            let parts = self.secure(select.clone())?;
            let rows = self.select_step(&select, parts)?;
            children.push(self.plan.push(Relations { terms: fetched }, vec![rows]));
        }

        let etypes = entities.iter().map(|def| def.etype.clone()).collect();
        let id = self.plan.push(
            plan::Insert {
                entities,
                relations,
            },
            children,
        );
        self.plan.result = ResultTypes::Uniform(etypes);
        Ok(vec![id])
    }
}

fn fetched_term(terms: &mut Vec<FetchedTerm>, var: &str, kind: TermKind) -> Term {
    let index = match terms.iter().position(|term| term.var == var && term.kind == kind) {
        Some(index) => index,
        None => {
            terms.push(FetchedTerm {
                var: var.to_string(),
                kind,
            });
            terms.len() - 1
        }
    };
    Term::Fetched(index)
}

fn constant(expr: &Expr) -> Result<Term> {
    Term::constant(expr).ok_or_else(|| Error::query(format!("unsupported relation end: {expr}")))
}
