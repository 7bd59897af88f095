use super::{Arm, Frame};

use crate::layout;

use rql_core::{
    driver::StagedRelation,
    schema::Schema,
    stmt::{CmpOp, Expr, Optional, Relation},
    Error, Result,
};

impl<'a> Arm<'a, '_> {
    /// Relations that bind the terms of their variables: they are generated
    /// before any other condition of their scope.
    pub(super) fn binds_terms(&self, rel: &Relation) -> bool {
        rel.rtype == "has_text"
            || (!Schema::is_pseudo(&rel.rtype) && !self.gen.schema.is_attribute(&rel.rtype))
    }

    pub(super) fn relation(&mut self, frame: &mut Frame, rel: &'a Relation, negated: bool) -> Result<()> {
        if let Some(object) = rel.object_var() {
            let var_map = self.state.var_map;
            if let Some(staged) = var_map.relation(&rel.subject, &rel.rtype, object) {
                self.staged_relation(frame, rel, staged);
                return Ok(());
            }
        }

        match rel.rtype.as_str() {
            "eid" => self.eid(frame, rel),
            "identity" => self.identity(frame, rel),
            "is" | "is_instance_of" => {
                self.is(frame, rel);
                Ok(())
            }
            "has_text" => self.has_text(frame, rel),
            rtype if self.gen.schema.is_attribute(rtype) => self.attribute(frame, rel),
            rtype => {
                let inlined = self
                    .gen
                    .schema
                    .relation(rtype)
                    .map(|rel| rel.inlined)
                    .unwrap_or(false);
                if inlined {
                    self.inlined(frame, rel, negated)
                } else {
                    self.table_relation(frame, rel)
                }
            }
        }
    }

    fn staged_relation(&mut self, frame: &mut Frame, rel: &Relation, staged: &StagedRelation) {
        if !frame.contains(&staged.table) {
            frame.push(&staged.table, &staged.table, false);
        }
        let alias = Some(staged.table.clone());
        self.bind(
            frame,
            &rel.subject,
            format!("{}.{}", staged.table, staged.from),
            alias.clone(),
        );
        if let Some(object) = rel.object_var() {
            self.bind(frame, object, format!("{}.{}", staged.table, staged.to), alias);
        }
    }

    /// `X rtype Y` stored in `<rtype>_relation`.
    fn table_relation(&mut self, frame: &mut Frame, rel: &Relation) -> Result<()> {
        let alias = self.alias(&format!("rel_{}", rel.rtype));
        let optional = rel.is_optional();
        frame.push(layout::relation_table(&rel.rtype), &alias, optional);

        let from = format!("{alias}.{}", layout::FROM);
        let to = format!("{alias}.{}", layout::TO);

        match rel.optional {
            Optional::Subject => {
                if let Some(object) = rel.object_var() {
                    self.bind(frame, object, to, Some(alias.clone()));
                }
                self.bind_optional(frame, &rel.subject, from, alias)?;
            }
            Optional::Object => {
                self.bind(frame, &rel.subject, from, Some(alias.clone()));
                if let Some(object) = rel.object_var() {
                    self.bind_optional(frame, object, to, alias)?;
                }
            }
            Optional::None => {
                self.bind(frame, &rel.subject, from, Some(alias.clone()));
                match rel.object_var() {
                    Some(object) => self.bind(frame, object, to, Some(alias)),
                    None => {
                        let mut aliases = vec![alias];
                        let cond = self.cmp(to, rel.op, &rel.object, &mut aliases)?;
                        frame.add_cond(cond, &aliases);
                    }
                }
            }
        }
        Ok(())
    }

    /// Binds the optional side of an outer-joined relation, left joining
    /// its entity table when it has one.
    fn bind_optional(&mut self, frame: &mut Frame, var: &str, sql: String, alias: String) -> Result<()> {
        let select = self.select;
        if !self.has_term(var) && self.gen.needs_table(select, self.state.var_map, var) {
            self.add_var_table(frame, var, true)?;
        }
        self.bind(frame, var, sql, Some(alias));
        Ok(())
    }

    /// `X rtype Y` stored in the `cw_<rtype>` column of the subject's table.
    fn inlined(&mut self, frame: &mut Frame, rel: &Relation, negated: bool) -> Result<()> {
        if rel.optional == Optional::Subject && !self.tables.contains_key(&rel.subject) {
            self.add_var_table(frame, &rel.subject, true)?;
        }
        let Some(table) = self.tables.get(&rel.subject).cloned() else {
            return Err(Error::query(format!(
                "relation `{}` needs the row of {}",
                rel.rtype, rel.subject
            )));
        };
        let column = format!("{table}.{}", layout::column(&rel.rtype));

        match rel.object_var() {
            Some(object) if rel.optional == Optional::Object => {
                self.bind_optional(frame, object, column, table)?;
            }
            Some(object) if negated && self.has_term(object) => {
                // the column is null when the relation is absent
                let term = self.term(object)?;
                let aliases: Vec<String> = Some(table).into_iter().chain(term.alias).collect();
                frame.add_cond(
                    format!("({column} IS NOT NULL AND {column} = {})", term.sql),
                    &aliases,
                );
            }
            Some(object) => {
                // the column is null when the relation is absent
                if !self.has_term(object) {
                    frame.add_cond(format!("{column} IS NOT NULL"), &[table.clone()]);
                }
                self.bind(frame, object, column, Some(table));
            }
            None => {
                let mut aliases = vec![table];
                let cond = self.cmp(column, rel.op, &rel.object, &mut aliases)?;
                frame.add_cond(cond, &aliases);
            }
        }
        Ok(())
    }

    /// `X attr V`, `X attr > 10`...
    fn attribute(&mut self, frame: &mut Frame, rel: &Relation) -> Result<()> {
        let Some(table) = self.tables.get(&rel.subject).cloned() else {
            // attributes of staged variables are staged along with them
            if self.state.var_map.get(&rel.subject).is_some()
                && rel
                    .object_var()
                    .map(|object| self.state.var_map.get(object).is_some())
                    .unwrap_or(false)
            {
                return Ok(());
            }
            return Err(Error::query(format!(
                "attribute `{}` of {} can not be read",
                rel.rtype, rel.subject
            )));
        };
        let column = format!("{table}.{}", layout::column(&rel.rtype));

        match rel.object_var() {
            Some(object) if rel.op == CmpOp::Eq => self.bind(frame, object, column, Some(table)),
            _ => {
                let mut aliases = vec![table];
                let cond = self.cmp(column, rel.op, &rel.object, &mut aliases)?;
                frame.add_cond(cond, &aliases);
            }
        }
        Ok(())
    }

    fn eid(&mut self, frame: &mut Frame, rel: &Relation) -> Result<()> {
        let term = self.term(&rel.subject)?;

        match rel.object_var() {
            Some(object) if rel.op == CmpOp::Eq => self.bind(frame, object, term.sql, term.alias),
            _ => {
                let mut aliases: Vec<String> = term.alias.into_iter().collect();
                let cond = self.cmp(term.sql, rel.op, &rel.object, &mut aliases)?;
                frame.add_cond(cond, &aliases);
            }
        }
        Ok(())
    }

    fn identity(&mut self, frame: &mut Frame, rel: &Relation) -> Result<()> {
        let term = self.term(&rel.subject)?;
        let mut aliases: Vec<String> = term.alias.into_iter().collect();
        let cond = self.cmp(term.sql, rel.op, &rel.object, &mut aliases)?;
        frame.add_cond(cond, &aliases);
        Ok(())
    }

    /// Types are fixed per arm: the relation holds or it does not.
    fn is(&mut self, frame: &mut Frame, rel: &Relation) {
        let Some(ty) = self.solution.get(&rel.subject) else {
            return;
        };

        let mut matches = false;
        rel.object.walk(&mut |expr| {
            if let Expr::EType(etype) = expr {
                matches |= etype == ty;
            }
        });

        if matches == (rel.op == CmpOp::Ne) {
            frame.add_cond("1 = 0", &[]);
        }
    }
}
