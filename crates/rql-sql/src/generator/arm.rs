use super::{limit_sql, Frame, Generator, State};

use crate::{layout, serializer::Param};

use rql_core::{
    stmt::{Node, ScopeId, Select, Solution},
    Error, Result,
};

use std::collections::HashMap;

/// Generates the SQL of one solution of a select.
pub(super) struct Arm<'a, 's> {
    pub(super) gen: Generator<'a>,
    pub(super) select: &'a Select,
    pub(super) solution: &'a Solution,
    pub(super) state: &'a mut State<'s>,

    /// SQL expression of each variable bound so far
    terms: HashMap<String, Term>,

    /// Alias of the entity table of each variable that has one
    pub(super) tables: HashMap<String, String>,

    /// `appears` alias and query of each full-text searched variable
    pub(super) fulltext: HashMap<String, (String, Param)>,

    next_alias: usize,
}

#[derive(Debug, Clone)]
pub(super) struct Term {
    pub(super) sql: String,

    /// Table alias the expression reads from
    pub(super) alias: Option<String>,
}

impl<'a, 's> Arm<'a, 's> {
    pub(super) fn new(
        gen: Generator<'a>,
        select: &'a Select,
        solution: &'a Solution,
        state: &'a mut State<'s>,
    ) -> Self {
        Arm {
            gen,
            select,
            solution,
            state,
            terms: HashMap::new(),
            tables: HashMap::new(),
            fulltext: HashMap::new(),
            next_alias: 0,
        }
    }

    /// The complete `SELECT` of a select generated as a single arm.
    pub(super) fn direct(mut self) -> Result<String> {
        let select = self.select;
        let mut frame = Frame::default();
        self.scope(&mut frame, select.restriction.as_ref(), 0, false)?;

        let selection = self.selection()?;
        let clauses = self.clauses()?;
        Ok(assemble(
            select.distinct,
            &selection,
            frame.from_sql(),
            frame.where_sql(),
            &clauses,
        ))
    }

    /// An arm of a wrapped select: projects the variables the outer query
    /// needs as `C0`, `C1`...
    pub(super) fn projection(mut self, base: &[String]) -> Result<String> {
        let select = self.select;
        let mut frame = Frame::default();
        self.scope(&mut frame, select.restriction.as_ref(), 0, false)?;

        let mut columns = vec![];
        for (i, var) in base.iter().enumerate() {
            columns.push(format!("{} AS C{i}", self.term(var)?.sql));
        }
        Ok(assemble(
            false,
            &columns.join(", "),
            frame.from_sql(),
            frame.where_sql(),
            "",
        ))
    }

    /// The outer query of a wrapped select, reading `inner` as `_T0`.
    pub(super) fn outer(mut self, base: &[String], inner: &str) -> Result<String> {
        for (i, var) in base.iter().enumerate() {
            self.terms.insert(
                var.clone(),
                Term {
                    sql: format!("_T0.C{i}"),
                    alias: None,
                },
            );
        }

        let selection = self.selection()?;
        let clauses = self.clauses()?;
        Ok(assemble(
            self.select.distinct,
            &selection,
            Some(format!("({inner}) AS _T0")),
            None,
            &clauses,
        ))
    }

    /// Adds the tables of the variables bound in `scope_id`, then the
    /// restriction of the scope.
    pub(super) fn scope(
        &mut self,
        frame: &mut Frame,
        node: Option<&'a Node>,
        scope_id: ScopeId,
        negated: bool,
    ) -> Result<()> {
        let select = self.select;

        if scope_id == 0 {
            self.staged_vars(frame);
        }

        for (name, info) in &select.vars {
            if info.scope != scope_id
                || info.optional
                || !self.gen.needs_table(select, self.state.var_map, name)
            {
                continue;
            }
            self.add_var_table(frame, name, false)?;
        }

        match node {
            Some(node) => self.nodes(frame, node.conjuncts(), scope_id, negated),
            None => Ok(()),
        }
    }

    /// Generates a conjunction. Relations binding variables come first so
    /// that later conditions find the variables' terms.
    fn nodes(
        &mut self,
        frame: &mut Frame,
        nodes: &'a [Node],
        scope_id: ScopeId,
        negated: bool,
    ) -> Result<()> {
        for node in nodes {
            if let Node::Relation(rel) = node {
                if self.binds_terms(rel) && !rel.is_optional() {
                    self.relation(frame, rel, negated)?;
                }
            }
        }

        for node in nodes {
            if let Node::Relation(rel) = node {
                if self.binds_terms(rel) && rel.is_optional() {
                    self.relation(frame, rel, negated)?;
                }
            }
        }

        for node in nodes {
            match node {
                Node::Relation(rel) if self.binds_terms(rel) => {}
                Node::Relation(rel) => self.relation(frame, rel, negated)?,
                Node::Compare(cmp) => {
                    let mut aliases = vec![];
                    let sql = self.compare(cmp, &mut aliases)?;
                    frame.add_cond(sql, &aliases);
                }
                Node::And(nodes) => self.nodes(frame, nodes, scope_id, negated)?,
                Node::Or(branches) => {
                    let mut parts = vec![];
                    for branch in branches {
                        let mut sub = Frame::default();
                        self.nodes(&mut sub, branch.conjuncts(), scope_id, negated)?;
                        parts.push(sub.condition_sql().unwrap_or_else(|| "1 = 1".to_string()));
                    }
                    frame.add_cond(format!("({})", parts.join(" OR ")), &[]);
                }
                Node::Not(id, inner) => {
                    let mut sub = Frame::default();
                    self.scope(&mut sub, Some(&**inner), *id, true)?;
                    match sub.condition_sql() {
                        Some(cond) if sub.has_tables() => frame.add_cond(format!("NOT {cond}"), &[]),
                        Some(cond) => frame.add_cond(format!("NOT ({cond})"), &[]),
                        None => frame.add_cond("1 = 0", &[]),
                    }
                }
                Node::Exists(id, inner) => {
                    let outer = self.outer_aliases(inner);
                    let mut sub = Frame::default();
                    self.scope(&mut sub, Some(&**inner), *id, negated)?;
                    if let Some(cond) = sub.condition_sql() {
                        frame.add_cond(cond, &outer);
                    }
                }
            }
        }

        Ok(())
    }

    /// Aliases of the enclosing tables `node` refers to. An `EXISTS` on an
    /// outer-joined variable belongs to the `ON` clause of its table.
    fn outer_aliases(&self, node: &Node) -> Vec<String> {
        let mut ret: Vec<String> = vec![];
        node.for_each_var(&mut |var| {
            if let Some(alias) = self.terms.get(var).and_then(|term| term.alias.as_ref()) {
                if !ret.contains(alias) {
                    ret.push(alias.clone());
                }
            }
        });
        ret
    }

    fn staged_vars(&mut self, frame: &mut Frame) {
        let var_map = self.state.var_map;
        for (var, column) in &var_map.vars {
            if self.select.var(var).is_none() {
                continue;
            }
            if !frame.contains(&column.table) {
                frame.push(&column.table, &column.table, false);
            }
            self.terms.insert(
                var.clone(),
                Term {
                    sql: format!("{}.{}", column.table, column.column),
                    alias: Some(column.table.clone()),
                },
            );
        }
    }

    pub(super) fn add_var_table(&mut self, frame: &mut Frame, var: &str, left: bool) -> Result<String> {
        let Some(etype) = self.solution.get(var) else {
            return Err(Error::query(format!("variable {var} has no type")));
        };
        let alias = format!("_{var}");
        frame.push(layout::entity_table(etype), &alias, left);

        self.tables.insert(var.to_string(), alias.clone());
        self.terms.insert(
            var.to_string(),
            Term {
                sql: format!("{alias}.{}", layout::EID),
                alias: Some(alias.clone()),
            },
        );
        Ok(alias)
    }

    pub(super) fn term(&self, var: &str) -> Result<Term> {
        self.terms
            .get(var)
            .cloned()
            .ok_or_else(|| Error::query(format!("variable {var} can not be used here")))
    }

    pub(super) fn has_term(&self, var: &str) -> bool {
        self.terms.contains_key(var)
    }

    /// Binds `var` to `sql`, or joins on its existing term.
    pub(super) fn bind(&mut self, frame: &mut Frame, var: &str, sql: String, alias: Option<String>) {
        match self.terms.get(var) {
            None => {
                self.terms.insert(var.to_string(), Term { sql, alias });
            }
            Some(term) => {
                let aliases: Vec<String> = alias.into_iter().chain(term.alias.clone()).collect();
                frame.add_cond(format!("{sql} = {}", term.sql), &aliases);
            }
        }
    }

    pub(super) fn alias(&mut self, prefix: &str) -> String {
        let n = self.next_alias;
        self.next_alias += 1;
        format!("{prefix}{n}")
    }

    fn selection(&mut self) -> Result<String> {
        let select = self.select;
        let mut columns = vec![];
        for expr in &select.selection {
            columns.push(self.expr(expr, &mut vec![])?);
        }
        Ok(columns.join(", "))
    }

    /// `GROUP BY`, `HAVING`, `ORDER BY` and `LIMIT` of the select.
    fn clauses(&mut self) -> Result<String> {
        let select = self.select;
        let mut out = String::new();

        if !select.groupby.is_empty() {
            let mut terms = vec![];
            for expr in &select.groupby {
                terms.push(self.expr(expr, &mut vec![])?);
            }
            out.push_str(" GROUP BY ");
            out.push_str(&terms.join(", "));
        }

        if let Some(having) = &select.having {
            out.push_str(" HAVING ");
            out.push_str(&self.having(having)?);
        }

        if !select.orderby.is_empty() {
            let mut terms = vec![];
            for term in &select.orderby {
                let sql = self.expr(&term.expr, &mut vec![])?;
                terms.push(if term.asc { sql } else { format!("{sql} DESC") });
            }
            out.push_str(" ORDER BY ");
            out.push_str(&terms.join(", "));
        }

        out.push_str(&limit_sql(self.gen.flavor, select.limit, select.offset));
        Ok(out)
    }

    fn having(&mut self, node: &Node) -> Result<String> {
        match node {
            Node::Compare(cmp) => self.compare(cmp, &mut vec![]),
            Node::And(nodes) | Node::Or(nodes) => {
                let sep = if matches!(node, Node::And(_)) {
                    " AND "
                } else {
                    " OR "
                };
                let mut parts = vec![];
                for node in nodes {
                    parts.push(self.having(node)?);
                }
                Ok(format!("({})", parts.join(sep)))
            }
            Node::Not(_, inner) => Ok(format!("NOT ({})", self.having(inner)?)),
            _ => Err(Error::query("HAVING only accepts comparisons")),
        }
    }
}

fn assemble(
    distinct: bool,
    selection: &str,
    from: Option<String>,
    cond: Option<String>,
    clauses: &str,
) -> String {
    let mut out = String::from("SELECT ");
    if distinct {
        out.push_str("DISTINCT ");
    }
    out.push_str(selection);
    if let Some(from) = from {
        out.push_str(" FROM ");
        out.push_str(&from);
    }
    if let Some(cond) = cond {
        out.push_str(" WHERE ");
        out.push_str(&cond);
    }
    out.push_str(clauses);
    out
}
