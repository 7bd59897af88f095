use super::{Expr, Node, Relation, ScopeInfo, Solution, VarInfo};
use crate::schema::{AttrType, Schema};

use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub distinct: bool,

    pub selection: Vec<Expr>,

    pub restriction: Option<Node>,

    pub groupby: Vec<Expr>,

    pub having: Option<Node>,

    pub orderby: Vec<SortTerm>,

    pub limit: Option<u64>,

    pub offset: u64,

    /// Type assignments, computed by [`crate::analyze::solve`]
    pub solutions: Vec<Solution>,

    /// Variable metadata, computed by [`crate::analyze::annotate`]
    pub vars: IndexMap<String, VarInfo>,

    /// Scope tree, index `0` is the root
    pub scopes: Vec<ScopeInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortTerm {
    pub expr: Expr,
    pub asc: bool,
}

impl Select {
    pub fn new(selection: Vec<Expr>, restriction: Option<Node>) -> Self {
        Self {
            distinct: false,
            selection,
            restriction,
            groupby: vec![],
            having: None,
            orderby: vec![],
            limit: None,
            offset: 0,
            solutions: vec![],
            vars: IndexMap::new(),
            scopes: vec![ScopeInfo::root()],
        }
    }

    /// ANDs `node` into the restriction.
    pub fn add_restriction(&mut self, node: Node) {
        self.restriction = Node::and(self.restriction.take().into_iter().chain(Some(node)));
    }

    pub fn add_relation(&mut self, relation: Relation) {
        self.add_restriction(Node::Relation(relation));
    }

    pub fn has_aggregate(&self) -> bool {
        !self.groupby.is_empty()
            || self.having.is_some()
            || self.selection.iter().any(Expr::contains_aggregate)
    }

    /// The select needs every row at hand before producing a result: it
    /// aggregates, sorts or deduplicates.
    pub fn needs_materialization(&self) -> bool {
        self.has_aggregate() || !self.orderby.is_empty() || self.distinct
    }

    pub fn has_limit(&self) -> bool {
        self.limit.is_some() || self.offset > 0
    }

    /// Every variable referenced anywhere in the select, in order of first
    /// appearance.
    pub fn defined_vars(&self) -> Vec<String> {
        let mut ret: Vec<String> = vec![];
        let mut push = |name: &str| {
            if !ret.iter().any(|v| v == name) {
                ret.push(name.to_string());
            }
        };

        for expr in &self.selection {
            expr.for_each_var(&mut push);
        }
        if let Some(restriction) = &self.restriction {
            restriction.for_each_var(&mut push);
        }
        for expr in &self.groupby {
            expr.for_each_var(&mut push);
        }
        for term in &self.orderby {
            term.expr.for_each_var(&mut push);
        }
        if let Some(having) = &self.having {
            having.for_each_var(&mut push);
        }
        ret
    }

    /// Variables referenced by the selection, group by, order by and having
    /// clauses.
    pub fn root_term_vars(&self) -> Vec<String> {
        let mut ret: Vec<String> = vec![];
        let mut push = |name: &str| {
            if !ret.iter().any(|v| v == name) {
                ret.push(name.to_string());
            }
        };
        for expr in &self.selection {
            expr.for_each_var(&mut push);
        }
        for expr in &self.groupby {
            expr.for_each_var(&mut push);
        }
        for term in &self.orderby {
            term.expr.for_each_var(&mut push);
        }
        if let Some(having) = &self.having {
            having.for_each_var(&mut push);
        }
        ret
    }

    pub fn var(&self, name: &str) -> Option<&VarInfo> {
        self.vars.get(name)
    }

    /// Ordered types `var` takes across the select's solutions.
    pub fn var_types(&self, var: &str) -> Vec<String> {
        Solution::types_of(&self.solutions, var)
    }

    pub fn rename_var(&mut self, from: &str, to: &str) {
        for expr in &mut self.selection {
            expr.rename_var(from, to);
        }
        if let Some(restriction) = &mut self.restriction {
            restriction.rename_var(from, to);
        }
        for expr in &mut self.groupby {
            expr.rename_var(from, to);
        }
        for term in &mut self.orderby {
            term.expr.rename_var(from, to);
        }
        if let Some(having) = &mut self.having {
            having.rename_var(from, to);
        }
        for solution in &mut self.solutions {
            solution.rename_var(from, to);
        }
        if let Some(mut info) = self.vars.shift_remove(from) {
            info.name = to.to_string();
            self.vars.insert(to.to_string(), info);
        }
    }

    /// Type name of a selected term for `solution`.
    ///
    /// Entity variables have their entity type, attribute variables their
    /// attribute type. Functions return their result type.
    pub fn term_type(&self, schema: &Schema, solution: &Solution, expr: &Expr) -> String {
        term_type(schema, solution, expr)
    }
}

fn term_type(schema: &Schema, solution: &Solution, expr: &Expr) -> String {
    match expr {
        Expr::Var(name) => solution.get(name).unwrap_or("Any").to_string(),
        Expr::Value(value) => AttrType::of_value(value).name().to_string(),
        Expr::Arg(_) => "Any".to_string(),
        Expr::EType(_) => AttrType::String.name().to_string(),
        Expr::Func(func) => match func.name.as_str() {
            "COUNT" | "LENGTH" => AttrType::Int.name().to_string(),
            "AVG" | "FTIRANK" => AttrType::Float.name().to_string(),
            "UPPER" | "LOWER" => AttrType::String.name().to_string(),
            _ => match func.args.first() {
                Some(arg) => term_type(schema, solution, arg),
                None => "Any".to_string(),
            },
        },
        Expr::BinaryOp(op) => {
            let lhs = term_type(schema, solution, &op.lhs);
            let rhs = term_type(schema, solution, &op.rhs);
            if lhs == AttrType::Float.name() || rhs == AttrType::Float.name() {
                AttrType::Float.name().to_string()
            } else if schema.entity(&lhs).is_some() {
                // eid arithmetic
                AttrType::Int.name().to_string()
            } else {
                lhs
            }
        }
        Expr::List(_) => "Any".to_string(),
    }
}

impl SortTerm {
    pub fn asc(expr: Expr) -> Self {
        Self { expr, asc: true }
    }

    pub fn desc(expr: Expr) -> Self {
        Self { expr, asc: false }
    }
}
