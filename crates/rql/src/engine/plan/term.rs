use rql_core::{
    err,
    stmt::{Args, Eid, Expr, Value},
    Result,
};

/// Operand of a write.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Term {
    /// Known when planning
    Value(Value),

    /// Query argument
    Arg(String),

    /// Column of the rows returned by the step's child
    Fetched(usize),

    /// Entity created by the same insert, by definition index
    New(usize),
}

impl Term {
    /// Term for an expression known before any fetch.
    pub(crate) fn constant(expr: &Expr) -> Option<Term> {
        match expr {
            Expr::Value(value) => Some(Term::Value(value.clone())),
            Expr::Arg(name) => Some(Term::Arg(name.clone())),
            _ => None,
        }
    }

    pub(crate) fn is_constant(&self) -> bool {
        matches!(self, Term::Value(_) | Term::Arg(_))
    }

    pub(crate) fn value(&self, row: &[Value], args: &Args) -> Result<Value> {
        match self {
            Term::Value(value) => Ok(value.clone()),
            Term::Arg(name) => args
                .get(name)
                .cloned()
                .ok_or_else(|| err!("missing argument `{name}`")),
            Term::Fetched(index) => row
                .get(*index)
                .cloned()
                .ok_or_else(|| err!("fetched row has no column {index}")),
            Term::New(index) => Err(err!("entity #{index} of the insert has no value yet")),
        }
    }

    pub(crate) fn eid(&self, row: &[Value], args: &Args) -> Result<Eid> {
        self.value(row, args)?.to_eid()
    }
}
