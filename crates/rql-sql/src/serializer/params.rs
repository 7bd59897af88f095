use super::{Formatter, ToSql};

use rql_core::{
    stmt::{Args, Value},
    Error, Result,
};

/// A query parameter. Named arguments are resolved when the statement runs so
/// that generated SQL can be reused with other arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Arg(String),
    Value(Value),
}

impl Param {
    pub fn resolve(&self, args: &Args) -> Result<Value> {
        match self {
            Param::Value(value) => Ok(value.clone()),
            Param::Arg(name) => args
                .get(name)
                .cloned()
                .ok_or_else(|| Error::query(format!("missing argument `{name}`"))),
        }
    }
}

pub trait Params {
    fn push(&mut self, param: &Param) -> Placeholder;
}

pub struct Placeholder(pub usize);

impl Params for Vec<Param> {
    fn push(&mut self, param: &Param) -> Placeholder {
        self.push(param.clone());
        Placeholder(self.len())
    }
}

impl ToSql for Placeholder {
    fn to_sql<T: super::Params>(self, f: &mut Formatter<'_, T>) {
        f.serializer.flavor.placeholder(self.0, f.dst);
    }
}

impl From<Value> for Param {
    fn from(value: Value) -> Self {
        Param::Value(value)
    }
}
