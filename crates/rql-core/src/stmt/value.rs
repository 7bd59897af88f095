use super::Eid;
use crate::Result;

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

#[derive(Debug, Default, Clone)]
pub enum Value {
    /// Null value
    #[default]
    Null,

    /// Boolean value
    Bool(bool),

    /// Signed 64-bit integer, also used for eids
    I64(i64),

    /// Double precision float
    F64(f64),

    /// String value
    String(String),

    /// Raw bytes
    Bytes(Vec<u8>),
}

impl Value {
    pub const fn null() -> Self {
        Self::Null
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn to_eid(&self) -> Result<Eid> {
        match self {
            Self::I64(v) => Ok(*v),
            Self::String(s) => Ok(s.parse()?),
            _ => crate::bail!("cannot convert value to eid; value={self:?}"),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::I64(v) => Some(*v as f64),
            Self::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric addition used when merging partial aggregates and evaluating
    /// arithmetic over staged rows. Null is absorbing.
    pub fn add(&self, other: &Value) -> Value {
        match (self, other) {
            (Self::Null, v) | (v, Self::Null) => v.clone(),
            (Self::I64(a), Self::I64(b)) => Self::I64(a + b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => Self::F64(a + b),
                _ => Self::Null,
            },
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::I64(_) | Self::F64(_) => 2,
            Self::String(_) => 3,
            Self::Bytes(_) => 4,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Total order used to sort and deduplicate in-memory rows. Integers and
/// floats compare numerically; distinct kinds are ordered by kind.
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::I64(a), Self::I64(b)) => a.cmp(b),
            (Self::F64(a), Self::F64(b)) => a.total_cmp(b),
            (Self::I64(a), Self::F64(b)) => (*a as f64).total_cmp(b),
            (Self::F64(a), Self::I64(b)) => a.total_cmp(&(*b as f64)),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Bytes(a), Self::Bytes(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Null => 0u8.hash(state),
            Self::Bool(v) => v.hash(state),
            // Integral floats hash like the equal integer
            Self::I64(v) => (*v as f64).to_bits().hash(state),
            Self::F64(v) => v.to_bits().hash(state),
            Self::String(v) => v.hash(state),
            Self::Bytes(v) => v.hash(state),
        }
    }
}

impl From<bool> for Value {
    fn from(src: bool) -> Self {
        Self::Bool(src)
    }
}

impl From<i64> for Value {
    fn from(src: i64) -> Self {
        Self::I64(src)
    }
}

impl From<i32> for Value {
    fn from(src: i32) -> Self {
        Self::I64(src as i64)
    }
}

impl From<f64> for Value {
    fn from(src: f64) -> Self {
        Self::F64(src)
    }
}

impl From<String> for Value {
    fn from(src: String) -> Self {
        Self::String(src)
    }
}

impl From<&String> for Value {
    fn from(src: &String) -> Self {
        Self::String(src.clone())
    }
}

impl From<&str> for Value {
    fn from(src: &str) -> Self {
        Self::String(src.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(src: Vec<u8>) -> Self {
        Self::Bytes(src)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(src: Option<T>) -> Self {
        match src {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Value;
    use std::collections::HashSet;

    #[test]
    fn numeric_equality_across_kinds() {
        assert_eq!(Value::I64(2), Value::F64(2.0));
        let set: HashSet<Value> = [Value::I64(2), Value::F64(2.0)].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn null_sorts_first() {
        let mut values = vec![Value::from("a"), Value::I64(1), Value::Null];
        values.sort();
        assert_eq!(values, vec![Value::Null, Value::I64(1), Value::from("a")]);
    }

    #[test]
    fn add_merges_partial_sums() {
        assert_eq!(Value::I64(2).add(&Value::I64(3)), Value::I64(5));
        assert_eq!(Value::Null.add(&Value::I64(3)), Value::I64(3));
        assert_eq!(Value::I64(1).add(&Value::F64(0.5)), Value::F64(1.5));
    }
}
