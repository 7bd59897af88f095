use crate::stmt::Value;

/// Type of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrType {
    String,
    Int,
    BigInt,
    Float,
    Boolean,
    Date,
    Datetime,
    Password,
    Bytes,
}

impl AttrType {
    pub const ALL: &'static [AttrType] = &[
        Self::String,
        Self::Int,
        Self::BigInt,
        Self::Float,
        Self::Boolean,
        Self::Date,
        Self::Datetime,
        Self::Password,
        Self::Bytes,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Int => "Int",
            Self::BigInt => "BigInt",
            Self::Float => "Float",
            Self::Boolean => "Boolean",
            Self::Date => "Date",
            Self::Datetime => "Datetime",
            Self::Password => "Password",
            Self::Bytes => "Bytes",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|ty| ty.name() == name)
    }

    /// Type of a literal appearing in a query.
    pub fn of_value(value: &Value) -> Self {
        match value {
            Value::Null | Value::String(_) => Self::String,
            Value::Bool(_) => Self::Boolean,
            Value::I64(_) => Self::Int,
            Value::F64(_) => Self::Float,
            Value::Bytes(_) => Self::Bytes,
        }
    }

    /// Returns true if `value` may be stored in an attribute of this type.
    /// Null is accepted; required attributes are checked separately.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::String | Self::Password | Self::Date | Self::Datetime, Value::String(_)) => true,
            (Self::Int | Self::BigInt, Value::I64(_)) => true,
            (Self::Float, Value::F64(_) | Value::I64(_)) => true,
            (Self::Boolean, Value::Bool(_)) => true,
            (Self::Bytes, Value::Bytes(_)) => true,
            _ => false,
        }
    }
}
