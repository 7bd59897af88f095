use super::{Name, Value};

/// `column = value` or `column IN (values..)`. A statement's filters are
/// ANDed together.
#[derive(Debug, Clone)]
pub struct Filter {
    pub column: Name,
    pub values: Vec<Value>,
}

impl Filter {
    pub fn eq(column: impl Into<Name>, value: impl Into<Value>) -> Filter {
        Filter {
            column: column.into(),
            values: vec![value.into()],
        }
    }

    pub fn any_of(column: impl Into<Name>, values: impl IntoIterator<Item = Value>) -> Filter {
        Filter {
            column: column.into(),
            values: values.into_iter().collect(),
        }
    }
}
