use rql_core::schema::AttrType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Boolean,
    Integer,
    BigInt,
    Real,
    Text,
    Blob,
    Date,
    Timestamp,
}

impl Type {
    pub fn from_attr(ty: AttrType) -> Type {
        match ty {
            AttrType::String | AttrType::Password => Type::Text,
            AttrType::Int => Type::Integer,
            AttrType::BigInt => Type::BigInt,
            AttrType::Float => Type::Real,
            AttrType::Boolean => Type::Boolean,
            AttrType::Date => Type::Date,
            AttrType::Datetime => Type::Timestamp,
            AttrType::Bytes => Type::Blob,
        }
    }

    /// Column type for a query term of type `name`: an attribute type name,
    /// or an entity type, stored as its eid.
    pub fn from_term_type(name: &str) -> Type {
        AttrType::from_name(name)
            .map(Type::from_attr)
            .unwrap_or(Type::Integer)
    }
}
