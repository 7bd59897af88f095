use super::{Name, Type};

#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub name: Name,
    pub ty: Type,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub not_null: bool,
    pub unique: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<Name>, ty: Type) -> ColumnDef {
        ColumnDef {
            name: name.into(),
            ty,
            primary_key: false,
            auto_increment: false,
            not_null: false,
            unique: false,
        }
    }

    /// An integer primary key column.
    pub fn primary_key(name: impl Into<Name>) -> ColumnDef {
        ColumnDef {
            primary_key: true,
            ..ColumnDef::new(name, Type::Integer)
        }
    }

    pub fn auto_increment(self) -> ColumnDef {
        ColumnDef {
            auto_increment: true,
            ..self
        }
    }

    pub fn not_null(self) -> ColumnDef {
        ColumnDef {
            not_null: true,
            ..self
        }
    }

    pub fn unique(self) -> ColumnDef {
        ColumnDef {
            unique: true,
            ..self
        }
    }
}
