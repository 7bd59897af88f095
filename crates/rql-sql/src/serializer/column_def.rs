use super::{Flavor, Params, ToSql};

use crate::stmt;

impl ToSql for &stmt::ColumnDef {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let name = &self.name;
        fmt!(f, name " ");

        match (self.auto_increment, f.serializer.flavor) {
            (true, Flavor::Postgresql) => fmt!(f, "SERIAL"),
            _ => fmt!(f, self.ty),
        }

        if self.primary_key {
            fmt!(f, " PRIMARY KEY");
            if self.auto_increment {
                match f.serializer.flavor {
                    Flavor::Sqlite => fmt!(f, " AUTOINCREMENT"),
                    Flavor::Mysql => fmt!(f, " AUTO_INCREMENT"),
                    Flavor::Postgresql => {}
                }
            }
        }

        if self.not_null && !self.primary_key {
            fmt!(f, " NOT NULL");
        }

        if self.unique {
            fmt!(f, " UNIQUE");
        }
    }
}
