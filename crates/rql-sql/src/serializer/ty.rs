use super::{Flavor, Params, ToSql};

use crate::stmt;

impl ToSql for stmt::Type {
    fn to_sql<T: Params>(self, f: &mut super::Formatter<'_, T>) {
        use stmt::Type::*;

        let flavor = f.serializer.flavor;
        fmt!(
            f,
            match (self, flavor) {
                (Boolean, _) => "BOOLEAN",
                (Integer, _) => "INTEGER",
                (BigInt, _) => "BIGINT",
                (Real, Flavor::Postgresql) => "DOUBLE PRECISION",
                (Real, Flavor::Mysql) => "DOUBLE",
                (Real, Flavor::Sqlite) => "REAL",
                (Text, Flavor::Mysql) => "VARCHAR(255)",
                (Text, _) => "TEXT",
                (Blob, Flavor::Postgresql) => "BYTEA",
                (Blob, _) => "BLOB",
                (Date, _) => "DATE",
                (Timestamp, Flavor::Mysql) => "DATETIME",
                (Timestamp, _) => "TIMESTAMP",
            }
        );
    }
}
