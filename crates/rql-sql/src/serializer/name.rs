use super::{Params, ToSql};

use crate::stmt;

impl ToSql for &stmt::Name {
    fn to_sql<T: Params>(self, f: &mut super::Formatter<'_, T>) {
        f.dst.push_str(&self.0);
    }
}
