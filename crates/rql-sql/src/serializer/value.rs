use super::{Param, Params, ToSql};

use crate::stmt::Value;

impl ToSql for &Value {
    fn to_sql<T: Params>(self, f: &mut super::Formatter<'_, T>) {
        let placeholder = f.params.push(&Param::Value(self.clone()));
        fmt!(f, placeholder);
    }
}
