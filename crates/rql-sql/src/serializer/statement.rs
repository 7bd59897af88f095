use super::{Comma, Params, ToSql};

use crate::stmt::{self, Statement};

impl ToSql for &Statement {
    fn to_sql<T: Params>(self, f: &mut super::Formatter<'_, T>) {
        match self {
            Statement::CreateIndex(stmt) => stmt.to_sql(f),
            Statement::CreateTable(stmt) => stmt.to_sql(f),
            Statement::Delete(stmt) => stmt.to_sql(f),
            Statement::DropTable(stmt) => stmt.to_sql(f),
            Statement::Insert(stmt) => stmt.to_sql(f),
            Statement::Select(stmt) => stmt.to_sql(f),
            Statement::Update(stmt) => stmt.to_sql(f),
        }
    }
}

impl ToSql for &stmt::CreateIndex {
    fn to_sql<T: Params>(self, f: &mut super::Formatter<'_, T>) {
        let unique = if self.unique { "UNIQUE " } else { "" };
        let name = &self.name;
        let on = &self.on;
        let columns = Comma(&self.columns);

        fmt!(f, "CREATE " unique "INDEX " name " ON " on " (" columns ")");
    }
}

impl ToSql for &stmt::CreateTable {
    fn to_sql<T: Params>(self, f: &mut super::Formatter<'_, T>) {
        let temporary = if self.temporary { "TEMPORARY " } else { "" };
        let name = &self.name;
        let columns = Comma(&self.columns);

        fmt!(f, "CREATE " temporary "TABLE " name " (" columns ")");
    }
}

impl ToSql for &stmt::DropTable {
    fn to_sql<T: Params>(self, f: &mut super::Formatter<'_, T>) {
        let if_exists = if self.if_exists { "IF EXISTS " } else { "" };

        let name = &self.name;

        fmt!(f, "DROP TABLE " if_exists name);
    }
}

impl ToSql for &stmt::Insert {
    fn to_sql<T: Params>(self, f: &mut super::Formatter<'_, T>) {
        let table = &self.table;
        let columns = Comma(&self.columns);
        let rows = Comma(self.rows.iter().map(Row));

        fmt!(f, "INSERT INTO " table " (" columns ") VALUES " rows);
    }
}

struct Row<'a>(&'a Vec<stmt::Value>);

impl ToSql for Row<'_> {
    fn to_sql<T: Params>(self, f: &mut super::Formatter<'_, T>) {
        let values = Comma(self.0);
        fmt!(f, "(" values ")");
    }
}

impl ToSql for &stmt::Update {
    fn to_sql<T: Params>(self, f: &mut super::Formatter<'_, T>) {
        let table = &self.table;
        let assignments = Comma(self.assignments.iter().map(Assignment));
        let filters = Filters(&self.filters);

        fmt!(f, "UPDATE " table " SET " assignments filters);
    }
}

struct Assignment<'a>(&'a (stmt::Name, stmt::Value));

impl ToSql for Assignment<'_> {
    fn to_sql<T: Params>(self, f: &mut super::Formatter<'_, T>) {
        let (column, value) = self.0;
        fmt!(f, column " = " value);
    }
}

impl ToSql for &stmt::Delete {
    fn to_sql<T: Params>(self, f: &mut super::Formatter<'_, T>) {
        let table = &self.table;
        let filters = Filters(&self.filters);

        fmt!(f, "DELETE FROM " table filters);
    }
}

impl ToSql for &stmt::Select {
    fn to_sql<T: Params>(self, f: &mut super::Formatter<'_, T>) {
        let table = &self.table;
        let columns = Comma(&self.columns);
        let filters = Filters(&self.filters);

        fmt!(f, "SELECT " columns " FROM " table filters);
    }
}

/// ` WHERE a AND b`, or nothing without filters.
struct Filters<'a>(&'a [stmt::Filter]);

impl ToSql for Filters<'_> {
    fn to_sql<T: Params>(self, f: &mut super::Formatter<'_, T>) {
        let mut s = " WHERE ";
        for filter in self.0 {
            fmt!(f, s filter);
            s = " AND ";
        }
    }
}

impl ToSql for &stmt::Filter {
    fn to_sql<T: Params>(self, f: &mut super::Formatter<'_, T>) {
        let column = &self.column;
        match &self.values[..] {
            [] => fmt!(f, "1 = 0"),
            [value] => fmt!(f, column " = " value),
            values => fmt!(f, column " IN (" Comma(values) ")"),
        }
    }
}
