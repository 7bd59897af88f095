//! Rendering of statements back to RQL text.
//!
//! The output parses back to an equal statement and is used as the normalized
//! form of a query for caching.

use super::*;

use core::fmt;

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(true) => f.write_str("TRUE"),
            Value::Bool(false) => f.write_str("FALSE"),
            Value::I64(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v:?}"),
            Value::String(v) => {
                f.write_str("\"")?;
                for c in v.chars() {
                    if c == '"' || c == '\\' {
                        f.write_str("\\")?;
                    }
                    write!(f, "{c}")?;
                }
                f.write_str("\"")
            }
            Value::Bytes(v) => {
                f.write_str("\"")?;
                for byte in v {
                    write!(f, "{byte:02x}")?;
                }
                f.write_str("\"")
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Var(name) | Expr::EType(name) => f.write_str(name),
            Expr::Value(value) => fmt::Display::fmt(value, f),
            Expr::Arg(name) => write!(f, "%({name})s"),
            Expr::Func(func) => {
                write!(f, "{}(", func.name)?;
                if func.distinct {
                    f.write_str("DISTINCT ")?;
                }
                comma(f, &func.args)?;
                f.write_str(")")
            }
            Expr::BinaryOp(op) => {
                operand(f, &op.lhs, op.op, false)?;
                write!(f, " {} ", op.op.as_str())?;
                operand(f, &op.rhs, op.op, true)
            }
            Expr::List(items) => {
                f.write_str("(")?;
                comma(f, items)?;
                f.write_str(")")
            }
        }
    }
}

fn operand(f: &mut fmt::Formatter<'_>, expr: &Expr, parent: ArithOp, rhs: bool) -> fmt::Result {
    match expr {
        Expr::BinaryOp(op)
            if op.op.precedence() < parent.precedence()
                || (rhs && op.op.precedence() == parent.precedence()) =>
        {
            write!(f, "({expr})")
        }
        _ => fmt::Display::fmt(expr, f),
    }
}

fn comma<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        fmt::Display::fmt(item, f)?;
    }
    Ok(())
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.subject)?;
        if self.optional == Optional::Subject {
            f.write_str("?")?;
        }
        write!(f, " {} ", self.rtype)?;

        match (self.op, &self.object) {
            (CmpOp::Eq, object) => fmt::Display::fmt(object, f)?,
            (CmpOp::In, Expr::List(items)) => {
                f.write_str("IN(")?;
                comma(f, items)?;
                f.write_str(")")?;
            }
            (op, object) => write!(f, "{} {object}", op.as_str())?,
        }

        if self.optional == Optional::Object {
            f.write_str("?")?;
        }
        Ok(())
    }
}

impl fmt::Display for Compare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.op.as_str(), self.rhs)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::And(nodes) => {
                for (i, node) in nodes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    fmt::Display::fmt(node, f)?;
                }
                Ok(())
            }
            Node::Or(nodes) => {
                for (i, node) in nodes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" OR ")?;
                    }
                    match node {
                        Node::And(_) => write!(f, "({node})")?,
                        node => fmt::Display::fmt(node, f)?,
                    }
                }
                Ok(())
            }
            Node::Not(_, inner) => match &**inner {
                Node::And(_) | Node::Or(_) => write!(f, "NOT ({inner})"),
                inner => write!(f, "NOT {inner}"),
            },
            Node::Exists(_, inner) => write!(f, "EXISTS({inner})"),
            Node::Relation(rel) => fmt::Display::fmt(rel, f),
            Node::Compare(cmp) => fmt::Display::fmt(cmp, f),
        }
    }
}

impl fmt::Display for Select {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.distinct {
            f.write_str("DISTINCT ")?;
        }
        f.write_str("Any ")?;
        comma(f, &self.selection)?;

        if !self.groupby.is_empty() {
            f.write_str(" GROUPBY ")?;
            comma(f, &self.groupby)?;
        }

        if !self.orderby.is_empty() {
            f.write_str(" ORDERBY ")?;
            for (i, term) in self.orderby.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", term.expr)?;
                if !term.asc {
                    f.write_str(" DESC")?;
                }
            }
        }

        if let Some(limit) = self.limit {
            write!(f, " LIMIT {limit}")?;
        }

        if self.offset > 0 {
            write!(f, " OFFSET {}", self.offset)?;
        }

        if let Some(restriction) = &self.restriction {
            write!(f, " WHERE {restriction}")?;
        }

        if let Some(having) = &self.having {
            write!(f, " HAVING {having}")?;
        }

        Ok(())
    }
}

impl fmt::Display for Union {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [select] = &self.selects[..] {
            return fmt::Display::fmt(select, f);
        }

        for (i, select) in self.selects.iter().enumerate() {
            if i > 0 {
                f.write_str(" UNION ")?;
            }
            write!(f, "({select})")?;
        }
        Ok(())
    }
}

fn main_vars(f: &mut fmt::Formatter<'_>, vars: &[(String, String)]) -> fmt::Result {
    for (i, (etype, var)) in vars.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{etype} {var}")?;
    }
    Ok(())
}

fn restriction(f: &mut fmt::Formatter<'_>, node: &Option<Node>) -> fmt::Result {
    match node {
        Some(node) => write!(f, " WHERE {node}"),
        None => Ok(()),
    }
}

impl fmt::Display for Insert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("INSERT ")?;
        main_vars(f, &self.main_vars)?;
        if !self.main_relations.is_empty() {
            f.write_str(": ")?;
            comma(f, &self.main_relations)?;
        }
        restriction(f, &self.restriction)
    }
}

impl fmt::Display for Delete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DELETE ")?;
        main_vars(f, &self.main_vars)?;
        if !self.main_vars.is_empty() && !self.main_relations.is_empty() {
            f.write_str(", ")?;
        }
        comma(f, &self.main_relations)?;
        restriction(f, &self.restriction)
    }
}

impl fmt::Display for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SET ")?;
        comma(f, &self.main_relations)?;
        restriction(f, &self.restriction)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Select(stmt) => fmt::Display::fmt(stmt, f),
            Statement::Insert(stmt) => fmt::Display::fmt(stmt, f),
            Statement::Delete(stmt) => fmt::Display::fmt(stmt, f),
            Statement::Set(stmt) => fmt::Display::fmt(stmt, f),
        }
    }
}
