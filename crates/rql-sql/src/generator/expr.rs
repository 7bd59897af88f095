use super::Arm;

use crate::serializer::{Flavor, Param};

use rql_core::{
    stmt::{CmpOp, Compare, Expr, ExprBinaryOp, ExprFunc, Value},
    Result,
};

impl Arm<'_, '_> {
    /// SQL of `expr`. Aliases of the tables read are appended to `aliases`.
    pub(super) fn expr(&mut self, expr: &Expr, aliases: &mut Vec<String>) -> Result<String> {
        match expr {
            Expr::Var(var) => {
                let term = self.term(var)?;
                aliases.extend(term.alias);
                Ok(term.sql)
            }
            Expr::Value(Value::Null) => Ok("NULL".to_string()),
            Expr::Value(value) => Ok(self.state.param(Param::Value(value.clone()))),
            Expr::Arg(name) => Ok(self.state.param(Param::Arg(name.clone()))),
            Expr::EType(name) => Ok(self.state.param(Param::Value(Value::String(name.clone())))),
            Expr::List(items) => {
                let mut parts = vec![];
                for item in items {
                    parts.push(self.expr(item, aliases)?);
                }
                Ok(format!("({})", parts.join(", ")))
            }
            Expr::Func(func) => self.func(func, aliases),
            Expr::BinaryOp(op) => self.binary_op(op, aliases),
        }
    }

    pub(super) fn compare(&mut self, cmp: &Compare, aliases: &mut Vec<String>) -> Result<String> {
        let lhs = self.expr(&cmp.lhs, aliases)?;
        self.cmp(lhs, cmp.op, &cmp.rhs, aliases)
    }

    /// `lhs op rhs`, with the SQL spelling of null checks, `IN` lists and
    /// case-insensitive matching.
    pub(super) fn cmp(
        &mut self,
        lhs: String,
        op: CmpOp,
        rhs: &Expr,
        aliases: &mut Vec<String>,
    ) -> Result<String> {
        Ok(match (op, rhs) {
            (CmpOp::Eq, Expr::Value(Value::Null)) => format!("{lhs} IS NULL"),
            (CmpOp::Ne, Expr::Value(Value::Null)) => format!("{lhs} IS NOT NULL"),
            (CmpOp::In, Expr::List(_)) => format!("{lhs} IN {}", self.expr(rhs, aliases)?),
            (CmpOp::In, rhs) => format!("{lhs} IN ({})", self.expr(rhs, aliases)?),
            (CmpOp::ILike, rhs) if self.gen.flavor != Flavor::Postgresql => {
                format!("LOWER({lhs}) LIKE LOWER({})", self.expr(rhs, aliases)?)
            }
            (op, rhs) => {
                let sql_op = match op {
                    CmpOp::Ne => "<>",
                    op => op.as_str(),
                };
                format!("{lhs} {sql_op} {}", self.expr(rhs, aliases)?)
            }
        })
    }

    fn func(&mut self, func: &ExprFunc, aliases: &mut Vec<String>) -> Result<String> {
        if func.name == "FTIRANK" {
            return match func.args.first().and_then(Expr::as_var) {
                Some(var) => Ok(self.rank(var)),
                None => Ok("1.0".to_string()),
            };
        }

        if func.args.is_empty() && func.name == "COUNT" {
            return Ok("COUNT(*)".to_string());
        }

        let mut args = vec![];
        for arg in &func.args {
            args.push(self.expr(arg, aliases)?);
        }
        let distinct = if func.distinct { "DISTINCT " } else { "" };
        Ok(format!("{}({distinct}{})", func.name, args.join(", ")))
    }

    fn binary_op(&mut self, op: &ExprBinaryOp, aliases: &mut Vec<String>) -> Result<String> {
        let mut operand = |arm: &mut Self, expr: &Expr, right: bool| -> Result<String> {
            let sql = arm.expr(expr, aliases)?;
            Ok(match expr {
                Expr::BinaryOp(inner)
                    if inner.op.precedence() < op.op.precedence()
                        || (right && inner.op.precedence() == op.op.precedence()) =>
                {
                    format!("({sql})")
                }
                _ => sql,
            })
        };

        let lhs = operand(self, &op.lhs, false)?;
        let rhs = operand(self, &op.rhs, true)?;
        Ok(format!("{lhs} {} {rhs}", op.op.as_str()))
    }
}
