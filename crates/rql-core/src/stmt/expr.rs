use super::{ArithOp, ExprBinaryOp, ExprFunc, Value};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// A query variable (`X`)
    Var(String),

    /// A literal value
    Value(Value),

    /// A named argument (`%(name)s`)
    Arg(String),

    /// An entity type name, object of `is` / `is_instance_of`
    EType(String),

    /// Function call, including aggregates
    Func(ExprFunc),

    /// Arithmetic
    BinaryOp(ExprBinaryOp),

    /// List of expressions, right-hand side of `IN`
    List(Vec<Expr>),
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(name.into())
    }

    pub fn arg(name: impl Into<String>) -> Self {
        Self::Arg(name.into())
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    pub fn func(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::Func(ExprFunc {
            name: name.into(),
            distinct: false,
            args,
        })
    }

    pub fn binary_op(lhs: Expr, op: ArithOp, rhs: Expr) -> Self {
        Self::BinaryOp(ExprBinaryOp {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
        })
    }

    pub fn as_var(&self) -> Option<&str> {
        match self {
            Self::Var(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Self::Var(_))
    }

    /// Returns true if the expression is, or contains, an aggregate call.
    pub fn contains_aggregate(&self) -> bool {
        let mut found = false;
        self.walk(&mut |expr| {
            if let Expr::Func(func) = expr {
                found |= func.is_aggregate();
            }
        });
        found
    }

    /// Calls `f` on every variable referenced by the expression.
    pub fn for_each_var(&self, f: &mut impl FnMut(&str)) {
        self.walk(&mut |expr| {
            if let Expr::Var(name) = expr {
                f(name);
            }
        });
    }

    pub fn vars(&self) -> Vec<String> {
        let mut ret = vec![];
        self.for_each_var(&mut |name| {
            if !ret.iter().any(|v: &String| v == name) {
                ret.push(name.to_string());
            }
        });
        ret
    }

    /// Pre-order traversal.
    pub fn walk(&self, f: &mut impl FnMut(&Expr)) {
        f(self);

        match self {
            Self::Func(func) => {
                for arg in &func.args {
                    arg.walk(f);
                }
            }
            Self::BinaryOp(op) => {
                op.lhs.walk(f);
                op.rhs.walk(f);
            }
            Self::List(items) => {
                for item in items {
                    item.walk(f);
                }
            }
            _ => {}
        }
    }

    /// Post-order mutable traversal.
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Expr)) {
        match self {
            Self::Func(func) => {
                for arg in &mut func.args {
                    arg.walk_mut(f);
                }
            }
            Self::BinaryOp(op) => {
                op.lhs.walk_mut(f);
                op.rhs.walk_mut(f);
            }
            Self::List(items) => {
                for item in items {
                    item.walk_mut(f);
                }
            }
            _ => {}
        }

        f(self);
    }

    /// Renames every occurrence of variable `from` to `to`.
    pub fn rename_var(&mut self, from: &str, to: &str) {
        self.walk_mut(&mut |expr| {
            if let Expr::Var(name) = expr {
                if name == from {
                    *name = to.to_string();
                }
            }
        });
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}
