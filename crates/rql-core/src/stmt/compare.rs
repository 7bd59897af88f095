use super::{CmpOp, Expr};

/// Comparison between two terms, used in `HAVING`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Compare {
    pub lhs: Expr,
    pub op: CmpOp,
    pub rhs: Expr,
}
