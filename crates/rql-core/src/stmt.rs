mod compare;
pub use compare::Compare;

mod delete;
pub use delete::Delete;

mod display;

mod expr;
pub use expr::Expr;

mod expr_binary_op;
pub use expr_binary_op::{ArithOp, ExprBinaryOp};

mod expr_func;
pub use expr_func::ExprFunc;

mod insert;
pub use insert::Insert;

mod node;
pub use node::{Node, RelationCx};

mod op_cmp;
pub use op_cmp::CmpOp;

mod relation;
pub use relation::{Optional, Relation};

mod scope;
pub use scope::{ScopeId, ScopeInfo, ScopeKind};

mod select;
pub use select::{Select, SortTerm};

mod set;
pub use set::Set;

mod solution;
pub use solution::Solution;

mod statement;
pub use statement::Statement;

mod union;
pub use union::Union;

mod value;
pub use value::Value;

mod var_info;
pub use var_info::{RelationUse, Side, VarInfo, VarKind};

use indexmap::IndexMap;

/// Entity identifier. Eids are allocated by the system source and are unique
/// across every source of a repository.
pub type Eid = i64;

/// Named query arguments, referenced from RQL text as `%(name)s`.
pub type Args = IndexMap<String, Value>;

/// A fully materialized result row.
pub type Row = Vec<Value>;
