use crate::engine::plan::{Step, Term};

/// Applies assignments once per row of the child, or once when there is no
/// child.
#[derive(Debug)]
pub(crate) struct Update {
    pub(crate) assignments: Vec<Assignment>,
}

#[derive(Debug, Clone)]
pub(crate) struct Assignment {
    /// Eid of the changed entity
    pub(crate) subject: Term,

    pub(crate) rtype: String,

    pub(crate) value: Term,

    pub(crate) kind: AssignmentKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AssignmentKind {
    Attribute,

    /// Stored as a column of the subject
    Inlined,

    Relation,
}

impl From<Update> for Step {
    fn from(value: Update) -> Self {
        Step::Update(value)
    }
}
