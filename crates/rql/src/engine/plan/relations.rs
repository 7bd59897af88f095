use crate::engine::plan::Step;

/// Sub-select feeding an insert. Returns the rows of its child; each column
/// is described by a term.
#[derive(Debug)]
pub(crate) struct Relations {
    pub(crate) terms: Vec<FetchedTerm>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FetchedTerm {
    pub(crate) var: String,
    pub(crate) kind: TermKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TermKind {
    /// Attribute or inlined value merged into an entity definition
    Final,

    /// Object of a relation from a new entity
    Relation,

    /// Subject of a relation to a new entity
    ReverseRelation,
}

impl From<Relations> for Step {
    fn from(value: Relations) -> Self {
        Step::Relations(value)
    }
}
