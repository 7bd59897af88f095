use super::ScopeId;

/// Analysis results for one variable of a select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarInfo {
    pub name: String,

    /// Scope binding the variable: the lowest common ancestor of every scope
    /// referencing it. Selected, grouped and sorted variables are bound at the
    /// root.
    pub scope: ScopeId,

    pub kind: VarKind,

    /// The relation itself may stand in for the variable in generated SQL.
    pub invariant: bool,

    /// The variable is the optional side of an outer-joined relation.
    pub optional: bool,

    /// Every relation referencing the variable.
    pub relations: Vec<RelationUse>,

    /// Appears in the selection.
    pub selected: bool,

    /// Has attributes read or compared (`X nom N`, `X nom "foo"`).
    pub attribute_access: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Entity,
    Attribute,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationUse {
    pub rtype: String,
    pub side: Side,
    pub scope: ScopeId,
    pub negated: bool,
    pub optional: bool,
    pub in_or: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Subject,
    Object,
}

impl VarInfo {
    pub fn new(name: impl Into<String>, kind: VarKind) -> Self {
        Self {
            name: name.into(),
            scope: 0,
            kind,
            invariant: false,
            optional: false,
            relations: vec![],
            selected: false,
            attribute_access: false,
        }
    }

    pub fn is_entity(&self) -> bool {
        self.kind == VarKind::Entity
    }

    pub fn is_attribute(&self) -> bool {
        self.kind == VarKind::Attribute
    }

    /// Every use of the variable is negated; read checks on it would change
    /// the meaning of the query.
    pub fn only_negated(&self) -> bool {
        !self.selected && !self.relations.is_empty() && self.relations.iter().all(|r| r.negated)
    }
}

impl Side {
    pub fn flip(self) -> Self {
        match self {
            Self::Subject => Self::Object,
            Self::Object => Self::Subject,
        }
    }
}
