/// Index of a scope in [`Select::scopes`](super::Select::scopes). The root
/// scope is always `0`.
pub type ScopeId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeInfo {
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Root,
    Exists,
    Not,
}

impl ScopeInfo {
    pub fn root() -> Self {
        Self {
            parent: None,
            kind: ScopeKind::Root,
        }
    }
}
