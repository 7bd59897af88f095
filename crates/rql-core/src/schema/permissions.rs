use crate::stmt::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Read,
    Add,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Add => "add",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Permissions of an entity type.
#[derive(Debug, Clone, Default)]
pub struct Permissions {
    pub read: Vec<Rule>,
    pub add: Vec<Rule>,
    pub update: Vec<Rule>,
    pub delete: Vec<Rule>,
}

/// Permissions of a relation type. Only groups are supported.
#[derive(Debug, Clone, Default)]
pub struct RelationPermissions {
    pub add: Vec<String>,
    pub delete: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum Rule {
    /// Members of the group are granted the action.
    Group(String),

    /// The action is granted on entities matching the expression.
    Expression(RqlExpression),
}

/// Restriction granting an action. `X` is the checked entity and `U` the
/// acting user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RqlExpression {
    pub text: String,
    pub restriction: Node,
}

impl Permissions {
    pub fn rules(&self, action: Action) -> &[Rule] {
        match action {
            Action::Read => &self.read,
            Action::Add => &self.add,
            Action::Update => &self.update,
            Action::Delete => &self.delete,
        }
    }

    pub(super) fn rules_mut(&mut self, action: Action) -> &mut Vec<Rule> {
        match action {
            Action::Read => &mut self.read,
            Action::Add => &mut self.add,
            Action::Update => &mut self.update,
            Action::Delete => &mut self.delete,
        }
    }

    /// Returns true if one of `groups` is unconditionally granted `action`.
    pub fn grants<S: AsRef<str>>(&self, action: Action, groups: &[S]) -> bool {
        self.rules(action).iter().any(|rule| match rule {
            Rule::Group(group) => groups.iter().any(|g| g.as_ref() == group),
            Rule::Expression(_) => false,
        })
    }

    /// Expressions conditionally granting `action`.
    pub fn expressions(&self, action: Action) -> Vec<&RqlExpression> {
        self.rules(action)
            .iter()
            .filter_map(|rule| match rule {
                Rule::Expression(expr) => Some(expr),
                Rule::Group(_) => None,
            })
            .collect()
    }
}

impl RelationPermissions {
    pub fn grants<S: AsRef<str>>(&self, action: Action, groups: &[S]) -> bool {
        let allowed = match action {
            Action::Add => &self.add,
            Action::Delete => &self.delete,
            Action::Read | Action::Update => return true,
        };
        allowed
            .iter()
            .any(|group| groups.iter().any(|g| g.as_ref() == group))
    }
}
