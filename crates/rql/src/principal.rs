use rql_core::stmt::Eid;

/// The user on whose behalf statements execute.
///
/// Read permissions are enforced by rewriting selects; add, update and
/// delete permissions are checked as writes happen. An internal principal
/// bypasses both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Eid of the `CWUser` entity
    pub eid: Eid,

    pub login: String,

    pub groups: Vec<String>,

    internal: bool,
}

impl Principal {
    pub fn new<I>(eid: Eid, login: impl Into<String>, groups: I) -> Principal
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Principal {
            eid,
            login: login.into(),
            groups: groups.into_iter().map(Into::into).collect(),
            internal: false,
        }
    }

    /// The repository itself, for maintenance and permission evaluation.
    pub fn internal() -> Principal {
        Principal {
            eid: 0,
            login: "__internal__".to_string(),
            groups: vec!["managers".to_string()],
            internal: true,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.internal
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups() {
        let principal = Principal::new(12, "anon", ["guests"]);
        assert!(principal.in_group("guests"));
        assert!(!principal.in_group("managers"));
        assert!(!principal.is_internal());
        assert!(Principal::internal().is_internal());
    }
}
