use super::Error;

/// The acting principal is not allowed to perform an action.
///
/// Raised by the security rewriter when no solution survives read checks,
/// and by write steps when an add/update/delete permission is not granted.
#[derive(Debug)]
pub(super) struct Unauthorized {
    pub(super) action: Box<str>,
    pub(super) target: Box<str>,
}

impl std::error::Error for Unauthorized {}

impl core::fmt::Display for Unauthorized {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "unauthorized: {} on {}", self.action, self.target)
    }
}

impl Error {
    /// Creates an authorization error for `action` (`read`, `add`, ...) on
    /// `target` (an entity type, relation type or eid).
    pub fn unauthorized(action: impl Into<String>, target: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::Unauthorized(Unauthorized {
            action: action.into().into(),
            target: target.into().into(),
        }))
    }

    /// Returns `true` if this error is an authorization error.
    pub fn is_unauthorized(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::Unauthorized(_)))
    }
}
