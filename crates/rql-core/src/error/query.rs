use super::Error;

/// A structurally invalid request.
///
/// This occurs when:
/// - a statement assigns to a read-only or computed relation
/// - a statement references an unknown entity type or relation
/// - a variable is used without being bound by any relation
///
/// Query errors are detected while planning, before any I/O.
#[derive(Debug)]
pub(super) struct QueryError {
    pub(super) message: Box<str>,
}

impl std::error::Error for QueryError {}

impl core::fmt::Display for QueryError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "bad query: {}", self.message)
    }
}

impl Error {
    /// Creates a query error.
    pub fn query(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::Query(QueryError {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is a query error.
    pub fn is_query(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::Query(_)))
    }
}
