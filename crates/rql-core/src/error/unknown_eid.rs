use super::Error;

/// A literal eid used in a query does not exist.
#[derive(Debug)]
pub(super) struct UnknownEid {
    pub(super) eid: i64,
}

impl std::error::Error for UnknownEid {}

impl core::fmt::Display for UnknownEid {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "unknown eid {}", self.eid)
    }
}

impl Error {
    /// Creates an unknown-reference error.
    pub fn unknown_eid(eid: i64) -> Error {
        Error::from(super::ErrorKind::UnknownEid(UnknownEid { eid }))
    }

    /// Returns `true` if this error is an unknown-reference error.
    pub fn is_unknown_eid(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::UnknownEid(_)))
    }
}
