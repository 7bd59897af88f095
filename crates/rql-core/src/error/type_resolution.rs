use super::Error;

/// No type assignment satisfies the statement's relations.
#[derive(Debug)]
pub(super) struct TypeResolutionError {
    pub(super) message: Box<str>,
}

impl std::error::Error for TypeResolutionError {}

impl core::fmt::Display for TypeResolutionError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "type resolution failed: {}", self.message)
    }
}

impl Error {
    /// Creates a type resolution error.
    pub fn type_resolution(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::TypeResolution(TypeResolutionError {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is a type resolution error.
    pub fn is_type_resolution(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::TypeResolution(_)))
    }
}
