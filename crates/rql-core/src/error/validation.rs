use super::Error;

/// A row fails a schema constraint at insert/update time.
#[derive(Debug)]
pub(super) struct ValidationError {
    pub(super) etype: Box<str>,
    pub(super) field: Box<str>,
    pub(super) message: Box<str>,
}

impl std::error::Error for ValidationError {}

impl core::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "validation failed for {}.{}: {}",
            self.etype, self.field, self.message
        )
    }
}

impl Error {
    /// Creates a validation error for `etype.field`.
    pub fn validation(
        etype: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Error {
        Error::from(super::ErrorKind::Validation(ValidationError {
            etype: etype.into().into(),
            field: field.into().into(),
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is a validation error.
    pub fn is_validation(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::Validation(_)))
    }
}
