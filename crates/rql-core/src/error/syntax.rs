use super::Error;

/// Error raised by the RQL parser.
#[derive(Debug)]
pub(super) struct SyntaxError {
    pub(super) message: Box<str>,
    pub(super) offset: usize,
}

impl std::error::Error for SyntaxError {}

impl core::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "syntax error at offset {}: {}", self.offset, self.message)
    }
}

impl Error {
    /// Creates a syntax error at the given byte offset of the query text.
    pub fn syntax(message: impl Into<String>, offset: usize) -> Error {
        Error::from(super::ErrorKind::Syntax(SyntaxError {
            message: message.into().into(),
            offset,
        }))
    }

    /// Returns `true` if this error is a syntax error.
    pub fn is_syntax(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::Syntax(_)))
    }
}
