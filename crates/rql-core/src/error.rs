mod adhoc;
mod backend;
mod invalid_schema;
mod query;
mod syntax;
mod type_resolution;
mod unauthorized;
mod unknown_eid;
mod validation;

use adhoc::AdhocError;
use backend::BackendError;
use invalid_schema::InvalidSchema;
use query::QueryError;
use std::sync::Arc;
use syntax::SyntaxError;
use type_resolution::TypeResolutionError;
use unauthorized::Unauthorized;
use unknown_eid::UnknownEid;
use validation::ValidationError;

/// Returns early with an ad-hoc error built from a format string.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::from_args(format_args!($($arg)*)))
    };
}

/// Builds an ad-hoc error from a format string.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        $crate::Error::from_args(format_args!($($arg)*))
    };
}

/// An error raised while analyzing, planning or executing a query.
#[derive(Clone)]
pub struct Error {
    inner: Option<Arc<ErrorInner>>,
}

#[derive(Debug)]
struct ErrorInner {
    kind: ErrorKind,
    cause: Option<Error>,
}

impl Error {
    /// Adds context to this error.
    ///
    /// Context is displayed in reverse order: the most recently added context
    /// is shown first, followed by earlier context, ending with the root cause.
    #[inline(always)]
    pub fn context(self, consequent: impl IntoError) -> Error {
        self.context_impl(consequent.into_error())
    }

    #[inline(never)]
    #[cold]
    fn context_impl(self, consequent: Error) -> Error {
        let mut err = consequent;
        if err.inner.is_none() {
            err = Error::from(ErrorKind::Unknown);
        }
        let inner = err.inner.as_mut().unwrap();
        assert!(
            inner.cause.is_none(),
            "consequent error must not already have a cause"
        );
        Arc::get_mut(inner).unwrap().cause = Some(self);
        err
    }

    /// Returns the innermost error of the context chain.
    pub fn root(&self) -> &Error {
        self.chain().last().unwrap()
    }

    fn chain(&self) -> impl Iterator<Item = &Error> {
        let mut err = self;
        core::iter::once(err).chain(core::iter::from_fn(move || {
            err = err.inner.as_ref().and_then(|inner| inner.cause.as_ref())?;
            Some(err)
        }))
    }

    /// Error kinds are matched against the whole chain so that predicates
    /// such as `is_unauthorized` keep working after context is added.
    fn any_kind(&self, f: impl Fn(&ErrorKind) -> bool) -> bool {
        self.chain().any(|err| f(err.kind()))
    }

    fn kind(&self) -> &ErrorKind {
        self.inner
            .as_ref()
            .map(|inner| &inner.kind)
            .unwrap_or(&ErrorKind::Unknown)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.kind() {
            ErrorKind::Backend(err) => Some(err),
            ErrorKind::Anyhow(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let mut it = self.chain().peekable();
        while let Some(err) = it.next() {
            core::fmt::Display::fmt(err.kind(), f)?;
            if it.peek().is_some() {
                f.write_str(": ")?;
            }
        }
        Ok(())
    }
}

impl core::fmt::Debug for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if !f.alternate() {
            core::fmt::Display::fmt(self, f)
        } else {
            let Some(ref inner) = self.inner else {
                return f.debug_struct("Error").field("kind", &"None").finish();
            };
            f.debug_struct("Error")
                .field("kind", &inner.kind)
                .field("cause", &inner.cause)
                .finish()
        }
    }
}

#[derive(Debug)]
enum ErrorKind {
    Anyhow(anyhow::Error),
    Adhoc(AdhocError),
    Backend(BackendError),
    InvalidSchema(InvalidSchema),
    Query(QueryError),
    Syntax(SyntaxError),
    TypeResolution(TypeResolutionError),
    Unauthorized(Unauthorized),
    UnknownEid(UnknownEid),
    Validation(ValidationError),
    Unknown,
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        use self::ErrorKind::*;

        match self {
            Anyhow(err) => core::fmt::Display::fmt(err, f),
            Adhoc(err) => core::fmt::Display::fmt(err, f),
            Backend(err) => core::fmt::Display::fmt(err, f),
            InvalidSchema(err) => core::fmt::Display::fmt(err, f),
            Query(err) => core::fmt::Display::fmt(err, f),
            Syntax(err) => core::fmt::Display::fmt(err, f),
            TypeResolution(err) => core::fmt::Display::fmt(err, f),
            Unauthorized(err) => core::fmt::Display::fmt(err, f),
            UnknownEid(err) => core::fmt::Display::fmt(err, f),
            Validation(err) => core::fmt::Display::fmt(err, f),
            Unknown => f.write_str("unknown rql error"),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {
            inner: Some(Arc::new(ErrorInner { kind, cause: None })),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Error {
        Error::from(ErrorKind::Anyhow(err))
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Error {
        Error::from(anyhow::Error::from(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::from(anyhow::Error::from(err))
    }
}

/// Trait for types that can be converted into an Error.
pub trait IntoError {
    /// Converts this type into an Error.
    fn into_error(self) -> Error;
}

impl IntoError for Error {
    #[inline(always)]
    fn into_error(self) -> Error {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn error_size() {
        // Errors travel through every step result; keep them a single pointer.
        let expected_size = core::mem::size_of::<usize>();
        assert_eq!(expected_size, core::mem::size_of::<Error>());
    }

    #[test]
    fn error_from_args() {
        let err = Error::from_args(format_args!("test error: {}", 42));
        assert_eq!(err.to_string(), "test error: 42");
    }

    #[test]
    fn error_chain_display() {
        let root = Error::from_args(format_args!("root cause"));
        let mid = Error::from_args(format_args!("middle context"));
        let top = Error::from_args(format_args!("top context"));

        let chained = root.context(mid).context(top);
        assert_eq!(
            chained.to_string(),
            "top context: middle context: root cause"
        );
    }

    #[test]
    fn anyhow_bridge() {
        let anyhow_err = anyhow::anyhow!("something failed");
        let our_err: Error = anyhow_err.into();
        assert_eq!(our_err.to_string(), "something failed");
    }

    #[test]
    fn unauthorized_survives_context() {
        let err = Error::unauthorized("read", "Personne").context(err!("planning select"));
        assert!(err.is_unauthorized());
        assert_eq!(
            err.to_string(),
            "planning select: unauthorized: read on Personne"
        );
    }

    #[test]
    fn backend_error_with_statement_context() {
        let io_err = std::io::Error::other("disk full");
        let err = Error::backend(io_err).context(err!("executing `DROP TABLE table1`"));
        assert!(err.is_backend());
        assert_eq!(err.to_string(), "executing `DROP TABLE table1`: disk full");
    }

    #[test]
    fn query_error() {
        let err = Error::query("relation `eid` is read-only");
        assert!(err.is_query());
        assert!(!err.is_validation());
        assert_eq!(err.to_string(), "bad query: relation `eid` is read-only");
    }

    #[test]
    fn syntax_error_position() {
        let err = Error::syntax("unexpected token `WHERE`", 12);
        assert!(err.is_syntax());
        assert_eq!(
            err.to_string(),
            "syntax error at offset 12: unexpected token `WHERE`"
        );
    }

    #[test]
    fn unknown_eid() {
        let err = Error::unknown_eid(1234);
        assert!(err.is_unknown_eid());
        assert_eq!(err.to_string(), "unknown eid 1234");
    }

    #[test]
    fn validation_error() {
        let err = Error::validation("Personne", "nom", "required attribute missing");
        assert!(err.is_validation());
        assert_eq!(
            err.to_string(),
            "validation failed for Personne.nom: required attribute missing"
        );
    }
}
