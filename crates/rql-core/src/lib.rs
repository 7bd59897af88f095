pub mod analyze;

pub mod driver;
pub use driver::Source;

mod error;
pub use error::{Error, IntoError};

pub mod parse;

pub mod schema;
pub use schema::Schema;

pub mod stmt;

/// A Result type alias that uses the engine's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

pub use async_trait::async_trait;
