pub mod generator;
pub use generator::{Generated, Generator};

pub mod layout;

pub mod serializer;
pub use serializer::{Flavor, Param, Params, Placeholder, Serializer};

pub mod stmt;
pub use stmt::Statement;
