mod engine;
pub use engine::{CacheKey, SolutionOrder};

mod principal;
pub use principal::Principal;

pub mod repository;
pub use repository::{Builder, Repository};

mod result;
pub use result::{Description, ResultSet};

mod session;
pub use session::Session;

pub use rql_core::{
    driver::{self, Source, Support},
    schema::{self, Schema},
    stmt::{self, Args, Eid, Row, Value},
    Error, Result,
};

#[cfg(feature = "sqlite")]
pub use rql_source_sqlite as sqlite;
