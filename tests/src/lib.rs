#[macro_use]
mod macros;

mod exec_log;
pub use exec_log::ExecLog;

mod logging_source;
pub use logging_source::{LoggingSource, SourceOp};

pub mod prelude;

mod setup;
pub use setup::{exec, insert, schema, RqlTest, EXTERN};

use rql::{Args, Value};

pub use std_util::*;

/// Installs a test subscriber honoring `RUST_LOG`. Later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Builds statement arguments from `(name, value)` pairs.
pub fn args<const N: usize>(pairs: [(&str, Value); N]) -> Args {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}
