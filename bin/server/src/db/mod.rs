//! PostgreSQL-backed implementations of the engine's collaborator contracts.

pub mod channel;
pub mod execution;
pub mod flow;
pub mod message;

pub use channel::PgChannelDirectory;
pub use execution::PgExecutionStore;
pub use flow::PgGraphStore;
pub use message::PgMessageRecorder;

use copper_sparrow_flow::StoreError;
use std::str::FromStr;

/// Maps a sqlx failure to the engine's store error.
pub(crate) fn backend_error(error: sqlx::Error) -> StoreError {
    StoreError::Backend {
        message: error.to_string(),
    }
}

/// Decodes a typed id column, surfacing corrupt rows as backend failures.
pub(crate) fn decode_id<T: FromStr>(what: &'static str, raw: &str) -> Result<T, StoreError>
where
    T::Err: std::fmt::Display,
{
    T::from_str(raw).map_err(|error| StoreError::Backend {
        message: format!("invalid {what} id '{raw}': {error}"),
    })
}
