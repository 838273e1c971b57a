//! Database plumbing shared by the engine drivers.
//!
//! - `connection`: per-call connection lifecycle
//! - `options`: credential resolution into sqlx connect options
//! - `types`: row decoding into JSON
//! - `paging`: SQL for paginated table reads
//! - `foreign_keys`: foreign key definition parsing and accumulation
//! - `executor`: raw multi-statement execution

pub mod connection;
pub mod executor;
pub mod foreign_keys;
pub mod options;
pub mod paging;
pub mod types;

pub use connection::{Connector, MySqlConnector, PgConnector, scoped};
pub use executor::StatementCollector;
pub use paging::TableDataQuery;
pub use types::RowToJson;
