//! db-catalog library
//!
//! A driver layer for PostgreSQL and MySQL: catalog introspection (schemas,
//! tables, columns, indexes, foreign keys), paginated table reads and raw SQL
//! execution behind one engine-independent [`Driver`] trait. Every call opens
//! and closes its own connection.

pub mod config;
pub mod db;
pub mod drivers;
pub mod error;
pub mod models;

pub use config::{Config, DriverOptions};
pub use drivers::{AnyDriver, Driver, MySqlDriver, PostgresDriver, resolve, resolve_with};
pub use error::{DriverError, DriverResult, ErrorKind};
