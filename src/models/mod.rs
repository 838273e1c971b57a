//! Data models for the driver layer.
//!
//! This module re-exports all model types used throughout the crate.

pub mod credentials;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use credentials::{
    ConnectionStringCredentials, Credentials, EngineKind, FieldCredentials,
    mask_connection_string,
};
pub use query::{
    DEFAULT_PER_PAGE, JsonRow, ListTablesArgs, PagedResult, TableDataArgs, TableRef,
};
pub use schema::{
    ColumnInfo, ForeignKeyInfo, IndexInfo, IndexKind, ReferentialAction, TableInfo,
    TableSortField,
};
