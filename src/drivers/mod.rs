//! Engine drivers and the driver registry.
//!
//! Every engine implements [`Driver`], the same seven operations with the same
//! result shapes. Callers pick an implementation with [`resolve`] from the
//! credentials' `type` string and get back an [`AnyDriver`], which dispatches
//! to the concrete driver without boxing.

pub mod mysql;
pub mod postgres;

use std::future::Future;

use crate::config::DriverOptions;
use crate::error::DriverResult;
use crate::models::{
    ColumnInfo, Credentials, EngineKind, ForeignKeyInfo, IndexInfo, ListTablesArgs, PagedResult,
    TableDataArgs, TableInfo, TableRef,
};

pub use mysql::MySqlDriver;
pub use postgres::PostgresDriver;

/// Catalog introspection, paginated reads and raw execution for one engine.
///
/// Every call opens its own connection from `credentials` and closes it
/// before returning, whether the call succeeds or fails.
pub trait Driver: Send + Sync {
    fn engine(&self) -> EngineKind;

    /// Schemas (Postgres) or databases (MySQL) visible on the server.
    fn list_databases(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = DriverResult<Vec<String>>> + Send;

    fn list_tables(
        &self,
        credentials: &Credentials,
        args: &ListTablesArgs,
    ) -> impl Future<Output = DriverResult<Vec<TableInfo>>> + Send;

    /// Columns in ordinal order.
    fn get_columns(
        &self,
        credentials: &Credentials,
        table: &TableRef,
    ) -> impl Future<Output = DriverResult<Vec<ColumnInfo>>> + Send;

    fn get_indexes(
        &self,
        credentials: &Credentials,
        table: &TableRef,
    ) -> impl Future<Output = DriverResult<Vec<IndexInfo>>> + Send;

    fn get_foreign_keys(
        &self,
        credentials: &Credentials,
        table: &TableRef,
    ) -> impl Future<Output = DriverResult<Vec<ForeignKeyInfo>>> + Send;

    /// One page of rows plus the total matching count.
    fn get_table_data(
        &self,
        credentials: &Credentials,
        args: &TableDataArgs,
    ) -> impl Future<Output = DriverResult<PagedResult>> + Send;

    /// Run caller-supplied SQL; one result per statement.
    fn execute_query(
        &self,
        credentials: &Credentials,
        query: &str,
    ) -> impl Future<Output = DriverResult<Vec<PagedResult>>> + Send;
}

/// A driver for any supported engine.
#[derive(Debug, Clone)]
pub enum AnyDriver {
    Postgres(PostgresDriver),
    MySql(MySqlDriver),
}

/// Expand one match arm per engine, binding the inner driver to `$d`.
macro_rules! dispatch {
    ($driver:expr, $d:ident => $body:expr) => {
        match $driver {
            AnyDriver::Postgres($d) => $body,
            AnyDriver::MySql($d) => $body,
        }
    };
}

impl Driver for AnyDriver {
    fn engine(&self) -> EngineKind {
        dispatch!(self, d => d.engine())
    }

    async fn list_databases(&self, credentials: &Credentials) -> DriverResult<Vec<String>> {
        dispatch!(self, d => d.list_databases(credentials).await)
    }

    async fn list_tables(
        &self,
        credentials: &Credentials,
        args: &ListTablesArgs,
    ) -> DriverResult<Vec<TableInfo>> {
        dispatch!(self, d => d.list_tables(credentials, args).await)
    }

    async fn get_columns(
        &self,
        credentials: &Credentials,
        table: &TableRef,
    ) -> DriverResult<Vec<ColumnInfo>> {
        dispatch!(self, d => d.get_columns(credentials, table).await)
    }

    async fn get_indexes(
        &self,
        credentials: &Credentials,
        table: &TableRef,
    ) -> DriverResult<Vec<IndexInfo>> {
        dispatch!(self, d => d.get_indexes(credentials, table).await)
    }

    async fn get_foreign_keys(
        &self,
        credentials: &Credentials,
        table: &TableRef,
    ) -> DriverResult<Vec<ForeignKeyInfo>> {
        dispatch!(self, d => d.get_foreign_keys(credentials, table).await)
    }

    async fn get_table_data(
        &self,
        credentials: &Credentials,
        args: &TableDataArgs,
    ) -> DriverResult<PagedResult> {
        dispatch!(self, d => d.get_table_data(credentials, args).await)
    }

    async fn execute_query(
        &self,
        credentials: &Credentials,
        query: &str,
    ) -> DriverResult<Vec<PagedResult>> {
        dispatch!(self, d => d.execute_query(credentials, query).await)
    }
}

/// Look up the driver for a `type` string with default timeouts.
///
/// Unknown engines fail with `UnsupportedEngine` before anything connects.
pub fn resolve(engine: &str) -> DriverResult<AnyDriver> {
    resolve_with(engine, DriverOptions::default())
}

/// Look up the driver for a `type` string.
pub fn resolve_with(engine: &str, options: DriverOptions) -> DriverResult<AnyDriver> {
    let driver = match engine.parse::<EngineKind>()? {
        EngineKind::Postgres => AnyDriver::Postgres(PostgresDriver::new(options)),
        EngineKind::MySql => AnyDriver::MySql(MySqlDriver::new(options)),
    };
    tracing::debug!(engine = %driver.engine(), "Resolved driver");
    Ok(driver)
}

/// Look up the driver matching `credentials`.
pub fn for_credentials(credentials: &Credentials, options: DriverOptions) -> DriverResult<AnyDriver> {
    resolve_with(credentials.engine(), options)
}
