//! Raw SQL execution.
//!
//! Caller-supplied SQL is sent as-is over the engine's text protocol, so one
//! call may carry several statements. Every statement yields one
//! [`PagedResult`]: its rows when it produced any, its affected-row count
//! otherwise. Statements are not wrapped in a transaction and never retried.

use futures_util::TryStreamExt;
use sqlx::mysql::MySqlConnection;
use sqlx::postgres::PgConnection;
use sqlx::{Either, Executor};
use tracing::debug;

use crate::db::types::RowToJson;
use crate::error::{DriverError, DriverResult};
use crate::models::{JsonRow, PagedResult};

/// Reject SQL that contains nothing to execute. Accepted SQL is returned
/// exactly as given.
pub fn ensure_statement(sql: &str) -> DriverResult<&str> {
    if sql.trim().is_empty() {
        return Err(DriverError::validation("query must not be empty"));
    }
    Ok(sql)
}

/// Groups a stream of rows and statement completions into one result per
/// statement.
#[derive(Debug, Default)]
pub struct StatementCollector {
    results: Vec<PagedResult>,
    pending: Vec<JsonRow>,
}

impl StatementCollector {
    pub fn push_row(&mut self, row: JsonRow) {
        self.pending.push(row);
    }

    /// Close the current statement.
    pub fn finish_statement(&mut self, rows_affected: u64) {
        let result = if self.pending.is_empty() {
            PagedResult::affected(rows_affected)
        } else {
            PagedResult::from_rows(std::mem::take(&mut self.pending))
        };
        self.results.push(result);
    }

    pub fn finish(mut self) -> Vec<PagedResult> {
        // Rows without a trailing completion still belong to a statement
        if !self.pending.is_empty() {
            self.results
                .push(PagedResult::from_rows(std::mem::take(&mut self.pending)));
        }
        self.results
    }
}

pub async fn run_postgres(conn: &mut PgConnection, sql: &str) -> DriverResult<Vec<PagedResult>> {
    let mut collector = StatementCollector::default();
    let mut stream = conn.fetch_many(sql);
    while let Some(step) = stream.try_next().await? {
        match step {
            Either::Left(done) => collector.finish_statement(done.rows_affected()),
            Either::Right(row) => collector.push_row(row.to_json_row()),
        }
    }
    let results = collector.finish();
    debug!(statements = results.len(), "PostgreSQL script executed");
    Ok(results)
}

pub async fn run_mysql(conn: &mut MySqlConnection, sql: &str) -> DriverResult<Vec<PagedResult>> {
    let mut collector = StatementCollector::default();
    let mut stream = conn.fetch_many(sql);
    while let Some(step) = stream.try_next().await? {
        match step {
            Either::Left(done) => collector.finish_statement(done.rows_affected()),
            Either::Right(row) => collector.push_row(row.to_json_row()),
        }
    }
    let results = collector.finish();
    debug!(statements = results.len(), "MySQL script executed");
    Ok(results)
}
