//! Request arguments and result shapes for driver operations.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{DriverError, DriverResult};

/// A decoded result row, keyed by column name.
pub type JsonRow = serde_json::Map<String, JsonValue>;

/// Default page size used by the CLI.
pub const DEFAULT_PER_PAGE: i64 = 50;

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListTablesArgs {
    /// Schema (Postgres) or database (MySQL) to list
    pub db_name: String,
    /// One of the `TableInfo` field names. Default: schema_name, table_name
    #[serde(default)]
    pub sort_field: Option<String>,
    #[serde(default)]
    pub sort_desc: bool,
}

impl ListTablesArgs {
    pub fn new(db_name: impl Into<String>) -> Self {
        Self {
            db_name: db_name.into(),
            sort_field: None,
            sort_desc: false,
        }
    }

    pub fn sorted_by(mut self, field: impl Into<String>, desc: bool) -> Self {
        self.sort_field = Some(field.into());
        self.sort_desc = desc;
        self
    }
}

/// Identifies one table.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableRef {
    pub db_name: String,
    pub table_name: String,
}

impl TableRef {
    pub fn new(db_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            db_name: db_name.into(),
            table_name: table_name.into(),
        }
    }

    pub fn validate(&self) -> DriverResult<()> {
        if self.db_name.is_empty() {
            return Err(DriverError::validation("dbName must not be empty"));
        }
        if self.table_name.is_empty() {
            return Err(DriverError::validation("tableName must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableDataArgs {
    pub db_name: String,
    pub table_name: String,
    /// 0-indexed
    pub page: i64,
    pub per_page: i64,
    #[serde(default)]
    pub sort_field: Option<String>,
    #[serde(default)]
    pub sort_desc: bool,
    /// Appended verbatim after `WHERE`. Trusted operators only.
    #[serde(default)]
    pub where_query: Option<String>,
}

impl TableDataArgs {
    pub fn new(db_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            db_name: db_name.into(),
            table_name: table_name.into(),
            page: 0,
            per_page: DEFAULT_PER_PAGE,
            sort_field: None,
            sort_desc: false,
            where_query: None,
        }
    }

    pub fn page(mut self, page: i64, per_page: i64) -> Self {
        self.page = page;
        self.per_page = per_page;
        self
    }

    pub fn sorted_by(mut self, field: impl Into<String>, desc: bool) -> Self {
        self.sort_field = Some(field.into());
        self.sort_desc = desc;
        self
    }

    pub fn filtered(mut self, where_query: impl Into<String>) -> Self {
        self.where_query = Some(where_query.into());
        self
    }

    /// Row offset for the requested page.
    pub fn offset(&self) -> DriverResult<i64> {
        self.validate()?;
        self.per_page
            .checked_mul(self.page)
            .ok_or_else(|| DriverError::validation("page * perPage overflows"))
    }

    /// Reject arguments that cannot form a valid query.
    pub fn validate(&self) -> DriverResult<()> {
        if self.db_name.is_empty() {
            return Err(DriverError::validation("dbName must not be empty"));
        }
        if self.table_name.is_empty() {
            return Err(DriverError::validation("tableName must not be empty"));
        }
        if self.page < 0 {
            return Err(DriverError::validation(format!(
                "page must be >= 0, got {}",
                self.page
            )));
        }
        if self.per_page < 0 {
            return Err(DriverError::validation(format!(
                "perPage must be >= 0, got {}",
                self.per_page
            )));
        }
        if matches!(self.sort_field.as_deref(), Some("")) {
            return Err(DriverError::validation("sortField must not be empty"));
        }
        Ok(())
    }

    /// The WHERE fragment, if it carries anything besides whitespace.
    pub fn where_fragment(&self) -> Option<&str> {
        self.where_query
            .as_deref()
            .map(str::trim)
            .filter(|w| !w.is_empty())
    }
}

/// A page of rows plus the total number of matching rows.
///
/// For table data `count` is the pre-pagination total. For raw queries it is
/// the number of returned rows, or the affected-row count for statements that
/// return no rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PagedResult {
    pub count: u64,
    pub data: Vec<JsonRow>,
}

impl PagedResult {
    pub fn new(count: u64, data: Vec<JsonRow>) -> Self {
        Self { count, data }
    }

    /// Result of a statement that returned rows.
    pub fn from_rows(data: Vec<JsonRow>) -> Self {
        Self {
            count: data.len() as u64,
            data,
        }
    }

    /// Result of a statement that only reported an affected-row count.
    pub fn affected(rows_affected: u64) -> Self {
        Self {
            count: rows_affected,
            data: Vec::new(),
        }
    }
}
