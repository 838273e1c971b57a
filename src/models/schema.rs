//! Schema-related data models.
//!
//! This module defines the catalog shapes returned by every driver. Field
//! names are the wire names; both engines fill the same structures.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::DriverError;

/// One row per table.
///
/// `row_count` and the sizes are catalog estimates (`pg_class.reltuples`,
/// `information_schema.TABLES.TABLE_ROWS`), not exact counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TableInfo {
    pub schema_name: String,
    pub table_name: String,
    pub row_count: u64,
    /// Bytes (heap only)
    pub table_size: u64,
    /// Bytes
    pub index_size: u64,
    /// Bytes (heap + indexes + toast)
    pub total_size: u64,
    pub comments: Option<String>,
    /// Always `None` for MySQL, which does not record table owners
    pub owner: Option<String>,
    /// Comma-joined key columns, empty when the table has no primary key
    pub primary_key: String,
    /// Comma-joined index names, empty when the table has no indexes
    pub indexes: String,
}

/// Columns a table listing may be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableSortField {
    SchemaName,
    TableName,
    RowCount,
    TableSize,
    IndexSize,
    TotalSize,
    Comments,
    Owner,
    PrimaryKey,
    Indexes,
}

impl TableSortField {
    /// Output column name, as aliased in both engines' table queries.
    pub fn column(&self) -> &'static str {
        match self {
            Self::SchemaName => "schema_name",
            Self::TableName => "table_name",
            Self::RowCount => "row_count",
            Self::TableSize => "table_size",
            Self::IndexSize => "index_size",
            Self::TotalSize => "total_size",
            Self::Comments => "comments",
            Self::Owner => "owner",
            Self::PrimaryKey => "primary_key",
            Self::Indexes => "indexes",
        }
    }
}

impl FromStr for TableSortField {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "schema_name" => Ok(Self::SchemaName),
            "table_name" => Ok(Self::TableName),
            "row_count" => Ok(Self::RowCount),
            "table_size" => Ok(Self::TableSize),
            "index_size" => Ok(Self::IndexSize),
            "total_size" => Ok(Self::TotalSize),
            "comments" => Ok(Self::Comments),
            "owner" => Ok(Self::Owner),
            "primary_key" => Ok(Self::PrimaryKey),
            "indexes" => Ok(Self::Indexes),
            other => Err(DriverError::validation(format!(
                "Cannot sort tables by '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnInfo {
    pub column_name: String,
    pub data_type: String,
    /// Engine-reported underlying type (Postgres `udt_name`, MySQL `COLUMN_TYPE`)
    pub udt_name: String,
    pub column_comment: Option<String>,
}

/// Index classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum IndexKind {
    Primary,
    Unique,
    Index,
}

impl IndexKind {
    /// Classify a Postgres index.
    ///
    /// Partial indexes are reported as plain `INDEX` even when unique.
    pub fn classify(is_primary: bool, is_unique: bool, is_partial: bool) -> Self {
        if is_partial {
            Self::Index
        } else if is_primary {
            Self::Primary
        } else if is_unique {
            Self::Unique
        } else {
            Self::Index
        }
    }

    /// Classify a MySQL index from `STATISTICS.NON_UNIQUE` and its name.
    pub fn classify_mysql(index_name: &str, non_unique: bool) -> Self {
        if non_unique {
            Self::Index
        } else if index_name == "PRIMARY" {
            Self::Primary
        } else {
            Self::Unique
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IndexInfo {
    pub relname: String,
    pub key: String,
    #[serde(rename = "type")]
    pub kind: IndexKind,
    /// Member columns in key order; expression members appear as their expression text
    pub columns: Vec<String>,
}

impl IndexInfo {
    /// Create a new index entry; `key` mirrors the index name.
    pub fn new(name: impl Into<String>, kind: IndexKind, columns: Vec<String>) -> Self {
        let name = name.into();
        Self {
            key: name.clone(),
            relname: name,
            kind,
            columns,
        }
    }
}

/// Foreign key referential action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum ReferentialAction {
    #[default]
    #[serde(rename = "NO ACTION")]
    NoAction,
    #[serde(rename = "RESTRICT")]
    Restrict,
    #[serde(rename = "CASCADE")]
    Cascade,
    #[serde(rename = "SET NULL")]
    SetNull,
    #[serde(rename = "SET DEFAULT")]
    SetDefault,
}

impl ReferentialAction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

impl FromStr for ReferentialAction {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NO ACTION" => Ok(Self::NoAction),
            "RESTRICT" => Ok(Self::Restrict),
            "CASCADE" => Ok(Self::Cascade),
            "SET NULL" => Ok(Self::SetNull),
            "SET DEFAULT" => Ok(Self::SetDefault),
            _ => Err(DriverError::parse("referential action", s)),
        }
    }
}

impl std::fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// One foreign key constraint; composite keys list several columns.
///
/// `source` and `target` always have the same length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ForeignKeyInfo {
    pub conname: String,
    pub deferrable: bool,
    pub definition: String,
    pub source: Vec<String>,
    /// Schema of the referenced table
    pub ns: String,
    pub table: String,
    pub target: Vec<String>,
    pub on_delete: ReferentialAction,
    pub on_update: ReferentialAction,
}
