//! MySQL driver (MariaDB included).
//!
//! Catalog data comes from `information_schema`. String columns are wrapped
//! in `CONVERT(... USING utf8mb4)` because some server versions report
//! information_schema text as VARBINARY; the row helpers below still accept
//! either form.

use sqlx::Row;
use sqlx::mysql::MySqlRow;
use tracing::debug;

use crate::config::DriverOptions;
use crate::db::foreign_keys::{ForeignKeyColumn, accumulate};
use crate::db::options::mysql_options;
use crate::db::{MySqlConnector, RowToJson, TableDataQuery, executor, scoped};
use crate::drivers::Driver;
use crate::error::{DriverError, DriverResult};
use crate::models::{
    ColumnInfo, Credentials, EngineKind, ForeignKeyInfo, IndexInfo, IndexKind, ListTablesArgs,
    PagedResult, TableDataArgs, TableInfo, TableRef, TableSortField,
};

// =============================================================================
// SQL Query Templates
// =============================================================================

mod queries {
    pub const LIST_DATABASES: &str = "SHOW DATABASES";

    /// Ordered by the caller; `?` is the database.
    pub const LIST_TABLES: &str = r#"
        SELECT
            CONVERT(t.TABLE_SCHEMA USING utf8mb4) AS schema_name,
            CONVERT(t.TABLE_NAME USING utf8mb4) AS table_name,
            CAST(COALESCE(t.TABLE_ROWS, 0) AS UNSIGNED) AS row_count,
            CAST(COALESCE(t.DATA_LENGTH, 0) AS UNSIGNED) AS table_size,
            CAST(COALESCE(t.INDEX_LENGTH, 0) AS UNSIGNED) AS index_size,
            CAST(COALESCE(t.DATA_LENGTH, 0) + COALESCE(t.INDEX_LENGTH, 0) AS UNSIGNED) AS total_size,
            CONVERT(NULLIF(t.TABLE_COMMENT, '') USING utf8mb4) AS comments,
            NULL AS owner,
            CONVERT(COALESCE((
                SELECT GROUP_CONCAT(k.COLUMN_NAME ORDER BY k.ORDINAL_POSITION SEPARATOR ', ')
                FROM information_schema.KEY_COLUMN_USAGE k
                WHERE k.TABLE_SCHEMA = t.TABLE_SCHEMA
                    AND k.TABLE_NAME = t.TABLE_NAME
                    AND k.CONSTRAINT_NAME = 'PRIMARY'
            ), '') USING utf8mb4) AS primary_key,
            CONVERT(COALESCE((
                SELECT GROUP_CONCAT(DISTINCT s.INDEX_NAME ORDER BY s.INDEX_NAME SEPARATOR ', ')
                FROM information_schema.STATISTICS s
                WHERE s.TABLE_SCHEMA = t.TABLE_SCHEMA AND s.TABLE_NAME = t.TABLE_NAME
            ), '') USING utf8mb4) AS indexes
        FROM information_schema.TABLES t
        WHERE t.TABLE_SCHEMA = ? AND t.TABLE_TYPE = 'BASE TABLE'
        "#;

    pub const LIST_COLUMNS: &str = r#"
        SELECT
            CONVERT(COLUMN_NAME USING utf8mb4) AS column_name,
            CONVERT(DATA_TYPE USING utf8mb4) AS data_type,
            CONVERT(COLUMN_TYPE USING utf8mb4) AS udt_name,
            CONVERT(NULLIF(COLUMN_COMMENT, '') USING utf8mb4) AS column_comment
        FROM information_schema.COLUMNS
        WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
        ORDER BY ORDINAL_POSITION
        "#;

    /// One row per index member, grouped in Rust. Functional key parts
    /// (MySQL 8.0.13+) have no COLUMN_NAME and report their EXPRESSION.
    pub const LIST_INDEX_COLUMNS: &str = r#"
        SELECT
            CONVERT(INDEX_NAME USING utf8mb4) AS index_name,
            NON_UNIQUE AS non_unique,
            CONVERT(COALESCE(COLUMN_NAME, EXPRESSION, '') USING utf8mb4) AS column_name
        FROM information_schema.STATISTICS
        WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
        ORDER BY INDEX_NAME = 'PRIMARY' DESC, INDEX_NAME, SEQ_IN_INDEX
        "#;

    /// Servers without STATISTICS.EXPRESSION (MySQL < 8.0.13, MariaDB).
    pub const LIST_INDEX_COLUMNS_LEGACY: &str = r#"
        SELECT
            CONVERT(INDEX_NAME USING utf8mb4) AS index_name,
            NON_UNIQUE AS non_unique,
            CONVERT(COALESCE(COLUMN_NAME, '') USING utf8mb4) AS column_name
        FROM information_schema.STATISTICS
        WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
        ORDER BY INDEX_NAME = 'PRIMARY' DESC, INDEX_NAME, SEQ_IN_INDEX
        "#;

    /// One row per constraint column, grouped in Rust.
    pub const LIST_FOREIGN_KEY_COLUMNS: &str = r#"
        SELECT
            CONVERT(rc.CONSTRAINT_NAME USING utf8mb4) AS conname,
            CONVERT(rc.DELETE_RULE USING utf8mb4) AS on_delete,
            CONVERT(rc.UPDATE_RULE USING utf8mb4) AS on_update,
            CONVERT(kcu.COLUMN_NAME USING utf8mb4) AS source,
            CONVERT(kcu.REFERENCED_TABLE_SCHEMA USING utf8mb4) AS ref_schema,
            CONVERT(kcu.REFERENCED_TABLE_NAME USING utf8mb4) AS ref_table,
            CONVERT(kcu.REFERENCED_COLUMN_NAME USING utf8mb4) AS target
        FROM information_schema.REFERENTIAL_CONSTRAINTS rc
        JOIN information_schema.KEY_COLUMN_USAGE kcu
            ON kcu.CONSTRAINT_SCHEMA = rc.CONSTRAINT_SCHEMA
            AND kcu.CONSTRAINT_NAME = rc.CONSTRAINT_NAME
            AND kcu.TABLE_NAME = rc.TABLE_NAME
        WHERE kcu.TABLE_SCHEMA = ? AND kcu.TABLE_NAME = ?
        ORDER BY rc.CONSTRAINT_NAME, kcu.ORDINAL_POSITION
        "#;
}

// =============================================================================
// Row Helpers
// =============================================================================

/// Read an unsigned count, whether the server reports it signed or unsigned.
fn try_get_u64(row: &MySqlRow, column: &str) -> DriverResult<u64> {
    if let Ok(Some(v)) = row.try_get::<Option<u64>, _>(column) {
        return Ok(v);
    }
    match row.try_get::<Option<i64>, _>(column)? {
        Some(v) => Ok(v.max(0) as u64),
        None => Ok(0),
    }
}

/// Read a flag column that may be INT or BIGINT depending on the server version.
fn try_get_flag(row: &MySqlRow, column: &str) -> DriverResult<bool> {
    if let Ok(v) = row.try_get::<i64, _>(column) {
        return Ok(v != 0);
    }
    Ok(row.try_get::<i32, _>(column)? != 0)
}

/// Read a string, falling back to raw bytes for VARBINARY.
fn get_string(row: &MySqlRow, column: &str) -> DriverResult<String> {
    Ok(get_optional_string(row, column)?.unwrap_or_default())
}

fn get_optional_string(row: &MySqlRow, column: &str) -> DriverResult<Option<String>> {
    match row.try_get::<Option<String>, _>(column) {
        Ok(v) => Ok(v),
        Err(e) => match row.try_get::<Option<Vec<u8>>, _>(column) {
            Ok(bytes) => Ok(bytes.map(|b| String::from_utf8_lossy(&b).into_owned())),
            Err(_) => Err(e.into()),
        },
    }
}

fn get_string_by_index(row: &MySqlRow, index: usize) -> DriverResult<String> {
    match row.try_get::<String, _>(index) {
        Ok(v) => Ok(v),
        Err(e) => match row.try_get::<Vec<u8>, _>(index) {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(_) => Err(e.into()),
        },
    }
}

/// Driver for MySQL and MariaDB.
#[derive(Debug, Clone, Default)]
pub struct MySqlDriver {
    options: DriverOptions,
}

impl MySqlDriver {
    pub fn new(options: DriverOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    fn connector(&self, credentials: &Credentials) -> DriverResult<MySqlConnector> {
        Ok(MySqlConnector::new(mysql_options(credentials)?))
    }

    /// Run one catalog query with text binds on a fresh connection.
    async fn fetch_catalog(
        &self,
        credentials: &Credentials,
        operation: &'static str,
        sql: String,
        binds: Vec<String>,
    ) -> DriverResult<Vec<MySqlRow>> {
        let connector = self.connector(credentials)?;
        scoped(&connector, &self.options, operation, move |conn| {
            Box::pin(async move {
                let mut query = sqlx::query(&sql);
                for value in &binds {
                    query = query.bind(value.as_str());
                }
                Ok::<_, DriverError>(query.fetch_all(&mut *conn).await?)
            })
        })
        .await
    }
}

impl Driver for MySqlDriver {
    fn engine(&self) -> EngineKind {
        EngineKind::MySql
    }

    async fn list_databases(&self, credentials: &Credentials) -> DriverResult<Vec<String>> {
        let rows = self
            .fetch_catalog(
                credentials,
                "list_databases",
                queries::LIST_DATABASES.to_string(),
                Vec::new(),
            )
            .await?;

        // SHOW DATABASES returns a single column "Database"
        let databases = rows
            .iter()
            .map(|row| get_string_by_index(row, 0))
            .collect::<DriverResult<Vec<_>>>()?;

        debug!(count = databases.len(), "Listed MySQL databases");
        Ok(databases)
    }

    async fn list_tables(
        &self,
        credentials: &Credentials,
        args: &ListTablesArgs,
    ) -> DriverResult<Vec<TableInfo>> {
        if args.db_name.is_empty() {
            return Err(DriverError::validation("dbName must not be empty"));
        }
        let sql = format!(
            "{} ORDER BY {}",
            queries::LIST_TABLES,
            table_order(args)?
        );

        let rows = self
            .fetch_catalog(credentials, "list_tables", sql, vec![args.db_name.clone()])
            .await?;
        let tables = rows
            .iter()
            .map(table_from_row)
            .collect::<DriverResult<Vec<_>>>()?;

        debug!(database = %args.db_name, count = tables.len(), "Listed MySQL tables");
        Ok(tables)
    }

    async fn get_columns(
        &self,
        credentials: &Credentials,
        table: &TableRef,
    ) -> DriverResult<Vec<ColumnInfo>> {
        table.validate()?;
        let rows = self
            .fetch_catalog(
                credentials,
                "get_columns",
                queries::LIST_COLUMNS.to_string(),
                vec![table.db_name.clone(), table.table_name.clone()],
            )
            .await?;

        let columns = rows
            .iter()
            .map(|row| -> DriverResult<ColumnInfo> {
                Ok(ColumnInfo {
                    column_name: get_string(row, "column_name")?,
                    data_type: get_string(row, "data_type")?,
                    udt_name: get_string(row, "udt_name")?,
                    column_comment: get_optional_string(row, "column_comment")?,
                })
            })
            .collect::<DriverResult<Vec<_>>>()?;

        debug!(table = %table.table_name, count = columns.len(), "Listed MySQL columns");
        Ok(columns)
    }

    async fn get_indexes(
        &self,
        credentials: &Credentials,
        table: &TableRef,
    ) -> DriverResult<Vec<IndexInfo>> {
        table.validate()?;
        let binds = vec![table.db_name.clone(), table.table_name.clone()];
        let rows = match self
            .fetch_catalog(
                credentials,
                "get_indexes",
                queries::LIST_INDEX_COLUMNS.to_string(),
                binds.clone(),
            )
            .await
        {
            Err(e) if is_unknown_column(&e) => {
                debug!(error = %e, "STATISTICS.EXPRESSION unavailable, retrying without it");
                self.fetch_catalog(
                    credentials,
                    "get_indexes",
                    queries::LIST_INDEX_COLUMNS_LEGACY.to_string(),
                    binds,
                )
                .await?
            }
            result => result?,
        };

        let mut indexes: Vec<IndexInfo> = Vec::new();
        for row in &rows {
            let name = get_string(row, "index_name")?;
            let column = get_string(row, "column_name")?;
            match indexes.last_mut() {
                Some(index) if index.relname == name => index.columns.push(column),
                _ => {
                    let kind = IndexKind::classify_mysql(&name, try_get_flag(row, "non_unique")?);
                    indexes.push(IndexInfo::new(name, kind, vec![column]));
                }
            }
        }

        debug!(table = %table.table_name, count = indexes.len(), "Listed MySQL indexes");
        Ok(indexes)
    }

    async fn get_foreign_keys(
        &self,
        credentials: &Credentials,
        table: &TableRef,
    ) -> DriverResult<Vec<ForeignKeyInfo>> {
        table.validate()?;
        let rows = self
            .fetch_catalog(
                credentials,
                "get_foreign_keys",
                queries::LIST_FOREIGN_KEY_COLUMNS.to_string(),
                vec![table.db_name.clone(), table.table_name.clone()],
            )
            .await?;

        let columns = rows
            .iter()
            .map(|row| -> DriverResult<ForeignKeyColumn> {
                Ok(ForeignKeyColumn {
                    conname: get_string(row, "conname")?,
                    source: get_string(row, "source")?,
                    ref_schema: get_string(row, "ref_schema")?,
                    ref_table: get_string(row, "ref_table")?,
                    target: get_string(row, "target")?,
                    on_delete: get_string(row, "on_delete")?.parse()?,
                    on_update: get_string(row, "on_update")?.parse()?,
                })
            })
            .collect::<DriverResult<Vec<_>>>()?;
        let keys = accumulate(columns);

        debug!(table = %table.table_name, count = keys.len(), "Listed MySQL foreign keys");
        Ok(keys)
    }

    async fn get_table_data(
        &self,
        credentials: &Credentials,
        args: &TableDataArgs,
    ) -> DriverResult<PagedResult> {
        let TableDataQuery {
            count_sql,
            data_sql,
            limit,
            offset,
        } = TableDataQuery::build(EngineKind::MySql, args)?;
        let connector = self.connector(credentials)?;

        let page = scoped(&connector, &self.options, "get_table_data", move |conn| {
            Box::pin(async move {
                let count_row = sqlx::query(&count_sql)
                    .fetch_optional(&mut *conn)
                    .await?
                    .ok_or_else(|| {
                        DriverError::query("COUNT(*) returned no rows", None, "Check whereQuery")
                    })?;
                let count = try_get_u64(&count_row, "count")?;

                let rows = sqlx::query(&data_sql)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&mut *conn)
                    .await?;
                let data = rows.iter().map(RowToJson::to_json_row).collect();
                Ok::<_, DriverError>(PagedResult::new(count, data))
            })
        })
        .await?;

        debug!(
            table = %args.table_name,
            count = page.count,
            returned = page.data.len(),
            "Fetched MySQL table page"
        );
        Ok(page)
    }

    async fn execute_query(
        &self,
        credentials: &Credentials,
        query: &str,
    ) -> DriverResult<Vec<PagedResult>> {
        let sql = executor::ensure_statement(query)?.to_string();
        let connector = self.connector(credentials)?;
        scoped(&connector, &self.options, "execute_query", move |conn| {
            Box::pin(async move { executor::run_mysql(conn, &sql).await })
        })
        .await
    }
}

/// ORDER BY clause for a table listing; ties broken by schema then table.
fn table_order(args: &ListTablesArgs) -> DriverResult<String> {
    match args.sort_field.as_deref() {
        Some(field) => {
            let field: TableSortField = field.parse()?;
            Ok(format!(
                "{} {}, schema_name, table_name",
                EngineKind::MySql.quote_ident(field.column()),
                if args.sort_desc { "DESC" } else { "ASC" }
            ))
        }
        None => Ok("schema_name, table_name".to_string()),
    }
}

fn table_from_row(row: &MySqlRow) -> DriverResult<TableInfo> {
    Ok(TableInfo {
        schema_name: get_string(row, "schema_name")?,
        table_name: get_string(row, "table_name")?,
        row_count: try_get_u64(row, "row_count")?,
        table_size: try_get_u64(row, "table_size")?,
        index_size: try_get_u64(row, "index_size")?,
        total_size: try_get_u64(row, "total_size")?,
        comments: get_optional_string(row, "comments")?,
        owner: None,
        primary_key: get_string(row, "primary_key")?,
        indexes: get_string(row, "indexes")?,
    })
}

/// ER_BAD_FIELD_ERROR, raised by servers predating a catalog column.
fn is_unknown_column(err: &DriverError) -> bool {
    matches!(err, DriverError::Query { sql_state: Some(state), .. } if state == "42S22")
}
