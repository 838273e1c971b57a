//! PostgreSQL driver.
//!
//! Catalog queries read `pg_catalog` and `information_schema`. The "databases"
//! of this driver are the schemas of the connected database.

use sqlx::Row;
use sqlx::postgres::PgRow;
use tracing::{debug, warn};

use crate::config::DriverOptions;
use crate::db::foreign_keys::parse_definition;
use crate::db::options::postgres_options;
use crate::db::{PgConnector, RowToJson, TableDataQuery, executor, scoped};
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
    /// Schemas in catalog (oid) order.
    pub const LIST_SCHEMAS: &str = r#"
        SELECT nspname::text AS nspname
        FROM pg_catalog.pg_namespace
        ORDER BY oid
        "#;

    /// Ordered by the caller; `$1` is the schema.
    pub const LIST_TABLES: &str = r#"
        WITH primary_keys AS (
            SELECT
                i.indrelid AS table_oid,
                string_agg(a.attname::text, ', ' ORDER BY array_position(i.indkey::int2[], a.attnum)) AS columns
            FROM pg_catalog.pg_index i
            JOIN pg_catalog.pg_attribute a
                ON a.attrelid = i.indrelid AND a.attnum = ANY (i.indkey)
            WHERE i.indisprimary
            GROUP BY i.indrelid
        )
        SELECT
            t.schemaname::text AS schema_name,
            t.tablename::text AS table_name,
            COALESCE((SELECT GREATEST(c.reltuples, 0)::bigint FROM pg_catalog.pg_class c WHERE c.oid = r.oid), 0) AS row_count,
            pg_relation_size(r.oid) AS table_size,
            pg_total_relation_size(r.oid) - pg_relation_size(r.oid) AS index_size,
            pg_total_relation_size(r.oid) AS total_size,
            obj_description(r.oid, 'pg_class') AS comments,
            t.tableowner::text AS owner,
            COALESCE(pk.columns, '') AS primary_key,
            COALESCE((
                SELECT string_agg(ix.indexname::text, ', ' ORDER BY ix.indexname)
                FROM pg_catalog.pg_indexes ix
                WHERE ix.schemaname = t.schemaname AND ix.tablename = t.tablename
            ), '') AS indexes
        FROM pg_catalog.pg_tables t
        CROSS JOIN LATERAL (
            SELECT (quote_ident(t.schemaname) || '.' || quote_ident(t.tablename))::regclass AS oid
        ) r
        LEFT JOIN primary_keys pk ON pk.table_oid = r.oid
        WHERE t.schemaname = $1
        "#;

    pub const LIST_COLUMNS: &str = r#"
        SELECT
            c.column_name::text AS column_name,
            c.data_type::text AS data_type,
            c.udt_name::text AS udt_name,
            col_description(cls.oid, a.attnum) AS column_comment
        FROM information_schema.columns c
        JOIN pg_catalog.pg_namespace n ON n.nspname = c.table_schema
        JOIN pg_catalog.pg_class cls ON cls.relnamespace = n.oid AND cls.relname = c.table_name
        LEFT JOIN pg_catalog.pg_attribute a ON a.attrelid = cls.oid AND a.attname = c.column_name
        WHERE c.table_schema = $1 AND c.table_name = $2
        ORDER BY c.ordinal_position
        "#;

    /// Expression members have no attribute and are rendered with pg_get_indexdef.
    pub const LIST_INDEXES: &str = r#"
        SELECT
            ci.relname::text AS relname,
            i.indisprimary AS is_primary,
            i.indisunique AS is_unique,
            (i.indpred IS NOT NULL) AS is_partial,
            ARRAY(
                SELECT COALESCE(a.attname::text, pg_get_indexdef(i.indexrelid, k.ord::int, true))
                FROM unnest(i.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
                LEFT JOIN pg_catalog.pg_attribute a
                    ON a.attrelid = i.indrelid AND a.attnum = k.attnum AND k.attnum > 0
                ORDER BY k.ord
            ) AS columns
        FROM pg_catalog.pg_index i
        JOIN pg_catalog.pg_class ci ON ci.oid = i.indexrelid
        JOIN pg_catalog.pg_class t ON t.oid = i.indrelid
        JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
        WHERE n.nspname = $1 AND t.relname = $2
        ORDER BY ci.relname
        "#;

    pub const LIST_FOREIGN_KEYS: &str = r#"
        SELECT
            con.conname::text AS conname,
            con.condeferrable AS deferrable,
            pg_get_constraintdef(con.oid) AS definition,
            rn.nspname::text AS ref_schema
        FROM pg_catalog.pg_constraint con
        JOIN pg_catalog.pg_class c ON c.oid = con.conrelid
        JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
        JOIN pg_catalog.pg_class rc ON rc.oid = con.confrelid
        JOIN pg_catalog.pg_namespace rn ON rn.oid = rc.relnamespace
        WHERE con.contype = 'f' AND n.nspname = $1 AND c.relname = $2
        ORDER BY con.conname
        "#;
}

/// Driver for PostgreSQL.
#[derive(Debug, Clone, Default)]
pub struct PostgresDriver {
    options: DriverOptions,
}

impl PostgresDriver {
    pub fn new(options: DriverOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    fn connector(&self, credentials: &Credentials) -> DriverResult<PgConnector> {
        Ok(PgConnector::new(postgres_options(credentials)?))
    }

    /// Run one catalog query with text binds on a fresh connection.
    async fn fetch_catalog(
        &self,
        credentials: &Credentials,
        operation: &'static str,
        sql: String,
        binds: Vec<String>,
    ) -> DriverResult<Vec<PgRow>> {
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

impl Driver for PostgresDriver {
    fn engine(&self) -> EngineKind {
        EngineKind::Postgres
    }

    async fn list_databases(&self, credentials: &Credentials) -> DriverResult<Vec<String>> {
        let rows = self
            .fetch_catalog(
                credentials,
                "list_databases",
                queries::LIST_SCHEMAS.to_string(),
                Vec::new(),
            )
            .await?;

        let schemas = rows
            .iter()
            .map(|row| row.try_get::<String, _>("nspname"))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = schemas.len(), "Listed PostgreSQL schemas");
        Ok(schemas)
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

        debug!(schema = %args.db_name, count = tables.len(), "Listed PostgreSQL tables");
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
                    column_name: row.try_get("column_name")?,
                    data_type: row.try_get("data_type")?,
                    udt_name: row.try_get("udt_name")?,
                    column_comment: row.try_get("column_comment")?,
                })
            })
            .collect::<DriverResult<Vec<_>>>()?;

        debug!(table = %table.table_name, count = columns.len(), "Listed PostgreSQL columns");
        Ok(columns)
    }

    async fn get_indexes(
        &self,
        credentials: &Credentials,
        table: &TableRef,
    ) -> DriverResult<Vec<IndexInfo>> {
        table.validate()?;
        let rows = self
            .fetch_catalog(
                credentials,
                "get_indexes",
                queries::LIST_INDEXES.to_string(),
                vec![table.db_name.clone(), table.table_name.clone()],
            )
            .await?;

        let indexes = rows
            .iter()
            .map(|row| -> DriverResult<IndexInfo> {
                let kind = IndexKind::classify(
                    row.try_get("is_primary")?,
                    row.try_get("is_unique")?,
                    row.try_get("is_partial")?,
                );
                Ok(IndexInfo::new(
                    row.try_get::<String, _>("relname")?,
                    kind,
                    row.try_get("columns")?,
                ))
            })
            .collect::<DriverResult<Vec<_>>>()?;

        debug!(table = %table.table_name, count = indexes.len(), "Listed PostgreSQL indexes");
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
                queries::LIST_FOREIGN_KEYS.to_string(),
                vec![table.db_name.clone(), table.table_name.clone()],
            )
            .await?;

        let mut keys = Vec::with_capacity(rows.len());
        for row in &rows {
            let conname: String = row.try_get("conname")?;
            let definition: String = row.try_get("definition")?;
            let parsed = match parse_definition(&definition) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(constraint = %conname, error = %e, "Skipping unparseable foreign key");
                    continue;
                }
            };

            keys.push(ForeignKeyInfo {
                conname,
                deferrable: row.try_get("deferrable")?,
                definition,
                source: parsed.source,
                // Unqualified references resolve through the search_path
                ns: match parsed.schema {
                    Some(schema) => schema,
                    None => row.try_get("ref_schema")?,
                },
                table: parsed.table,
                target: parsed.target,
                on_delete: parsed.on_delete,
                on_update: parsed.on_update,
            });
        }

        debug!(table = %table.table_name, count = keys.len(), "Listed PostgreSQL foreign keys");
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
        } = TableDataQuery::build(EngineKind::Postgres, args)?;
        let connector = self.connector(credentials)?;

        // Count and page run concurrently, each on its own connection.
        let count = scoped(&connector, &self.options, "get_table_data: count", move |conn| {
            Box::pin(async move {
                let row = sqlx::query(&count_sql)
                    .fetch_optional(&mut *conn)
                    .await?
                    .ok_or_else(|| {
                        DriverError::query("COUNT(*) returned no rows", None, "Check whereQuery")
                    })?;
                Ok::<_, DriverError>(non_negative(row.try_get::<i64, _>("count")?))
            })
        });
        let data = scoped(&connector, &self.options, "get_table_data: page", move |conn| {
            Box::pin(async move {
                let rows = sqlx::query(&data_sql)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&mut *conn)
                    .await?;
                Ok::<_, DriverError>(rows.iter().map(RowToJson::to_json_row).collect::<Vec<_>>())
            })
        });
        let (count, data) = tokio::try_join!(count, data)?;

        debug!(
            table = %args.table_name,
            count,
            returned = data.len(),
            "Fetched PostgreSQL table page"
        );
        Ok(PagedResult::new(count, data))
    }

    async fn execute_query(
        &self,
        credentials: &Credentials,
        query: &str,
    ) -> DriverResult<Vec<PagedResult>> {
        let sql = executor::ensure_statement(query)?.to_string();
        let connector = self.connector(credentials)?;
        scoped(&connector, &self.options, "execute_query", move |conn| {
            Box::pin(async move { executor::run_postgres(conn, &sql).await })
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
                EngineKind::Postgres.quote_ident(field.column()),
                if args.sort_desc { "DESC" } else { "ASC" }
            ))
        }
        None => Ok("schema_name, table_name".to_string()),
    }
}

fn table_from_row(row: &PgRow) -> DriverResult<TableInfo> {
    Ok(TableInfo {
        schema_name: row.try_get("schema_name")?,
        table_name: row.try_get("table_name")?,
        row_count: non_negative(row.try_get("row_count")?),
        table_size: non_negative(row.try_get("table_size")?),
        index_size: non_negative(row.try_get("index_size")?),
        total_size: non_negative(row.try_get("total_size")?),
        comments: row.try_get("comments")?,
        owner: row.try_get("owner")?,
        primary_key: row.try_get("primary_key")?,
        indexes: row.try_get("indexes")?,
    })
}

fn non_negative(value: i64) -> u64 {
    value.max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_order() {
        let args = ListTablesArgs::new("public");
        assert_eq!(table_order(&args).unwrap(), "schema_name, table_name");
    }

    #[test]
    fn test_sorted_table_order() {
        let args = ListTablesArgs::new("public").sorted_by("row_count", true);
        assert_eq!(
            table_order(&args).unwrap(),
            "\"row_count\" DESC, schema_name, table_name"
        );
    }

    #[test]
    fn test_unknown_sort_field_rejected() {
        let args = ListTablesArgs::new("public").sorted_by("1; DROP TABLE users", false);
        assert!(matches!(
            table_order(&args),
            Err(DriverError::Validation { .. })
        ));
    }

    #[test]
    fn test_non_negative() {
        assert_eq!(non_negative(-1), 0);
        assert_eq!(non_negative(42), 42);
    }

    #[tokio::test]
    async fn test_validation_happens_before_connecting() {
        // Port 1 on localhost is never a Postgres server; reaching it would
        // produce a connection error instead of a validation error.
        let creds = Credentials::fields("postgres", "127.0.0.1", "1", "u", "p", "db");
        let driver = PostgresDriver::default();

        let err = driver
            .get_table_data(&creds, &TableDataArgs::new("public", "users").page(-1, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Validation { .. }));

        let err = driver.execute_query(&creds, "   ").await.unwrap_err();
        assert!(matches!(err, DriverError::Validation { .. }));

        let err = driver
            .list_tables(&creds, &ListTablesArgs::new("public").sorted_by("bogus", false))
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Validation { .. }));
    }
}
