//! SQL for paginated table reads.
//!
//! Identifiers are quoted for the target engine and the page window is bound
//! as parameters. The optional `whereQuery` fragment is the one piece of
//! caller text spliced in verbatim.

use crate::error::DriverResult;
use crate::models::{EngineKind, TableDataArgs};

/// The two statements behind one page of table data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDataQuery {
    /// Total matching rows, aliased `count`
    pub count_sql: String,
    /// One page; binds `limit` then `offset`
    pub data_sql: String,
    pub limit: i64,
    pub offset: i64,
}

impl TableDataQuery {
    /// Validate `args` and build both statements.
    pub fn build(engine: EngineKind, args: &TableDataArgs) -> DriverResult<Self> {
        let offset = args.offset()?;
        let table = engine.qualified(&args.db_name, &args.table_name);

        // The fragment ends the line so a trailing `--` comment cannot swallow
        // the ORDER BY or LIMIT that follow.
        let filter = match args.where_fragment() {
            Some(fragment) => format!(" WHERE {}\n", fragment),
            None => String::new(),
        };

        let order = match args.sort_field.as_deref() {
            Some(field) => format!(
                " ORDER BY {} {}",
                engine.quote_ident(field),
                if args.sort_desc { "DESC" } else { "ASC" }
            ),
            None => String::new(),
        };

        let window = match engine {
            EngineKind::Postgres => " LIMIT $1 OFFSET $2",
            EngineKind::MySql => " LIMIT ? OFFSET ?",
        };

        Ok(Self {
            count_sql: format!("SELECT COUNT(*) AS count FROM {}{}", table, filter),
            data_sql: format!("SELECT * FROM {}{}{}{}", table, filter, order, window),
            limit: args.per_page,
            offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_postgres_plain_page() {
        let args = TableDataArgs::new("public", "users").page(2, 10);
        let q = TableDataQuery::build(EngineKind::Postgres, &args).unwrap();

        assert_eq!(q.count_sql, "SELECT COUNT(*) AS count FROM \"public\".\"users\"");
        assert_eq!(
            q.data_sql,
            "SELECT * FROM \"public\".\"users\" LIMIT $1 OFFSET $2"
        );
        assert_eq!(q.limit, 10);
        assert_eq!(q.offset, 20);
    }

    #[test]
    fn test_mysql_sorted_and_filtered() {
        let args = TableDataArgs::new("shop", "orders")
            .page(0, 25)
            .sorted_by("created_at", true)
            .filtered("total > 100");
        let q = TableDataQuery::build(EngineKind::MySql, &args).unwrap();

        assert_eq!(
            q.count_sql,
            "SELECT COUNT(*) AS count FROM `shop`.`orders` WHERE total > 100\n"
        );
        assert_eq!(
            q.data_sql,
            "SELECT * FROM `shop`.`orders` WHERE total > 100\n ORDER BY `created_at` DESC LIMIT ? OFFSET ?"
        );
    }

    #[test]
    fn test_blank_where_adds_no_clause() {
        let args = TableDataArgs::new("public", "users").filtered("   ");
        let q = TableDataQuery::build(EngineKind::Postgres, &args).unwrap();
        assert!(!q.count_sql.contains("WHERE"));
        assert!(!q.data_sql.contains("WHERE"));
    }

    #[test]
    fn test_sort_field_is_quoted() {
        let args = TableDataArgs::new("public", "users").sorted_by("name\"; DROP TABLE users; --", false);
        let q = TableDataQuery::build(EngineKind::Postgres, &args).unwrap();
        assert!(
            q.data_sql
                .contains("ORDER BY \"name\"\"; DROP TABLE users; --\" ASC")
        );
    }

    #[test]
    fn test_invalid_page_rejected_before_building() {
        let args = TableDataArgs::new("public", "users").page(-1, 10);
        let err = TableDataQuery::build(EngineKind::Postgres, &args).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
