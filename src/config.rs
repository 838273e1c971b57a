//! Configuration handling.
//!
//! [`DriverOptions`] carries the per-call timeouts every driver honors.
//! [`Config`] is the command-line surface of the `db-catalog` binary, parsed
//! from CLI arguments and environment variables.

use clap::{Parser, Subcommand};
use std::time::Duration;

use crate::error::{DriverError, DriverResult};
use crate::models::{Credentials, DEFAULT_PER_PAGE};

pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Timeouts applied to every driver call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverOptions {
    /// Connection establishment (handshake + auth)
    pub connect_timeout: Duration,
    /// Whole operation once connected
    pub query_timeout: Duration,
}

impl DriverOptions {
    pub fn new(connect_timeout_secs: u64, query_timeout_secs: u64) -> Self {
        Self {
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            query_timeout: Duration::from_secs(query_timeout_secs),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_QUERY_TIMEOUT_SECS)
    }
}

/// Configuration for the db-catalog CLI.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "db-catalog",
    about = "Inspect PostgreSQL and MySQL catalogs, page through tables and run SQL",
    version,
    author
)]
pub struct Config {
    /// Database engine: "postgres" or "mysql"
    #[arg(short = 't', long = "type", env = "DBC_TYPE", default_value = "postgres")]
    pub engine: String,

    /// Engine-native connection string. Takes precedence over the discrete fields.
    #[arg(long, env = "DBC_URL", hide_env_values = true)]
    pub connection_string: Option<String>,

    /// Database server host
    #[arg(long, env = "DBC_HOST", default_value = "localhost")]
    pub host: String,

    /// Database server port (defaults to the engine's standard port)
    #[arg(long, env = "DBC_PORT")]
    pub port: Option<String>,

    /// User name
    #[arg(short, long, env = "DBC_USER", default_value = "")]
    pub username: String,

    /// Password
    #[arg(long, env = "DBC_PASSWORD", hide_env_values = true, default_value = "")]
    pub password: String,

    /// Database to connect to
    #[arg(short, long, env = "DBC_DATABASE", default_value = "")]
    pub database: String,

    /// "true", "false" or a Postgres sslmode such as "prefer"
    #[arg(long, env = "DBC_SSL", default_value = "false")]
    pub ssl: String,

    /// Query timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_QUERY_TIMEOUT_SECS,
        env = "DBC_QUERY_TIMEOUT"
    )]
    pub query_timeout: u64,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "DBC_CONNECT_TIMEOUT"
    )]
    pub connect_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "DBC_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "DBC_JSON_LOGS")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// One subcommand per driver operation.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List schemas (Postgres) or databases (MySQL)
    Databases,
    /// List tables with size and key summaries
    Tables {
        db_name: String,
        #[arg(long)]
        sort_field: Option<String>,
        #[arg(long)]
        sort_desc: bool,
    },
    /// List a table's columns
    Columns { db_name: String, table_name: String },
    /// List a table's indexes
    Indexes { db_name: String, table_name: String },
    /// List a table's foreign keys
    ForeignKeys { db_name: String, table_name: String },
    /// Fetch one page of table rows
    Data {
        db_name: String,
        table_name: String,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        page: i64,
        #[arg(long, default_value_t = DEFAULT_PER_PAGE, allow_negative_numbers = true)]
        per_page: i64,
        #[arg(long)]
        sort_field: Option<String>,
        #[arg(long)]
        sort_desc: bool,
        /// SQL fragment appended after WHERE
        #[arg(long = "where")]
        where_query: Option<String>,
    },
    /// Run arbitrary SQL
    Query { sql: String },
}

impl Config {
    pub fn driver_options(&self) -> DriverOptions {
        DriverOptions::new(self.connect_timeout, self.query_timeout)
    }

    /// Build credentials from the connection string or the discrete fields.
    pub fn credentials(&self) -> DriverResult<Credentials> {
        if let Some(dsn) = &self.connection_string {
            return Ok(Credentials::connection_string(&self.engine, dsn));
        }

        let port = match &self.port {
            Some(port) => port.clone(),
            None => self
                .engine
                .parse::<crate::models::EngineKind>()?
                .default_port()
                .to_string(),
        };
        if self.database.is_empty() {
            return Err(DriverError::validation(
                "--database (or DBC_DATABASE) is required without a connection string",
            ));
        }

        Ok(Credentials::fields(
            &self.engine,
            &self.host,
            port,
            &self.username,
            &self.password,
            &self.database,
        )
        .with_ssl(&self.ssl))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_options_default() {
        let options = DriverOptions::default();
        assert_eq!(
            options.connect_timeout,
            Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)
        );
        assert_eq!(
            options.query_timeout,
            Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_parse_field_credentials() {
        let config = Config::try_parse_from([
            "db-catalog",
            "--type",
            "mysql",
            "--username",
            "root",
            "--database",
            "shop",
            "tables",
            "shop",
        ])
        .unwrap();

        match config.credentials().unwrap() {
            Credentials::Fields(f) => {
                assert_eq!(f.engine, "mysql");
                assert_eq!(f.port, "3306");
                assert_eq!(f.database, "shop");
            }
            other => panic!("expected field credentials, got {:?}", other),
        }
    }

    #[test]
    fn test_connection_string_takes_precedence() {
        let config = Config::try_parse_from([
            "db-catalog",
            "--connection-string",
            "postgres://u:p@localhost/app",
            "databases",
        ])
        .unwrap();
        assert!(matches!(
            config.credentials().unwrap(),
            Credentials::ConnectionString(_)
        ));
    }

    #[test]
    fn test_missing_database_rejected() {
        let config = Config::try_parse_from(["db-catalog", "databases"]).unwrap();
        assert!(config.credentials().is_err());
    }

    #[test]
    fn test_data_subcommand_accepts_negative_page() {
        let config = Config::try_parse_from([
            "db-catalog",
            "data",
            "public",
            "users",
            "--page",
            "-1",
            "--where",
            "id > 10",
        ])
        .unwrap();
        match config.command {
            Command::Data {
                page, where_query, ..
            } => {
                assert_eq!(page, -1);
                assert_eq!(where_query.as_deref(), Some("id > 10"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_timeouts_from_args() {
        let config = Config::try_parse_from([
            "db-catalog",
            "--query-timeout",
            "5",
            "--connect-timeout",
            "2",
            "databases",
        ])
        .unwrap();
        let options = config.driver_options();
        assert_eq!(options.query_timeout, Duration::from_secs(5));
        assert_eq!(options.connect_timeout, Duration::from_secs(2));
    }
}
