//! db-catalog - command-line entry point.
//!
//! Runs one driver operation against the configured database and prints the
//! result as JSON on stdout. Logs go to stderr.

use clap::Parser;
use db_catalog::config::{Command, Config};
use db_catalog::drivers::{Driver, for_credentials};
use db_catalog::error::{DriverError, DriverResult};
use db_catalog::models::{ListTablesArgs, TableDataArgs, TableRef};
use serde_json::Value as JsonValue;
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

async fn run(config: &Config) -> DriverResult<JsonValue> {
    let credentials = config.credentials()?;
    let driver = for_credentials(&credentials, config.driver_options())?;
    debug!(
        engine = %driver.engine(),
        server = %credentials.display_target(),
        "Running command"
    );

    let value = match &config.command {
        Command::Databases => to_json(driver.list_databases(&credentials).await?),
        Command::Tables {
            db_name,
            sort_field,
            sort_desc,
        } => {
            let args = ListTablesArgs {
                db_name: db_name.clone(),
                sort_field: sort_field.clone(),
                sort_desc: *sort_desc,
            };
            to_json(driver.list_tables(&credentials, &args).await?)
        }
        Command::Columns {
            db_name,
            table_name,
        } => {
            let table = TableRef::new(db_name, table_name);
            to_json(driver.get_columns(&credentials, &table).await?)
        }
        Command::Indexes {
            db_name,
            table_name,
        } => {
            let table = TableRef::new(db_name, table_name);
            to_json(driver.get_indexes(&credentials, &table).await?)
        }
        Command::ForeignKeys {
            db_name,
            table_name,
        } => {
            let table = TableRef::new(db_name, table_name);
            to_json(driver.get_foreign_keys(&credentials, &table).await?)
        }
        Command::Data {
            db_name,
            table_name,
            page,
            per_page,
            sort_field,
            sort_desc,
            where_query,
        } => {
            let args = TableDataArgs {
                db_name: db_name.clone(),
                table_name: table_name.clone(),
                page: *page,
                per_page: *per_page,
                sort_field: sort_field.clone(),
                sort_desc: *sort_desc,
                where_query: where_query.clone(),
            };
            to_json(driver.get_table_data(&credentials, &args).await?)
        }
        Command::Query { sql } => to_json(driver.execute_query(&credentials, sql).await?),
    };
    value
}

fn to_json<T: serde::Serialize>(value: T) -> DriverResult<JsonValue> {
    serde_json::to_value(value).map_err(|e| {
        DriverError::query(
            format!("Result could not be represented as JSON: {}", e),
            None,
            "Select only columns with JSON-representable values",
        )
    })
}

#[tokio::main]
async fn main() {
    // Parse configuration from command line and environment
    let config = Config::parse();

    init_tracing(&config);

    match run(&config).await {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                error!(error = %e, "Failed to serialize result");
                std::process::exit(1);
            }
        },
        Err(e) => {
            debug!(kind = ?e.kind(), error = %e, "Command failed");
            eprintln!("Error: {}", e);
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Hint: {}", suggestion);
            }
            std::process::exit(1);
        }
    }
}
