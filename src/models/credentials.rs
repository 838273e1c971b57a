//! Credential and engine models.
//!
//! This module defines the two accepted credential shapes and the engine
//! discriminator used to pick a driver.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::DriverError;

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Postgres,
    /// Includes MariaDB
    MySql,
}

impl EngineKind {
    /// The `type` discriminator carried by credentials.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
        }
    }

    /// Get the display name for this engine.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Postgres => "PostgreSQL",
            Self::MySql => "MySQL",
        }
    }

    /// Get the default port for this engine.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Postgres => 5432,
            Self::MySql => 3306,
        }
    }

    /// Quote an identifier for this engine's SQL dialect.
    ///
    /// Every schema, table and column name placed into dynamic SQL goes
    /// through here; embedded quote characters are doubled.
    pub fn quote_ident(&self, ident: &str) -> String {
        match self {
            Self::Postgres => format!("\"{}\"", ident.replace('"', "\"\"")),
            Self::MySql => format!("`{}`", ident.replace('`', "``")),
        }
    }

    /// Quote a `schema.table` pair.
    pub fn qualified(&self, schema: &str, table: &str) -> String {
        format!("{}.{}", self.quote_ident(schema), self.quote_ident(table))
    }
}

impl FromStr for EngineKind {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postgres" => Ok(Self::Postgres),
            "mysql" => Ok(Self::MySql),
            other => Err(DriverError::unsupported_engine(other)),
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Discrete connection fields, as submitted by a login form.
///
/// All values are strings; `port` is parsed when the credentials are resolved.
#[derive(Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FieldCredentials {
    #[serde(rename = "type")]
    pub engine: String,
    pub username: String,
    /// Contains sensitive data - never log
    #[serde(default)]
    pub password: String,
    pub host: String,
    pub port: String,
    pub database: String,
    /// `"true"`, `"false"`, or a named Postgres sslmode. Ignored for MySQL.
    #[serde(default = "default_ssl")]
    pub ssl: String,
}

fn default_ssl() -> String {
    "false".to_string()
}

impl std::fmt::Debug for FieldCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCredentials")
            .field("engine", &self.engine)
            .field("username", &self.username)
            .field("password", &"****")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("ssl", &self.ssl)
            .finish()
    }
}

/// Engine-native DSN, used verbatim.
#[derive(Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ConnectionStringCredentials {
    #[serde(rename = "type")]
    pub engine: String,
    /// Contains sensitive data - never log unmasked
    #[serde(rename = "connectionString")]
    pub connection_string: String,
}

impl ConnectionStringCredentials {
    /// Get a display-safe version of the connection string (password masked).
    pub fn masked(&self) -> String {
        mask_connection_string(&self.connection_string)
    }
}

impl std::fmt::Debug for ConnectionStringCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionStringCredentials")
            .field("engine", &self.engine)
            .field("connection_string", &self.masked())
            .finish()
    }
}

/// Credentials for one call. Exactly one shape is present.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Credentials {
    ConnectionString(ConnectionStringCredentials),
    Fields(FieldCredentials),
}

impl Credentials {
    /// Build field-form credentials.
    pub fn fields(
        engine: impl Into<String>,
        host: impl Into<String>,
        port: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self::Fields(FieldCredentials {
            engine: engine.into(),
            username: username.into(),
            password: password.into(),
            host: host.into(),
            port: port.into(),
            database: database.into(),
            ssl: default_ssl(),
        })
    }

    /// Build connection-string credentials.
    pub fn connection_string(engine: impl Into<String>, dsn: impl Into<String>) -> Self {
        Self::ConnectionString(ConnectionStringCredentials {
            engine: engine.into(),
            connection_string: dsn.into(),
        })
    }

    /// Set the ssl field (field form only).
    pub fn with_ssl(mut self, ssl: impl Into<String>) -> Self {
        if let Self::Fields(ref mut fields) = self {
            fields.ssl = ssl.into();
        }
        self
    }

    /// The raw `type` discriminator.
    pub fn engine(&self) -> &str {
        match self {
            Self::ConnectionString(c) => &c.engine,
            Self::Fields(f) => &f.engine,
        }
    }

    /// Human-readable connection target for logs; never includes a password.
    pub fn display_target(&self) -> String {
        match self {
            Self::ConnectionString(c) => c.masked(),
            Self::Fields(f) => format!("{}@{}:{}/{}", f.username, f.host, f.port, f.database),
        }
    }
}

/// Replace the password component of a URL-style DSN.
///
/// Strings that do not parse as URLs are returned with everything after the
/// scheme hidden, since their layout is unknown.
pub fn mask_connection_string(dsn: &str) -> String {
    match url::Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() && parsed.set_password(Some("****")).is_err() {
                return format!("{}://****", parsed.scheme());
            }
            parsed.to_string()
        }
        Err(_) => match dsn.find("://") {
            Some(idx) => format!("{}://****", &dsn[..idx]),
            None => "****".to_string(),
        },
    }
}
