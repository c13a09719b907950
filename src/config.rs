//! Connection settings and run options

use std::time::Duration;

use tiberius::{AuthMethod, Config};

use crate::error::{Result, UnbindError};

/// Default ceiling on dependency levels (SQL Server's default MAXRECURSION)
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// SQL Server connection configuration
#[derive(Debug, Clone)]
pub struct SqlServerConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: Option<String>,
    pub trust_cert: bool,
    /// ADO.NET connection string; overrides the individual fields when set
    pub connection_string: Option<String>,
}

impl Default for SqlServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1433,
            user: "sa".to_string(),
            password: "Password1".to_string(),
            database: None,
            trust_cert: true,
            connection_string: None,
        }
    }
}

impl SqlServerConfig {
    /// Load settings from the environment (and a `.env` file if present).
    ///
    /// Reads `CONNECTION_STRING`, or else `SQL_SERVER_HOST`, `SQL_SERVER_PORT`,
    /// `SQL_SERVER_USER`, `SQL_SERVER_PASSWORD` and `SQL_SERVER_DATABASE`.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        let port = match std::env::var("SQL_SERVER_PORT") {
            Ok(p) => p.parse().map_err(|_| UnbindError::Configuration {
                message: format!("SQL_SERVER_PORT is not a valid port: {}", p),
            })?,
            Err(_) => defaults.port,
        };

        Ok(Self {
            host: std::env::var("SQL_SERVER_HOST").unwrap_or(defaults.host),
            port,
            user: std::env::var("SQL_SERVER_USER").unwrap_or(defaults.user),
            password: std::env::var("SQL_SERVER_PASSWORD").unwrap_or(defaults.password),
            database: std::env::var("SQL_SERVER_DATABASE").ok(),
            trust_cert: defaults.trust_cert,
            connection_string: std::env::var("CONNECTION_STRING")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        })
    }

    /// Build a tiberius client config
    pub fn to_tiberius(&self) -> Result<Config> {
        if let Some(ado) = &self.connection_string {
            return Config::from_ado_string(ado).map_err(|e| UnbindError::Configuration {
                message: format!("invalid CONNECTION_STRING: {}", e),
            });
        }

        let mut config = Config::new();
        config.host(&self.host);
        config.port(self.port);
        config.authentication(AuthMethod::sql_server(&self.user, &self.password));
        if self.trust_cert {
            config.trust_cert();
        }
        if let Some(db) = &self.database {
            config.database(db);
        }
        Ok(config)
    }
}

/// Options for an unbind run
#[derive(Debug, Clone)]
pub struct UnbindOptions {
    /// Deepest dependency level allowed before the run is aborted
    pub max_depth: usize,
    /// Record statements instead of executing them
    pub dry_run: bool,
    /// Re-read each definition after applying it
    pub verify: bool,
    /// Log each rewrite at info level
    pub verbose: bool,
    /// Connection attempts before giving up
    pub connect_retries: u32,
    pub retry_delay: Duration,
}

impl Default for UnbindOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            dry_run: false,
            verify: false,
            verbose: false,
            connect_retries: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}
