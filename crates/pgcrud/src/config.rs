//! Connection configuration.

use crate::error::{CrudError, CrudResult};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Environment variables read by [`ConnectionConfig::from_env`].
pub const ENV_HOST: &str = "PGCRUD_HOST";
pub const ENV_PORT: &str = "PGCRUD_PORT";
pub const ENV_USER: &str = "PGCRUD_USER";
pub const ENV_PASSWORD: &str = "PGCRUD_PASSWORD";
pub const ENV_DATABASE: &str = "PGCRUD_DATABASE";
pub const ENV_BUFFERED: &str = "PGCRUD_BUFFERED";

/// Parameters for opening one database session.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub database: String,
    /// Materialize query results when the statement executes (default `true`).
    ///
    /// When `false`, a query runs on the first fetch, and executing another
    /// statement before then fails with [`CrudError::UnreadResult`].
    pub buffered: bool,
    pub application_name: Option<String>,
    pub connect_timeout: Option<Duration>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: None,
            database: "postgres".to_string(),
            buffered: true,
            application_name: Some("pgcrud".to_string()),
            connect_timeout: Some(Duration::from_secs(10)),
        }
    }
}

impl ConnectionConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn buffered(mut self, buffered: bool) -> Self {
        self.buffered = buffered;
        self
    }

    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Load from `PGCRUD_*` environment variables, after reading `.env` if one
    /// exists. Unset variables keep their defaults.
    pub fn from_env() -> CrudResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (environment, test fixtures).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CrudResult<Self> {
        let mut config = Self::default();
        if let Some(host) = lookup(ENV_HOST) {
            config.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| CrudError::config(format!("{ENV_PORT}: invalid port '{port}'")))?;
        }
        if let Some(user) = lookup(ENV_USER) {
            config.user = user;
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            config.password = Some(password);
        }
        if let Some(database) = lookup(ENV_DATABASE) {
            config.database = database;
        }
        if let Some(buffered) = lookup(ENV_BUFFERED) {
            config.buffered = parse_bool(&buffered)
                .ok_or_else(|| CrudError::config(format!("{ENV_BUFFERED}: expected a boolean, got '{buffered}'")))?;
        }
        Ok(config)
    }

    /// Parse a `postgres://` URL or a `key=value` connection string.
    pub fn from_url(url: &str) -> CrudResult<Self> {
        let pg = tokio_postgres::Config::from_str(url).map_err(|e| CrudError::config(e.to_string()))?;
        let mut config = Self::default();

        if let Some(host) = pg.get_hosts().first() {
            config.host = match host {
                tokio_postgres::config::Host::Tcp(h) => h.clone(),
                #[cfg(unix)]
                tokio_postgres::config::Host::Unix(path) => path.display().to_string(),
            };
        }
        if let Some(port) = pg.get_ports().first() {
            config.port = *port;
        }
        if let Some(user) = pg.get_user() {
            config.user = user.to_string();
        }
        if let Some(password) = pg.get_password() {
            let password = std::str::from_utf8(password)
                .map_err(|_| CrudError::config("password is not valid UTF-8"))?;
            config.password = Some(password.to_string());
        }
        if let Some(dbname) = pg.get_dbname() {
            config.database = dbname.to_string();
        }
        if let Some(name) = pg.get_application_name() {
            config.application_name = Some(name.to_string());
        }
        if let Some(timeout) = pg.get_connect_timeout() {
            config.connect_timeout = Some(*timeout);
        }
        Ok(config)
    }

    /// Convert into a `tokio_postgres::Config`.
    pub fn to_pg_config(&self) -> tokio_postgres::Config {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&self.host)
            .port(self.port)
            .user(&self.user)
            .dbname(&self.database);
        if let Some(password) = &self.password {
            pg.password(password);
        }
        if let Some(name) = &self.application_name {
            pg.application_name(name);
        }
        if let Some(timeout) = self.connect_timeout {
            pg.connect_timeout(timeout);
        }
        pg
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .field("buffered", &self.buffered)
            .field("application_name", &self.application_name)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
