use pgcrud::{ColumnAllowList, ConnectionConfig, Ident, ORDERS_COMBINED, ORDERS_COMBINED_COLUMNS};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::cli::{ConnArgs, DEFAULT_CONFIG};

#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub config_dir: PathBuf,
    pub file: ConfigFile,
}

impl ProjectConfig {
    /// Load the TOML config named by `--config`.
    ///
    /// When the default config file does not exist, connection settings come
    /// from `PGCRUD_*` environment variables instead.
    pub fn load(args: &ConnArgs) -> anyhow::Result<Self> {
        let config_path = &args.config;
        let config_dir = config_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        if !config_path.exists() && config_path == Path::new(DEFAULT_CONFIG) {
            tracing::debug!("no {DEFAULT_CONFIG}; using environment");
            return Ok(Self {
                config_dir,
                file: ConfigFile::default(),
            });
        }

        let raw = std::fs::read_to_string(config_path).map_err(|e| {
            anyhow::anyhow!(
                "failed to read config file {}: {e}",
                config_path.display()
            )
        })?;
        let file = ConfigFile::parse(&raw, |key| std::env::var(key).ok()).map_err(|e| {
            anyhow::anyhow!(
                "failed to load config file {}: {e:#}",
                config_path.display()
            )
        })?;

        Ok(Self { config_dir, file })
    }

    /// Connection settings: `--database` URL, else the `[database]` section,
    /// else the environment.
    pub fn connection(&self, database_override: Option<&str>) -> anyhow::Result<ConnectionConfig> {
        if let Some(url) = database_override {
            return Ok(ConnectionConfig::from_url(url)?);
        }
        match &self.file.database {
            Some(db) => db.to_connection_config(),
            None => Ok(ConnectionConfig::from_env()?),
        }
    }

    /// Allow-list for `table`: `[tables.<name>]`, else the built-in
    /// `orders_combined` list.
    pub fn allow_list(&self, table: &Ident) -> anyhow::Result<ColumnAllowList> {
        let key = table.to_sql();
        if let Some(t) = self
            .file
            .tables
            .get(&key)
            .or_else(|| self.file.tables.get(table.name()))
        {
            return Ok(ColumnAllowList::new(t.columns.iter().cloned())?);
        }
        if table.name() == ORDERS_COMBINED {
            return Ok(ColumnAllowList::new(ORDERS_COMBINED_COLUMNS)?);
        }
        anyhow::bail!(
            "no allow-list for table {key}; add `[tables.{key}] columns = [...]` to the config"
        )
    }

    pub fn resolve_path(&self, p: impl AsRef<Path>) -> PathBuf {
        let p = p.as_ref();
        if p.is_absolute() || p.exists() {
            p.to_path_buf()
        } else {
            self.config_dir.join(p)
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub tables: BTreeMap<String, TableConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Connection URL; when set, the discrete fields below are ignored.
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub buffered: Option<bool>,
    pub application_name: Option<String>,
    pub connect_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableConfig {
    pub columns: Vec<String>,
}

impl ConfigFile {
    fn parse(raw: &str, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut file: ConfigFile = toml::from_str(raw)?;
        file.expand_env(&lookup)?;
        file.validate()?;
        Ok(file)
    }

    fn expand_env(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        let Some(db) = self.database.as_mut() else {
            return Ok(());
        };
        for field in [
            &mut db.url,
            &mut db.host,
            &mut db.user,
            &mut db.password,
            &mut db.database,
            &mut db.application_name,
        ] {
            if let Some(v) = field.as_mut() {
                *v = expand_env_vars(v, lookup)?;
            }
        }
        Ok(())
    }

    fn validate(&self) -> anyhow::Result<()> {
        for (name, table) in &self.tables {
            Ident::parse(name)
                .map_err(|e| anyhow::anyhow!("[tables.{name}]: {e}"))?;
            if table.columns.is_empty() {
                anyhow::bail!("[tables.{name}]: columns must not be empty");
            }
        }
        if let Some(url) = self.database.as_ref().and_then(|db| db.url.as_deref()) {
            if url.trim().is_empty() {
                anyhow::bail!("database.url is empty");
            }
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn to_connection_config(&self) -> anyhow::Result<ConnectionConfig> {
        let mut config = match &self.url {
            Some(url) => ConnectionConfig::from_url(url)?,
            None => {
                let mut config = ConnectionConfig::new();
                if let Some(host) = &self.host {
                    config = config.host(host);
                }
                if let Some(port) = self.port {
                    config = config.port(port);
                }
                if let Some(user) = &self.user {
                    config = config.user(user);
                }
                if let Some(password) = &self.password {
                    config = config.password(password);
                }
                if let Some(database) = &self.database {
                    config = config.database(database);
                }
                config
            }
        };
        if let Some(buffered) = self.buffered {
            config = config.buffered(buffered);
        }
        if let Some(name) = &self.application_name {
            config = config.application_name(name);
        }
        if let Some(secs) = self.connect_timeout_secs {
            config = config.connect_timeout(std::time::Duration::from_secs(secs));
        }
        Ok(config)
    }
}

fn expand_env_vars(input: &str, lookup: &impl Fn(&str) -> Option<String>) -> anyhow::Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut key = String::new();
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                key.push(ch);
            }

            if !closed {
                anyhow::bail!("unterminated env var reference: ${{{key}");
            }
            if key.is_empty() {
                anyhow::bail!("invalid env var reference: ${{}}");
            }

            let v = lookup(&key)
                .ok_or_else(|| anyhow::anyhow!("missing env var for config expansion: {key}"))?;
            out.push_str(&v);
            continue;
        }

        out.push(c);
    }

    Ok(out)
}
