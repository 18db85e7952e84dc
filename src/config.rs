//! Configuration loading and management.
//!
//! Resolution order (first hit wins for the file, later steps override fields):
//! 1. `--config <file>` or `TASKLOCK_CONFIG_PATH`
//! 2. `./tasklock/config.yaml`
//! 3. `~/.tasklock/config.yaml`
//! 4. Built-in defaults
//!
//! Environment overrides: `TASKLOCK_DB_PATH`, `TASKLOCK_HOST`, `TASKLOCK_PORT`.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const CONFIG_PATH_ENV: &str = "TASKLOCK_CONFIG_PATH";
pub const DB_PATH_ENV: &str = "TASKLOCK_DB_PATH";
pub const HOST_ENV: &str = "TASKLOCK_HOST";
pub const PORT_ENV: &str = "TASKLOCK_PORT";

/// Server configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub tasks: TasksConfig,
}

/// HTTP and storage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Prefix under which the task routes are mounted.
    #[serde(default = "default_base_path")]
    pub base_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            host: default_host(),
            port: default_port(),
            base_path: default_base_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("tasklock/tasks.db")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3005
}

fn default_base_path() -> String {
    "/todo/api/tasks".to_string()
}

/// Task rule switches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Accept `locked: false` on a locked task and clear its deadline.
    #[serde(default)]
    pub allow_unlock: bool,

    /// Run reorder batches in a single transaction.
    #[serde(default)]
    pub atomic_reorder: bool,
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// Candidate files searched when no explicit path is given.
    pub fn default_locations() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("tasklock/config.yaml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".tasklock").join("config.yaml"));
        }
        paths
    }

    /// Find and load the configuration, then apply environment overrides.
    ///
    /// An explicit path (argument or `TASKLOCK_CONFIG_PATH`) must exist.
    /// Returns the config and the file it came from, if any.
    pub fn resolve(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let (mut config, source) = match explicit {
            Some(path) => (Self::load(&path)?, Some(path)),
            None => Self::first_existing(&Self::default_locations())?,
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok((config, source))
    }

    fn first_existing(candidates: &[PathBuf]) -> Result<(Self, Option<PathBuf>)> {
        for path in candidates {
            if path.is_file() {
                return Ok((Self::load(path)?, Some(path.clone())));
            }
        }
        Ok((Self::default(), None))
    }

    /// Apply `TASKLOCK_*` overrides using the given variable lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db_path) = lookup(DB_PATH_ENV) {
            self.server.db_path = PathBuf::from(db_path);
        }

        if let Some(host) = lookup(HOST_ENV) {
            self.server.host = host;
        }

        if let Some(port) = lookup(PORT_ENV) {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!("Ignoring {}={:?}: not a port number", PORT_ENV, port),
            }
        }
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if !self.server.base_path.starts_with('/') {
            bail!(
                "server.base_path must start with '/', got {:?}",
                self.server.base_path
            );
        }
        if self.server.host.trim().is_empty() {
            bail!("server.host must not be empty");
        }
        Ok(())
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}
