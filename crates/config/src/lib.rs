//! Configuration loading and validation.
//!
//! Settings are layered, lowest priority first:
//!
//! 1. Built-in defaults ([`Config::default`]).
//! 2. A configuration file: either the path given explicitly, or
//!    `ffsgate.toml` inside the platform configuration directory. The format
//!    is chosen by extension (`.toml`, `.yaml`/`.yml`, `.json`).
//! 3. Environment variables prefixed with `FFSGATE_`, using `__` to reach
//!    nested keys (`FFSGATE_POWERGATE__ADDRESS=10.0.0.2:5002`). The bare
//!    `SECRET_KEY` variable is also honoured for the HTTP secret.
//!
//! Command-line overrides are applied by the binary on top of the extracted
//! [`Config`], followed by [`Config::validate`]. Configuration is fixed for
//! the lifetime of the process.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use ffsgate_compress::Compression;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE_NAME: &str = "ffsgate.toml";
const ENV_PREFIX: &str = "FFSGATE_";
/// Shipped only so that a fresh checkout runs; [`Config::validate`] warns
/// loudly when it is still in use.
pub const INSECURE_SECRET_KEY: &str = "you-will-never-guess";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "ffsgate")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub powergate: PowergateConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    pub log: LogConfig,
}

/// Connection settings for the remote Powergate gRPC service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowergateConfig {
    /// `host:port` of the Powergate API.
    pub address: String,
    /// Upper bound for unary calls (create, push, config, wallet lookups).
    pub timeout_secs: u64,
    /// Upper bound for staging a file, and for the wait between two chunks
    /// when fetching one.
    pub transfer_timeout_secs: u64,
}
impl Default for PowergateConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:5002".to_string(),
            timeout_secs: 30,
            transfer_timeout_secs: 600,
        }
    }
}
impl PowergateConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_secs)
    }
}

/// Local directories used while moving files to and from Filecoin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub download_dir: PathBuf,
    /// Compression applied to packaged (multi-file) uploads.
    pub package_compression: String,
}
impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("_uploads"),
            download_dir: PathBuf::from("_downloads"),
            package_compression: Compression::default().to_string(),
        }
    }
}
impl StorageConfig {
    pub fn package_compression(&self) -> Result<Compression> {
        self.package_compression
            .parse::<Compression>()
            .or_raise(|| ErrorKind::Invalid("storage.package_compression", self.package_compression.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection string, e.g. `sqlite://ffsgate.db`.
    pub url: String,
}
impl Default for DatabaseConfig {
    fn default() -> Self {
        let path = project_dirs()
            .map(|dirs| dirs.data_dir().join("ffsgate.db"))
            .unwrap_or_else(|| PathBuf::from("ffsgate.db"));
        Self { url: format!("sqlite://{}", path.display()) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub listen: String,
    /// Signs the notice cookie carried across redirects.
    pub secret_key: String,
}
impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:5000".to_string(),
            secret_key: INSECURE_SECRET_KEY.to_string(),
        }
    }
}
impl HttpConfig {
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse::<SocketAddr>().or_raise(|| ErrorKind::Invalid("http.listen", self.listen.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    pub level: String,
}
impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            powergate: PowergateConfig::default(),
            storage: StorageConfig::default(),
            database: DatabaseConfig::default(),
            http: HttpConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Location of the configuration file used when none is given explicitly.
    pub fn default_file() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Build the layered [`Figment`] without extracting it.
    ///
    /// An explicitly requested file must exist; the default file is optional.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        match file {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::Invalid("--config", path.display().to_string()));
                }
                figment = merge_file(figment, path);
            },
            None => {
                if let Some(path) = Self::default_file().filter(|p| p.is_file()) {
                    figment = merge_file(figment, &path);
                }
            },
        }
        Ok(figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Env::raw().only(&["SECRET_KEY"]).map(|_| "http.secret_key".into())))
    }

    /// Load configuration from every layer. Does **not** validate; call
    /// [`validate`](Self::validate) after applying command-line overrides.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::figment(file)?.extract().or_raise(|| ErrorKind::Load)
    }

    /// Check that every setting is usable before the server starts.
    pub fn validate(&self) -> Result<()> {
        if self.powergate.address.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("powergate.address", "must not be empty".to_string()));
        }
        if self.powergate.timeout_secs == 0 || self.powergate.transfer_timeout_secs == 0 {
            exn::bail!(ErrorKind::Invalid("powergate.timeout_secs", "timeouts must be non-zero".to_string()));
        }
        if self.storage.upload_dir.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("storage.upload_dir", "must not be empty".to_string()));
        }
        if self.storage.download_dir.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("storage.download_dir", "must not be empty".to_string()));
        }
        self.storage.package_compression()?;
        if !self.database.url.starts_with("sqlite:") {
            exn::bail!(ErrorKind::Invalid("database.url", self.database.url.clone()));
        }
        self.http.listen_addr()?;
        if self.http.secret_key.is_empty() {
            exn::bail!(ErrorKind::Invalid("http.secret_key", "must not be empty".to_string()));
        }
        if self.http.secret_key == INSECURE_SECRET_KEY {
            tracing::warn!("Using the built-in secret key; set SECRET_KEY before exposing this server");
        }
        Ok(())
    }
}

fn merge_file(figment: Figment, path: &Path) -> Figment {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => figment.merge(Toml::file(path)),
    }
}
