//! Runtime configuration.
//!
//! [`SyncConfig`] holds everything a run needs and is built either in code
//! with the `with_*` setters or from a [`ConfigFile`]. The file is INI:
//!
//! ```ini
//! [sync]
//! endpoint = https://example.com/api/manifest
//! package = vanilla-plus
//! target_dir = /home/user/.game
//! concurrency = 10
//! timeout = 30
//! download_timeout = 300
//! verify = shortcut
//! reap_stale = true
//!
//! [logging]
//! level = info
//! directory = /home/user/.cache/assetsync/logs
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::logging::LoggingConfig;
use crate::sync::{VerifyMode, DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT_SECS};

/// Directory name under the platform config dir.
pub const CONFIG_DIR_NAME: &str = "assetsync";

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Default manifest request timeout in seconds.
pub const DEFAULT_MANIFEST_TIMEOUT_SECS: u64 = 30;

const SYNC_SECTION: &str = "sync";
const LOGGING_SECTION: &str = "logging";

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid value '{value}' for [{section}] {key}: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

/// Settings for one synchronization run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Manifest endpoint URL.
    pub endpoint: String,

    /// Package id sent as the `modpack` query parameter.
    pub package: Option<String>,

    /// Local directory kept in sync.
    pub target_dir: PathBuf,

    /// Maximum simultaneous file downloads.
    pub concurrency: usize,

    /// Manifest request timeout.
    pub timeout: Duration,

    /// Per-file download timeout.
    pub download_timeout: Duration,

    pub verify_mode: VerifyMode,

    /// Delete undeclared files in sync-enabled subtrees.
    pub reap_stale: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            package: None,
            target_dir: PathBuf::from("."),
            concurrency: DEFAULT_CONCURRENCY,
            timeout: Duration::from_secs(DEFAULT_MANIFEST_TIMEOUT_SECS),
            download_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            verify_mode: VerifyMode::default(),
            reap_stale: true,
        }
    }
}

impl SyncConfig {
    /// Create a configuration for `endpoint` with defaults for everything else.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn with_target_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.target_dir = path.into();
        self
    }

    /// Set the download concurrency (minimum 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    pub fn with_verify_mode(mut self, mode: VerifyMode) -> Self {
        self.verify_mode = mode;
        self
    }

    pub fn with_reap_stale(mut self, reap: bool) -> Self {
        self.reap_stale = reap;
        self
    }

    /// Check that the settings are usable for a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Missing("endpoint"));
        }
        Ok(())
    }
}

/// Contents of the INI config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

impl ConfigFile {
    /// `<config dir>/assetsync/config.ini`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let ini = Ini::load_from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Self::from_ini(&ini)
    }

    /// Load from [`default_path`](Self::default_path), or defaults if there
    /// is none.
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some(SYNC_SECTION)) {
            let sync = &mut config.sync;
            for (key, value) in section.iter() {
                let value = value.trim();
                match key {
                    "endpoint" => sync.endpoint = value.to_string(),
                    "package" if !value.is_empty() => sync.package = Some(value.to_string()),
                    "package" => sync.package = None,
                    "target_dir" => sync.target_dir = expand_home(value),
                    "concurrency" => {
                        let n: usize = parse_value(SYNC_SECTION, key, value)?;
                        if n == 0 {
                            return Err(invalid(SYNC_SECTION, key, value, "must be at least 1"));
                        }
                        sync.concurrency = n;
                    }
                    "timeout" => {
                        sync.timeout = Duration::from_secs(parse_value(SYNC_SECTION, key, value)?)
                    }
                    "download_timeout" => {
                        sync.download_timeout =
                            Duration::from_secs(parse_value(SYNC_SECTION, key, value)?)
                    }
                    "verify" => {
                        sync.verify_mode = VerifyMode::from_config_str(value).ok_or_else(|| {
                            invalid(SYNC_SECTION, key, value, "expected 'shortcut' or 'full'")
                        })?
                    }
                    "reap_stale" => sync.reap_stale = parse_bool(SYNC_SECTION, key, value)?,
                    _ => tracing::warn!(section = SYNC_SECTION, key, "Ignoring unknown config key"),
                }
            }
        }

        if let Some(section) = ini.section(Some(LOGGING_SECTION)) {
            for (key, value) in section.iter() {
                let value = value.trim();
                match key {
                    "level" => config.logging.level = value.to_string(),
                    "directory" if !value.is_empty() => {
                        config.logging.directory = Some(expand_home(value))
                    }
                    "directory" => config.logging.directory = None,
                    _ => {
                        tracing::warn!(section = LOGGING_SECTION, key, "Ignoring unknown config key")
                    }
                }
            }
        }

        Ok(config)
    }

    /// Render as INI text, as `config show` prints it.
    pub fn to_ini_string(&self) -> String {
        let mut ini = Ini::new();
        let sync = &self.sync;
        ini.with_section(Some(SYNC_SECTION))
            .set("endpoint", sync.endpoint.as_str())
            .set("package", sync.package.as_deref().unwrap_or(""))
            .set("target_dir", sync.target_dir.display().to_string())
            .set("concurrency", sync.concurrency.to_string())
            .set("timeout", sync.timeout.as_secs().to_string())
            .set("download_timeout", sync.download_timeout.as_secs().to_string())
            .set("verify", sync.verify_mode.as_str())
            .set("reap_stale", sync.reap_stale.to_string());
        ini.with_section(Some(LOGGING_SECTION))
            .set("level", self.logging.level.as_str())
            .set(
                "directory",
                self.logging
                    .directory
                    .as_ref()
                    .map(|d| d.display().to_string())
                    .unwrap_or_default(),
            );

        let mut out = Vec::new();
        // Writing to a Vec cannot fail.
        if ini.write_to(&mut out).is_err() {
            return String::new();
        }
        String::from_utf8_lossy(&out).into_owned()
    }
}

fn invalid(section: &str, key: &str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_value<T>(section: &str, key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| invalid(section, key, value, e.to_string()))
}

fn parse_bool(section: &str, key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(section, key, value, "expected true or false")),
    }
}

/// Expand a leading `~` to the home directory.
fn expand_home(value: &str) -> PathBuf {
    if let Some(rest) = value.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(value)
}
