//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. CLI flags (applied by the caller through the `with_*` overrides)
//!
//! # Config Locations
//!
//! Searched in order, first hit wins:
//! 1. An explicit path (`--config`)
//! 2. `$REVSTORE_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/revstore/config.toml`
//! 4. `~/.revstore/config.toml`
//!
//! A missing file is not an error; defaults are used.
//!
//! # Example
//!
//! ```no_run
//! use revstore::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! println!("origins live in {}", config.origin_root().display());
//! println!("clone timeout: {:?}", config.clone_timeout());
//! ```

pub mod schema;

pub use schema::{IdentityConfig, StoreConfig, TimeoutConfig};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::core::paths::StorePaths;
use crate::core::types::{BranchName, Signature};

/// Branch created by init when the config names none.
pub const DEFAULT_PRIMARY_BRANCH: &str = "master";

/// Default bound for clone and pull-style git invocations.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const DEFAULT_IDENTITY_NAME: &str = "revstore";
const DEFAULT_IDENTITY_EMAIL: &str = "revstore@localhost";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Resolved configuration with defaults applied.
///
/// Built once at process start and handed to
/// [`crate::store::DocumentStore::new`]; nothing reads configuration
/// from ambient state after that.
#[derive(Debug, Clone)]
pub struct Config {
    origin_root: PathBuf,
    work_root: PathBuf,
    primary_branch: BranchName,
    git_program: PathBuf,
    clone_timeout: Duration,
    pull_timeout: Duration,
    command_timeout: Duration,
    identity_name: String,
    identity_email: String,
    /// File the values were read from, if any
    source: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `explicit` or the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed,
    /// or validated. An explicit path that does not exist is a read error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            let file = Self::read_config(path)?;
            return Self::from_file_config(file, Some(path.to_path_buf()));
        }

        match Self::find_config_file() {
            Some(path) => {
                let file = Self::read_config(&path)?;
                Self::from_file_config(file, Some(path))
            }
            None => Self::from_file_config(StoreConfig::default(), None),
        }
    }

    /// Resolve a parsed config file into concrete values.
    pub fn from_file_config(
        file: StoreConfig,
        source: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        file.validate()?;

        let primary_branch = BranchName::new(
            file.primary_branch
                .as_deref()
                .unwrap_or(DEFAULT_PRIMARY_BRANCH),
        )
        .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let timeouts = file.timeouts.unwrap_or_default();
        let secs = |v: Option<u64>| Duration::from_secs(v.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let identity = file.identity.unwrap_or_default();

        Ok(Self {
            origin_root: file.origin_root.unwrap_or_else(default_origin_root),
            work_root: file.work_root.unwrap_or_else(default_work_root),
            primary_branch,
            git_program: file.git_program.unwrap_or_else(|| PathBuf::from("git")),
            clone_timeout: secs(timeouts.clone_secs),
            pull_timeout: secs(timeouts.pull_secs),
            command_timeout: secs(timeouts.command_secs),
            identity_name: identity
                .name
                .unwrap_or_else(|| DEFAULT_IDENTITY_NAME.to_string()),
            identity_email: identity
                .email
                .unwrap_or_else(|| DEFAULT_IDENTITY_EMAIL.to_string()),
            source,
        })
    }

    /// Locate the first existing config file in the default locations.
    fn find_config_file() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("REVSTORE_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("revstore/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".revstore/config.toml"))
            .filter(|path| path.exists())
    }

    fn read_config(path: &Path) -> Result<StoreConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    // =========================================================================
    // Overrides
    // =========================================================================

    pub fn with_origin_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.origin_root = root.into();
        self
    }

    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = root.into();
        self
    }

    pub fn with_clone_timeout(mut self, timeout: Duration) -> Self {
        self.clone_timeout = timeout;
        self
    }

    pub fn with_pull_timeout(mut self, timeout: Duration) -> Self {
        self.pull_timeout = timeout;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn origin_root(&self) -> &Path {
        &self.origin_root
    }

    pub fn work_root(&self) -> &Path {
        &self.work_root
    }

    /// Path routing for this configuration's roots.
    pub fn paths(&self) -> StorePaths {
        StorePaths::new(self.origin_root.clone(), self.work_root.clone())
    }

    pub fn primary_branch(&self) -> &BranchName {
        &self.primary_branch
    }

    pub fn git_program(&self) -> &Path {
        &self.git_program
    }

    pub fn clone_timeout(&self) -> Duration {
        self.clone_timeout
    }

    /// Bound for fetch, checkout and push.
    pub fn pull_timeout(&self) -> Duration {
        self.pull_timeout
    }

    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Default committer signature, stamped now.
    pub fn default_signature(&self) -> Signature {
        Signature::now(&self.identity_name, &self.identity_email)
    }

    /// The config file these values came from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

fn default_origin_root() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("revstore").join("origins"))
        .unwrap_or_else(|| std::env::temp_dir().join("revstore-origins"))
}

fn default_work_root() -> PathBuf {
    std::env::temp_dir().join("revstore-work")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_applied() {
        let config = Config::from_file_config(StoreConfig::default(), None).unwrap();
        assert_eq!(config.primary_branch().as_str(), DEFAULT_PRIMARY_BRANCH);
        assert_eq!(config.clone_timeout(), Duration::from_secs(60));
        assert_eq!(config.pull_timeout(), Duration::from_secs(60));
        assert_eq!(config.git_program(), Path::new("git"));
        assert!(config.work_root().ends_with("revstore-work"));
        assert!(config.source().is_none());

        let sig = config.default_signature();
        assert_eq!(sig.name, "revstore");
        assert_eq!(sig.email, "revstore@localhost");
    }

    #[test]
    fn load_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "primary_branch = \"main\"\n[timeouts]\nclone_secs = 5\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.primary_branch().as_str(), "main");
        assert_eq!(config.clone_timeout(), Duration::from_secs(5));
        assert_eq!(config.pull_timeout(), Duration::from_secs(60));
        assert_eq!(config.source(), Some(path.as_path()));
    }

    #[test]
    fn load_explicit_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let result = Config::load(Some(&temp.path().join("nope.toml")));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn load_rejects_malformed_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "origin_root = [").unwrap();
        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn overrides_win() {
        let config = Config::from_file_config(
            StoreConfig {
                origin_root: Some(PathBuf::from("/from/file")),
                ..Default::default()
            },
            None,
        )
        .unwrap()
        .with_origin_root("/from/flag")
        .with_work_root("/work");

        assert_eq!(config.origin_root(), Path::new("/from/flag"));
        assert_eq!(config.paths().work_root(), Path::new("/work"));
    }
}
