//! core::config::schema
//!
//! Configuration file schema.
//!
//! Every field is optional; [`super::Config`] applies defaults.
//!
//! # Validation
//!
//! Values are validated after parsing (the primary branch must be a valid
//! branch name, timeouts must be positive, identity fields non-empty).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::BranchName;

/// Store configuration file.
///
/// # Example
///
/// ```toml
/// origin_root = "/var/lib/revstore"
/// work_root = "/tmp/revstore-work"
/// primary_branch = "master"
///
/// [timeouts]
/// clone_secs = 60
/// pull_secs = 60
///
/// [identity]
/// name = "revstore"
/// email = "revstore@localhost"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Directory holding bare origin repositories
    pub origin_root: Option<PathBuf>,

    /// Directory holding disposable working copies
    pub work_root: Option<PathBuf>,

    /// Branch created by init and used when no revision is given
    pub primary_branch: Option<String>,

    /// git executable (name on PATH or absolute path)
    pub git_program: Option<PathBuf>,

    /// Per-invocation timeouts for the git engine
    pub timeouts: Option<TimeoutConfig>,

    /// Default committer identity for the CLI
    pub identity: Option<IdentityConfig>,
}

impl StoreConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(branch) = &self.primary_branch {
            BranchName::new(branch).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid primary branch name: {}", e))
            })?;
        }

        if let Some(program) = &self.git_program {
            if program.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "git_program cannot be empty".to_string(),
                ));
            }
        }

        if let Some(timeouts) = &self.timeouts {
            timeouts.validate()?;
        }

        if let Some(identity) = &self.identity {
            identity.validate()?;
        }

        Ok(())
    }
}

/// Timeouts, in seconds, for external git invocations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutConfig {
    /// `git clone` of a working copy
    pub clone_secs: Option<u64>,

    /// fetch, checkout and push
    pub pull_secs: Option<u64>,

    /// Every other git invocation
    pub command_secs: Option<u64>,
}

impl TimeoutConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("clone_secs", self.clone_secs),
            ("pull_secs", self.pull_secs),
            ("command_secs", self.command_secs),
        ] {
            if value == Some(0) {
                return Err(ConfigError::InvalidValue(format!(
                    "timeouts.{name} must be greater than zero"
                )));
            }
        }
        Ok(())
    }
}

/// Committer identity used when a caller does not supply one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct IdentityConfig {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl IdentityConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ConfigError::InvalidValue(
                "identity.name cannot be empty".to_string(),
            ));
        }
        if self.email.as_deref().is_some_and(|e| e.trim().is_empty()) {
            return Err(ConfigError::InvalidValue(
                "identity.email cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_valid() {
        let config: StoreConfig = toml::from_str("").unwrap();
        assert_eq!(config, StoreConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn full_config_parses() {
        let config: StoreConfig = toml::from_str(
            r#"
            origin_root = "/srv/origins"
            work_root = "/tmp/work"
            primary_branch = "main"
            git_program = "/usr/bin/git"

            [timeouts]
            clone_secs = 120
            pull_secs = 30

            [identity]
            name = "Docs Bot"
            email = "docs@example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.origin_root, Some(PathBuf::from("/srv/origins")));
        assert_eq!(config.primary_branch.as_deref(), Some("main"));
        let timeouts = config.timeouts.as_ref().unwrap();
        assert_eq!(timeouts.clone_secs, Some(120));
        assert_eq!(timeouts.command_secs, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_fields_rejected() {
        let parsed: Result<StoreConfig, _> = toml::from_str("primary = \"main\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn invalid_primary_branch_rejected() {
        let config = StoreConfig {
            primary_branch: Some("bad..name".into()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = StoreConfig {
            timeouts: Some(TimeoutConfig {
                pull_secs: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pull_secs"));
    }

    #[test]
    fn blank_identity_rejected() {
        let config = StoreConfig {
            identity: Some(IdentityConfig {
                name: Some("  ".into()),
                email: None,
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
