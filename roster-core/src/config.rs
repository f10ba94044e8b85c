//! Node configuration: YAML file plus command-line overrides.
//!
//! ```yaml
//! name: node-a.example.com
//! store_dir: /var/lib/roster/registry
//! refresh_interval_secs: 300
//! registration_interval_secs: 300
//! unhealthy_threshold_secs: 900
//! ```
//!
//! Every setting is required after merging; nothing is defaulted.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::NodeName;

/// Directory under `$HOME` holding the config file and daemon socket.
pub const ROSTER_DIR: &str = ".roster";
pub const CONFIG_FILE: &str = "config.yaml";

/// `<home>/.roster/config.yaml` — pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(ROSTER_DIR).join(CONFIG_FILE)
}

/// Partially specified settings, as read from YAML or built from CLI flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_interval_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_interval_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unhealthy_threshold_secs: Option<u64>,
}

impl ConfigFile {
    /// Load settings from `path`. A missing file yields empty settings so
    /// that flags alone can configure a node.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Layer `overrides` on top of `self`; any value set in `overrides` wins.
    pub fn merge(self, overrides: ConfigFile) -> ConfigFile {
        ConfigFile {
            name: overrides.name.or(self.name),
            store_dir: overrides.store_dir.or(self.store_dir),
            refresh_interval_secs: overrides
                .refresh_interval_secs
                .or(self.refresh_interval_secs),
            registration_interval_secs: overrides
                .registration_interval_secs
                .or(self.registration_interval_secs),
            unhealthy_threshold_secs: overrides
                .unhealthy_threshold_secs
                .or(self.unhealthy_threshold_secs),
        }
    }

    /// Check that every setting is present and sane.
    pub fn resolve(self) -> Result<Config, ConfigError> {
        let name = self.name.ok_or(ConfigError::Missing("name"))?;
        if name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "name",
                reason: "must not be empty".to_string(),
            });
        }
        if name.contains(['/', '\\']) {
            return Err(ConfigError::Invalid {
                field: "name",
                reason: format!("'{name}' must be a DNS name, not a path"),
            });
        }

        let store_dir = self.store_dir.ok_or(ConfigError::Missing("store_dir"))?;

        Ok(Config {
            name: NodeName::from(name),
            store_dir,
            refresh_interval: positive_secs(
                "refresh_interval_secs",
                self.refresh_interval_secs,
            )?,
            registration_interval: positive_secs(
                "registration_interval_secs",
                self.registration_interval_secs,
            )?,
            unhealthy_threshold: positive_secs(
                "unhealthy_threshold_secs",
                self.unhealthy_threshold_secs,
            )?,
        })
    }
}

fn positive_secs(field: &'static str, value: Option<u64>) -> Result<Duration, ConfigError> {
    match value {
        None => Err(ConfigError::Missing(field)),
        Some(0) => Err(ConfigError::Invalid {
            field,
            reason: "must be greater than zero".to_string(),
        }),
        Some(secs) => Ok(Duration::from_secs(secs)),
    }
}

/// Fully resolved node configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub name: NodeName,
    pub store_dir: PathBuf,
    pub refresh_interval: Duration,
    pub registration_interval: Duration,
    pub unhealthy_threshold: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    fn complete() -> ConfigFile {
        ConfigFile {
            name: Some("node-a".to_string()),
            store_dir: Some(PathBuf::from("/srv/registry")),
            refresh_interval_secs: Some(30),
            registration_interval_secs: Some(60),
            unhealthy_threshold_secs: Some(300),
        }
    }

    #[test]
    fn missing_file_is_empty_settings() {
        let dir = assert_fs::TempDir::new().expect("tempdir");
        let loaded = ConfigFile::load(&dir.path().join("config.yaml")).expect("load");
        assert_eq!(loaded, ConfigFile::default());
    }

    #[test]
    fn loads_yaml_file() {
        let dir = assert_fs::TempDir::new().expect("tempdir");
        let file = dir.child("config.yaml");
        file.write_str(
            "name: node-a\nstore_dir: /srv/registry\nrefresh_interval_secs: 30\n\
             registration_interval_secs: 60\nunhealthy_threshold_secs: 300\n",
        )
        .expect("write");

        let loaded = ConfigFile::load(file.path()).expect("load");
        assert_eq!(loaded, complete());
    }

    #[test]
    fn unknown_key_is_parse_error_with_path() {
        let dir = assert_fs::TempDir::new().expect("tempdir");
        let file = dir.child("config.yaml");
        file.write_str("name: node-a\nrefresh: 30\n").expect("write");

        let err = ConfigFile::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
        assert!(err.to_string().contains("config.yaml"));
    }

    #[test]
    fn overrides_win_over_file_values() {
        let overrides = ConfigFile {
            name: Some("node-b".to_string()),
            refresh_interval_secs: Some(5),
            ..ConfigFile::default()
        };
        let merged = complete().merge(overrides);
        assert_eq!(merged.name.as_deref(), Some("node-b"));
        assert_eq!(merged.refresh_interval_secs, Some(5));
        assert_eq!(merged.registration_interval_secs, Some(60));
    }

    #[test]
    fn resolve_converts_seconds_to_durations() {
        let config = complete().resolve().expect("resolve");
        assert_eq!(config.name, NodeName::from("node-a"));
        assert_eq!(config.refresh_interval, Duration::from_secs(30));
        assert_eq!(config.registration_interval, Duration::from_secs(60));
        assert_eq!(config.unhealthy_threshold, Duration::from_secs(300));
    }

    #[test]
    fn resolve_rejects_zero_interval() {
        let file = ConfigFile {
            registration_interval_secs: Some(0),
            ..complete()
        };
        let err = file.resolve().unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid { field: "registration_interval_secs", .. }),
            "got: {err}"
        );
    }

    #[test]
    fn resolve_reports_first_missing_setting() {
        let file = ConfigFile {
            store_dir: None,
            ..complete()
        };
        let err = file.resolve().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("store_dir")), "got: {err}");
    }

    #[test]
    fn resolve_rejects_path_like_name() {
        let file = ConfigFile {
            name: Some("../etc".to_string()),
            ..complete()
        };
        assert!(matches!(
            file.resolve().unwrap_err(),
            ConfigError::Invalid { field: "name", .. }
        ));
    }

    #[test]
    fn config_path_lives_under_roster_dir() {
        let path = config_path_at(Path::new("/home/ops"));
        assert_eq!(path, PathBuf::from("/home/ops/.roster/config.yaml"));
    }
}
