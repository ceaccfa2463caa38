use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::sync::keyring;
use crate::sync::subscription::PollPolicy;

pub const CONFIG_VERSION: u64 = 1;

const MIN_POLL_MS: u64 = 100;
const MIN_REQUEST_TIMEOUT_MS: u64 = 1_000;

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("vortex")
}

fn default_browser_command() -> String {
    "xdg-open".into()
}

fn default_table() -> String {
    "apps".into()
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Local,
    Remote,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Project URL of the PostgREST endpoint, e.g. `https://<ref>.supabase.co`.
    pub url: String,
    pub table: String,
    /// Used only when the keyring has no key for `url`.
    pub api_key: Option<String>,
    pub poll_interval_ms: u64,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            table: default_table(),
            api_key: None,
            poll_interval_ms: 2_000,
            backoff_base_ms: 1_000,
            backoff_max_ms: 60_000,
            request_timeout_ms: 15_000,
        }
    }
}

impl RemoteConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        let backoff_base = self.backoff_base_ms.max(MIN_POLL_MS);
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_MS)),
            backoff_base: Duration::from_millis(backoff_base),
            backoff_max: Duration::from_millis(self.backoff_max_ms.max(backoff_base)),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(MIN_REQUEST_TIMEOUT_MS))
    }

    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty()
    }

    /// The API key for `url`: the system keyring first, then `api_key`.
    pub async fn resolve_api_key(&self) -> Result<String, ConfigError> {
        if !self.is_configured() {
            return Err(ConfigError::RemoteNotConfigured);
        }
        let url = self.url.trim();
        match keyring::load_api_key(url).await {
            Ok(Some(key)) => return Ok(key),
            Ok(None) => log::debug!("No API key for {} in keyring", url),
            Err(e) => log::warn!("Falling back to config API key: {}", e),
        }
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingApiKey(url.to_string()))
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct VortexConfig {
    pub version: u64,
    pub backend: Backend,
    pub data_directory: PathBuf,
    pub remote: RemoteConfig,
    pub browser_command: String,
    pub debug_logging: bool,
}

impl Default for VortexConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            backend: Backend::default(),
            data_directory: default_data_dir(),
            remote: RemoteConfig::default(),
            browser_command: default_browser_command(),
            debug_logging: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("no remote URL configured")]
    RemoteNotConfigured,
    #[error("no API key for {0} in the keyring or the config file")]
    MissingApiKey(String),
}

impl VortexConfig {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("vortex")
            .join("config.json")
    }

    /// Read the config at `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Like [`load_from`](Self::load_from), but falls back to the defaults on
    /// any error after logging it.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load_from(path).unwrap_or_else(|e| {
            log::error!("Using default config: {}", e);
            Self::default()
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, json).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = VortexConfig::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, VortexConfig::default());
        assert_eq!(config.backend, Backend::Local);
        assert_eq!(config.remote.table, "apps");
        assert_eq!(config.browser_command, "xdg-open");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "backend": "remote", "remote": { "url": "https://x.supabase.co" } }"#,
        )
        .unwrap();
        let config = VortexConfig::load_from(&path).unwrap();
        assert_eq!(config.backend, Backend::Remote);
        assert!(config.remote.is_configured());
        assert_eq!(config.remote.poll_interval_ms, 2_000);
    }

    #[test]
    fn invalid_file_is_an_error_but_load_or_default_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(
            VortexConfig::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
        assert_eq!(VortexConfig::load_or_default(&path), VortexConfig::default());
    }

    #[test]
    fn save_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = VortexConfig::default();
        config.remote.url = "https://x.supabase.co".into();
        config.debug_logging = true;
        config.save_to(&path).unwrap();
        assert_eq!(VortexConfig::load_from(&path).unwrap(), config);
    }

    #[tokio::test]
    async fn unconfigured_remote_has_no_key() {
        let remote = RemoteConfig {
            api_key: Some("secret".into()),
            ..RemoteConfig::default()
        };
        assert!(matches!(
            remote.resolve_api_key().await,
            Err(ConfigError::RemoteNotConfigured)
        ));
    }

    #[test]
    fn poll_policy_is_clamped() {
        let remote = RemoteConfig {
            poll_interval_ms: 0,
            backoff_base_ms: 500,
            backoff_max_ms: 10,
            ..RemoteConfig::default()
        };
        let policy = remote.poll_policy();
        assert_eq!(policy.interval, Duration::from_millis(100));
        assert_eq!(policy.backoff_max, Duration::from_millis(500));

        let zeroed = RemoteConfig {
            backoff_base_ms: 0,
            backoff_max_ms: 0,
            ..RemoteConfig::default()
        };
        let policy = zeroed.poll_policy();
        assert_eq!(policy.backoff_base, Duration::from_millis(100));
        assert_eq!(policy.backoff_max, Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(5), Duration::from_millis(100));
    }

    #[test]
    fn request_timeout_has_a_floor() {
        let remote = RemoteConfig {
            request_timeout_ms: 0,
            ..RemoteConfig::default()
        };
        assert_eq!(remote.request_timeout(), Duration::from_secs(1));
        assert_eq!(
            RemoteConfig::default().request_timeout(),
            Duration::from_secs(15)
        );
    }
}
