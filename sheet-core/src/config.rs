//! Runtime configuration.

use crate::autosave::DEFAULT_AUTOSAVE_DELAY;
use directories::ProjectDirs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const ENV_DATA_DIR: &str = "SHEET_DATA_DIR";
pub const ENV_API_URL: &str = "SHEET_API_URL";
pub const ENV_AUTOSAVE_MS: &str = "SHEET_AUTOSAVE_MS";
pub const ENV_REFERENCE_URL: &str = "SHEET_REFERENCE_URL";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No data directory available; set SHEET_DATA_DIR")]
    NoDataDir,

    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// Where characters live and which services to talk to.
#[derive(Debug, Clone)]
pub struct SheetConfig {
    /// Root for `characters/` and `auth.json`.
    pub data_dir: PathBuf,

    /// Character sheet service base URL.
    pub api_url: String,

    /// Quiet period before an edit is written locally.
    pub autosave_delay: Duration,

    /// Reference data mirror base URL.
    pub reference_url: String,

    /// Spell sources offered by the catalog.
    pub spell_sources: Vec<String>,
}

impl SheetConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            api_url: sheet_api::DEFAULT_API_URL.to_string(),
            autosave_delay: DEFAULT_AUTOSAVE_DELAY,
            reference_url: sheet_api::catalog::DEFAULT_BASE_URL.to_string(),
            spell_sources: sheet_api::catalog::DEFAULT_SPELL_SOURCES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Set the service base URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Set the autosave quiet period.
    pub fn with_autosave_delay(mut self, delay: Duration) -> Self {
        self.autosave_delay = delay;
        self
    }

    pub fn with_reference_url(mut self, url: impl Into<String>) -> Self {
        self.reference_url = url.into();
        self
    }

    pub fn with_spell_sources(mut self, sources: Vec<String>) -> Self {
        self.spell_sources = sources;
        self
    }

    /// Build from `SHEET_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = match lookup(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir().ok_or(ConfigError::NoDataDir)?,
        };

        let mut config = Self::new(data_dir);

        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            config.api_url = url;
        }
        if let Some(url) = lookup(ENV_REFERENCE_URL).filter(|v| !v.trim().is_empty()) {
            config.reference_url = url;
        }
        if let Some(ms) = lookup(ENV_AUTOSAVE_MS) {
            let millis: u64 = ms.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: ENV_AUTOSAVE_MS,
                value: ms.clone(),
            })?;
            config.autosave_delay = Duration::from_millis(millis);
        }

        Ok(config)
    }

    pub fn characters_dir(&self) -> PathBuf {
        self.data_dir.join("characters")
    }

    pub fn auth_path(&self) -> PathBuf {
        self.data_dir.join("auth.json")
    }
}

/// Platform data directory, e.g. `~/.local/share/charactersheet`.
pub fn default_data_dir() -> Option<PathBuf> {
    ProjectDirs::from("io", "charactersheet", "charactersheet").map(|d| d.data_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_builder() {
        let config = SheetConfig::new("/tmp/sheets")
            .with_api_url("https://sheets.example.com/api")
            .with_autosave_delay(Duration::from_millis(50));

        assert_eq!(config.api_url, "https://sheets.example.com/api");
        assert_eq!(config.autosave_delay, Duration::from_millis(50));
        assert_eq!(config.characters_dir(), PathBuf::from("/tmp/sheets/characters"));
        assert_eq!(config.auth_path(), PathBuf::from("/tmp/sheets/auth.json"));
        assert_eq!(config.spell_sources, vec!["PHB", "XGE", "TCE"]);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = SheetConfig::from_lookup(lookup(&[
            (ENV_DATA_DIR, "/data"),
            (ENV_API_URL, "http://api.test"),
            (ENV_AUTOSAVE_MS, "250"),
        ]))
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/data"));
        assert_eq!(config.api_url, "http://api.test");
        assert_eq!(config.autosave_delay, Duration::from_millis(250));
        assert_eq!(
            config.reference_url,
            sheet_api::catalog::DEFAULT_BASE_URL.to_string()
        );
    }

    #[test]
    fn test_from_lookup_rejects_bad_delay() {
        let err = SheetConfig::from_lookup(lookup(&[
            (ENV_DATA_DIR, "/data"),
            (ENV_AUTOSAVE_MS, "soon"),
        ]))
        .unwrap_err();

        assert_eq!(
            err,
            ConfigError::InvalidValue {
                var: ENV_AUTOSAVE_MS,
                value: "soon".to_string()
            }
        );
    }
}
