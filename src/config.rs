use crate::paginator::{PageStyle, Paginator};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const API_URL_ENV: &str = "HANDBOOK_API_URL";
pub const DEFAULT_CONFIG_FILE: &str = "handbook.yaml";
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Rows kept free at the bottom of every page.
    pub safety_margin: u32,
    pub style: PageStyle,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            safety_margin: Paginator::default().safety_margin(),
            style: PageStyle::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub resize_debounce_ms: u64,
    pub pagination: PaginationConfig,
    pub log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: 15,
            resize_debounce_ms: 150,
            pagination: PaginationConfig::default(),
            log_file: "handbook.log".to_string(),
        }
    }
}

impl Config {
    /// Read `path`. A missing file is not an error and yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Load `path` or the default config file. On failure the defaults are
    /// returned with the error, which the caller logs once logging is up.
    pub fn load_or_default(path: Option<&Path>) -> (Self, Option<anyhow::Error>) {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        match Self::load(path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_api_override(std::env::var(API_URL_ENV).ok())
    }

    /// Replace the API address when `url` is set and not blank.
    pub fn with_api_override(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    pub fn paginator(&self) -> Paginator {
        Paginator::new(self.pagination.safety_margin)
    }

    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("nope.yaml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.resize_debounce(), Duration::from_millis(150));
        assert_eq!(config.paginator().safety_margin(), 1);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "api_base_url: https://camnang.example/api\npagination:\n  safety_margin: 3\n  style:\n    padding_x: 2"
        )
        .unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.api_base_url, "https://camnang.example/api");
        assert_eq!(config.pagination.safety_margin, 3);
        assert_eq!(config.pagination.style.padding_x, 2);
        assert_eq!(config.pagination.style.line_height, 1);
        assert_eq!(config.request_timeout_secs, 15);
    }

    #[test]
    fn test_invalid_yaml_falls_back_and_reports() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "request_timeout_secs: [not, a, number]").unwrap();
        assert!(Config::load(file.path()).is_err());

        let (config, error) = Config::load_or_default(Some(file.path()));
        assert_eq!(config, Config::default());
        let message = format!("{:#}", error.unwrap());
        assert!(message.contains("Failed to parse config file"), "{message}");

        let dir = tempfile::tempdir().unwrap();
        let (_, error) = Config::load_or_default(Some(&dir.path().join("nope.yaml")));
        assert!(error.is_none());
    }

    #[test]
    fn test_api_override() {
        let config = Config::default()
            .with_api_override(Some("  http://10.0.0.2:9000/api ".into()))
            .with_api_override(Some("   ".into()))
            .with_api_override(None);
        assert_eq!(config.api_base_url, "http://10.0.0.2:9000/api");
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = Config::default();
        let yaml = config.to_yaml().unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }
}
