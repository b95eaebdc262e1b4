use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::Url;
use serde::Deserialize;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SetupSettings {
    pub backend_url: String,
    pub request_timeout_ms: u64,
}

impl Default for SetupSettings {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl SetupSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Applies command-line/env overrides on top of file or default values.
    pub fn with_overrides(
        mut self,
        backend_url: Option<String>,
        timeout_ms: Option<u64>,
    ) -> Result<Self> {
        if let Some(url) = backend_url {
            self.backend_url = url;
        }
        if let Some(timeout_ms) = timeout_ms {
            self.request_timeout_ms = timeout_ms;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        let url = Url::parse(self.backend_url.trim())
            .with_context(|| format!("backend_url '{}' is not a valid URL", self.backend_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!(
                "backend_url '{}' must start with http:// or https://",
                self.backend_url
            );
        }
        if url.host_str().is_none_or(str::is_empty) {
            bail!("backend_url '{}' has no host", self.backend_url);
        }
        if self.request_timeout_ms == 0 {
            bail!("request_timeout_ms must be greater than zero");
        }
        Ok(())
    }
}

pub fn load_settings(path: &Path) -> Result<SetupSettings> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read settings file {}", path.display()))?;
    parse_settings_text(&content)
}

pub fn parse_settings_text(content: &str) -> Result<SetupSettings> {
    let raw = serde_json::from_str::<SettingsFile>(content).map_err(|err| {
        let line = err.line();
        let column = err.column();
        anyhow::anyhow!("invalid JSON at line {line}, column {column}: {err}")
    })?;

    if raw.version != 1 {
        bail!(
            "unsupported settings version {}; expected version 1",
            raw.version
        );
    }

    let settings = SetupSettings {
        backend_url: raw.backend_url,
        request_timeout_ms: raw.request_timeout_ms,
    };
    settings.validate()?;
    Ok(settings)
}

#[derive(Debug, Deserialize)]
struct SettingsFile {
    version: u32,
    #[serde(default = "default_backend_url")]
    backend_url: String,
    #[serde(default = "default_request_timeout_ms")]
    request_timeout_ms: u64,
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_settings_file() {
        let json = r#"
{
  "version": 1,
  "backend_url": "http://10.0.0.5:8000",
  "request_timeout_ms": 2500
}
"#;
        let settings = parse_settings_text(json).expect("valid settings");
        assert_eq!(settings.backend_url, "http://10.0.0.5:8000");
        assert_eq!(settings.request_timeout(), Duration::from_millis(2_500));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let settings = parse_settings_text(r#"{"version": 1}"#).expect("valid settings");
        assert_eq!(settings, SetupSettings::default());
    }

    #[test]
    fn rejects_unknown_version() {
        let err = parse_settings_text(r#"{"version": 2}"#).expect_err("version 2");
        assert!(err.to_string().contains("unsupported settings version"));
    }

    #[test]
    fn rejects_malformed_json_with_position() {
        let err = parse_settings_text("{ not json").expect_err("malformed");
        assert!(err.to_string().contains("invalid JSON at line 1"));
    }

    #[test]
    fn rejects_non_http_url_and_zero_timeout() {
        let err = parse_settings_text(r#"{"version": 1, "backend_url": "ftp://host"}"#)
            .expect_err("bad scheme");
        assert!(err.to_string().contains("must start with http"));

        let err = SetupSettings::default()
            .with_overrides(Some("http://".to_string()), None)
            .expect_err("no host");
        assert!(err.to_string().contains("not a valid URL"));

        let err = SetupSettings::default()
            .with_overrides(Some("localhost:8000".to_string()), None)
            .expect_err("no scheme");
        assert!(!err.to_string().is_empty());

        let err = SetupSettings::default()
            .with_overrides(None, Some(0))
            .expect_err("zero timeout");
        assert!(err.to_string().contains("greater than zero"));
    }

    #[test]
    fn overrides_win_over_file_values() {
        let settings = parse_settings_text(r#"{"version": 1, "request_timeout_ms": 500}"#)
            .expect("valid")
            .with_overrides(Some("https://heimdall.local".to_string()), None)
            .expect("valid overrides");
        assert_eq!(settings.backend_url, "https://heimdall.local");
        assert_eq!(settings.request_timeout_ms, 500);
    }
}
