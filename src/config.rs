//! Application settings, read once at start-up from a TOML file.
//!
//! Lookup order: the path in `NER_SHEET_CONFIG`, then `ner-sheet.toml` in the
//! working directory. A missing file means defaults; a broken file is logged
//! and also falls back to defaults so the window still opens.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::annotate::retry::RetryPolicy;
use crate::annotate::spec::CollisionPolicy;

pub const CONFIG_ENV: &str = "NER_SHEET_CONFIG";
pub const CONFIG_FILE: &str = "ner-sheet.toml";

/// Which implementation answers `predict_entities`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Remote inference server speaking JSON over HTTP.
    #[default]
    Http,
    /// Local ONNX model through gline-rs (requires the `gliner` feature).
    Gliner,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            initial_backoff_ms: policy.initial_backoff.as_millis() as u64,
            max_backoff_ms: policy.max_backoff.as_millis() as u64,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend: Backend,
    /// Base URL of the inference server (`http` backend).
    pub endpoint: String,
    pub request_timeout_secs: u64,
    /// Directory holding one sub-directory per model id (`gliner` backend).
    pub model_dir: PathBuf,
    /// Models offered in the model picker.
    pub models: Vec<String>,
    pub default_model: String,
    pub default_threshold: f32,
    pub collision: CollisionPolicy,
    pub retry: RetrySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            endpoint: "http://127.0.0.1:8080".to_string(),
            request_timeout_secs: 30,
            model_dir: PathBuf::from("models"),
            models: vec![
                "urchade/gliner_multi-v2.1".to_string(),
                "urchade/gliner_medium-v2.1".to_string(),
                "urchade/gliner_small-v2.1".to_string(),
                "urchade/gliner_large-v2.1".to_string(),
            ],
            default_model: "urchade/gliner_medium-v2.1".to_string(),
            default_threshold: 0.5,
            collision: CollisionPolicy::default(),
            retry: RetrySettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from the usual locations, never failing.
    pub fn load() -> Self {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::from_path(&path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::error!("Ignoring config {}: {e:#}", path.display());
                Self::default()
            }
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut settings: Settings = toml::from_str(text).context("parsing settings TOML")?;
        settings.default_threshold = if settings.default_threshold.is_finite() {
            settings.default_threshold.clamp(0.0, 1.0)
        } else {
            Self::default().default_threshold
        };
        if !settings.models.contains(&settings.default_model) {
            settings.models.push(settings.default_model.clone());
        }
        Ok(settings)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let s = Settings::from_toml_str("").unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.models.len(), 4);
        assert_eq!(s.retry.policy().max_attempts, 3);
    }

    #[test]
    fn fields_override_defaults() {
        let s = Settings::from_toml_str(
            r#"
            backend = "gliner"
            collision = "overwrite"
            default_model = "onnx-community/gliner_small-v2.1"
            default_threshold = 1.7

            [retry]
            max_attempts = 0
            initial_backoff_ms = 10
            "#,
        )
        .unwrap();
        assert_eq!(s.backend, Backend::Gliner);
        assert_eq!(s.collision, CollisionPolicy::Overwrite);
        assert_eq!(s.default_threshold, 1.0);
        assert!(s.models.contains(&"onnx-community/gliner_small-v2.1".to_string()));

        let policy = s.retry.policy();
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.initial_backoff, Duration::from_millis(10));
        assert_eq!(policy.max_backoff, Duration::from_secs(60));
    }

    #[test]
    fn nan_threshold_falls_back_to_default() {
        let s = Settings::from_toml_str("default_threshold = nan").unwrap();
        assert_eq!(s.default_threshold, 0.5);
        let s = Settings::from_toml_str("default_threshold = -inf").unwrap();
        assert_eq!(s.default_threshold, 0.5);
    }

    #[test]
    fn unknown_backend_is_an_error() {
        assert!(Settings::from_toml_str(r#"backend = "python""#).is_err());
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "endpoint = \"http://ner.local:9000\"\n").unwrap();
        let s = Settings::from_path(&path).unwrap();
        assert_eq!(s.endpoint, "http://ner.local:9000");
    }
}
