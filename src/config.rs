//! Configuration loading and schema.
//!
//! Everything is defaulted so the service runs with no file at all; a TOML
//! file overrides per section:
//!
//! ```toml
//! [judge]
//! pool_capacity = 10
//! compile_timeout_secs = 10
//!
//! [server]
//! bind_addr = "0.0.0.0:8080"
//!
//! [callback]
//! base_url = "http://localhost:5129/"
//!
//! [docker.images]
//! cpp = "gcc:13"
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::Language;

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub judge: JudgeConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub callback: CallbackConfig,

    #[serde(default)]
    pub docker: DockerConfig,
}

/// Core judging settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JudgeConfig {
    /// Maximum number of warm sandbox containers.
    #[serde(default = "default_pool_capacity")]
    pub pool_capacity: usize,

    /// Fixed wall-clock budget for the compile step, in seconds.
    #[serde(default = "default_compile_timeout")]
    pub compile_timeout_secs: u64,

    /// CPU count for sandboxes; the submission wire format does not carry
    /// one.
    #[serde(default = "default_cpu_count")]
    pub default_cpu_count: u32,
}

impl JudgeConfig {
    pub fn compile_budget(&self) -> Duration {
        Duration::from_secs(self.compile_timeout_secs)
    }
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            pool_capacity: default_pool_capacity(),
            compile_timeout_secs: default_compile_timeout(),
            default_cpu_count: default_cpu_count(),
        }
    }
}

/// Intake HTTP server settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// Grading-service callback settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallbackConfig {
    /// Root URL of the grading service, trailing slash included.
    #[serde(default = "default_callback_base")]
    pub base_url: String,

    #[serde(default = "default_callback_timeout")]
    pub request_timeout_secs: u64,
}

impl CallbackConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            base_url: default_callback_base(),
            request_timeout_secs: default_callback_timeout(),
        }
    }
}

/// Container-runtime connection and image settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DockerConfig {
    /// HTTP endpoint of the daemon; local defaults when absent.
    pub host: Option<String>,

    #[serde(default)]
    pub images: ImageOverrides,
}

/// Per-language sandbox image overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ImageOverrides {
    pub cpp: Option<String>,
    pub python: Option<String>,
}

impl DockerConfig {
    /// Overrides keyed by language; absent languages use their built-in
    /// default image.
    pub fn image_map(&self) -> HashMap<Language, String> {
        let mut map = HashMap::new();
        if let Some(cpp) = &self.images.cpp {
            map.insert(Language::Cpp, cpp.clone());
        }
        if let Some(python) = &self.images.python {
            map.insert(Language::Python, python.clone());
        }
        map
    }
}

fn default_pool_capacity() -> usize {
    10
}

fn default_compile_timeout() -> u64 {
    10
}

fn default_cpu_count() -> u32 {
    1
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_callback_base() -> String {
    "http://localhost:5129/".to_string()
}

fn default_callback_timeout() -> u64 {
    30
}

/// Loads configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    load_config_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Loads configuration from a TOML string. Useful for tests and embedding.
pub fn load_config_str(content: &str) -> Result<Config> {
    toml::from_str(content).context("Failed to parse config")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_defaults() {
        let config = load_config_str("").unwrap();
        assert_eq!(config.judge.pool_capacity, 10);
        assert_eq!(config.judge.compile_timeout_secs, 10);
        assert_eq!(config.judge.default_cpu_count, 1);
        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.callback.base_url, "http://localhost:5129/");
        assert_eq!(config.callback.request_timeout_secs, 30);
        assert!(config.docker.host.is_none());
        assert!(config.docker.image_map().is_empty());
    }

    #[test]
    fn sections_override_independently() {
        let config = load_config_str(
            r#"
            [judge]
            pool_capacity = 4

            [callback]
            base_url = "http://grader.internal/"

            [docker]
            host = "http://dockerd:2375"

            [docker.images]
            cpp = "gcc:13"
        "#,
        )
        .unwrap();

        assert_eq!(config.judge.pool_capacity, 4);
        // Untouched fields keep their defaults.
        assert_eq!(config.judge.compile_timeout_secs, 10);
        assert_eq!(config.callback.base_url, "http://grader.internal/");
        assert_eq!(config.docker.host.as_deref(), Some("http://dockerd:2375"));

        let images = config.docker.image_map();
        assert_eq!(images.get(&Language::Cpp).unwrap(), "gcc:13");
        assert!(!images.contains_key(&Language::Python));
    }

    #[test]
    fn durations_convert() {
        let config = Config::default();
        assert_eq!(config.judge.compile_budget(), Duration::from_secs(10));
        assert_eq!(config.callback.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn garbage_toml_is_rejected() {
        assert!(load_config_str("not [valid").is_err());
    }
}
