//! Configuration management for the generation pipeline
//!
//! This module provides utilities for loading and validating configuration
//! for the model client, the video lookup client and the pipeline itself,
//! with support for environment variables.

use std::collections::HashMap;
use std::env;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Attempts per generation run, inclusive of the first one
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Hard ceiling the controller clamps any configured attempt count to
pub const MAX_ATTEMPTS_CEILING: u32 = 10;

/// Minimum view count a suggested video must have at verification time
pub const DEFAULT_MIN_VIEW_COUNT: u64 = 100_000;

/// Hosts YouTube serves canonical thumbnails from
pub const DEFAULT_THUMBNAIL_HOST_PATTERN: &str = r"^(i\d?\.ytimg\.com|img\.youtube\.com)$";

/// Base trait for configuration providers
pub trait ConfigProvider: Send + Sync {
    /// Get a string configuration value
    fn get_string(&self, key: &str) -> Result<String>;
}

/// Extension methods for configuration providers
pub trait ConfigProviderExt: ConfigProvider {
    fn get_int(&self, key: &str) -> Result<i64> {
        let value = self.get_string(key)?;
        value
            .parse::<i64>()
            .map_err(|e| ServiceError::configuration(format!("Invalid integer for key {}: {}", key, e)))
    }

    fn get_float(&self, key: &str) -> Result<f64> {
        let value = self.get_string(key)?;
        value
            .parse::<f64>()
            .map_err(|e| ServiceError::configuration(format!("Invalid float for key {}: {}", key, e)))
    }

    fn get_bool(&self, key: &str) -> Result<bool> {
        let value = self.get_string(key)?;
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(true),
            "false" | "no" | "0" | "off" => Ok(false),
            _ => Err(ServiceError::configuration(format!(
                "Invalid boolean value for key {}: {}",
                key, value
            ))),
        }
    }

    /// Get a duration value such as `500ms` or `30s`
    fn get_duration(&self, key: &str) -> Result<Duration> {
        let value = self.get_string(key)?;
        crate::util::parse_duration(&value)
            .ok_or_else(|| ServiceError::configuration(format!("Invalid duration for key {}: {}", key, value)))
    }

    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|_| default.to_string())
    }

    /// Get a non-negative integer; `default` applies only when the key is absent
    fn get_u64_or(&self, key: &str, default: u64) -> Result<u64> {
        if self.get_string(key).is_err() {
            return Ok(default);
        }
        let value = self.get_int(key)?;
        u64::try_from(value).map_err(|_| {
            ServiceError::configuration(format!("Value for key {} must not be negative, got {}", key, value))
        })
    }

    fn get_u32_or(&self, key: &str, default: u32) -> Result<u32> {
        let value = self.get_u64_or(key, u64::from(default))?;
        u32::try_from(value)
            .map_err(|_| ServiceError::configuration(format!("Value for key {} is out of range: {}", key, value)))
    }

    fn get_float_or(&self, key: &str, default: f64) -> f64 {
        self.get_float(key).unwrap_or(default)
    }

    fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProviderExt for T {}

/// Environment variable based configuration provider
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    /// Optional prefix for environment variables
    prefix: Option<String>,

    /// Optional namespace for variables (e.g., "OPENAI", "YOUTUBE")
    namespace: Option<String>,
}

impl EnvConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Format a configuration key as an environment variable
    pub(crate) fn format_key(&self, key: &str) -> String {
        let mut env_key = String::new();

        if let Some(ref prefix) = self.prefix {
            env_key.push_str(prefix);
            env_key.push('_');
        }

        if let Some(ref namespace) = self.namespace {
            env_key.push_str(namespace);
            env_key.push('_');
        }

        // uppercase, non-alphanumerics become underscores
        env_key.push_str(&key.to_uppercase().replace(|c: char| !c.is_ascii_alphanumeric(), "_"));

        env_key
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        let env_key = self.format_key(key);

        env::var(&env_key).map_err(|e| match e {
            env::VarError::NotPresent => {
                ServiceError::configuration(format!("Environment variable not set: {}", env_key))
            }
            env::VarError::NotUnicode(_) => ServiceError::configuration(format!(
                "Environment variable is not valid unicode: {}",
                env_key
            )),
        })
    }
}

/// In-memory config provider for testing or static configuration
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigProvider {
    values: HashMap<String, String>,
}

impl MemoryConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: ToString,
    {
        self.values.insert(key.into(), value.to_string());
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| ServiceError::configuration(format!("Configuration key not found: {}", key)))
    }
}

/// Global default configuration provider
pub static DEFAULT_PROVIDER: Lazy<Arc<EnvConfigProvider>> =
    Lazy::new(|| Arc::new(EnvConfigProvider::new().with_prefix("PORTFOLIO")));

/// Trait for service-specific configuration
pub trait ServiceConfig: Debug + Send + Sync {
    /// Validate this configuration
    fn validate(&self) -> Result<()>;

    fn service_name(&self) -> &str;
}

/// Configuration for the OpenAI-compatible generation endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    pub api_key: String,

    /// Organization ID (optional)
    pub org_id: Option<String>,

    /// Base URL (can be changed for proxies and compatible providers)
    pub base_url: String,

    /// Chat model used for generation
    pub model: String,

    pub temperature: f32,

    pub timeout_seconds: u64,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            org_id: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            timeout_seconds: 60,
        }
    }
}

impl OpenAIConfig {
    /// Load configuration from a config provider
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            api_key: provider.get_string("openai_api_key")?,
            org_id: provider.get_string("openai_org_id").ok(),
            base_url: provider.get_string_or("openai_base_url", &defaults.base_url),
            model: provider.get_string_or("openai_model", &defaults.model),
            temperature: provider.get_float_or("openai_temperature", defaults.temperature as f64) as f32,
            timeout_seconds: provider.get_u64_or("openai_timeout_seconds", defaults.timeout_seconds)?,
        };

        config.validate()?;
        Ok(config)
    }
}

impl ServiceConfig for OpenAIConfig {
    fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(ServiceError::configuration("OpenAI API key is required"));
        }

        if self.base_url.is_empty() {
            return Err(ServiceError::configuration("OpenAI base URL is required"));
        }

        if self.model.is_empty() {
            return Err(ServiceError::configuration("OpenAI model is required"));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ServiceError::configuration(format!(
                "OpenAI temperature must be within 0.0-2.0, got {}",
                self.temperature
            )));
        }

        Ok(())
    }

    fn service_name(&self) -> &str {
        "openai"
    }
}

/// Configuration for the YouTube Data API (video verification)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YouTubeConfig {
    pub api_key: String,

    pub base_url: String,

    pub timeout_seconds: u64,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            timeout_seconds: 15,
        }
    }
}

impl YouTubeConfig {
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            api_key: provider.get_string("youtube_api_key")?,
            base_url: provider.get_string_or("youtube_base_url", &defaults.base_url),
            timeout_seconds: provider.get_u64_or("youtube_timeout_seconds", defaults.timeout_seconds)?,
        };

        config.validate()?;
        Ok(config)
    }
}

impl ServiceConfig for YouTubeConfig {
    fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(ServiceError::configuration("YouTube API key is required"));
        }

        if self.base_url.is_empty() {
            return Err(ServiceError::configuration("YouTube base URL is required"));
        }

        Ok(())
    }

    fn service_name(&self) -> &str {
        "youtube"
    }
}

/// Exponential delay applied before retrying after an upstream failure
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
    pub randomization_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(5),
            multiplier: 2.0,
            randomization_factor: 0.2,
        }
    }
}

/// Configuration of the generation pipeline itself
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Attempts per run, inclusive of the first
    pub max_attempts: u32,

    /// Quality bar for verified videos
    pub min_view_count: u64,

    /// Regex the thumbnail URL's host must match
    pub thumbnail_host_pattern: String,

    /// Delay between attempts after upstream failures; `None` retries immediately
    pub upstream_backoff: Option<BackoffConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_view_count: DEFAULT_MIN_VIEW_COUNT,
            thumbnail_host_pattern: DEFAULT_THUMBNAIL_HOST_PATTERN.to_string(),
            upstream_backoff: None,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a config provider; every key is optional
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let defaults = Self::default();

        let upstream_backoff = match provider.get_string("pipeline_upstream_backoff") {
            Ok(_) => {
                let initial_interval = provider.get_duration("pipeline_upstream_backoff")?;
                let max_interval = provider
                    .get_duration("pipeline_upstream_backoff_max")
                    .unwrap_or_else(|_| BackoffConfig::default().max_interval.max(initial_interval));
                Some(BackoffConfig {
                    initial_interval,
                    max_interval,
                    ..BackoffConfig::default()
                })
            }
            Err(_) => None,
        };

        let config = Self {
            max_attempts: provider.get_u32_or("pipeline_max_attempts", defaults.max_attempts)?,
            min_view_count: provider.get_u64_or("pipeline_min_view_count", defaults.min_view_count)?,
            thumbnail_host_pattern: provider
                .get_string_or("pipeline_thumbnail_host_pattern", &defaults.thumbnail_host_pattern),
            upstream_backoff,
        };

        config.validate()?;
        Ok(config)
    }

    /// Compile the thumbnail host pattern
    pub fn thumbnail_host_regex(&self) -> Result<Regex> {
        Regex::new(&self.thumbnail_host_pattern).map_err(|e| {
            ServiceError::configuration(format!("Invalid thumbnail host pattern: {}", e))
        })
    }
}

impl ServiceConfig for PipelineConfig {
    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 || self.max_attempts > MAX_ATTEMPTS_CEILING {
            return Err(ServiceError::configuration(format!(
                "max_attempts must be within 1-{}, got {}",
                MAX_ATTEMPTS_CEILING, self.max_attempts
            )));
        }

        self.thumbnail_host_regex()?;

        if let Some(ref backoff) = self.upstream_backoff {
            if backoff.initial_interval > backoff.max_interval {
                return Err(ServiceError::configuration(
                    "upstream backoff initial interval exceeds its maximum",
                ));
            }
        }

        Ok(())
    }

    fn service_name(&self) -> &str {
        "pipeline"
    }
}
