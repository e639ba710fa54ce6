//! Client configuration.
//!
//! The API key is resolved once and carried in a [`Config`] value that is
//! handed to the client builder, so the client never reads the environment
//! on its own.

use crate::error::{ProPhotoError, Result};
use std::time::Duration;

/// Default Gemini API root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variables checked for the API key, in order.
pub const API_KEY_ENV_VARS: [&str; 3] = ["API_KEY", "GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Gemini image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeminiModel {
    /// Gemini 2.5 Flash Image.
    #[default]
    FlashImage,
}

impl GeminiModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FlashImage => "gemini-2.5-flash-image",
        }
    }
}

impl std::fmt::Display for GeminiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for the transformation client.
#[derive(Clone)]
pub struct Config {
    api_key: String,
    model: GeminiModel,
    base_url: String,
    timeout: Option<Duration>,
}

impl Config {
    /// Creates a config with the given API key and default settings.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProPhotoError::Auth("API key is empty".into()));
        }
        Ok(Self {
            api_key,
            model: GeminiModel::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
        })
    }

    /// Resolves the API key from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolves the API key through `lookup`, trying [`API_KEY_ENV_VARS`] in order.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| lookup(*name))
            .find(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                ProPhotoError::Auth(format!(
                    "no API key found (set one of {})",
                    API_KEY_ENV_VARS.join(", ")
                ))
            })?;
        Self::new(api_key)
    }

    /// Points the client at a different API root (used against mock servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets a request timeout. Without one a request waits until the
    /// service answers or the transport fails.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// The model.
    pub fn model(&self) -> GeminiModel {
        self.model
    }

    /// The API root.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The request timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
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
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_model_as_str() {
        assert_eq!(GeminiModel::FlashImage.as_str(), "gemini-2.5-flash-image");
        assert_eq!(GeminiModel::default(), GeminiModel::FlashImage);
    }

    #[test]
    fn test_from_lookup_prefers_api_key() {
        let config = Config::from_lookup(lookup(&[
            ("API_KEY", "primary"),
            ("GOOGLE_API_KEY", "fallback"),
        ]))
        .unwrap();
        assert_eq!(config.api_key(), "primary");
    }

    #[test]
    fn test_from_lookup_skips_blank_values() {
        let config =
            Config::from_lookup(lookup(&[("API_KEY", "  "), ("GOOGLE_API_KEY", "fallback")]))
                .unwrap();
        assert_eq!(config.api_key(), "fallback");
    }

    #[test]
    fn test_from_lookup_missing_key() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ProPhotoError::Auth(_)));
    }

    #[test]
    fn test_defaults_and_overrides() {
        let config = Config::new("k").unwrap();
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert!(config.timeout().is_none());

        let config = config
            .with_base_url("http://127.0.0.1:9000/")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.base_url(), "http://127.0.0.1:9000");
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = Config::new("super-secret").unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
    }
}
