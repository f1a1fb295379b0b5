use std::env;
use std::str::FromStr;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub llm_provider: String,
    pub llm_model: String,
    pub llm_base_url: Option<String>,
    /// Read eagerly, validated only when a generation call needs it.
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            port: parse_var(&lookup, "APP_PORT", 8080)?,
            environment: or("APP_ENVIRONMENT", "development"),
            llm_provider: or("LLM_PROVIDER", "gemini"),
            llm_model: or("LLM_MODEL", "gemini-3-pro-preview"),
            llm_base_url: lookup("LLM_BASE_URL").filter(|v| !v.trim().is_empty()),
            api_key: lookup("API_KEY"),
            request_timeout_secs: parse_var(&lookup, "REQUEST_TIMEOUT_SECS", 300)?,
            otel_service_name: or("OTEL_SERVICE_NAME", "profile-analysis-service"),
            otel_exporter_endpoint: or("OTEL_EXPORTER_OTLP_ENDPOINT", "http://localhost:4317"),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a number, got {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.environment, "development");
        assert_eq!(config.llm_provider, "gemini");
        assert_eq!(config.llm_model, "gemini-3-pro-preview");
        assert_eq!(config.request_timeout_secs, 300);
        assert!(config.api_key.is_none());
        assert!(config.llm_base_url.is_none());
        assert!(!config.is_production());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("APP_PORT", "9090"),
            ("APP_ENVIRONMENT", "production"),
            ("LLM_PROVIDER", "openai"),
            ("LLM_BASE_URL", "http://localhost:11434/v1"),
            ("API_KEY", "secret"),
        ])
        .unwrap();
        assert_eq!(config.port, 9090);
        assert!(config.is_production());
        assert_eq!(config.llm_provider, "openai");
        assert_eq!(config.llm_base_url.as_deref(), Some("http://localhost:11434/v1"));
        assert_eq!(config.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_placeholder_key_is_not_rejected_at_startup() {
        let config = config_from(&[("API_KEY", "undefined")]).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("undefined"));
    }

    #[test]
    fn test_invalid_port() {
        let err = config_from(&[("APP_PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("APP_PORT"));
    }

    #[test]
    fn test_blank_base_url_is_ignored() {
        let config = config_from(&[("LLM_BASE_URL", "  ")]).unwrap();
        assert!(config.llm_base_url.is_none());
    }
}
