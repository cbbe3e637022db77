use std::collections::HashSet;
use std::env;

use anyhow::{Context, Result};
use dotenvy::dotenv;

/// Application configuration loaded from environment variables.
///
/// Built once at startup and treated as immutable for the life of the
/// process. Tests construct values directly instead of going through the
/// environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub app_env: String,
    pub database_url: String,
    pub api_port: u16,
    /// Comma-separated list of accepted API tokens; empty disables auth.
    pub local_api_token: String,

    pub max_iterations: u32,
    pub qa_threshold: f64,
    pub qa_random_review_ratio: f64,

    pub raw_retention_days: u32,
    pub intermediate_retention_days: u32,
    pub output_retention_days: u32,

    /// "api" uses the remote inference provider; "local" runs bundled models.
    pub model_runtime_mode: String,
    pub model_api_provider: String,
    pub model_api_base_url: Option<String>,
    pub model_api_key: Option<String>,
    pub models_dir: String,
    pub allow_local_model_install: bool,
    pub allow_api_stub_fallback: bool,
    pub remote_model_timeout_seconds: f64,
    pub remote_model_max_retries: u32,

    pub enable_fallback_orchestrator: bool,
    pub restate_ingress_url: String,

    pub callback_timeout_seconds: f64,
    pub callback_max_retries: u32,

    pub safety_admin_token: Option<String>,
    safety_override_allow_rules_raw: String,
    high_risk_review_keywords_raw: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string()),
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .context("API_PORT must be a valid number")?,
            local_api_token: env::var("LOCAL_API_TOKEN").unwrap_or_else(|_| "dev-token".to_string()),

            max_iterations: parse_env("MAX_ITERATIONS", 3)?,
            qa_threshold: parse_env("QA_THRESHOLD", 0.82)?,
            qa_random_review_ratio: parse_env("QA_RANDOM_REVIEW_RATIO", 0.2)?,

            raw_retention_days: parse_env("RAW_RETENTION_DAYS", 30)?,
            intermediate_retention_days: parse_env("INTERMEDIATE_RETENTION_DAYS", 7)?,
            output_retention_days: parse_env("OUTPUT_RETENTION_DAYS", 180)?,

            model_runtime_mode: env::var("MODEL_RUNTIME_MODE")
                .unwrap_or_else(|_| "api".to_string())
                .to_lowercase(),
            model_api_provider: env::var("MODEL_API_PROVIDER")
                .unwrap_or_else(|_| "openai_compatible".to_string()),
            model_api_base_url: env::var("MODEL_API_BASE_URL").ok(),
            model_api_key: env::var("MODEL_API_KEY").ok(),
            models_dir: env::var("MODELS_DIR").unwrap_or_else(|_| "models".to_string()),
            allow_local_model_install: parse_env_bool("ALLOW_LOCAL_MODEL_INSTALL", false),
            allow_api_stub_fallback: parse_env_bool("ALLOW_API_STUB_FALLBACK", true),
            remote_model_timeout_seconds: parse_env("REMOTE_MODEL_TIMEOUT_SECONDS", 45.0)?,
            remote_model_max_retries: parse_env("REMOTE_MODEL_MAX_RETRIES", 2)?,

            enable_fallback_orchestrator: parse_env_bool("ENABLE_FALLBACK_ORCHESTRATOR", true),
            restate_ingress_url: env::var("RESTATE_INGRESS_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),

            callback_timeout_seconds: parse_env("CALLBACK_TIMEOUT_SECONDS", 8.0)?,
            callback_max_retries: parse_env("CALLBACK_MAX_RETRIES", 2)?,

            safety_admin_token: env::var("SAFETY_ADMIN_TOKEN").ok(),
            safety_override_allow_rules_raw: env::var("SAFETY_OVERRIDE_ALLOW_RULES")
                .unwrap_or_default(),
            high_risk_review_keywords_raw: env::var("HIGH_RISK_REVIEW_KEYWORDS")
                .unwrap_or_else(|_| {
                    "public figure,politician,minor,medical,financial,news".to_string()
                }),
        })
    }

    /// Accepted API tokens. Empty list means token auth is disabled.
    pub fn api_tokens(&self) -> Vec<String> {
        split_comma_list(&self.local_api_token)
    }

    /// Rule ids an admin override is allowed to bypass.
    pub fn safety_override_allow_rules(&self) -> HashSet<String> {
        split_comma_list(&self.safety_override_allow_rules_raw)
            .into_iter()
            .collect()
    }

    /// Extra high-risk keywords on top of the built-in list, lowercased.
    pub fn high_risk_review_keywords(&self) -> Vec<String> {
        split_comma_list(&self.high_risk_review_keywords_raw)
            .into_iter()
            .map(|token| token.to_lowercase())
            .collect()
    }

    pub fn is_local_runtime(&self) -> bool {
        self.model_runtime_mode == "local"
    }

    /// Configuration suitable for unit tests; never reads the environment.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            app_env: "test".to_string(),
            database_url: "postgres://localhost/test".to_string(),
            api_port: 8000,
            local_api_token: "dev-token".to_string(),
            max_iterations: 3,
            qa_threshold: 0.82,
            qa_random_review_ratio: 0.2,
            raw_retention_days: 30,
            intermediate_retention_days: 7,
            output_retention_days: 180,
            model_runtime_mode: "api".to_string(),
            model_api_provider: "openai_compatible".to_string(),
            model_api_base_url: None,
            model_api_key: None,
            models_dir: "models".to_string(),
            allow_local_model_install: false,
            allow_api_stub_fallback: true,
            remote_model_timeout_seconds: 45.0,
            remote_model_max_retries: 2,
            enable_fallback_orchestrator: true,
            restate_ingress_url: "http://localhost:8080".to_string(),
            callback_timeout_seconds: 8.0,
            callback_max_retries: 2,
            safety_admin_token: None,
            safety_override_allow_rules_raw: String::new(),
            high_risk_review_keywords_raw:
                "public figure,politician,minor,medical,financial,news".to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_override_allow_rules(mut self, raw: &str) -> Self {
        self.safety_override_allow_rules_raw = raw.to_string();
        self
    }

    #[cfg(test)]
    pub fn with_high_risk_keywords(mut self, raw: &str) -> Self {
        self.high_risk_review_keywords_raw = raw.to_string();
        self
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{name} must be a valid value, got {raw:?}")),
        Err(_) => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|raw| raw.to_lowercase() == "true")
        .unwrap_or(default)
}

fn split_comma_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_tokens_split_and_trim() {
        let mut config = Config::for_tests();
        config.local_api_token = "alpha, beta ,,gamma".to_string();
        assert_eq!(config.api_tokens(), vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn empty_token_list_disables_auth() {
        let mut config = Config::for_tests();
        config.local_api_token = " ".to_string();
        assert!(config.api_tokens().is_empty());
    }

    #[test]
    fn override_allow_rules_parse_into_a_set() {
        let config = Config::for_tests().with_override_allow_rules("high_risk_face_swap, sexual_content");
        let rules = config.safety_override_allow_rules();
        assert!(rules.contains("high_risk_face_swap"));
        assert!(rules.contains("sexual_content"));
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn high_risk_keywords_are_lowercased() {
        let config = Config::for_tests().with_high_risk_keywords("Election,BREAKING news");
        assert_eq!(
            config.high_risk_review_keywords(),
            vec!["election", "breaking news"]
        );
    }
}
