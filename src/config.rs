use std::env;
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_MODELS: [&str; 4] = [
    "google/gemini-2.0-flash-exp:free",
    "openrouter/optimus-alpha",
    "meta-llama/llama-4-scout:free",
    "nvidia/llama-3.1-nemotron-ultra-253b-v1:free",
];
const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful personal AI assistant named Hopper.";
const DEFAULT_CUSTOM_CONTEXT: &str = "Always use casual language in your response. \
Your responses should be short, concise and to the point. \
Do your best to sound as human as possible.";
const DEFAULT_MAX_TOKENS: u32 = 4000;
const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("OPENROUTER_API_KEY is not set; add it to the environment or a .env file")]
    MissingApiKey,
    #[error("OPENROUTER_BASE_URL is set but empty")]
    EmptyEndpoint,
    #[error("OPENROUTER_MODELS does not name any model")]
    EmptyRoster,
}

#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub models: Vec<String>,
    pub referer: Option<String>,
    pub title: Option<String>,
    pub system_prompt: String,
    pub custom_context: String,
    pub max_tokens: u32,
    pub model_timeout_secs: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("models", &self.models)
            .field("referer", &self.referer)
            .field("title", &self.title)
            .field("system_prompt", &self.system_prompt)
            .field("custom_context", &self.custom_context)
            .field("max_tokens", &self.max_tokens)
            .field("model_timeout_secs", &self.model_timeout_secs)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| env::var(key).ok())
    }

    fn from_env_with(
        mut get_var: impl FnMut(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let api_key = non_blank(get_var("OPENROUTER_API_KEY")).ok_or(ConfigError::MissingApiKey)?;
        let base_url = parse_base_url(get_var("OPENROUTER_BASE_URL").as_deref())?;
        let models = parse_models(get_var("OPENROUTER_MODELS").as_deref())?;

        Ok(Self {
            api_key,
            base_url,
            models,
            referer: non_blank(get_var("OPENROUTER_REFERER")),
            title: non_blank(get_var("OPENROUTER_TITLE")),
            system_prompt: get_var("SYSTEM_PROMPT")
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            custom_context: get_var("CUSTOM_CONTEXT")
                .unwrap_or_else(|| DEFAULT_CUSTOM_CONTEXT.to_string()),
            max_tokens: parse_max_tokens(get_var("MAX_TOKENS").as_deref()),
            model_timeout_secs: parse_model_timeout_secs(get_var("MODEL_TIMEOUT_SECS").as_deref()),
        })
    }
}

fn non_blank(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_base_url(raw: Option<&str>) -> Result<String, ConfigError> {
    match raw.map(str::trim) {
        None => Ok(DEFAULT_BASE_URL.to_string()),
        Some("") => Err(ConfigError::EmptyEndpoint),
        Some(url) => Ok(url.to_string()),
    }
}

fn parse_models(raw: Option<&str>) -> Result<Vec<String>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_MODELS.iter().map(|model| model.to_string()).collect());
    };

    let models: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|model| !model.is_empty())
        .map(str::to_string)
        .collect();
    if models.is_empty() {
        return Err(ConfigError::EmptyRoster);
    }
    Ok(models)
}

fn parse_positive_u64(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn parse_model_timeout_secs(raw: Option<&str>) -> u64 {
    parse_positive_u64(raw, DEFAULT_MODEL_TIMEOUT_SECS)
}

fn parse_max_tokens(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_MAX_TOKENS)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{
        Config, ConfigError, DEFAULT_BASE_URL, DEFAULT_CUSTOM_CONTEXT, DEFAULT_MAX_TOKENS,
        DEFAULT_MODEL_TIMEOUT_SECS, DEFAULT_MODELS, DEFAULT_SYSTEM_PROMPT, parse_max_tokens,
        parse_model_timeout_secs, parse_models,
    };

    fn config_from_pairs(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        Config::from_env_with(|key| vars.get(key).cloned())
    }

    #[test]
    fn from_env_uses_defaults_when_only_key_is_set() {
        let cfg = config_from_pairs(&[("OPENROUTER_API_KEY", "sk-test")]).expect("config");
        assert_eq!(cfg.api_key, "sk-test");
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.models, DEFAULT_MODELS);
        assert_eq!(cfg.referer, None);
        assert_eq!(cfg.title, None);
        assert_eq!(cfg.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(cfg.custom_context, DEFAULT_CUSTOM_CONTEXT);
        assert_eq!(cfg.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(cfg.model_timeout_secs, DEFAULT_MODEL_TIMEOUT_SECS);
    }

    #[test]
    fn from_env_reads_configured_values() {
        let cfg = config_from_pairs(&[
            ("OPENROUTER_API_KEY", " sk-live "),
            ("OPENROUTER_BASE_URL", "http://localhost:9999/v1/chat/completions"),
            ("OPENROUTER_MODELS", "a/one, b/two ,,c/three"),
            ("OPENROUTER_REFERER", "https://example.com"),
            ("OPENROUTER_TITLE", "Hopper"),
            ("SYSTEM_PROMPT", "Be concise."),
            ("CUSTOM_CONTEXT", ""),
            ("MAX_TOKENS", "256"),
            ("MODEL_TIMEOUT_SECS", "15"),
        ])
        .expect("config");

        assert_eq!(cfg.api_key, "sk-live");
        assert_eq!(cfg.base_url, "http://localhost:9999/v1/chat/completions");
        assert_eq!(cfg.models, ["a/one", "b/two", "c/three"]);
        assert_eq!(cfg.referer.as_deref(), Some("https://example.com"));
        assert_eq!(cfg.title.as_deref(), Some("Hopper"));
        assert_eq!(cfg.system_prompt, "Be concise.");
        assert_eq!(cfg.custom_context, "");
        assert_eq!(cfg.max_tokens, 256);
        assert_eq!(cfg.model_timeout_secs, 15);
    }

    #[test]
    fn missing_or_blank_api_key_is_rejected() {
        assert_eq!(
            config_from_pairs(&[]).unwrap_err(),
            ConfigError::MissingApiKey
        );
        assert_eq!(
            config_from_pairs(&[("OPENROUTER_API_KEY", "   ")]).unwrap_err(),
            ConfigError::MissingApiKey
        );
    }

    #[test]
    fn blank_endpoint_is_rejected() {
        let err = config_from_pairs(&[("OPENROUTER_API_KEY", "k"), ("OPENROUTER_BASE_URL", " ")])
            .unwrap_err();
        assert_eq!(err, ConfigError::EmptyEndpoint);
    }

    #[test]
    fn roster_without_entries_is_rejected() {
        let err = config_from_pairs(&[("OPENROUTER_API_KEY", "k"), ("OPENROUTER_MODELS", " , ")])
            .unwrap_err();
        assert_eq!(err, ConfigError::EmptyRoster);
        assert_eq!(parse_models(Some("")), Err(ConfigError::EmptyRoster));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let cfg = config_from_pairs(&[("OPENROUTER_API_KEY", "sk-secret")]).expect("config");
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("sk-secret"), "leaked key: {rendered}");
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn numeric_settings_fall_back_for_invalid_values() {
        assert_eq!(parse_model_timeout_secs(None), DEFAULT_MODEL_TIMEOUT_SECS);
        assert_eq!(parse_model_timeout_secs(Some("0")), DEFAULT_MODEL_TIMEOUT_SECS);
        assert_eq!(parse_model_timeout_secs(Some("abc")), DEFAULT_MODEL_TIMEOUT_SECS);
        assert_eq!(parse_model_timeout_secs(Some("  90  ")), 90);
        assert_eq!(parse_max_tokens(Some("-5")), DEFAULT_MAX_TOKENS);
        assert_eq!(parse_max_tokens(Some("0")), DEFAULT_MAX_TOKENS);
        assert_eq!(parse_max_tokens(Some("1024")), 1024);
    }
}
