use dialogue_flow::{DEFAULT_MAX_MESSAGES, GenerationParams};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Service settings, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub openrouter_api_key: String,
    pub model: String,
    pub port: u16,
    /// Absent means patient records are served from memory.
    pub database_url: Option<String>,
    pub max_conversation_history: usize,
    pub generation: GenerationParams,
    pub completion_timeout: Duration,
    /// Absent means conversations live for the whole process.
    pub conversation_ttl: Option<Duration>,
    pub allowed_origins: Vec<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let openrouter_api_key =
            var("OPENROUTER_API_KEY").ok_or(ConfigError::Missing("OPENROUTER_API_KEY"))?;

        let allowed_origins = var("ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| vec!["http://localhost:3000".to_string()]);

        Ok(Self {
            openrouter_api_key,
            model: var("OPENROUTER_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            port: parse_or("PORT", var("PORT"), 3000)?,
            database_url: var("DATABASE_URL"),
            max_conversation_history: parse_or(
                "MAX_CONVERSATION_HISTORY",
                var("MAX_CONVERSATION_HISTORY"),
                DEFAULT_MAX_MESSAGES,
            )?,
            generation: GenerationParams {
                temperature: parse_or(
                    "MODEL_TEMPERATURE",
                    var("MODEL_TEMPERATURE"),
                    GenerationParams::DIALOGUE.temperature,
                )?,
                max_tokens: parse_or(
                    "MAX_OUTPUT_TOKENS",
                    var("MAX_OUTPUT_TOKENS"),
                    GenerationParams::DIALOGUE.max_tokens,
                )?,
            },
            completion_timeout: Duration::from_secs(parse_or(
                "COMPLETION_TIMEOUT_SECS",
                var("COMPLETION_TIMEOUT_SECS"),
                60,
            )?),
            conversation_ttl: var("CONVERSATION_TTL_SECS")
                .map(|raw| parse_or("CONVERSATION_TTL_SECS", Some(raw), 0))
                .transpose()?
                .map(Duration::from_secs),
            allowed_origins,
        })
    }
}

fn parse_or<T: FromStr>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings(&[("OPENROUTER_API_KEY", "key")]).unwrap();
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.port, 3000);
        assert_eq!(settings.max_conversation_history, 10);
        assert_eq!(settings.generation, GenerationParams::DIALOGUE);
        assert_eq!(settings.completion_timeout, Duration::from_secs(60));
        assert!(settings.database_url.is_none());
        assert!(settings.conversation_ttl.is_none());
        assert_eq!(settings.allowed_origins, vec!["http://localhost:3000"]);
    }

    #[test]
    fn test_api_key_required() {
        let err = settings(&[("OPENROUTER_API_KEY", "  ")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("OPENROUTER_API_KEY")));
    }

    #[test]
    fn test_overrides() {
        let settings = settings(&[
            ("OPENROUTER_API_KEY", "key"),
            ("PORT", "8000"),
            ("MAX_CONVERSATION_HISTORY", "20"),
            ("MODEL_TEMPERATURE", "0.2"),
            ("CONVERSATION_TTL_SECS", "3600"),
            ("ALLOWED_ORIGINS", "http://a.test, http://b.test"),
        ])
        .unwrap();
        assert_eq!(settings.port, 8000);
        assert_eq!(settings.max_conversation_history, 20);
        assert_eq!(settings.generation.temperature, 0.2);
        assert_eq!(settings.conversation_ttl, Some(Duration::from_secs(3600)));
        assert_eq!(settings.allowed_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = settings(&[("OPENROUTER_API_KEY", "key"), ("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }
}
