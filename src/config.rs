use std::env;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is not a valid value: {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("{name} must be at least {min} bytes")]
    TooShort { name: &'static str, min: usize },
}

/// Minimum length of `SESSION_SECRET`, the size of a cookie signing key.
pub const SESSION_SECRET_MIN_LEN: usize = 64;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Postgres connection string; the in-memory store is used when unset.
    pub database_url: Option<String>,
    pub cors_origin: String,
    /// Signs the session cookie; a random per-process key is used when unset.
    pub session_secret: Option<String>,
    pub openai: OpenAiConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: raw,
            })?,
            None => 5000,
        };

        let defaults = OpenAiConfig::default();
        let openai = OpenAiConfig {
            api_key: get("OPENAI_API_KEY").or_else(|| get("OPENAI_API_KEY_ENV_VAR")),
            model: get("OPENAI_MODEL").unwrap_or(defaults.model),
            base_url: get("OPENAI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
        };

        let session_secret = get("SESSION_SECRET");
        if session_secret.as_ref().is_some_and(|s| s.len() < SESSION_SECRET_MIN_LEN) {
            return Err(ConfigError::TooShort {
                name: "SESSION_SECRET",
                min: SESSION_SECRET_MIN_LEN,
            });
        }

        Ok(Self {
            port,
            session_secret,
            database_url: get("DATABASE_URL"),
            cors_origin: get("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:5173".to_string()),
            openai,
        })
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
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 5000);
        assert!(config.database_url.is_none());
        assert!(config.openai.api_key.is_none());
        assert!(config.session_secret.is_none());
        assert_eq!(config.openai.model, "gpt-4o");
        assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_legacy_key_variable_is_honoured() {
        let config =
            AppConfig::from_lookup(lookup(&[("OPENAI_API_KEY_ENV_VAR", "sk-legacy")])).unwrap();
        assert_eq!(config.openai.api_key.as_deref(), Some("sk-legacy"));

        let config = AppConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-primary"),
            ("OPENAI_API_KEY_ENV_VAR", "sk-legacy"),
        ]))
        .unwrap();
        assert_eq!(config.openai.api_key.as_deref(), Some("sk-primary"));
    }

    #[test]
    fn test_overrides_and_blank_values() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("DATABASE_URL", "  "),
            ("OPENAI_BASE_URL", "http://localhost:9999/v1/"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.database_url.is_none());
        assert_eq!(config.openai.base_url, "http://localhost:9999/v1");
    }

    #[test]
    fn test_session_secret_length() {
        let err = AppConfig::from_lookup(lookup(&[("SESSION_SECRET", "hunter2")])).unwrap_err();
        assert!(err.to_string().contains("SESSION_SECRET"));
        assert!(!err.to_string().contains("hunter2"));

        let secret = "k".repeat(SESSION_SECRET_MIN_LEN);
        let config = AppConfig::from_lookup(lookup(&[("SESSION_SECRET", secret.as_str())])).unwrap();
        assert_eq!(config.session_secret.as_deref(), Some(secret.as_str()));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
