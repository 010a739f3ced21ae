// Flowsmith: n8n workflow generation driven by an LLM
// License: Apache-2.0

use crate::provider::Protocol;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("missing API key for provider '{provider}' (set one of: {})", .variables.join(", "))]
    MissingApiKey {
        provider: Provider,
        variables: Vec<&'static str>,
    },
    #[error("unknown provider '{0}' (expected 'deepseek' or 'openai')")]
    UnknownProvider(String),
    #[error("{variable} is not a valid URL: {value}")]
    InvalidBaseUrl {
        variable: &'static str,
        value: String,
    },
    #[error("{variable} is not a valid number: {value}")]
    InvalidNumber {
        variable: &'static str,
        value: String,
    },
    #[error("{variable} must be 'true' or 'false', got: {value}")]
    InvalidFlag {
        variable: &'static str,
        value: String,
    },
    #[error("unknown API shape '{0}' (expected 'chat' or 'responses')")]
    UnknownApiShape(String),
}

// ---------------------------------------------------------------------------
// Recognized environment variables
// ---------------------------------------------------------------------------

pub const ENV_PROVIDER: &str = "LLM_PROVIDER";
pub const ENV_DEEPSEEK_API_KEY: &str = "DEEPSEEK_API_KEY";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_SHARED_API_KEY: &str = "LLM_API_KEY";
pub const ENV_BASE_URL: &str = "LLM_BASE_URL";
pub const ENV_OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_MODEL_NAME: &str = "MODEL_NAME";
pub const ENV_OPENAI_MODEL: &str = "OPENAI_MODEL";
pub const ENV_N8N_VERSION: &str = "N8N_VERSION";
pub const ENV_TEMPERATURE: &str = "LLM_TEMPERATURE";
pub const ENV_MAX_OUTPUT_TOKENS: &str = "LLM_MAX_OUTPUT_TOKENS";
pub const ENV_JSON_MODE: &str = "LLM_JSON_MODE";
pub const ENV_API_SHAPE: &str = "LLM_API_SHAPE";

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// The LLM vendor a run talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    /// DeepSeek (OpenAI-compatible chat completions). The default.
    #[default]
    DeepSeek,
    /// OpenAI, or any endpoint configured through `OPENAI_BASE_URL`.
    OpenAi,
}

impl Provider {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_lowercase().as_str() {
            "deepseek" => Ok(Provider::DeepSeek),
            "openai" => Ok(Provider::OpenAi),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::DeepSeek => "deepseek",
            Provider::OpenAi => "openai",
        }
    }

    /// Credential variables in lookup order.
    fn key_variables(&self) -> Vec<&'static str> {
        match self {
            Provider::DeepSeek => vec![ENV_DEEPSEEK_API_KEY],
            Provider::OpenAi => vec![ENV_OPENAI_API_KEY, ENV_SHARED_API_KEY],
        }
    }

    fn model_variables(&self) -> Vec<&'static str> {
        match self {
            Provider::DeepSeek => vec![ENV_MODEL_NAME],
            Provider::OpenAi => vec![ENV_OPENAI_MODEL, ENV_MODEL_NAME],
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            Provider::DeepSeek => "deepseek-chat",
            Provider::OpenAi => "gpt-4.1",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Substring that identifies a DeepSeek endpoint in a base URL.
pub const DEEPSEEK_DOMAIN_MARKER: &str = "deepseek";
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
/// Endpoint used for OpenAI when no base URL override is configured.
pub const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

// ---------------------------------------------------------------------------
// Secret
// ---------------------------------------------------------------------------

/// API credential. `Debug` and `Display` never print the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// A short hint such as `sk-1****cdef` for status output.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 8 {
            return "****".to_string();
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}****{}", head, tail)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(****)")
    }
}

// ---------------------------------------------------------------------------
// GenerationConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub provider: Provider,
    pub api_key: ApiKey,
    /// `None` means the provider client's own default endpoint.
    pub base_url: Option<Url>,
    pub model: String,
    pub target_platform_version: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
    /// Ask the provider for its JSON output mode.
    pub json_mode: bool,
    /// Explicit protocol choice; bypasses URL-based selection when set.
    pub api_shape: Option<Protocol>,
}

fn default_target_platform_version() -> String {
    "2.6.3".to_string()
}
fn default_temperature() -> f64 {
    0.2
}
fn default_max_output_tokens() -> u32 {
    8192
}
fn default_json_mode() -> bool {
    true
}

impl GenerationConfig {
    /// Resolve configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Resolve configuration from an environment snapshot.
    ///
    /// Blank values are treated as absent.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let lookup = |name: &str| -> Option<String> {
            vars.get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let provider = match lookup(ENV_PROVIDER) {
            Some(raw) => Provider::parse(&raw)?,
            None => Provider::default(),
        };

        let key_vars = provider.key_variables();
        let api_key = key_vars
            .iter()
            .find_map(|name| lookup(*name))
            .map(ApiKey::new)
            .ok_or_else(|| ConfigError::MissingApiKey {
                provider,
                variables: key_vars.clone(),
            })?;

        let base_url = match provider {
            Provider::DeepSeek => {
                let raw = lookup(ENV_BASE_URL).unwrap_or_else(|| DEEPSEEK_BASE_URL.to_string());
                Some(parse_url(ENV_BASE_URL, &raw)?)
            }
            Provider::OpenAi => lookup(ENV_OPENAI_BASE_URL)
                .map(|raw| parse_url(ENV_OPENAI_BASE_URL, &raw))
                .transpose()?,
        };

        let model = provider
            .model_variables()
            .iter()
            .find_map(|name| lookup(*name))
            .unwrap_or_else(|| provider.default_model().to_string());

        let target_platform_version =
            lookup(ENV_N8N_VERSION).unwrap_or_else(default_target_platform_version);

        let temperature = match lookup(ENV_TEMPERATURE) {
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|t| t.is_finite())
                .ok_or(ConfigError::InvalidNumber {
                    variable: ENV_TEMPERATURE,
                    value: raw,
                })?,
            None => default_temperature(),
        };

        let max_output_tokens = match lookup(ENV_MAX_OUTPUT_TOKENS) {
            Some(raw) => raw.parse::<u32>().map_err(|_| ConfigError::InvalidNumber {
                variable: ENV_MAX_OUTPUT_TOKENS,
                value: raw,
            })?,
            None => default_max_output_tokens(),
        };

        let json_mode = match lookup(ENV_JSON_MODE) {
            Some(raw) => raw.parse::<bool>().map_err(|_| ConfigError::InvalidFlag {
                variable: ENV_JSON_MODE,
                value: raw,
            })?,
            None => default_json_mode(),
        };

        let api_shape = lookup(ENV_API_SHAPE)
            .map(|raw| Protocol::parse(&raw))
            .transpose()?;

        Ok(Self {
            provider,
            api_key,
            base_url,
            model,
            target_platform_version,
            temperature,
            max_output_tokens,
            json_mode,
            api_shape,
        })
    }

    /// The request protocol for this configuration.
    pub fn protocol(&self) -> Protocol {
        self.api_shape.unwrap_or_else(|| {
            Protocol::select(self.provider, self.base_url.as_ref().map(Url::as_str))
        })
    }

    /// Base URL requests are sent to, with provider defaults applied.
    pub fn endpoint_base(&self) -> String {
        match &self.base_url {
            Some(url) => url.as_str().trim_end_matches('/').to_string(),
            None => match self.provider {
                Provider::DeepSeek => DEEPSEEK_BASE_URL.to_string(),
                Provider::OpenAi => OPENAI_DEFAULT_BASE_URL.to_string(),
            },
        }
    }
}

fn parse_url(variable: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|_| ConfigError::InvalidBaseUrl {
        variable,
        value: raw.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_provider_is_deepseek() {
        let cfg = GenerationConfig::from_vars(&vars(&[("DEEPSEEK_API_KEY", "sk-ds")])).unwrap();
        assert_eq!(cfg.provider, Provider::DeepSeek);
        assert_eq!(cfg.api_key.expose(), "sk-ds");
        assert_eq!(cfg.model, "deepseek-chat");
        assert_eq!(cfg.endpoint_base(), "https://api.deepseek.com");
        assert_eq!(cfg.target_platform_version, "2.6.3");
        assert_eq!(cfg.max_output_tokens, 8192);
        assert!(cfg.json_mode);
        assert_eq!(cfg.protocol(), Protocol::ChatCompletions);
    }

    #[test]
    fn test_blank_provider_falls_back_to_default() {
        let cfg = GenerationConfig::from_vars(&vars(&[
            ("LLM_PROVIDER", "   "),
            ("DEEPSEEK_API_KEY", "sk-ds"),
        ]))
        .unwrap();
        assert_eq!(cfg.provider, Provider::DeepSeek);
    }

    #[test]
    fn test_missing_default_key() {
        // An OpenAI key does not satisfy the default provider
        let err = GenerationConfig::from_vars(&vars(&[("OPENAI_API_KEY", "sk-oa")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingApiKey {
                provider: Provider::DeepSeek,
                variables: vec!["DEEPSEEK_API_KEY"],
            }
        );
        assert!(err.to_string().contains("DEEPSEEK_API_KEY"));
    }

    #[test]
    fn test_openai_key_precedence() {
        let cfg = GenerationConfig::from_vars(&vars(&[
            ("LLM_PROVIDER", "OpenAI"),
            ("OPENAI_API_KEY", "sk-dedicated"),
            ("LLM_API_KEY", "sk-shared"),
        ]))
        .unwrap();
        assert_eq!(cfg.provider, Provider::OpenAi);
        assert_eq!(cfg.api_key.expose(), "sk-dedicated");

        let cfg = GenerationConfig::from_vars(&vars(&[
            ("LLM_PROVIDER", "openai"),
            ("OPENAI_API_KEY", ""),
            ("LLM_API_KEY", "sk-shared"),
        ]))
        .unwrap();
        assert_eq!(cfg.api_key.expose(), "sk-shared");
    }

    #[test]
    fn test_openai_missing_all_keys() {
        let err = GenerationConfig::from_vars(&vars(&[("LLM_PROVIDER", "openai")])).unwrap_err();
        match err {
            ConfigError::MissingApiKey { provider, variables } => {
                assert_eq!(provider, Provider::OpenAi);
                assert_eq!(variables, vec!["OPENAI_API_KEY", "LLM_API_KEY"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_openai_base_url_absent_means_client_default() {
        let cfg = GenerationConfig::from_vars(&vars(&[
            ("LLM_PROVIDER", "openai"),
            ("OPENAI_API_KEY", "sk-oa"),
            ("LLM_BASE_URL", "https://ignored.example.com"),
        ]))
        .unwrap();
        assert!(cfg.base_url.is_none());
        assert_eq!(cfg.endpoint_base(), "https://api.openai.com/v1");
        assert_eq!(cfg.model, "gpt-4.1");
        assert_eq!(cfg.protocol(), Protocol::Responses);
    }

    #[test]
    fn test_deepseek_base_url_override() {
        let cfg = GenerationConfig::from_vars(&vars(&[
            ("DEEPSEEK_API_KEY", "sk-ds"),
            ("LLM_BASE_URL", "http://localhost:8080/"),
        ]))
        .unwrap();
        assert_eq!(cfg.endpoint_base(), "http://localhost:8080");
    }

    #[test]
    fn test_openai_pointed_at_deepseek_uses_chat() {
        let cfg = GenerationConfig::from_vars(&vars(&[
            ("LLM_PROVIDER", "openai"),
            ("OPENAI_API_KEY", "sk-oa"),
            ("OPENAI_BASE_URL", "https://api.deepseek.com/v1"),
        ]))
        .unwrap();
        assert_eq!(cfg.protocol(), Protocol::ChatCompletions);
    }

    #[test]
    fn test_model_overrides() {
        let cfg = GenerationConfig::from_vars(&vars(&[
            ("DEEPSEEK_API_KEY", "sk-ds"),
            ("MODEL_NAME", "deepseek-reasoner"),
            ("OPENAI_MODEL", "gpt-4o"),
        ]))
        .unwrap();
        assert_eq!(cfg.model, "deepseek-reasoner");

        let cfg = GenerationConfig::from_vars(&vars(&[
            ("LLM_PROVIDER", "openai"),
            ("OPENAI_API_KEY", "sk-oa"),
            ("MODEL_NAME", "generic-model"),
            ("OPENAI_MODEL", "  "),
        ]))
        .unwrap();
        assert_eq!(cfg.model, "generic-model");
    }

    #[test]
    fn test_unknown_provider() {
        let err = GenerationConfig::from_vars(&vars(&[("LLM_PROVIDER", "anthropic")])).unwrap_err();
        assert_eq!(err, ConfigError::UnknownProvider("anthropic".into()));
    }

    #[test]
    fn test_invalid_values() {
        let base = [("DEEPSEEK_API_KEY", "sk-ds")];

        let mut v = vars(&base);
        v.insert("LLM_BASE_URL".into(), "not a url".into());
        assert!(matches!(
            GenerationConfig::from_vars(&v),
            Err(ConfigError::InvalidBaseUrl { variable: "LLM_BASE_URL", .. })
        ));

        let mut v = vars(&base);
        v.insert("LLM_TEMPERATURE".into(), "warm".into());
        assert!(matches!(
            GenerationConfig::from_vars(&v),
            Err(ConfigError::InvalidNumber { variable: "LLM_TEMPERATURE", .. })
        ));

        let mut v = vars(&base);
        v.insert("LLM_MAX_OUTPUT_TOKENS".into(), "-5".into());
        assert!(matches!(
            GenerationConfig::from_vars(&v),
            Err(ConfigError::InvalidNumber { .. })
        ));

        let mut v = vars(&base);
        v.insert("LLM_JSON_MODE".into(), "yes".into());
        assert!(matches!(
            GenerationConfig::from_vars(&v),
            Err(ConfigError::InvalidFlag { .. })
        ));

        let mut v = vars(&base);
        v.insert("LLM_API_SHAPE".into(), "grpc".into());
        assert_eq!(
            GenerationConfig::from_vars(&v).unwrap_err(),
            ConfigError::UnknownApiShape("grpc".into())
        );
    }

    #[test]
    fn test_numeric_and_shape_overrides() {
        let cfg = GenerationConfig::from_vars(&vars(&[
            ("DEEPSEEK_API_KEY", "sk-ds"),
            ("LLM_TEMPERATURE", "0"),
            ("LLM_MAX_OUTPUT_TOKENS", "2048"),
            ("LLM_JSON_MODE", "false"),
            ("LLM_API_SHAPE", "responses"),
            ("N8N_VERSION", "1.80.0"),
        ]))
        .unwrap();
        assert_eq!(cfg.temperature, 0.0);
        assert_eq!(cfg.max_output_tokens, 2048);
        assert!(!cfg.json_mode);
        assert_eq!(cfg.protocol(), Protocol::Responses);
        assert_eq!(cfg.target_platform_version, "1.80.0");
    }

    #[test]
    fn test_api_key_never_printed() {
        let key = ApiKey::new("sk-1234567890abcdef");
        assert_eq!(format!("{:?}", key), "ApiKey(****)");
        assert_eq!(key.masked(), "sk-1****cdef");
        assert_eq!(ApiKey::new("short").masked(), "****");
    }
}
