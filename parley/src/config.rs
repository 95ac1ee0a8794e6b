//! Gateway configuration, loadable from `PARLEY_*` environment variables.
//!
//! ```rust
//! use std::time::Duration;
//!
//! use parley::GatewayConfig;
//!
//! let config = GatewayConfig::from_lookup(|key| match key {
//!     "PARLEY_PROVIDER" => Some("ollama".to_string()),
//!     "PARLEY_TOOL_TIMEOUT_SECS" => Some("5".to_string()),
//!     _ => None,
//! })
//! .unwrap();
//!
//! assert_eq!(config.provider.as_str(), "ollama");
//! assert_eq!(config.tool_timeout, Duration::from_secs(5));
//! ```

use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use pprovider::{ModelConfig, ProviderId, SecretString};

pub const ENV_PROVIDER: &str = "PARLEY_PROVIDER";
pub const ENV_MODEL: &str = "PARLEY_MODEL";
pub const ENV_API_KEY: &str = "PARLEY_API_KEY";
pub const ENV_BASE_URL: &str = "PARLEY_BASE_URL";
pub const ENV_MAX_TOKENS: &str = "PARLEY_MAX_TOKENS";
pub const ENV_TEMPERATURE: &str = "PARLEY_TEMPERATURE";
pub const ENV_PROVIDER_TIMEOUT_SECS: &str = "PARLEY_PROVIDER_TIMEOUT_SECS";
pub const ENV_TOOL_TIMEOUT_SECS: &str = "PARLEY_TOOL_TIMEOUT_SECS";
pub const ENV_SECRETS_PATH: &str = "PARLEY_SECRETS_PATH";
pub const ENV_SECRETS_PASSPHRASE: &str = "PARLEY_SECRETS_PASSPHRASE";
pub const ENV_PLUGINS_DIR: &str = "PARLEY_PLUGINS_DIR";
pub const ENV_SYSTEM_PROMPT: &str = "PARLEY_SYSTEM_PROMPT";

pub const DEFAULT_PROVIDER: &str = "openai";
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(90);
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub key: String,
    pub message: String,
}

impl ConfigError {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Static settings the gateway is wired from.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub provider: ProviderId,
    /// Blank means the provider's first catalog model.
    pub model: Option<String>,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub provider_timeout: Duration,
    pub tool_timeout: Duration,
    pub secrets_path: Option<PathBuf>,
    pub secrets_passphrase: Option<SecretString>,
    pub plugins_dir: Option<PathBuf>,
    pub system_prompt: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            provider: ProviderId::new(DEFAULT_PROVIDER),
            model: None,
            api_key: None,
            base_url: None,
            max_tokens: None,
            temperature: None,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            secrets_path: None,
            secrets_passphrase: None,
            plugins_dir: None,
            system_prompt: None,
        }
    }
}

impl GatewayConfig {
    pub fn new(provider: impl Into<ProviderId>) -> Self {
        Self {
            provider: provider.into(),
            ..Self::default()
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(provider) = read(ENV_PROVIDER) {
            config.provider = ProviderId::new(provider.to_ascii_lowercase());
        }
        config.model = read(ENV_MODEL);
        config.api_key = read(ENV_API_KEY).map(SecretString::new);
        config.base_url = read(ENV_BASE_URL);
        config.max_tokens = parse(ENV_MAX_TOKENS, read(ENV_MAX_TOKENS))?;
        config.temperature = parse(ENV_TEMPERATURE, read(ENV_TEMPERATURE))?;
        if let Some(secs) = parse::<u64>(ENV_PROVIDER_TIMEOUT_SECS, read(ENV_PROVIDER_TIMEOUT_SECS))? {
            config.provider_timeout = positive_secs(ENV_PROVIDER_TIMEOUT_SECS, secs)?;
        }
        if let Some(secs) = parse::<u64>(ENV_TOOL_TIMEOUT_SECS, read(ENV_TOOL_TIMEOUT_SECS))? {
            config.tool_timeout = positive_secs(ENV_TOOL_TIMEOUT_SECS, secs)?;
        }
        config.secrets_path = read(ENV_SECRETS_PATH).map(PathBuf::from);
        config.secrets_passphrase = lookup(ENV_SECRETS_PASSPHRASE)
            .filter(|value| !value.is_empty())
            .map(SecretString::new);
        config.plugins_dir = read(ENV_PLUGINS_DIR).map(PathBuf::from);
        config.system_prompt = read(ENV_SYSTEM_PROMPT);

        if config.secrets_path.is_some() && config.secrets_passphrase.is_none() {
            return Err(ConfigError::new(
                ENV_SECRETS_PASSPHRASE,
                "required when a secrets path is configured",
            ));
        }
        if let Some(temperature) = config.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(ConfigError::new(
                ENV_TEMPERATURE,
                "must be between 0.0 and 2.0",
            ));
        }

        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<SecretString>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_secrets(
        mut self,
        path: impl Into<PathBuf>,
        passphrase: impl Into<SecretString>,
    ) -> Self {
        self.secrets_path = Some(path.into());
        self.secrets_passphrase = Some(passphrase.into());
        self
    }

    pub fn with_plugins_dir(mut self, directory: impl Into<PathBuf>) -> Self {
        self.plugins_dir = Some(directory.into());
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Model configuration for `provider`, carrying the gateway defaults.
    ///
    /// The configured API key and base URL only apply to the default provider.
    pub fn model_config(&self, provider: &ProviderId, model: Option<&str>) -> ModelConfig {
        let model = model
            .or(self.model.as_deref().filter(|_| *provider == self.provider))
            .unwrap_or_default();
        let mut config = ModelConfig::new(provider.clone(), model);

        if *provider == self.provider {
            if let Some(api_key) = &self.api_key {
                config = config.with_api_key(api_key.clone());
            }
            if let Some(base_url) = &self.base_url {
                config = config.with_base_url(base_url.clone());
            }
        }
        if let Some(max_tokens) = self.max_tokens {
            config = config.with_max_tokens(max_tokens);
        }
        if let Some(temperature) = self.temperature {
            config = config.with_temperature(temperature);
        }
        config.with_timeout(self.provider_timeout)
    }
}

fn parse<T>(key: &str, value: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|error| ConfigError::new(key, format!("invalid value '{raw}': {error}")))
        })
        .transpose()
}

fn positive_secs(key: &str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::new(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| values.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = GatewayConfig::from_lookup(lookup(&[])).expect("defaults");

        assert_eq!(config.provider.as_str(), DEFAULT_PROVIDER);
        assert_eq!(config.provider_timeout, DEFAULT_PROVIDER_TIMEOUT);
        assert_eq!(config.tool_timeout, DEFAULT_TOOL_TIMEOUT);
        assert!(config.model.is_none());
        assert!(config.secrets_path.is_none());
    }

    #[test]
    fn reads_every_supported_variable() {
        let config = GatewayConfig::from_lookup(lookup(&[
            (ENV_PROVIDER, " Anthropic "),
            (ENV_MODEL, "claude-3-5-haiku-latest"),
            (ENV_API_KEY, "sk-ant"),
            (ENV_BASE_URL, "http://localhost:9999"),
            (ENV_MAX_TOKENS, "512"),
            (ENV_TEMPERATURE, "0.2"),
            (ENV_PROVIDER_TIMEOUT_SECS, "15"),
            (ENV_TOOL_TIMEOUT_SECS, "3"),
            (ENV_SECRETS_PATH, "/tmp/secrets.json"),
            (ENV_SECRETS_PASSPHRASE, "correct horse"),
            (ENV_PLUGINS_DIR, "/tmp/plugins"),
            (ENV_SYSTEM_PROMPT, "Be brief."),
        ]))
        .expect("config");

        assert_eq!(config.provider.as_str(), "anthropic");
        assert_eq!(config.model.as_deref(), Some("claude-3-5-haiku-latest"));
        assert_eq!(config.api_key.as_ref().map(SecretString::expose), Some("sk-ant"));
        assert_eq!(config.max_tokens, Some(512));
        assert_eq!(config.temperature, Some(0.2));
        assert_eq!(config.provider_timeout, Duration::from_secs(15));
        assert_eq!(config.tool_timeout, Duration::from_secs(3));
        assert_eq!(config.plugins_dir, Some(PathBuf::from("/tmp/plugins")));
        assert_eq!(config.system_prompt.as_deref(), Some("Be brief."));
    }

    #[test]
    fn invalid_numbers_name_the_offending_key() {
        let error = GatewayConfig::from_lookup(lookup(&[(ENV_MAX_TOKENS, "lots")]))
            .expect_err("non-numeric max tokens");
        assert_eq!(error.key, ENV_MAX_TOKENS);

        let error = GatewayConfig::from_lookup(lookup(&[(ENV_TOOL_TIMEOUT_SECS, "0")]))
            .expect_err("zero timeout");
        assert_eq!(error.key, ENV_TOOL_TIMEOUT_SECS);

        let error = GatewayConfig::from_lookup(lookup(&[(ENV_TEMPERATURE, "7")]))
            .expect_err("temperature out of range");
        assert_eq!(error.key, ENV_TEMPERATURE);
    }

    #[test]
    fn secrets_path_requires_passphrase() {
        let error = GatewayConfig::from_lookup(lookup(&[(ENV_SECRETS_PATH, "/tmp/s.json")]))
            .expect_err("passphrase missing");
        assert_eq!(error.key, ENV_SECRETS_PASSPHRASE);
    }

    #[test]
    fn model_config_applies_key_only_to_default_provider() {
        let config = GatewayConfig::new("openai")
            .with_model("gpt-4o-mini")
            .with_api_key("sk-openai")
            .with_provider_timeout(Duration::from_secs(7));

        let openai = config.model_config(&ProviderId::new("openai"), None);
        assert_eq!(openai.model, "gpt-4o-mini");
        assert!(openai.has_api_key());
        assert_eq!(openai.timeout, Some(Duration::from_secs(7)));

        let ollama = config.model_config(&ProviderId::new("ollama"), Some("llama3.2"));
        assert_eq!(ollama.model, "llama3.2");
        assert!(!ollama.has_api_key());

        let blank = config.model_config(&ProviderId::new("anthropic"), None);
        assert!(blank.model.is_empty());
    }
}
