use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::submission::ClientContext;

pub const DEFAULT_CONFIG_FILE: &str = "wayfare.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub leads: LeadsConfig,
    pub client: ClientConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LeadsConfig {
    pub endpoint: String,
    /// Sent as a bearer token when present.
    pub api_key: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub source: String,
    pub channel: String,
    pub locale: String,
    pub user_agent: Option<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub leads_endpoint: Option<String>,
    pub leads_api_key: Option<String>,
    pub leads_timeout_secs: Option<u64>,
    pub client_source: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            leads: LeadsConfig {
                endpoint: "http://127.0.0.1:8787/api/leads".to_string(),
                api_key: None,
                timeout_secs: 15,
            },
            client: ClientConfig {
                source: "wayfare-web".to_string(),
                channel: "lead-wizard".to_string(),
                locale: "pt-BR".to_string(),
                user_agent: None,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

impl From<&ClientConfig> for ClientContext {
    fn from(client: &ClientConfig) -> Self {
        Self {
            source: client.source.clone(),
            channel: client.channel.clone(),
            locale: client.locale.clone(),
            user_agent: client.user_agent.clone(),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = resolve_config_path(options.config_path.as_deref()) {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn client_context(&self) -> ClientContext {
        ClientContext::from(&self.client)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(leads) = patch.leads {
            if let Some(endpoint) = leads.endpoint {
                self.leads.endpoint = endpoint;
            }
            if let Some(api_key) = leads.api_key {
                self.leads.api_key = Some(api_key.into());
            }
            if let Some(timeout_secs) = leads.timeout_secs {
                self.leads.timeout_secs = timeout_secs;
            }
        }

        if let Some(client) = patch.client {
            if let Some(source) = client.source {
                self.client.source = source;
            }
            if let Some(channel) = client.channel {
                self.client.channel = channel;
            }
            if let Some(locale) = client.locale {
                self.client.locale = locale;
            }
            if let Some(user_agent) = client.user_agent {
                self.client.user_agent = Some(user_agent);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("WAYFARE_LEADS_ENDPOINT") {
            self.leads.endpoint = value;
        }
        if let Some(value) = read_env("WAYFARE_LEADS_API_KEY") {
            self.leads.api_key = Some(value.into());
        }
        if let Some(value) = read_env("WAYFARE_LEADS_TIMEOUT_SECS") {
            self.leads.timeout_secs = parse_u64("WAYFARE_LEADS_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("WAYFARE_CLIENT_SOURCE") {
            self.client.source = value;
        }
        if let Some(value) = read_env("WAYFARE_CLIENT_CHANNEL") {
            self.client.channel = value;
        }
        if let Some(value) = read_env("WAYFARE_CLIENT_LOCALE") {
            self.client.locale = value;
        }
        if let Some(value) = read_env("WAYFARE_CLIENT_USER_AGENT") {
            self.client.user_agent = Some(value);
        }

        let log_level =
            read_env("WAYFARE_LOGGING_LEVEL").or_else(|| read_env("WAYFARE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("WAYFARE_LOGGING_FORMAT").or_else(|| read_env("WAYFARE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(endpoint) = overrides.leads_endpoint {
            self.leads.endpoint = endpoint;
        }
        if let Some(api_key) = overrides.leads_api_key {
            self.leads.api_key = Some(api_key.into());
        }
        if let Some(timeout_secs) = overrides.leads_timeout_secs {
            self.leads.timeout_secs = timeout_secs;
        }
        if let Some(source) = overrides.client_source {
            self.client.source = source;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(format) = overrides.log_format {
            self.logging.format = format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_leads(&self.leads)?;
        validate_client(&self.client)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), Path::new("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || !matches!(chars.peek(), Some('{')) {
            output.push(ch);
            continue;
        }

        chars.next();
        let mut key = String::new();
        loop {
            match chars.next() {
                Some('}') => break,
                Some(next) => key.push(next),
                None => return Err(ConfigError::UnterminatedInterpolation),
            }
        }

        let value =
            env::var(&key).map_err(|_| ConfigError::MissingEnvInterpolation { var: key })?;
        output.push_str(&value);
    }

    Ok(output)
}

fn validate_leads(leads: &LeadsConfig) -> Result<(), ConfigError> {
    let endpoint = leads.endpoint.trim();
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        return Err(ConfigError::Validation(
            "leads.endpoint must start with http:// or https://".to_string(),
        ));
    }

    if leads.timeout_secs == 0 || leads.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "leads.timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    let blank_key =
        leads.api_key.as_ref().map(|key| key.expose_secret().trim().is_empty()).unwrap_or(false);
    if blank_key {
        return Err(ConfigError::Validation(
            "leads.api_key is set but empty; remove it or provide a token".to_string(),
        ));
    }

    Ok(())
}

fn validate_client(client: &ClientConfig) -> Result<(), ConfigError> {
    for (field, value) in
        [("client.source", &client.source), ("client.channel", &client.channel)]
    {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{field} must not be empty")));
        }
    }

    if client.locale.trim().is_empty() {
        return Err(ConfigError::Validation(
            "client.locale must not be empty (for example `pt-BR`)".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    leads: Option<LeadsPatch>,
    client: Option<ClientPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LeadsPatch {
    endpoint: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ClientPatch {
    source: Option<String>,
    channel: Option<String>,
    locale: Option<String>,
    user_agent: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
