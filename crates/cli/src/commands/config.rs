use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use toml::Value;
use wayfare_core::config::{AppConfig, LoadOptions, DEFAULT_CONFIG_FILE};

use crate::commands::CommandResult;

struct Field<'a> {
    key_path: &'static str,
    value: String,
    env_keys: &'a [&'static str],
}

pub fn run(options: LoadOptions) -> CommandResult {
    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            );
        }
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let fields = [
        Field {
            key_path: "leads.endpoint",
            value: config.leads.endpoint.clone(),
            env_keys: &["WAYFARE_LEADS_ENDPOINT"],
        },
        Field {
            key_path: "leads.api_key",
            value: redact_token(config.leads.api_key.as_ref().map(|key| key.expose_secret())),
            env_keys: &["WAYFARE_LEADS_API_KEY"],
        },
        Field {
            key_path: "leads.timeout_secs",
            value: config.leads.timeout_secs.to_string(),
            env_keys: &["WAYFARE_LEADS_TIMEOUT_SECS"],
        },
        Field {
            key_path: "client.source",
            value: config.client.source.clone(),
            env_keys: &["WAYFARE_CLIENT_SOURCE"],
        },
        Field {
            key_path: "client.channel",
            value: config.client.channel.clone(),
            env_keys: &["WAYFARE_CLIENT_CHANNEL"],
        },
        Field {
            key_path: "client.locale",
            value: config.client.locale.clone(),
            env_keys: &["WAYFARE_CLIENT_LOCALE"],
        },
        Field {
            key_path: "client.user_agent",
            value: config.client.user_agent.clone().unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["WAYFARE_CLIENT_USER_AGENT"],
        },
        Field {
            key_path: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["WAYFARE_LOGGING_LEVEL", "WAYFARE_LOG_LEVEL"],
        },
        Field {
            key_path: "logging.format",
            value: config.logging.format.as_str().to_string(),
            env_keys: &["WAYFARE_LOGGING_FORMAT", "WAYFARE_LOG_FORMAT"],
        },
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(fields.iter().map(|field| {
        let source = field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        render_line(field.key_path, &field.value, source)
    }));

    CommandResult::success("config", lines.join("\n"))
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), Path::new("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let from_env = env_keys
        .iter()
        .find(|key| env::var(key).map(|value| !value.trim().is_empty()).unwrap_or(false));
    if let Some(env_key) = from_env {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps a short prefix so operators can tell keys apart without exposing them.
fn redact_token(token: Option<&str>) -> String {
    let Some(token) = token.map(str::trim) else {
        return "<unset>".to_string();
    };

    match token.char_indices().nth(4) {
        Some((cut, _)) if token.len() > 8 => format!("{}***", &token[..cut]),
        _ => "<redacted>".to_string(),
    }
}
