use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use autorec_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let api_key = match &config.auth.api_key {
        Some(key) if !key.expose_secret().trim().is_empty() => "<redacted>",
        Some(_) => "<empty>",
        None => "<unset>",
    };

    let entries = [
        (
            "artifacts.model_path",
            config.artifacts.model_path.display().to_string(),
            source("artifacts.model_path", &["AUTOREC_ARTIFACTS_MODEL_PATH"]),
        ),
        (
            "artifacts.inventory_path",
            config.artifacts.inventory_path.display().to_string(),
            source("artifacts.inventory_path", &["AUTOREC_ARTIFACTS_INVENTORY_PATH"]),
        ),
        (
            "recommender.default_k",
            config.recommender.default_k.to_string(),
            source("recommender.default_k", &["AUTOREC_RECOMMENDER_DEFAULT_K"]),
        ),
        (
            "recommender.max_k",
            config.recommender.max_k.to_string(),
            source("recommender.max_k", &["AUTOREC_RECOMMENDER_MAX_K"]),
        ),
        (
            "recommender.candidate_oversample",
            config.recommender.candidate_oversample.to_string(),
            source(
                "recommender.candidate_oversample",
                &["AUTOREC_RECOMMENDER_CANDIDATE_OVERSAMPLE"],
            ),
        ),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            source("server.bind_address", &["AUTOREC_SERVER_BIND_ADDRESS"]),
        ),
        (
            "server.port",
            config.server.port.to_string(),
            source("server.port", &["AUTOREC_SERVER_PORT"]),
        ),
        (
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            source("server.graceful_shutdown_secs", &["AUTOREC_SERVER_GRACEFUL_SHUTDOWN_SECS"]),
        ),
        (
            "auth.enabled",
            config.auth.enabled.to_string(),
            source("auth.enabled", &["AUTOREC_AUTH_ENABLED"]),
        ),
        (
            "auth.api_key",
            api_key.to_string(),
            source("auth.api_key", &["AUTOREC_AUTH_API_KEY", "API_KEY"]),
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            source("logging.level", &["AUTOREC_LOGGING_LEVEL", "AUTOREC_LOG_LEVEL"]),
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            source("logging.format", &["AUTOREC_LOGGING_FORMAT", "AUTOREC_LOG_FORMAT"]),
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(entries.iter().map(|(key, value, source)| render_line(key, value, source)));
    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    ["autorec.toml", "config/autorec.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
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
    if let Some(env_key) = env_keys.iter().find(|env_key| env::var_os(env_key).is_some()) {
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

fn render_line(key: &str, value: &str, source: &str) -> String {
    format!("- {key} = {value} (source: {source})")
}
