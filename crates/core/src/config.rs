use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_K_CEILING: usize = 1000;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub artifacts: ArtifactsConfig,
    pub recommender: RecommenderConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ArtifactsConfig {
    pub model_path: PathBuf,
    pub inventory_path: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecommenderConfig {
    pub default_k: usize,
    pub max_k: usize,
    pub candidate_oversample: usize,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub enabled: bool,
    pub api_key: Option<SecretString>,
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
    pub model_path: Option<PathBuf>,
    pub inventory_path: Option<PathBuf>,
    pub default_k: Option<usize>,
    pub log_level: Option<String>,
    pub server_port: Option<u16>,
    pub auth_enabled: Option<bool>,
    pub auth_api_key: Option<String>,
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
            artifacts: ArtifactsConfig {
                model_path: PathBuf::from("recommendation_artifacts.bin"),
                inventory_path: PathBuf::from("inventory.csv"),
            },
            recommender: RecommenderConfig::default(),
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            auth: AuthConfig { enabled: false, api_key: None },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self { default_k: 10, max_k: 100, candidate_oversample: 5 }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
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

impl AuthConfig {
    /// True when the gate is on but there is no usable key to compare against.
    pub fn is_misconfigured(&self) -> bool {
        self.enabled
            && self
                .api_key
                .as_ref()
                .map(|key| key.expose_secret().trim().is_empty())
                .unwrap_or(true)
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("autorec.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(artifacts) = patch.artifacts {
            if let Some(model_path) = artifacts.model_path {
                self.artifacts.model_path = model_path;
            }
            if let Some(inventory_path) = artifacts.inventory_path {
                self.artifacts.inventory_path = inventory_path;
            }
        }

        if let Some(recommender) = patch.recommender {
            if let Some(default_k) = recommender.default_k {
                self.recommender.default_k = default_k;
            }
            if let Some(max_k) = recommender.max_k {
                self.recommender.max_k = max_k;
            }
            if let Some(candidate_oversample) = recommender.candidate_oversample {
                self.recommender.candidate_oversample = candidate_oversample;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(auth) = patch.auth {
            if let Some(enabled) = auth.enabled {
                self.auth.enabled = enabled;
            }
            if let Some(api_key_value) = auth.api_key {
                self.auth.api_key = Some(secret_value(api_key_value));
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
        if let Some(value) = read_env("AUTOREC_ARTIFACTS_MODEL_PATH") {
            self.artifacts.model_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("AUTOREC_ARTIFACTS_INVENTORY_PATH") {
            self.artifacts.inventory_path = PathBuf::from(value);
        }

        if let Some(value) = read_env("AUTOREC_RECOMMENDER_DEFAULT_K") {
            self.recommender.default_k = parse_usize("AUTOREC_RECOMMENDER_DEFAULT_K", &value)?;
        }
        if let Some(value) = read_env("AUTOREC_RECOMMENDER_MAX_K") {
            self.recommender.max_k = parse_usize("AUTOREC_RECOMMENDER_MAX_K", &value)?;
        }
        if let Some(value) = read_env("AUTOREC_RECOMMENDER_CANDIDATE_OVERSAMPLE") {
            self.recommender.candidate_oversample =
                parse_usize("AUTOREC_RECOMMENDER_CANDIDATE_OVERSAMPLE", &value)?;
        }

        if let Some(value) = read_env("AUTOREC_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("AUTOREC_SERVER_PORT") {
            self.server.port = parse_u16("AUTOREC_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("AUTOREC_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("AUTOREC_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("AUTOREC_AUTH_ENABLED") {
            self.auth.enabled = parse_bool("AUTOREC_AUTH_ENABLED", &value)?;
        }
        let api_key = read_env("AUTOREC_AUTH_API_KEY").or_else(|| read_env("API_KEY"));
        if let Some(value) = api_key {
            self.auth.api_key = Some(secret_value(value));
        }

        let log_level =
            read_env("AUTOREC_LOGGING_LEVEL").or_else(|| read_env("AUTOREC_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("AUTOREC_LOGGING_FORMAT").or_else(|| read_env("AUTOREC_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(model_path) = overrides.model_path {
            self.artifacts.model_path = model_path;
        }
        if let Some(inventory_path) = overrides.inventory_path {
            self.artifacts.inventory_path = inventory_path;
        }
        if let Some(default_k) = overrides.default_k {
            self.recommender.default_k = default_k;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(enabled) = overrides.auth_enabled {
            self.auth.enabled = enabled;
        }
        if let Some(api_key) = overrides.auth_api_key {
            self.auth.api_key = Some(secret_value(api_key));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_artifacts(&self.artifacts)?;
        validate_recommender(&self.recommender)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("autorec.toml"), PathBuf::from("config/autorec.toml")]
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
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_artifacts(artifacts: &ArtifactsConfig) -> Result<(), ConfigError> {
    if artifacts.model_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("artifacts.model_path must not be empty".to_string()));
    }

    if artifacts.inventory_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "artifacts.inventory_path must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_recommender(recommender: &RecommenderConfig) -> Result<(), ConfigError> {
    if recommender.max_k == 0 || recommender.max_k > MAX_K_CEILING {
        return Err(ConfigError::Validation(format!(
            "recommender.max_k must be in range 1..={MAX_K_CEILING}"
        )));
    }

    if recommender.default_k == 0 || recommender.default_k > recommender.max_k {
        return Err(ConfigError::Validation(
            "recommender.default_k must be in range 1..=recommender.max_k".to_string(),
        ));
    }

    if recommender.candidate_oversample == 0 {
        return Err(ConfigError::Validation(
            "recommender.candidate_oversample must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
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

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    artifacts: Option<ArtifactsPatch>,
    recommender: Option<RecommenderPatch>,
    server: Option<ServerPatch>,
    auth: Option<AuthPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ArtifactsPatch {
    model_path: Option<PathBuf>,
    inventory_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct RecommenderPatch {
    default_k: Option<usize>,
    max_k: Option<usize>,
    candidate_oversample: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthPatch {
    enabled: Option<bool>,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
