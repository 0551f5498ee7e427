use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub builder: BuilderConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: SecretString,
    pub timeout_secs: u64,
    pub max_read_retries: u32,
    /// Minimum spacing between outbound calls, guarding the remote quota.
    pub min_request_interval_ms: u64,
}

#[derive(Clone, Debug)]
pub struct BuilderConfig {
    pub honor_supplied_price: bool,
    pub service_requires_article: bool,
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
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub honor_supplied_price: Option<bool>,
    pub service_requires_article: Option<bool>,
    pub log_level: Option<String>,
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
            api: ApiConfig {
                base_url: "https://api.lexoffice.io".to_string(),
                api_key: String::new().into(),
                timeout_secs: 30,
                max_read_retries: 3,
                min_request_interval_ms: 500,
            },
            builder: BuilderConfig {
                honor_supplied_price: false,
                service_requires_article: false,
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

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("offerkit.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// True when an API key is configured; commands that talk to the remote
    /// API check this before doing anything with quota.
    pub fn has_api_key(&self) -> bool {
        !self.api.api_key.expose_secret().trim().is_empty()
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(api) = patch.api {
            if let Some(base_url) = api.base_url {
                self.api.base_url = base_url;
            }
            if let Some(api_key_value) = api.api_key {
                self.api.api_key = api_key_value.into();
            }
            if let Some(timeout_secs) = api.timeout_secs {
                self.api.timeout_secs = timeout_secs;
            }
            if let Some(max_read_retries) = api.max_read_retries {
                self.api.max_read_retries = max_read_retries;
            }
            if let Some(min_request_interval_ms) = api.min_request_interval_ms {
                self.api.min_request_interval_ms = min_request_interval_ms;
            }
        }

        if let Some(builder) = patch.builder {
            if let Some(honor_supplied_price) = builder.honor_supplied_price {
                self.builder.honor_supplied_price = honor_supplied_price;
            }
            if let Some(service_requires_article) = builder.service_requires_article {
                self.builder.service_requires_article = service_requires_article;
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
        if let Some(value) = read_env("OFFERKIT_API_BASE_URL") {
            self.api.base_url = value;
        }
        if let Some(value) = read_env("OFFERKIT_API_KEY") {
            self.api.api_key = value.into();
        }
        if let Some(value) = read_env("OFFERKIT_API_TIMEOUT_SECS") {
            self.api.timeout_secs = parse_u64("OFFERKIT_API_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("OFFERKIT_API_MAX_READ_RETRIES") {
            self.api.max_read_retries = parse_u32("OFFERKIT_API_MAX_READ_RETRIES", &value)?;
        }
        if let Some(value) = read_env("OFFERKIT_API_MIN_REQUEST_INTERVAL_MS") {
            self.api.min_request_interval_ms =
                parse_u64("OFFERKIT_API_MIN_REQUEST_INTERVAL_MS", &value)?;
        }

        if let Some(value) = read_env("OFFERKIT_BUILDER_HONOR_SUPPLIED_PRICE") {
            self.builder.honor_supplied_price =
                parse_bool("OFFERKIT_BUILDER_HONOR_SUPPLIED_PRICE", &value)?;
        }
        if let Some(value) = read_env("OFFERKIT_BUILDER_SERVICE_REQUIRES_ARTICLE") {
            self.builder.service_requires_article =
                parse_bool("OFFERKIT_BUILDER_SERVICE_REQUIRES_ARTICLE", &value)?;
        }

        let log_level =
            read_env("OFFERKIT_LOGGING_LEVEL").or_else(|| read_env("OFFERKIT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("OFFERKIT_LOGGING_FORMAT")
            .map(|value| ("OFFERKIT_LOGGING_FORMAT", value))
            .or_else(|| read_env("OFFERKIT_LOG_FORMAT").map(|value| ("OFFERKIT_LOG_FORMAT", value)));
        if let Some((key, value)) = log_format {
            self.logging.format =
                value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                    key: key.to_string(),
                    value: value.clone(),
                })?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(base_url) = overrides.base_url {
            self.api.base_url = base_url;
        }
        if let Some(api_key) = overrides.api_key {
            self.api.api_key = api_key.into();
        }
        if let Some(honor_supplied_price) = overrides.honor_supplied_price {
            self.builder.honor_supplied_price = honor_supplied_price;
        }
        if let Some(service_requires_article) = overrides.service_requires_article {
            self.builder.service_requires_article = service_requires_article;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.api.base_url.trim();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "api.base_url must start with http:// or https://".to_string(),
            ));
        }

        if self.api.timeout_secs == 0 || self.api.timeout_secs > 300 {
            return Err(ConfigError::Validation(
                "api.timeout_secs must be in range 1..=300".to_string(),
            ));
        }

        if self.api.min_request_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "api.min_request_interval_ms must be greater than zero".to_string(),
            ));
        }

        let level = self.logging.level.trim().to_ascii_lowercase();
        match level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            _ => Err(ConfigError::Validation(
                "logging.level must be one of trace|debug|info|warn|error".to_string(),
            )),
        }
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("offerkit.toml"), PathBuf::from("config/offerkit.toml")]
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

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
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

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    api: Option<ApiPatch>,
    builder: Option<BuilderPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiPatch {
    base_url: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
    max_read_retries: Option<u32>,
    min_request_interval_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct BuilderPatch {
    honor_supplied_price: Option<bool>,
    service_requires_article: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
