use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub notifier: NotifierConfig,
    pub logging: LoggingConfig,
    pub procurement: ProcurementConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct NotifierConfig {
    pub mode: NotifierMode,
    pub endpoint: Option<String>,
    pub auth_token: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Procurement-wide constants surfaced in responses and award notices.
#[derive(Clone, Debug)]
pub struct ProcurementConfig {
    pub currency: String,
    pub default_unit: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifierMode {
    Noop,
    Webhook,
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
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub notifier_mode: Option<NotifierMode>,
    pub notifier_endpoint: Option<String>,
    pub notifier_auth_token: Option<String>,
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
            database: DatabaseConfig {
                url: "sqlite://fuelbid.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                health_check_port: 8081,
                graceful_shutdown_secs: 15,
            },
            notifier: NotifierConfig {
                mode: NotifierMode::Noop,
                endpoint: None,
                auth_token: None,
                timeout_secs: 10,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            procurement: ProcurementConfig {
                currency: "RWF".to_string(),
                default_unit: "Liters".to_string(),
            },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for NotifierMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "noop" => Ok(Self::Noop),
            "webhook" => Ok(Self::Webhook),
            other => Err(ConfigError::Validation(format!(
                "unsupported notifier mode `{other}` (expected noop|webhook)"
            ))),
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("fuelbid.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(notifier) = patch.notifier {
            if let Some(mode) = notifier.mode {
                self.notifier.mode = mode;
            }
            if let Some(endpoint) = notifier.endpoint {
                self.notifier.endpoint = Some(endpoint);
            }
            if let Some(auth_token_value) = notifier.auth_token {
                self.notifier.auth_token = Some(secret_value(auth_token_value));
            }
            if let Some(timeout_secs) = notifier.timeout_secs {
                self.notifier.timeout_secs = timeout_secs;
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

        if let Some(procurement) = patch.procurement {
            if let Some(currency) = procurement.currency {
                self.procurement.currency = currency;
            }
            if let Some(default_unit) = procurement.default_unit {
                self.procurement.default_unit = default_unit;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("FUELBID_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("FUELBID_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("FUELBID_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("FUELBID_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("FUELBID_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("FUELBID_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("FUELBID_SERVER_PORT") {
            self.server.port = parse_u16("FUELBID_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("FUELBID_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port =
                parse_u16("FUELBID_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("FUELBID_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("FUELBID_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("FUELBID_NOTIFIER_MODE") {
            self.notifier.mode = value.parse()?;
        }
        if let Some(value) = read_env("FUELBID_NOTIFIER_ENDPOINT") {
            self.notifier.endpoint = Some(value);
        }
        if let Some(value) = read_env("FUELBID_NOTIFIER_AUTH_TOKEN") {
            self.notifier.auth_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("FUELBID_NOTIFIER_TIMEOUT_SECS") {
            self.notifier.timeout_secs = parse_u64("FUELBID_NOTIFIER_TIMEOUT_SECS", &value)?;
        }

        let log_level =
            read_env("FUELBID_LOGGING_LEVEL").or_else(|| read_env("FUELBID_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("FUELBID_LOGGING_FORMAT").or_else(|| read_env("FUELBID_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        if let Some(value) = read_env("FUELBID_PROCUREMENT_CURRENCY") {
            self.procurement.currency = value;
        }
        if let Some(value) = read_env("FUELBID_PROCUREMENT_DEFAULT_UNIT") {
            self.procurement.default_unit = value;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(mode) = overrides.notifier_mode {
            self.notifier.mode = mode;
        }
        if let Some(endpoint) = overrides.notifier_endpoint {
            self.notifier.endpoint = Some(endpoint);
        }
        if let Some(auth_token) = overrides.notifier_auth_token {
            self.notifier.auth_token = Some(secret_value(auth_token));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_notifier(&self.notifier)?;
        validate_logging(&self.logging)?;
        validate_procurement(&self.procurement)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    if let Some(from_env) = read_env("FUELBID_CONFIG") {
        let path = PathBuf::from(from_env);
        if path.exists() {
            return Some(path);
        }
    }

    [PathBuf::from("fuelbid.toml"), PathBuf::from("config/fuelbid.toml")]
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

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation(
            "server.port must be greater than zero".to_string(),
        ));
    }

    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.port == server.health_check_port {
        return Err(ConfigError::Validation(
            "server.port and server.health_check_port must differ".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_notifier(notifier: &NotifierConfig) -> Result<(), ConfigError> {
    if notifier.timeout_secs == 0 || notifier.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "notifier.timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    if notifier.mode == NotifierMode::Webhook {
        let endpoint = notifier.endpoint.as_deref().map(str::trim).unwrap_or_default();
        if endpoint.is_empty() {
            return Err(ConfigError::Validation(
                "notifier.endpoint is required when notifier.mode is `webhook`".to_string(),
            ));
        }
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ConfigError::Validation(
                "notifier.endpoint must start with http:// or https://".to_string(),
            ));
        }
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

fn validate_procurement(procurement: &ProcurementConfig) -> Result<(), ConfigError> {
    if procurement.currency.trim().is_empty() {
        return Err(ConfigError::Validation(
            "procurement.currency must not be empty".to_string(),
        ));
    }

    if procurement.default_unit.trim().is_empty() {
        return Err(ConfigError::Validation(
            "procurement.default_unit must not be empty".to_string(),
        ));
    }

    Ok(())
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

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    notifier: Option<NotifierPatch>,
    logging: Option<LoggingPatch>,
    procurement: Option<ProcurementPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct NotifierPatch {
    mode: Option<NotifierMode>,
    endpoint: Option<String>,
    auth_token: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct ProcurementPatch {
    currency: Option<String>,
    default_unit: Option<String>,
}
