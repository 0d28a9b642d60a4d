use std::env;
use std::fs;
use std::path::PathBuf;

use fuelbid_core::config::{AppConfig, LoadOptions, NotifierMode};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let sources = SourceReporter::detect();
    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(sources.line("database.url", &["FUELBID_DATABASE_URL"], &config.database.url));
    lines.push(sources.line(
        "database.max_connections",
        &["FUELBID_DATABASE_MAX_CONNECTIONS"],
        &config.database.max_connections.to_string(),
    ));
    lines.push(sources.line(
        "database.timeout_secs",
        &["FUELBID_DATABASE_TIMEOUT_SECS"],
        &config.database.timeout_secs.to_string(),
    ));

    lines.push(sources.line(
        "server.bind_address",
        &["FUELBID_SERVER_BIND_ADDRESS"],
        &config.server.bind_address,
    ));
    lines.push(sources.line(
        "server.port",
        &["FUELBID_SERVER_PORT"],
        &config.server.port.to_string(),
    ));
    lines.push(sources.line(
        "server.health_check_port",
        &["FUELBID_SERVER_HEALTH_CHECK_PORT"],
        &config.server.health_check_port.to_string(),
    ));
    lines.push(sources.line(
        "server.graceful_shutdown_secs",
        &["FUELBID_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        &config.server.graceful_shutdown_secs.to_string(),
    ));

    let notifier_mode = match config.notifier.mode {
        NotifierMode::Noop => "noop",
        NotifierMode::Webhook => "webhook",
    };
    lines.push(sources.line("notifier.mode", &["FUELBID_NOTIFIER_MODE"], notifier_mode));
    lines.push(sources.line(
        "notifier.endpoint",
        &["FUELBID_NOTIFIER_ENDPOINT"],
        config.notifier.endpoint.as_deref().unwrap_or("<unset>"),
    ));
    let auth_token = if config.notifier.auth_token.is_some() { "<redacted>" } else { "<unset>" };
    lines.push(sources.line("notifier.auth_token", &["FUELBID_NOTIFIER_AUTH_TOKEN"], auth_token));
    lines.push(sources.line(
        "notifier.timeout_secs",
        &["FUELBID_NOTIFIER_TIMEOUT_SECS"],
        &config.notifier.timeout_secs.to_string(),
    ));

    lines.push(sources.line(
        "logging.level",
        &["FUELBID_LOGGING_LEVEL", "FUELBID_LOG_LEVEL"],
        &config.logging.level,
    ));
    lines.push(sources.line(
        "logging.format",
        &["FUELBID_LOGGING_FORMAT", "FUELBID_LOG_FORMAT"],
        &format!("{:?}", config.logging.format),
    ));

    lines.push(sources.line(
        "procurement.currency",
        &["FUELBID_PROCUREMENT_CURRENCY"],
        &config.procurement.currency,
    ));
    lines.push(sources.line(
        "procurement.default_unit",
        &["FUELBID_PROCUREMENT_DEFAULT_UNIT"],
        &config.procurement.default_unit,
    ));

    lines.join("\n")
}

/// Resolves where each rendered value came from without re-running the full
/// config loader: env wins, then the detected config file, then defaults.
struct SourceReporter {
    file_path: Option<PathBuf>,
    file_doc: Option<Value>,
}

impl SourceReporter {
    fn detect() -> Self {
        let file_path = detect_config_path();
        let file_doc = file_path
            .as_deref()
            .and_then(|path| fs::read_to_string(path).ok())
            .and_then(|raw| raw.parse::<Value>().ok());
        Self { file_path, file_doc }
    }

    fn line(&self, key_path: &str, env_keys: &[&str], value: &str) -> String {
        format!("- {key_path} = {value} (source: {})", self.source_of(key_path, env_keys))
    }

    fn source_of(&self, key_path: &str, env_keys: &[&str]) -> String {
        for env_key in env_keys {
            if env::var_os(env_key).is_some() {
                return format!("env ({env_key})");
            }
        }

        if let Some(doc) = &self.file_doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .file_path
                    .as_deref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

fn detect_config_path() -> Option<PathBuf> {
    if let Some(from_env) = env::var_os("FUELBID_CONFIG") {
        let path = PathBuf::from(from_env);
        if path.exists() {
            return Some(path);
        }
    }

    [PathBuf::from("fuelbid.toml"), PathBuf::from("config/fuelbid.toml")]
        .into_iter()
        .find(|path| path.exists())
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
