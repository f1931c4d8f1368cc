use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use moldquote_core::config::{AppConfig, LoadOptions, DEFAULT_CONFIG_FILE};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

struct Entry {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

impl Entry {
    fn new(key: &'static str, value: impl Into<String>, env_keys: &'static [&'static str]) -> Self {
        Self { key, value: value.into(), env_keys }
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for entry in entries(&config) {
        let source = field_source(
            entry.key,
            entry.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(entry.key, &entry.value, source));
    }

    lines.join("\n")
}

fn entries(config: &AppConfig) -> Vec<Entry> {
    vec![
        Entry::new("database.url", &config.database.url, &["MOLDQUOTE_DATABASE_URL"]),
        Entry::new(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["MOLDQUOTE_DATABASE_MAX_CONNECTIONS"],
        ),
        Entry::new(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["MOLDQUOTE_DATABASE_TIMEOUT_SECS"],
        ),
        Entry::new(
            "line.channel_access_token",
            redact_secret(&config.line.channel_access_token),
            &["MOLDQUOTE_LINE_CHANNEL_ACCESS_TOKEN"],
        ),
        Entry::new(
            "line.channel_secret",
            config.line.channel_secret.as_ref().map(redact_secret).unwrap_or_else(unset),
            &["MOLDQUOTE_LINE_CHANNEL_SECRET"],
        ),
        Entry::new(
            "line.api_base_url",
            &config.line.api_base_url,
            &["MOLDQUOTE_LINE_API_BASE_URL"],
        ),
        Entry::new(
            "sheets.spreadsheet_id",
            or_unset(&config.sheets.spreadsheet_id),
            &["MOLDQUOTE_SHEETS_SPREADSHEET_ID"],
        ),
        Entry::new(
            "sheets.access_token",
            redact_secret(&config.sheets.access_token),
            &["MOLDQUOTE_SHEETS_ACCESS_TOKEN"],
        ),
        Entry::new(
            "sheets.quote_sheet",
            &config.sheets.quote_sheet,
            &["MOLDQUOTE_SHEETS_QUOTE_SHEET"],
        ),
        Entry::new(
            "sheets.material_sheet",
            &config.sheets.material_sheet,
            &["MOLDQUOTE_SHEETS_MATERIAL_SHEET"],
        ),
        Entry::new(
            "sheets.api_base_url",
            &config.sheets.api_base_url,
            &["MOLDQUOTE_SHEETS_API_BASE_URL"],
        ),
        Entry::new(
            "pricing.source",
            format!("{:?}", config.pricing.source),
            &["MOLDQUOTE_PRICING_SOURCE"],
        ),
        Entry::new(
            "pricing.materials",
            render_materials(config),
            &["MOLDQUOTE_PRICING_MATERIALS"],
        ),
        Entry::new(
            "session.idle_ttl_secs",
            config.session.idle_ttl_secs.map(|ttl| ttl.to_string()).unwrap_or_else(unset),
            &["MOLDQUOTE_SESSION_IDLE_TTL_SECS"],
        ),
        Entry::new(
            "session.sweep_interval_secs",
            config.session.sweep_interval_secs.to_string(),
            &["MOLDQUOTE_SESSION_SWEEP_INTERVAL_SECS"],
        ),
        Entry::new(
            "server.bind_address",
            &config.server.bind_address,
            &["MOLDQUOTE_SERVER_BIND_ADDRESS"],
        ),
        Entry::new(
            "server.port",
            config.server.port.to_string(),
            &["MOLDQUOTE_SERVER_PORT", "PORT"],
        ),
        Entry::new(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["MOLDQUOTE_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        Entry::new(
            "logging.level",
            &config.logging.level,
            &["MOLDQUOTE_LOGGING_LEVEL", "MOLDQUOTE_LOG_LEVEL"],
        ),
        Entry::new(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["MOLDQUOTE_LOGGING_FORMAT", "MOLDQUOTE_LOG_FORMAT"],
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config").join(DEFAULT_CONFIG_FILE)]
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
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
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

fn render_materials(config: &AppConfig) -> String {
    let entries = config.pricing.materials.entries();
    if entries.is_empty() {
        return unset();
    }
    entries
        .iter()
        .map(|entry| format!("{}={}", entry.material, entry.cost_per_kg))
        .collect::<Vec<_>>()
        .join(", ")
}

fn redact_secret(secret: &SecretString) -> String {
    if secret.expose_secret().trim().is_empty() {
        return "<empty>".to_string();
    }
    "<redacted>".to_string()
}

fn or_unset(value: &str) -> String {
    if value.trim().is_empty() {
        unset()
    } else {
        value.to_string()
    }
}

fn unset() -> String {
    "<unset>".to_string()
}
