use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::material::{MaterialName, MaterialPriceTable};

pub const DEFAULT_CONFIG_FILE: &str = "moldquote.toml";
pub const DEFAULT_LINE_API_BASE_URL: &str = "https://api.line.me";
pub const DEFAULT_SHEETS_API_BASE_URL: &str = "https://sheets.googleapis.com";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub line: LineConfig,
    pub sheets: SheetsConfig,
    pub pricing: PricingConfig,
    pub session: SessionConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LineConfig {
    pub channel_access_token: SecretString,
    /// When unset, inbound webhook signatures are not checked.
    pub channel_secret: Option<SecretString>,
    pub api_base_url: String,
}

#[derive(Clone, Debug)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub access_token: SecretString,
    pub quote_sheet: String,
    pub material_sheet: String,
    pub api_base_url: String,
}

#[derive(Clone, Debug)]
pub struct PricingConfig {
    pub source: PriceSourceKind,
    pub materials: MaterialPriceTable,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Sessions untouched for longer than this are evicted. `None` keeps them forever.
    pub idle_ttl_secs: Option<u64>,
    pub sweep_interval_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSourceKind {
    Sheets,
    Inline,
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
    pub port: Option<u16>,
    pub pricing_source: Option<PriceSourceKind>,
    pub line_channel_access_token: Option<String>,
    pub line_channel_secret: Option<String>,
    pub sheets_spreadsheet_id: Option<String>,
    pub sheets_access_token: Option<String>,
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
                url: "sqlite://moldquote.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            line: LineConfig {
                channel_access_token: String::new().into(),
                channel_secret: None,
                api_base_url: DEFAULT_LINE_API_BASE_URL.to_string(),
            },
            sheets: SheetsConfig {
                spreadsheet_id: String::new(),
                access_token: String::new().into(),
                quote_sheet: "Data".to_string(),
                material_sheet: "MATERIAL_COSTS".to_string(),
                api_base_url: DEFAULT_SHEETS_API_BASE_URL.to_string(),
            },
            pricing: PricingConfig {
                source: PriceSourceKind::Sheets,
                materials: MaterialPriceTable::default(),
            },
            session: SessionConfig { idle_ttl_secs: None, sweep_interval_secs: 60 },
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for PriceSourceKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sheets" => Ok(Self::Sheets),
            "inline" => Ok(Self::Inline),
            other => Err(ConfigError::Validation(format!(
                "unsupported pricing source `{other}` (expected sheets|inline)"
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

impl LineConfig {
    pub fn has_access_token(&self) -> bool {
        !self.channel_access_token.expose_secret().trim().is_empty()
    }
}

impl SheetsConfig {
    pub fn has_credentials(&self) -> bool {
        !self.spreadsheet_id.trim().is_empty()
            && !self.access_token.expose_secret().trim().is_empty()
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
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
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

        if let Some(line) = patch.line {
            if let Some(value) = line.channel_access_token {
                self.line.channel_access_token = secret_value(value);
            }
            if let Some(value) = line.channel_secret {
                self.line.channel_secret = non_empty_secret(value);
            }
            if let Some(api_base_url) = line.api_base_url {
                self.line.api_base_url = api_base_url;
            }
        }

        if let Some(sheets) = patch.sheets {
            if let Some(spreadsheet_id) = sheets.spreadsheet_id {
                self.sheets.spreadsheet_id = spreadsheet_id;
            }
            if let Some(value) = sheets.access_token {
                self.sheets.access_token = secret_value(value);
            }
            if let Some(quote_sheet) = sheets.quote_sheet {
                self.sheets.quote_sheet = quote_sheet;
            }
            if let Some(material_sheet) = sheets.material_sheet {
                self.sheets.material_sheet = material_sheet;
            }
            if let Some(api_base_url) = sheets.api_base_url {
                self.sheets.api_base_url = api_base_url;
            }
        }

        if let Some(pricing) = patch.pricing {
            if let Some(source) = pricing.source {
                self.pricing.source = source;
            }
            if let Some(materials) = pricing.materials {
                let mut table = MaterialPriceTable::default();
                for (name, cost_per_kg) in materials {
                    table.insert(MaterialName(name.trim().to_string()), cost_per_kg);
                }
                self.pricing.materials = table;
            }
        }

        if let Some(session) = patch.session {
            if let Some(idle_ttl_secs) = session.idle_ttl_secs {
                self.session.idle_ttl_secs = (idle_ttl_secs > 0).then_some(idle_ttl_secs);
            }
            if let Some(sweep_interval_secs) = session.sweep_interval_secs {
                self.session.sweep_interval_secs = sweep_interval_secs;
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
        if let Some(value) = read_env("MOLDQUOTE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("MOLDQUOTE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("MOLDQUOTE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("MOLDQUOTE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("MOLDQUOTE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("MOLDQUOTE_LINE_CHANNEL_ACCESS_TOKEN") {
            self.line.channel_access_token = secret_value(value);
        }
        if let Some(value) = read_env("MOLDQUOTE_LINE_CHANNEL_SECRET") {
            self.line.channel_secret = non_empty_secret(value);
        }
        if let Some(value) = read_env("MOLDQUOTE_LINE_API_BASE_URL") {
            self.line.api_base_url = value;
        }

        if let Some(value) = read_env("MOLDQUOTE_SHEETS_SPREADSHEET_ID") {
            self.sheets.spreadsheet_id = value;
        }
        if let Some(value) = read_env("MOLDQUOTE_SHEETS_ACCESS_TOKEN") {
            self.sheets.access_token = secret_value(value);
        }
        if let Some(value) = read_env("MOLDQUOTE_SHEETS_QUOTE_SHEET") {
            self.sheets.quote_sheet = value;
        }
        if let Some(value) = read_env("MOLDQUOTE_SHEETS_MATERIAL_SHEET") {
            self.sheets.material_sheet = value;
        }
        if let Some(value) = read_env("MOLDQUOTE_SHEETS_API_BASE_URL") {
            self.sheets.api_base_url = value;
        }

        if let Some(value) = read_env("MOLDQUOTE_PRICING_SOURCE") {
            self.pricing.source = value.parse()?;
        }
        if let Some(value) = read_env("MOLDQUOTE_PRICING_MATERIALS") {
            self.pricing.materials = parse_material_list("MOLDQUOTE_PRICING_MATERIALS", &value)?;
        }

        if let Some(value) = read_env("MOLDQUOTE_SESSION_IDLE_TTL_SECS") {
            let ttl = parse_u64("MOLDQUOTE_SESSION_IDLE_TTL_SECS", &value)?;
            self.session.idle_ttl_secs = (ttl > 0).then_some(ttl);
        }
        if let Some(value) = read_env("MOLDQUOTE_SESSION_SWEEP_INTERVAL_SECS") {
            self.session.sweep_interval_secs =
                parse_u64("MOLDQUOTE_SESSION_SWEEP_INTERVAL_SECS", &value)?;
        }

        if let Some(value) = read_env("MOLDQUOTE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        let port = read_env("MOLDQUOTE_SERVER_PORT")
            .map(|value| ("MOLDQUOTE_SERVER_PORT", value))
            .or_else(|| read_env("PORT").map(|value| ("PORT", value)));
        if let Some((key, value)) = port {
            self.server.port = parse_u16(key, &value)?;
        }
        if let Some(value) = read_env("MOLDQUOTE_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("MOLDQUOTE_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("MOLDQUOTE_LOGGING_LEVEL").or_else(|| read_env("MOLDQUOTE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("MOLDQUOTE_LOGGING_FORMAT").or_else(|| read_env("MOLDQUOTE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
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
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(source) = overrides.pricing_source {
            self.pricing.source = source;
        }
        if let Some(token) = overrides.line_channel_access_token {
            self.line.channel_access_token = secret_value(token);
        }
        if let Some(secret) = overrides.line_channel_secret {
            self.line.channel_secret = non_empty_secret(secret);
        }
        if let Some(spreadsheet_id) = overrides.sheets_spreadsheet_id {
            self.sheets.spreadsheet_id = spreadsheet_id;
        }
        if let Some(token) = overrides.sheets_access_token {
            self.sheets.access_token = secret_value(token);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_line(&self.line)?;
        validate_sheets(&self.sheets)?;
        validate_pricing(&self.pricing, &self.sheets)?;
        validate_session(&self.session)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config").join(DEFAULT_CONFIG_FILE)]
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

/// Parses `ABS=120,PC=150` keeping the listed order.
fn parse_material_list(key: &str, value: &str) -> Result<MaterialPriceTable, ConfigError> {
    let invalid =
        || ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() };

    let mut table = MaterialPriceTable::default();
    for pair in value.split(',').map(str::trim).filter(|pair| !pair.is_empty()) {
        let (name, cost) = pair.split_once('=').ok_or_else(invalid)?;
        let name = name.trim();
        let cost = cost.trim().parse::<f64>().map_err(|_| invalid())?;
        if name.is_empty() || !cost.is_finite() || cost < 0.0 {
            return Err(invalid());
        }
        table.insert(MaterialName(name.to_string()), cost);
    }
    Ok(table)
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

fn validate_line(line: &LineConfig) -> Result<(), ConfigError> {
    validate_http_url("line.api_base_url", &line.api_base_url)
}

fn validate_sheets(sheets: &SheetsConfig) -> Result<(), ConfigError> {
    validate_http_url("sheets.api_base_url", &sheets.api_base_url)?;

    if sheets.quote_sheet.trim().is_empty() {
        return Err(ConfigError::Validation("sheets.quote_sheet must not be empty".to_string()));
    }
    if sheets.material_sheet.trim().is_empty() {
        return Err(ConfigError::Validation(
            "sheets.material_sheet must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_pricing(pricing: &PricingConfig, sheets: &SheetsConfig) -> Result<(), ConfigError> {
    match pricing.source {
        PriceSourceKind::Sheets if !sheets.has_credentials() => Err(ConfigError::Validation(
            "pricing.source = \"sheets\" requires sheets.spreadsheet_id and sheets.access_token \
             (or set pricing.source = \"inline\" with [pricing.materials])"
                .to_string(),
        )),
        PriceSourceKind::Inline if pricing.materials.is_empty() => Err(ConfigError::Validation(
            "pricing.source = \"inline\" requires at least one entry in [pricing.materials] \
             or MOLDQUOTE_PRICING_MATERIALS"
                .to_string(),
        )),
        PriceSourceKind::Sheets | PriceSourceKind::Inline => {
            let negative = pricing.materials.entries().iter().find(|entry| {
                !entry.cost_per_kg.is_finite() || entry.cost_per_kg < 0.0
            });
            match negative {
                Some(entry) => Err(ConfigError::Validation(format!(
                    "pricing.materials.{} must be a non-negative number",
                    entry.material
                ))),
                None => Ok(()),
            }
        }
    }
}

fn validate_session(session: &SessionConfig) -> Result<(), ConfigError> {
    if session.sweep_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "session.sweep_interval_secs must be greater than zero".to_string(),
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

fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!("{key} must start with http:// or https://")))
    }
}

fn non_empty_secret(value: String) -> Option<SecretString> {
    (!value.trim().is_empty()).then(|| secret_value(value))
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
    line: Option<LinePatch>,
    sheets: Option<SheetsPatch>,
    pricing: Option<PricingPatch>,
    session: Option<SessionPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LinePatch {
    channel_access_token: Option<String>,
    channel_secret: Option<String>,
    api_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SheetsPatch {
    spreadsheet_id: Option<String>,
    access_token: Option<String>,
    quote_sheet: Option<String>,
    material_sheet: Option<String>,
    api_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    source: Option<PriceSourceKind>,
    materials: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionPatch {
    idle_ttl_secs: Option<u64>,
    sweep_interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
