use std::sync::Arc;

use axum::Router;
use moldquote_core::audit::{AuditSink, TracingAuditSink};
use moldquote_core::config::{AppConfig, ConfigError};
use moldquote_core::flows::QuestionnaireEngine;
use moldquote_core::sinks::QuoteSink;
use moldquote_db::{
    connect_with_settings, migrations, DbPool, InMemorySessionStore, SessionStore, SqlQuoteSink,
};
use moldquote_line::client::{LinePushClient, Messenger};
use moldquote_line::commands::CommandRouter;
use moldquote_line::events::EventDispatcher;
use moldquote_sheets::{configured_source, PriceSourceError, SheetsClient, SheetsQuoteSink};
use thiserror::Error;
use tracing::{info, warn};

use crate::health::{self, HealthState};
use crate::intake::IntakeService;
use crate::webhook::{self, WebhookState};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub sessions: Arc<dyn SessionStore>,
    pub router: Router,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("line.channel_access_token is required to reply to users")]
    MissingLineToken,
    #[error("material price table could not be loaded: {0}")]
    Pricing(#[from] PriceSourceError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    config.validate()?;
    if !config.line.has_access_token() {
        return Err(BootstrapError::MissingLineToken);
    }

    let sheets_client = SheetsClient::from_config(&config.sheets).map(Arc::new);
    let price_source = configured_source(&config, sheets_client.clone())?;
    let prices = price_source.load().await?;
    info!(
        event_name = "system.bootstrap.prices_loaded",
        correlation_id = "bootstrap",
        source = price_source.name(),
        materials = %prices.display_list(),
        "material price table ready"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let mut sinks: Vec<Arc<dyn QuoteSink>> = Vec::new();
    match &sheets_client {
        Some(client) => {
            sinks.push(Arc::new(SheetsQuoteSink::new(client.clone(), &config.sheets.quote_sheet)))
        }
        None => warn!(
            event_name = "system.bootstrap.spreadsheet_sink_disabled",
            correlation_id = "bootstrap",
            "sheets credentials missing; quote requests go to the database only"
        ),
    }
    sinks.push(Arc::new(SqlQuoteSink::new(db_pool.clone())));

    let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
    let audit: Arc<dyn AuditSink> = Arc::new(TracingAuditSink);
    let intake = IntakeService::new(
        sessions.clone(),
        Arc::new(QuestionnaireEngine::with_prices(Arc::new(prices))),
        sinks,
        audit,
    );
    let messenger: Arc<dyn Messenger> = Arc::new(LinePushClient::new(
        &config.line.api_base_url,
        config.line.channel_access_token.clone(),
    ));
    let dispatcher = EventDispatcher::new(CommandRouter::new(intake), messenger);

    let webhook_state = WebhookState::new(dispatcher, config.line.channel_secret.clone());
    if !webhook_state.verifies_signatures() {
        warn!(
            event_name = "system.bootstrap.signature_check_disabled",
            correlation_id = "bootstrap",
            "line.channel_secret not set; webhook signatures are not verified"
        );
    }

    let router = webhook::router(webhook_state)
        .merge(health::router(HealthState::new(db_pool.clone(), sessions.clone())));

    Ok(Application { config, db_pool, sessions, router })
}
