use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use moldquote_core::errors::{ApplicationError, InterfaceError};
use moldquote_line::{
    events::{parse_webhook, EventContext, EventDispatcher},
    signature::{verify_signature, SIGNATURE_HEADER},
};
use secrecy::SecretString;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::intake::IntakeService;

pub const ROOT_BANNER: &str = "LINE Webhook is running";

pub struct WebhookState {
    dispatcher: EventDispatcher<IntakeService>,
    channel_secret: Option<SecretString>,
}

impl WebhookState {
    /// Without a channel secret, incoming bodies are accepted unsigned.
    pub fn new(
        dispatcher: EventDispatcher<IntakeService>,
        channel_secret: Option<SecretString>,
    ) -> Self {
        Self { dispatcher, channel_secret }
    }

    pub fn verifies_signatures(&self) -> bool {
        self.channel_secret.is_some()
    }
}

#[derive(Debug)]
pub struct WebhookError(InterfaceError);

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({
            "error": self.0.user_message(),
            "correlation_id": self.0.correlation_id(),
        });
        (status, Json(body)).into_response()
    }
}

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/webhook", post(receive))
        .with_state(Arc::new(state))
}

async fn root() -> &'static str {
    ROOT_BANNER
}

async fn receive(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, WebhookError> {
    let correlation_id = Uuid::new_v4().to_string();

    if let Some(secret) = &state.channel_secret {
        let signature = headers.get(SIGNATURE_HEADER).and_then(|value| value.to_str().ok());
        if let Err(error) = verify_signature(secret, &body, signature) {
            warn!(
                event_name = "ingress.line.signature_rejected",
                correlation_id = %correlation_id,
                error = %error,
                "webhook signature rejected"
            );
            return Err(WebhookError(
                ApplicationError::Unauthorized(error.to_string()).into_interface(&correlation_id),
            ));
        }
    }

    let batch = parse_webhook(&body).map_err(|error| {
        warn!(
            event_name = "ingress.line.payload_rejected",
            correlation_id = %correlation_id,
            error = %error,
            "webhook payload rejected"
        );
        WebhookError(InterfaceError::BadRequest {
            message: error.to_string(),
            correlation_id: correlation_id.clone(),
        })
    })?;

    let ctx = EventContext::new(correlation_id.clone());
    let results = state.dispatcher.dispatch_batch(&batch, &ctx).await;
    info!(
        event_name = "ingress.line.batch_handled",
        correlation_id = %correlation_id,
        events = batch.events.len(),
        failed = results.iter().filter(|result| result.is_err()).count(),
        "webhook batch handled"
    );

    Ok(Json(json!({ "status": "ok" })))
}
