use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use moldquote_core::domain::session::UserId;

use crate::client::Messenger;
use crate::commands::{classify_message, CommandRouteError, CommandRouter, QuestionnaireService};

#[derive(Debug, Deserialize)]
struct RawPayload {
    #[serde(default)]
    destination: Option<String>,
    #[serde(default)]
    events: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type", default)]
    event_type: String,
    #[serde(rename = "webhookEventId", default)]
    webhook_event_id: Option<String>,
    #[serde(default)]
    source: Option<RawSource>,
    #[serde(default)]
    message: Option<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    #[serde(rename = "userId", default)]
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(rename = "type", default)]
    message_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebhookBatch {
    pub destination: Option<String>,
    pub events: Vec<LineEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineEvent {
    TextMessage(TextMessageEvent),
    Ignored { event_type: String, reason: IgnoreReason },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextMessageEvent {
    pub webhook_event_id: Option<String>,
    pub user_id: UserId,
    /// Already trimmed.
    pub text: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    NotAMessage,
    NoUserId,
    NotText,
}

impl IgnoreReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotAMessage => "not_a_message",
            Self::NoUserId => "no_user_id",
            Self::NotText => "not_text",
        }
    }
}

#[derive(Debug, Error)]
pub enum WebhookParseError {
    #[error("webhook body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parses a raw webhook body. Events the bot does not act on are kept as
/// [`LineEvent::Ignored`] so callers can log them.
pub fn parse_webhook(body: &[u8]) -> Result<WebhookBatch, WebhookParseError> {
    let raw: RawPayload = serde_json::from_slice(body)?;
    let events = raw.events.into_iter().map(normalize_event).collect();
    Ok(WebhookBatch { destination: raw.destination, events })
}

fn normalize_event(raw: RawEvent) -> LineEvent {
    let ignored = |reason| LineEvent::Ignored { event_type: raw.event_type.clone(), reason };

    let Some(message) = raw.message.as_ref().filter(|_| raw.event_type == "message") else {
        return ignored(IgnoreReason::NotAMessage);
    };
    let Some(user_id) = raw.source.as_ref().and_then(|source| source.user_id.clone()) else {
        return ignored(IgnoreReason::NoUserId);
    };
    let (Some(text), "text") = (message.text.as_ref(), message.message_type.as_str()) else {
        return ignored(IgnoreReason::NotText);
    };

    LineEvent::TextMessage(TextMessageEvent {
        webhook_event_id: raw.webhook_event_id.clone(),
        user_id: UserId(user_id),
        text: text.trim().to_owned(),
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl EventContext {
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self { correlation_id: correlation_id.into() }
    }
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    /// Replies were produced; `delivered` is false when the push failed.
    Responded { message_count: usize, delivered: bool },
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Route(#[from] CommandRouteError),
}

/// Routes each text message and pushes the replies back to the sender.
pub struct EventDispatcher<S> {
    router: CommandRouter<S>,
    messenger: Arc<dyn Messenger>,
}

impl<S> EventDispatcher<S>
where
    S: QuestionnaireService,
{
    pub fn new(router: CommandRouter<S>, messenger: Arc<dyn Messenger>) -> Self {
        Self { router, messenger }
    }

    pub fn router(&self) -> &CommandRouter<S> {
        &self.router
    }

    pub async fn dispatch(
        &self,
        event: &LineEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let message = match event {
            LineEvent::TextMessage(message) => message,
            LineEvent::Ignored { event_type, reason } => {
                tracing::debug!(
                    event_name = "ingress.line.event_ignored",
                    correlation_id = %ctx.correlation_id,
                    event_type = %event_type,
                    reason = reason.as_str(),
                );
                return Ok(HandlerResult::Ignored);
            }
        };

        let command = classify_message(&message.text);
        tracing::info!(
            event_name = "ingress.line.event_received",
            correlation_id = %ctx.correlation_id,
            user_id = %message.user_id,
            command = command.name(),
            "line message received"
        );

        let replies = self.router.route(&message.user_id, command, ctx).await?;
        if replies.is_empty() {
            return Ok(HandlerResult::Responded { message_count: 0, delivered: true });
        }

        // Delivery problems are logged by the messenger and never fail the batch.
        let delivered = self.messenger.push(&message.user_id, &replies).await.is_ok();
        Ok(HandlerResult::Responded { message_count: replies.len(), delivered })
    }

    /// Handles events sequentially; a failing event does not stop the rest.
    pub async fn dispatch_batch(
        &self,
        batch: &WebhookBatch,
        ctx: &EventContext,
    ) -> Vec<Result<HandlerResult, DispatchError>> {
        let mut results = Vec::with_capacity(batch.events.len());
        for event in &batch.events {
            let result = self.dispatch(event, ctx).await;
            if let Err(error) = &result {
                tracing::error!(
                    event_name = "ingress.line.event_failed",
                    correlation_id = %ctx.correlation_id,
                    error = %error,
                    "line event handling failed"
                );
            }
            results.push(result);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use moldquote_core::domain::session::UserId;

    use super::{
        parse_webhook, DispatchError, EventContext, EventDispatcher, HandlerResult, IgnoreReason,
        LineEvent,
    };
    use crate::client::RecordingMessenger;
    use crate::commands::{CommandRouteError, CommandRouter, QuestionnaireService};
    use crate::messages::LineMessage;

    struct EchoService;

    #[async_trait]
    impl QuestionnaireService for EchoService {
        async fn start(
            &self,
            _user_id: &UserId,
            _ctx: &EventContext,
        ) -> Result<Vec<LineMessage>, CommandRouteError> {
            Ok(vec![LineMessage::text("started")])
        }

        async fn continue_with(
            &self,
            _user_id: &UserId,
            text: &str,
            _ctx: &EventContext,
        ) -> Result<Vec<LineMessage>, CommandRouteError> {
            if text == "boom" {
                return Err(CommandRouteError::Service("store offline".to_owned()));
            }
            Ok(vec![LineMessage::text(format!("echo:{text}"))])
        }
    }

    fn dispatcher() -> (EventDispatcher<EchoService>, RecordingMessenger) {
        let messenger = RecordingMessenger::new();
        (EventDispatcher::new(CommandRouter::new(EchoService), Arc::new(messenger.clone())), messenger)
    }

    #[test]
    fn text_message_event_is_normalized_and_trimmed() {
        let body = br#"{
            "destination": "Ubot",
            "events": [{
                "type": "message",
                "webhookEventId": "01H",
                "source": {"type": "user", "userId": "U-1"},
                "message": {"type": "text", "id": "1", "text": "  ABS \n"}
            }]
        }"#;

        let batch = parse_webhook(body).expect("parse");

        assert_eq!(batch.destination.as_deref(), Some("Ubot"));
        let [LineEvent::TextMessage(message)] = batch.events.as_slice() else {
            panic!("expected one text message, got {:?}", batch.events);
        };
        assert_eq!(message.user_id, UserId("U-1".to_owned()));
        assert_eq!(message.text, "ABS");
        assert_eq!(message.webhook_event_id.as_deref(), Some("01H"));
    }

    #[test]
    fn unsupported_events_are_ignored_with_reason() {
        let body = br#"{"events": [
            {"type": "follow", "source": {"userId": "U-1"}},
            {"type": "message", "source": {"type": "group"}, "message": {"type": "text", "text": "hi"}},
            {"type": "message", "source": {"userId": "U-1"}, "message": {"type": "sticker", "packageId": "1"}}
        ]}"#;

        let reasons = parse_webhook(body)
            .expect("parse")
            .events
            .into_iter()
            .map(|event| match event {
                LineEvent::Ignored { reason, .. } => reason,
                other => panic!("unexpected {other:?}"),
            })
            .collect::<Vec<_>>();

        assert_eq!(
            reasons,
            vec![IgnoreReason::NotAMessage, IgnoreReason::NoUserId, IgnoreReason::NotText]
        );
    }

    #[test]
    fn empty_and_malformed_bodies() {
        assert!(parse_webhook(br#"{"destination":"U"}"#).expect("no events").events.is_empty());
        assert!(parse_webhook(b"not json").is_err());
    }

    #[tokio::test]
    async fn dispatch_pushes_replies_to_sender() {
        let (dispatcher, messenger) = dispatcher();
        let batch = parse_webhook(
            r#"{"events":[{"type":"message","source":{"userId":"U-9"},"message":{"type":"text","text":"ติดต่อ"}}]}"#.as_bytes(),
        )
        .expect("parse");

        let results = dispatcher.dispatch_batch(&batch, &EventContext::default()).await;

        assert_eq!(results, vec![Ok(HandlerResult::Responded { message_count: 1, delivered: true })]);
        let pushes = messenger.pushes();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].0, UserId("U-9".to_owned()));
        assert!(pushes[0].1[0].as_text().is_some_and(|text| text.contains("FAQ 1")));
    }

    #[tokio::test]
    async fn failing_event_does_not_stop_the_batch() {
        let (dispatcher, messenger) = dispatcher();
        let batch = parse_webhook(
            br#"{"events":[
                {"type":"message","source":{"userId":"U-1"},"message":{"type":"text","text":"boom"}},
                {"type":"unfollow","source":{"userId":"U-1"}},
                {"type":"message","source":{"userId":"U-1"},"message":{"type":"text","text":"next"}}
            ]}"#,
        )
        .expect("parse");

        let results = dispatcher.dispatch_batch(&batch, &EventContext::new("req-1")).await;

        assert!(matches!(results[0], Err(DispatchError::Route(_))));
        assert_eq!(results[1], Ok(HandlerResult::Ignored));
        assert!(results[2].is_ok());
        assert_eq!(messenger.texts_for(&UserId("U-1".to_owned())), vec!["echo:next"]);
    }
}
