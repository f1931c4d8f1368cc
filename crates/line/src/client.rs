use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;

use moldquote_core::domain::session::UserId;

use crate::messages::LineMessage;

/// The push endpoint accepts at most five messages per request.
pub const MAX_MESSAGES_PER_PUSH: usize = 5;
pub const PUSH_PATH: &str = "/v2/bot/message/push";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessengerError {
    #[error("push request failed: {0}")]
    Transport(String),
    #[error("push endpoint returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait Messenger: Send + Sync {
    async fn push(&self, to: &UserId, messages: &[LineMessage]) -> Result<(), MessengerError>;
}

#[derive(Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: &'a [LineMessage],
}

pub struct LinePushClient {
    client: Client,
    endpoint: String,
    access_token: SecretString,
}

impl LinePushClient {
    pub fn new(api_base_url: &str, access_token: SecretString) -> Self {
        Self::with_client(Client::new(), api_base_url, access_token)
    }

    pub fn with_client(client: Client, api_base_url: &str, access_token: SecretString) -> Self {
        let endpoint = format!("{}{PUSH_PATH}", api_base_url.trim_end_matches('/'));
        Self { client, endpoint, access_token }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn push_chunk(&self, to: &UserId, messages: &[LineMessage]) -> Result<(), MessengerError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.access_token.expose_secret())
            .json(&PushRequest { to: to.as_str(), messages })
            .send()
            .await
            .map_err(|error| MessengerError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MessengerError::Rejected { status: status.as_u16(), body });
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for LinePushClient {
    /// Sends in chunks of [`MAX_MESSAGES_PER_PUSH`]; stops at the first
    /// rejected chunk. Nothing is retried.
    async fn push(&self, to: &UserId, messages: &[LineMessage]) -> Result<(), MessengerError> {
        for chunk in messages.chunks(MAX_MESSAGES_PER_PUSH) {
            if let Err(error) = self.push_chunk(to, chunk).await {
                tracing::warn!(
                    event_name = "egress.line.push_failed",
                    user_id = %to,
                    error = %error,
                    "line push failed"
                );
                return Err(error);
            }
        }
        tracing::info!(
            event_name = "egress.line.push_delivered",
            user_id = %to,
            message_count = messages.len(),
            "line push delivered"
        );
        Ok(())
    }
}

/// Captures pushes instead of sending them.
#[derive(Clone, Default)]
pub struct RecordingMessenger {
    pushes: Arc<Mutex<Vec<(UserId, Vec<LineMessage>)>>>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pushes(&self) -> Vec<(UserId, Vec<LineMessage>)> {
        match self.pushes.lock() {
            Ok(pushes) => pushes.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Text bodies pushed to `user`, flattened in order.
    pub fn texts_for(&self, user: &UserId) -> Vec<String> {
        self.pushes()
            .into_iter()
            .filter(|(to, _)| to == user)
            .flat_map(|(_, messages)| messages)
            .filter_map(|message| message.as_text().map(str::to_owned))
            .collect()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn push(&self, to: &UserId, messages: &[LineMessage]) -> Result<(), MessengerError> {
        let entry = (to.clone(), messages.to_vec());
        match self.pushes.lock() {
            Ok(mut pushes) => pushes.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use moldquote_core::domain::session::UserId;

    use super::{LinePushClient, Messenger, MessengerError, RecordingMessenger};
    use crate::messages::LineMessage;

    fn client(server: &MockServer) -> LinePushClient {
        LinePushClient::new(&server.uri(), SecretString::from("token-123".to_owned()))
    }

    #[tokio::test]
    async fn push_posts_bearer_authorized_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/bot/message/push"))
            .and(header("authorization", "Bearer token-123"))
            .and(body_json(json!({
                "to": "U-1",
                "messages": [{"type": "text", "text": "hello"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .push(&UserId("U-1".to_owned()), &[LineMessage::text("hello")])
            .await
            .expect("push accepted");
    }

    #[tokio::test]
    async fn more_than_five_messages_are_split_into_chunks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/bot/message/push"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let messages = (0..7).map(|n| LineMessage::text(format!("m{n}"))).collect::<Vec<_>>();
        client(&server).push(&UserId("U-2".to_owned()), &messages).await.expect("both chunks");
    }

    #[tokio::test]
    async fn rejected_push_surfaces_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Invalid reply token"))
            .mount(&server)
            .await;

        let error = client(&server)
            .push(&UserId("U-3".to_owned()), &[LineMessage::text("x")])
            .await
            .expect_err("400 is an error");

        assert_eq!(
            error,
            MessengerError::Rejected { status: 400, body: "Invalid reply token".to_owned() }
        );
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let client =
            LinePushClient::new("https://api.line.me/", SecretString::from("t".to_owned()));

        assert_eq!(client.endpoint(), "https://api.line.me/v2/bot/message/push");
    }

    #[tokio::test]
    async fn recording_messenger_keeps_texts_per_user() {
        let messenger = RecordingMessenger::new();
        let alice = UserId("U-a".to_owned());
        messenger.push(&alice, &[LineMessage::text("one"), LineMessage::text("two")]).await.expect("push");
        messenger.push(&UserId("U-b".to_owned()), &[LineMessage::text("other")]).await.expect("push");

        assert_eq!(messenger.texts_for(&alice), vec!["one", "two"]);
        assert_eq!(messenger.pushes().len(), 2);
    }
}
