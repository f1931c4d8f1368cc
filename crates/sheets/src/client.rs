use moldquote_core::config::SheetsConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SheetsError {
    #[error("sheets request failed: {0}")]
    Transport(String),
    #[error("sheets api returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("unexpected sheets response: {0}")]
    Decode(String),
}

impl SheetsError {
    /// 4xx responses mean the request itself was refused.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Api { status, .. } if (400..500).contains(status))
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Thin client over the `spreadsheets.values` endpoints of one spreadsheet.
///
/// The bearer token is used as configured and never refreshed; an expired
/// token surfaces as a `401` from every call until it is rotated.
pub struct SheetsClient {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    access_token: SecretString,
}

impl SheetsClient {
    pub fn new(api_base_url: &str, spreadsheet_id: &str, access_token: SecretString) -> Self {
        Self {
            client: Client::new(),
            base_url: api_base_url.trim_end_matches('/').to_owned(),
            spreadsheet_id: spreadsheet_id.to_owned(),
            access_token,
        }
    }

    /// `None` until both `sheets.spreadsheet_id` and `sheets.access_token` are set.
    pub fn from_config(config: &SheetsConfig) -> Option<Self> {
        config.has_credentials().then(|| {
            Self::new(&config.api_base_url, &config.spreadsheet_id, config.access_token.clone())
        })
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    fn values_url(&self, range: &str) -> String {
        format!("{}/v4/spreadsheets/{}/values/{range}", self.base_url, self.spreadsheet_id)
    }

    /// Reads `range` as rows of display strings. Missing `values` means an
    /// empty range.
    pub async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        let response = self
            .client
            .get(self.values_url(range))
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await
            .map_err(|error| SheetsError::Transport(error.to_string()))?;
        let response = check_status(response).await?;

        let body: ValueRange =
            response.json().await.map_err(|error| SheetsError::Decode(error.to_string()))?;
        Ok(body.values.into_iter().map(|row| row.into_iter().map(cell_text).collect()).collect())
    }

    pub async fn append_row(&self, range: &str, row: Vec<Value>) -> Result<(), SheetsError> {
        let response = self
            .client
            .post(format!("{}:append", self.values_url(range)))
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(self.access_token.expose_secret())
            .json(&json!({ "values": [row] }))
            .send()
            .await
            .map_err(|error| SheetsError::Transport(error.to_string()))?;
        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SheetsError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(
        event_name = "egress.sheets.request_failed",
        status = status.as_u16(),
        "sheets api returned an error status"
    );
    Err(SheetsError::Api { status: status.as_u16(), body })
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
