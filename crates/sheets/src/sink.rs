use std::sync::Arc;

use async_trait::async_trait;

use moldquote_core::domain::quote_request::QuoteRequest;
use moldquote_core::sinks::{QuoteSink, SinkError};

use crate::client::SheetsClient;

pub const SPREADSHEET_SINK_NAME: &str = "spreadsheet";

/// Appends each completed quote request as one row of the quote sheet.
pub struct SheetsQuoteSink {
    client: Arc<SheetsClient>,
    range: String,
}

impl SheetsQuoteSink {
    pub fn new(client: Arc<SheetsClient>, quote_sheet: &str) -> Self {
        Self { client, range: format!("{quote_sheet}!A1") }
    }
}

#[async_trait]
impl QuoteSink for SheetsQuoteSink {
    fn name(&self) -> &str {
        SPREADSHEET_SINK_NAME
    }

    async fn submit(&self, request: &QuoteRequest) -> Result<(), SinkError> {
        self.client.append_row(&self.range, request.sheet_row()).await.map_err(|error| {
            let sink = SPREADSHEET_SINK_NAME.to_owned();
            let message = error.to_string();
            if error.is_client_error() {
                SinkError::Rejected { sink, message }
            } else {
                SinkError::Unavailable { sink, message }
            }
        })
    }
}
