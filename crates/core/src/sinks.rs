use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::quote_request::QuoteRequest;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SinkError {
    #[error("{sink} rejected the quote request: {message}")]
    Rejected { sink: String, message: String },
    #[error("{sink} is unreachable: {message}")]
    Unavailable { sink: String, message: String },
}

impl SinkError {
    pub fn sink(&self) -> &str {
        match self {
            Self::Rejected { sink, .. } | Self::Unavailable { sink, .. } => sink,
        }
    }
}

/// Destination for completed quote requests. Each sink is called once per
/// submission and is never retried.
#[async_trait]
pub trait QuoteSink: Send + Sync {
    fn name(&self) -> &str;

    async fn submit(&self, request: &QuoteRequest) -> Result<(), SinkError>;
}

/// Outcome of fanning one request out to every configured sink.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SinkReport {
    pub delivered: Vec<String>,
    pub failures: Vec<SinkError>,
}

impl SinkReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// All failures joined into one line for the user-facing apology.
    pub fn failure_summary(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        Some(self.failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))
    }
}

/// Calls every sink exactly once, in order, even after an earlier failure.
pub async fn submit_to_all(sinks: &[Arc<dyn QuoteSink>], request: &QuoteRequest) -> SinkReport {
    let mut report = SinkReport::default();
    for sink in sinks {
        match sink.submit(request).await {
            Ok(()) => {
                tracing::info!(
                    event_name = "persistence.sink_delivered",
                    sink = sink.name(),
                    quote_request_id = %request.id.0,
                    "quote request delivered"
                );
                report.delivered.push(sink.name().to_string());
            }
            Err(error) => {
                tracing::warn!(
                    event_name = "persistence.sink_failed",
                    sink = sink.name(),
                    quote_request_id = %request.id.0,
                    error = %error,
                    "quote request delivery failed"
                );
                report.failures.push(error);
            }
        }
    }
    report
}

#[derive(Clone, Default)]
pub struct InMemoryQuoteSink {
    name: String,
    requests: Arc<Mutex<Vec<QuoteRequest>>>,
    failure: Option<SinkError>,
}

impl InMemoryQuoteSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// A sink that records each call and then fails with `message`.
    pub fn failing(name: impl Into<String>, message: impl Into<String>) -> Self {
        let name = name.into();
        let failure = SinkError::Unavailable { sink: name.clone(), message: message.into() };
        Self { name, requests: Arc::default(), failure: Some(failure) }
    }

    pub fn requests(&self) -> Vec<QuoteRequest> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl QuoteSink for InMemoryQuoteSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn submit(&self, request: &QuoteRequest) -> Result<(), SinkError> {
        match self.requests.lock() {
            Ok(mut requests) => requests.push(request.clone()),
            Err(poisoned) => poisoned.into_inner().push(request.clone()),
        }
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use crate::domain::quote_request::{QuoteRequest, QuoteRequestId};
    use crate::sinks::{submit_to_all, InMemoryQuoteSink, QuoteSink};

    fn request() -> QuoteRequest {
        QuoteRequest {
            id: QuoteRequestId::generate(),
            user_id: "U-1".to_owned(),
            material: "ABS".to_owned(),
            size: "10x5x2".to_owned(),
            quantity: 50,
            volume: 100.0,
            weight_kg: 0.105,
            total_cost: 630.0,
            full_name: "Jane Doe".to_owned(),
            phone: "0891234567".to_owned(),
            company: "Acme".to_owned(),
            email: "jane@acme.com".to_owned(),
            submitted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn every_sink_is_called_once_even_after_failure() {
        let sheet = InMemoryQuoteSink::failing("spreadsheet", "quota exceeded");
        let warehouse = InMemoryQuoteSink::new("warehouse");
        let sinks: Vec<Arc<dyn QuoteSink>> =
            vec![Arc::new(sheet.clone()), Arc::new(warehouse.clone())];

        let report = submit_to_all(&sinks, &request()).await;

        assert_eq!(sheet.requests().len(), 1);
        assert_eq!(warehouse.requests().len(), 1);
        assert_eq!(report.delivered, vec!["warehouse".to_owned()]);
        assert!(!report.is_success());
        let summary = report.failure_summary().expect("one failure");
        assert!(summary.contains("spreadsheet"));
        assert!(summary.contains("quota exceeded"));
    }

    #[tokio::test]
    async fn all_failures_are_combined() {
        let sinks: Vec<Arc<dyn QuoteSink>> = vec![
            Arc::new(InMemoryQuoteSink::failing("spreadsheet", "timeout")),
            Arc::new(InMemoryQuoteSink::failing("warehouse", "disk full")),
        ];

        let report = submit_to_all(&sinks, &request()).await;

        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[1].sink(), "warehouse");
        let summary = report.failure_summary().expect("failures");
        assert!(summary.contains("timeout") && summary.contains("disk full"));
    }

    #[tokio::test]
    async fn successful_fan_out_has_no_summary() {
        let sink = InMemoryQuoteSink::new("warehouse");
        let sinks: Vec<Arc<dyn QuoteSink>> = vec![Arc::new(sink.clone())];

        let report = submit_to_all(&sinks, &request()).await;

        assert!(report.is_success());
        assert_eq!(report.failure_summary(), None);
        assert_eq!(sink.requests()[0].email, "jane@acme.com");
    }
}
