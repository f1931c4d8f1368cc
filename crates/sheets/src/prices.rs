use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use moldquote_core::config::{AppConfig, PriceSourceKind};
use moldquote_core::domain::material::{table_from_rows, MaterialPriceTable};

use crate::client::{SheetsClient, SheetsError};

#[derive(Debug, Error)]
pub enum PriceSourceError {
    #[error(transparent)]
    Sheets(#[from] SheetsError),
    #[error("{source_name} returned no material prices")]
    Empty { source_name: String },
    #[error("pricing.source = \"sheets\" requires sheets.spreadsheet_id and sheets.access_token")]
    MissingCredentials,
}

/// Picks the source named by `pricing.source`. `sheets_client` is shared with
/// the quote sink so both use one HTTP client.
pub fn configured_source(
    config: &AppConfig,
    sheets_client: Option<Arc<SheetsClient>>,
) -> Result<Box<dyn MaterialPriceSource>, PriceSourceError> {
    match (config.pricing.source, sheets_client) {
        (PriceSourceKind::Inline, _) => {
            Ok(Box::new(InlinePriceSource::new(config.pricing.materials.clone())))
        }
        (PriceSourceKind::Sheets, Some(client)) => {
            Ok(Box::new(SheetsPriceSource::new(client, &config.sheets.material_sheet)))
        }
        (PriceSourceKind::Sheets, None) => Err(PriceSourceError::MissingCredentials),
    }
}

/// Where the material price table comes from. Loaded once at startup.
#[async_trait]
pub trait MaterialPriceSource: Send + Sync {
    fn name(&self) -> &str;

    async fn load(&self) -> Result<MaterialPriceTable, PriceSourceError>;
}

pub struct SheetsPriceSource {
    client: Arc<SheetsClient>,
    range: String,
}

impl SheetsPriceSource {
    /// Reads columns A (material) and B (cost per kg) below the header row.
    pub fn new(client: Arc<SheetsClient>, material_sheet: &str) -> Self {
        Self { client, range: format!("{material_sheet}!A2:B") }
    }

    pub fn range(&self) -> &str {
        &self.range
    }
}

#[async_trait]
impl MaterialPriceSource for SheetsPriceSource {
    fn name(&self) -> &str {
        "sheets"
    }

    async fn load(&self) -> Result<MaterialPriceTable, PriceSourceError> {
        let rows = self.client.get_values(&self.range).await?;
        let table = table_from_rows(rows);
        if table.is_empty() {
            return Err(PriceSourceError::Empty { source_name: format!("sheet range {}", self.range) });
        }

        tracing::info!(
            event_name = "pricing.table_loaded",
            source = self.name(),
            range = %self.range,
            materials = table.len(),
            "material prices loaded"
        );
        Ok(table)
    }
}

/// Prices taken from `[pricing.materials]` in the configuration file.
pub struct InlinePriceSource {
    table: MaterialPriceTable,
}

impl InlinePriceSource {
    pub fn new(table: MaterialPriceTable) -> Self {
        Self { table }
    }
}

#[async_trait]
impl MaterialPriceSource for InlinePriceSource {
    fn name(&self) -> &str {
        "inline"
    }

    async fn load(&self) -> Result<MaterialPriceTable, PriceSourceError> {
        if self.table.is_empty() {
            return Err(PriceSourceError::Empty { source_name: "pricing.materials".to_owned() });
        }
        tracing::info!(
            event_name = "pricing.table_loaded",
            source = self.name(),
            materials = self.table.len(),
            "material prices loaded"
        );
        Ok(self.table.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use moldquote_core::config::{AppConfig, PriceSourceKind};
    use moldquote_core::domain::material::{MaterialName, MaterialPrice, MaterialPriceTable};

    use super::{
        configured_source, InlinePriceSource, MaterialPriceSource, PriceSourceError,
        SheetsPriceSource,
    };
    use crate::client::SheetsClient;

    async fn source_with(values: serde_json::Value) -> (MockServer, SheetsPriceSource) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/prices/values/MATERIAL_COSTS!A2:B"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "values": values })))
            .mount(&server)
            .await;
        let client = SheetsClient::new(&server.uri(), "prices", SecretString::from("t".to_owned()));
        (server, SheetsPriceSource::new(Arc::new(client), "MATERIAL_COSTS"))
    }

    #[tokio::test]
    async fn sheet_rows_become_ordered_price_table() {
        let (_server, source) = source_with(json!([
            ["ABS", "120"],
            ["PC", "150"],
            ["Broken"],
            [" Nylon ", "abc"],
            ["ABS", "125"]
        ]))
        .await;

        let table = source.load().await.expect("prices");

        assert_eq!(table.display_list(), "ABS, PC, Nylon");
        assert_eq!(table.get("ABS"), Some(125.0));
        assert_eq!(table.get("Nylon"), Some(0.0));
        assert_eq!(source.range(), "MATERIAL_COSTS!A2:B");
    }

    #[tokio::test]
    async fn empty_sheet_fails_the_load() {
        let (_server, source) = source_with(json!([])).await;

        let error = source.load().await.expect_err("no prices");

        assert!(matches!(error, PriceSourceError::Empty { .. }));
    }

    #[tokio::test]
    async fn sheet_api_failure_is_propagated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let client = SheetsClient::new(&server.uri(), "prices", SecretString::from("t".to_owned()));
        let source = SheetsPriceSource::new(Arc::new(client), "MATERIAL_COSTS");

        assert!(matches!(source.load().await, Err(PriceSourceError::Sheets(_))));
    }

    #[tokio::test]
    async fn inline_source_returns_configured_table() {
        let table = MaterialPriceTable::new(vec![MaterialPrice {
            material: MaterialName("PP".to_owned()),
            cost_per_kg: 40.0,
        }]);

        let loaded = InlinePriceSource::new(table.clone()).load().await.expect("inline");

        assert_eq!(loaded, table);
        assert!(InlinePriceSource::new(MaterialPriceTable::default()).load().await.is_err());
    }

    #[test]
    fn configured_source_follows_pricing_source() {
        let mut config = AppConfig::default();
        config.pricing.source = PriceSourceKind::Inline;
        assert_eq!(configured_source(&config, None).expect("inline").name(), "inline");

        config.pricing.source = PriceSourceKind::Sheets;
        assert!(matches!(
            configured_source(&config, None),
            Err(PriceSourceError::MissingCredentials)
        ));

        let client =
            SheetsClient::new("http://127.0.0.1:9", "prices", SecretString::from("t".to_owned()));
        let source = configured_source(&config, Some(Arc::new(client))).expect("sheets");
        assert_eq!(source.name(), "sheets");
    }
}
