//! Google Sheets access for moldquote
//!
//! - **Client** (`client`) - values `get` / `append` over the Sheets REST API
//! - **Prices** (`prices`) - material price sources (sheet-backed or inline)
//! - **Sink** (`sink`) - spreadsheet quote sink appending one row per request

pub mod client;
pub mod prices;
pub mod sink;

pub use client::{SheetsClient, SheetsError};
pub use prices::{
    configured_source, InlinePriceSource, MaterialPriceSource, PriceSourceError, SheetsPriceSource,
};
pub use sink::{SheetsQuoteSink, SPREADSHEET_SINK_NAME};
