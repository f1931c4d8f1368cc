pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod estimate;
pub mod flows;
pub mod sinks;

pub use domain::material::{MaterialName, MaterialPrice, MaterialPriceTable};
pub use domain::quote_request::{QuoteRequest, QuoteRequestId};
pub use domain::session::{ContactInfo, QuestionnaireStep, Session, UserId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use estimate::{CostEstimate, EstimateError};
pub use flows::{FlowAction, FlowTransitionError, QuestionnaireEngine, TransitionOutcome};
pub use sinks::{QuoteSink, SinkError, SinkReport};
