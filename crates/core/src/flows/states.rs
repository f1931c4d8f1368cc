use serde::{Deserialize, Serialize};

use crate::domain::quote_request::QuoteRequest;
use crate::domain::session::QuestionnaireStep;
use crate::estimate::CostEstimate;

/// Side effects the caller performs after a transition has been applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FlowAction {
    PromptMaterial,
    PromptSize,
    PromptQuantity,
    /// Quantity was kept but the stored size no longer validates.
    PromptSizeReentry,
    PresentEstimate(CostEstimate),
    PromptContact,
    PersistQuote(QuoteRequest),
    AcknowledgeDecline,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: QuestionnaireStep,
    /// `None` once the questionnaire is over and the session must be removed.
    pub to: Option<QuestionnaireStep>,
    pub actions: Vec<FlowAction>,
}

impl TransitionOutcome {
    pub fn ends_session(&self) -> bool {
        self.to.is_none()
    }

    pub fn quote_request(&self) -> Option<&QuoteRequest> {
        self.actions.iter().find_map(|action| match action {
            FlowAction::PersistQuote(request) => Some(request),
            _ => None,
        })
    }
}
