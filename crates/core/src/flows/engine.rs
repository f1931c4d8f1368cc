use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::material::{MaterialName, MaterialPriceTable};
use crate::domain::quote_request::QuoteRequest;
use crate::domain::session::{ContactInfo, QuestionnaireStep, Session};
use crate::estimate::{
    CostCalculator, CostEstimate, DeterministicCostCalculator, Dimensions, EstimateError,
    EstimateInput,
};
use crate::flows::states::{FlowAction, TransitionOutcome};

/// The only reply that accepts an estimate and moves on to contact capture.
pub const AFFIRMATIVE_REPLY: &str = "ต้องการ";
pub const CONTACT_FIELD_DELIMITER: char = ',';
pub const CONTACT_FIELD_COUNT: usize = 4;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum FlowTransitionError {
    #[error("`{input}` is not a known material (available: {available})")]
    UnknownMaterial { input: String, available: String },
    #[error("malformed size `{input}`: {reason}")]
    MalformedSize { input: String, reason: EstimateError },
    #[error("`{input}` is not a positive whole quantity")]
    InvalidQuantity { input: String },
    #[error("quantity `{input}` exceeds the largest order of {max}")]
    QuantityTooLarge { input: String, max: u32 },
    #[error("contact details need 4 comma separated fields, found {found}")]
    MalformedContact { input: String, found: usize },
    #[error("session at {step:?} is incomplete: {detail}")]
    IncompleteSession { step: QuestionnaireStep, detail: String },
}

/// Pure questionnaire state machine.
///
/// `apply` interprets one message against the session's current step. A
/// rejected message leaves the session untouched; an accepted one mutates it
/// in place and reports the side effects the caller must perform.
pub struct QuestionnaireEngine<C = DeterministicCostCalculator> {
    calculator: C,
    prices: Arc<MaterialPriceTable>,
}

impl QuestionnaireEngine<DeterministicCostCalculator> {
    pub fn with_prices(prices: Arc<MaterialPriceTable>) -> Self {
        Self::new(DeterministicCostCalculator, prices)
    }
}

impl<C> QuestionnaireEngine<C>
where
    C: CostCalculator,
{
    pub fn new(calculator: C, prices: Arc<MaterialPriceTable>) -> Self {
        Self { calculator, prices }
    }

    pub fn prices(&self) -> &MaterialPriceTable {
        &self.prices
    }

    pub fn initial_step(&self) -> QuestionnaireStep {
        QuestionnaireStep::INITIAL
    }

    pub fn apply(
        &self,
        session: &mut Session,
        input: &str,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        let from = session.step;
        let (to, actions) = match from {
            QuestionnaireStep::AwaitingMaterial => self.accept_material(session, input)?,
            QuestionnaireStep::AwaitingSize => accept_size(session, input)?,
            QuestionnaireStep::AwaitingQuantity if session.size.is_none() => {
                self.accept_size_reentry(session, input)?
            }
            QuestionnaireStep::AwaitingQuantity => self.accept_quantity(session, input)?,
            QuestionnaireStep::AwaitingQuoteDecision => accept_decision(session, input),
            QuestionnaireStep::AwaitingContactInfo => accept_contact(session, input, now)?,
        };

        if let Some(step) = to {
            session.step = step;
        }
        session.touch(now);

        Ok(TransitionOutcome { from, to, actions })
    }

    pub fn apply_with_audit<S>(
        &self,
        session: &mut Session,
        input: &str,
        now: DateTime<Utc>,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(session, input, now);
        match &result {
            Ok(outcome) => {
                let to = outcome.to.map(QuestionnaireStep::as_str).unwrap_or("session_closed");
                let mut event = AuditEvent::new(
                    audit,
                    "flow.transition_applied",
                    AuditCategory::Flow,
                    AuditOutcome::Success,
                )
                .with_metadata("from", outcome.from.as_str())
                .with_metadata("to", to);
                if let Some(request) = outcome.quote_request() {
                    event.quote_request_id = Some(request.id.clone());
                }
                sink.emit(event);
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "flow.transition_rejected",
                        AuditCategory::Flow,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("step", session.step.as_str())
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }

    fn accept_material(
        &self,
        session: &mut Session,
        input: &str,
    ) -> Result<(Option<QuestionnaireStep>, Vec<FlowAction>), FlowTransitionError> {
        if !self.prices.contains(input) {
            return Err(FlowTransitionError::UnknownMaterial {
                input: input.to_string(),
                available: self.prices.display_list(),
            });
        }

        session.material = Some(MaterialName(input.to_string()));
        Ok((Some(QuestionnaireStep::AwaitingSize), vec![FlowAction::PromptSize]))
    }

    fn accept_quantity(
        &self,
        session: &mut Session,
        input: &str,
    ) -> Result<(Option<QuestionnaireStep>, Vec<FlowAction>), FlowTransitionError> {
        let quantity = parse_quantity(input)?;
        let size = session.size.clone().unwrap_or_default();

        match self.estimate(session, &size, quantity)? {
            Ok(estimate) => {
                session.quantity = Some(quantity);
                session.estimate = Some(estimate.clone());
                Ok((
                    Some(QuestionnaireStep::AwaitingQuoteDecision),
                    vec![FlowAction::PresentEstimate(estimate)],
                ))
            }
            Err(_) => {
                session.quantity = Some(quantity);
                session.size = None;
                Ok((Some(QuestionnaireStep::AwaitingQuantity), vec![FlowAction::PromptSizeReentry]))
            }
        }
    }

    /// Runs while the step is `AwaitingQuantity` but the stored size was
    /// cleared, so the message is read as a replacement size.
    fn accept_size_reentry(
        &self,
        session: &mut Session,
        input: &str,
    ) -> Result<(Option<QuestionnaireStep>, Vec<FlowAction>), FlowTransitionError> {
        validate_size(input)?;

        let Some(quantity) = session.quantity else {
            session.size = Some(input.to_string());
            return Ok((Some(QuestionnaireStep::AwaitingQuantity), vec![FlowAction::PromptQuantity]));
        };

        let estimate = self
            .estimate(session, input, quantity)?
            .map_err(|reason| FlowTransitionError::MalformedSize { input: input.to_string(), reason })?;
        session.size = Some(input.to_string());
        session.estimate = Some(estimate.clone());
        Ok((
            Some(QuestionnaireStep::AwaitingQuoteDecision),
            vec![FlowAction::PresentEstimate(estimate)],
        ))
    }

    /// Outer error means the session itself is inconsistent; the inner result
    /// carries the calculator's verdict on the size.
    fn estimate(
        &self,
        session: &Session,
        size: &str,
        quantity: u32,
    ) -> Result<Result<CostEstimate, EstimateError>, FlowTransitionError> {
        let material = session.material.as_ref().ok_or_else(|| FlowTransitionError::IncompleteSession {
            step: session.step,
            detail: "no material recorded".to_string(),
        })?;

        Ok(self.calculator.estimate(
            EstimateInput { material: material.as_str(), size, quantity },
            &self.prices,
        ))
    }
}

fn accept_size(
    session: &mut Session,
    input: &str,
) -> Result<(Option<QuestionnaireStep>, Vec<FlowAction>), FlowTransitionError> {
    validate_size(input)?;
    session.size = Some(input.to_string());
    Ok((Some(QuestionnaireStep::AwaitingQuantity), vec![FlowAction::PromptQuantity]))
}

fn accept_decision(session: &Session, input: &str) -> (Option<QuestionnaireStep>, Vec<FlowAction>) {
    if input == AFFIRMATIVE_REPLY && session.estimate.is_some() {
        (Some(QuestionnaireStep::AwaitingContactInfo), vec![FlowAction::PromptContact])
    } else {
        (None, vec![FlowAction::AcknowledgeDecline])
    }
}

fn accept_contact(
    session: &mut Session,
    input: &str,
    now: DateTime<Utc>,
) -> Result<(Option<QuestionnaireStep>, Vec<FlowAction>), FlowTransitionError> {
    let contact = parse_contact(input)?;
    let request = QuoteRequest::from_session(session, &contact, now).map_err(|error| {
        FlowTransitionError::IncompleteSession { step: session.step, detail: error.to_string() }
    })?;

    session.contact = Some(contact);
    Ok((None, vec![FlowAction::PersistQuote(request)]))
}

fn validate_size(input: &str) -> Result<(), FlowTransitionError> {
    input
        .parse::<Dimensions>()
        .map(|_| ())
        .map_err(|reason| FlowTransitionError::MalformedSize { input: input.to_string(), reason })
}

/// Quantities are whole parts up to `u32::MAX`; larger digit strings get
/// their own error so the reply can name the limit.
fn parse_quantity(input: &str) -> Result<u32, FlowTransitionError> {
    match input.parse::<u32>() {
        Ok(quantity) if quantity > 0 => Ok(quantity),
        Ok(_) => Err(FlowTransitionError::InvalidQuantity { input: input.to_string() }),
        Err(_) if !input.is_empty() && input.bytes().all(|byte| byte.is_ascii_digit()) => {
            Err(FlowTransitionError::QuantityTooLarge { input: input.to_string(), max: u32::MAX })
        }
        Err(_) => Err(FlowTransitionError::InvalidQuantity { input: input.to_string() }),
    }
}

/// `full name, phone, company, email`; empty fields are accepted as given.
pub fn parse_contact(input: &str) -> Result<ContactInfo, FlowTransitionError> {
    let fields = input.split(CONTACT_FIELD_DELIMITER).map(str::trim).collect::<Vec<_>>();
    let [full_name, phone, company, email] = fields.as_slice() else {
        return Err(FlowTransitionError::MalformedContact {
            input: input.to_string(),
            found: fields.len(),
        });
    };

    Ok(ContactInfo {
        full_name: (*full_name).to_string(),
        phone: (*phone).to_string(),
        company: (*company).to_string(),
        email: (*email).to_string(),
    })
}
