use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::session::{ContactInfo, Session};
use crate::errors::DomainError;
use crate::estimate::{format_amount, format_fixed};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteRequestId(pub String);

impl QuoteRequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Flattened record filed to every quote sink once a questionnaire completes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub id: QuoteRequestId,
    pub user_id: String,
    pub material: String,
    pub size: String,
    pub quantity: u32,
    pub volume: f64,
    pub weight_kg: f64,
    pub total_cost: f64,
    pub full_name: String,
    pub phone: String,
    pub company: String,
    pub email: String,
    pub submitted_at: DateTime<Utc>,
}

impl QuoteRequest {
    /// Flattens a session whose answers and estimate are all present.
    pub fn from_session(
        session: &Session,
        contact: &ContactInfo,
        submitted_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let missing = |field: &str| {
            DomainError::InvariantViolation(format!(
                "session for `{}` has no {field} at submission",
                session.user_id
            ))
        };

        let material = session.material.as_ref().ok_or_else(|| missing("material"))?;
        let size = session.size.as_ref().ok_or_else(|| missing("size"))?;
        let quantity = session.quantity.ok_or_else(|| missing("quantity"))?;
        let estimate = session.estimate.as_ref().ok_or_else(|| missing("estimate"))?;

        Ok(Self {
            id: QuoteRequestId::generate(),
            user_id: session.user_id.0.clone(),
            material: material.0.clone(),
            size: size.clone(),
            quantity,
            volume: estimate.volume_cm3,
            weight_kg: estimate.weight_kg,
            total_cost: estimate.total_cost,
            full_name: contact.full_name.clone(),
            phone: contact.phone.clone(),
            company: contact.company.clone(),
            email: contact.email.clone(),
            submitted_at,
        })
    }

    /// Spreadsheet row in column order; weight and cost use display formatting.
    pub fn sheet_row(&self) -> Vec<serde_json::Value> {
        vec![
            self.user_id.clone().into(),
            self.material.clone().into(),
            self.size.clone().into(),
            self.quantity.into(),
            self.volume.into(),
            format_fixed(self.weight_kg).into(),
            format_amount(self.total_cost).into(),
            self.full_name.clone().into(),
            self.phone.clone().into(),
            self.company.clone().into(),
            self.email.clone().into(),
        ]
    }
}
