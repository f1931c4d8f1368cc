use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::material::MaterialName;
use crate::estimate::CostEstimate;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QuestionnaireStep {
    AwaitingMaterial,
    AwaitingSize,
    AwaitingQuantity,
    AwaitingQuoteDecision,
    AwaitingContactInfo,
}

impl QuestionnaireStep {
    pub const INITIAL: Self = Self::AwaitingMaterial;

    /// One-based position in the questionnaire.
    pub fn ordinal(self) -> u8 {
        match self {
            Self::AwaitingMaterial => 1,
            Self::AwaitingSize => 2,
            Self::AwaitingQuantity => 3,
            Self::AwaitingQuoteDecision => 4,
            Self::AwaitingContactInfo => 5,
        }
    }

    pub fn next(self) -> Option<Self> {
        match self {
            Self::AwaitingMaterial => Some(Self::AwaitingSize),
            Self::AwaitingSize => Some(Self::AwaitingQuantity),
            Self::AwaitingQuantity => Some(Self::AwaitingQuoteDecision),
            Self::AwaitingQuoteDecision => Some(Self::AwaitingContactInfo),
            Self::AwaitingContactInfo => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AwaitingMaterial => "awaiting_material",
            Self::AwaitingSize => "awaiting_size",
            Self::AwaitingQuantity => "awaiting_quantity",
            Self::AwaitingQuoteDecision => "awaiting_quote_decision",
            Self::AwaitingContactInfo => "awaiting_contact_info",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub full_name: String,
    pub phone: String,
    pub company: String,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub step: QuestionnaireStep,
    pub material: Option<MaterialName>,
    pub size: Option<String>,
    pub quantity: Option<u32>,
    pub estimate: Option<CostEstimate>,
    pub contact: Option<ContactInfo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            step: QuestionnaireStep::INITIAL,
            material: None,
            size: None,
            quantity: None,
            estimate: None,
            contact: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    pub fn is_idle_since(&self, cutoff: DateTime<Utc>) -> bool {
        self.updated_at < cutoff
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{QuestionnaireStep, Session, UserId};

    #[test]
    fn new_session_starts_at_material_step_with_no_answers() {
        let session = Session::new(UserId("U-1".to_string()), Utc::now());

        assert_eq!(session.step, QuestionnaireStep::AwaitingMaterial);
        assert!(session.material.is_none());
        assert!(session.estimate.is_none());
        assert!(session.contact.is_none());
    }

    #[test]
    fn steps_advance_by_exactly_one() {
        let mut step = QuestionnaireStep::INITIAL;
        let mut visited = vec![step];
        while let Some(next) = step.next() {
            assert_eq!(next.ordinal(), step.ordinal() + 1);
            step = next;
            visited.push(step);
        }

        assert_eq!(visited.len(), 5);
        assert_eq!(step, QuestionnaireStep::AwaitingContactInfo);
    }

    #[test]
    fn idle_check_uses_last_update() {
        let now = Utc::now();
        let mut session = Session::new(UserId("U-2".to_string()), now - Duration::minutes(30));

        assert!(session.is_idle_since(now - Duration::minutes(10)));
        session.touch(now);
        assert!(!session.is_idle_since(now - Duration::minutes(10)));
    }
}
