pub mod engine;
pub mod states;

pub use engine::{
    FlowTransitionError, QuestionnaireEngine, AFFIRMATIVE_REPLY, CONTACT_FIELD_COUNT,
    CONTACT_FIELD_DELIMITER,
};
pub use states::{FlowAction, TransitionOutcome};
