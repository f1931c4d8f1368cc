use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use moldquote_core::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use moldquote_core::domain::session::UserId;
use moldquote_core::errors::ApplicationError;
use moldquote_core::flows::{FlowTransitionError, QuestionnaireEngine};
use moldquote_core::sinks::{submit_to_all, QuoteSink};
use moldquote_db::{RepositoryError, SessionStore};
use moldquote_line::commands::{CommandRouteError, QuestionnaireService};
use moldquote_line::events::EventContext;
use moldquote_line::messages::LineMessage;
use moldquote_line::replies;

const AUDIT_ACTOR: &str = "line-webhook";

/// Runs one questionnaire step per message: lease, load, apply, persist.
pub struct IntakeService {
    store: Arc<dyn SessionStore>,
    engine: Arc<QuestionnaireEngine>,
    sinks: Vec<Arc<dyn QuoteSink>>,
    audit: Arc<dyn AuditSink>,
}

impl IntakeService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        engine: Arc<QuestionnaireEngine>,
        sinks: Vec<Arc<dyn QuoteSink>>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self { store, engine, sinks, audit }
    }

    fn audit_context(user_id: &UserId, ctx: &EventContext) -> AuditContext {
        AuditContext::new(Some(user_id.clone()), ctx.correlation_id.clone(), AUDIT_ACTOR)
    }
}

fn persistence_failure(error: RepositoryError) -> CommandRouteError {
    CommandRouteError::Service(ApplicationError::Persistence(error.to_string()).to_string())
}

#[async_trait]
impl QuestionnaireService for IntakeService {
    async fn start(
        &self,
        user_id: &UserId,
        ctx: &EventContext,
    ) -> Result<Vec<LineMessage>, CommandRouteError> {
        let _lease = self.store.lease(user_id).await;
        let session = self.store.create(user_id).await.map_err(persistence_failure)?;

        self.audit.emit(
            AuditEvent::new(
                &Self::audit_context(user_id, ctx),
                "flow.session_started",
                AuditCategory::Flow,
                AuditOutcome::Success,
            )
            .with_metadata("step", session.step.as_str()),
        );
        Ok(vec![replies::start_prompt(self.engine.prices())])
    }

    async fn continue_with(
        &self,
        user_id: &UserId,
        text: &str,
        ctx: &EventContext,
    ) -> Result<Vec<LineMessage>, CommandRouteError> {
        let _lease = self.store.lease(user_id).await;
        let Some(mut session) = self.store.get(user_id).await.map_err(persistence_failure)? else {
            return Ok(vec![replies::no_session_notice()]);
        };

        let audit = Self::audit_context(user_id, ctx);
        let outcome =
            match self.engine.apply_with_audit(&mut session, text, Utc::now(), &*self.audit, &audit) {
                Ok(outcome) => outcome,
                Err(error @ FlowTransitionError::IncompleteSession { .. }) => {
                    warn!(
                        event_name = "intake.session_discarded",
                        correlation_id = %ctx.correlation_id,
                        user_id = %user_id,
                        error = %error,
                        "inconsistent session discarded"
                    );
                    self.store.delete(user_id).await.map_err(persistence_failure)?;
                    return Ok(vec![replies::reply_for_error(&error)]);
                }
                Err(error) => return Ok(vec![replies::reply_for_error(&error)]),
            };

        let mut messages = outcome
            .actions
            .iter()
            .filter_map(|action| replies::reply_for_action(action, &session, self.engine.prices()))
            .collect::<Vec<_>>();

        if let Some(request) = outcome.quote_request() {
            let report = submit_to_all(&self.sinks, request).await;
            info!(
                event_name = "intake.quote_submitted",
                correlation_id = %ctx.correlation_id,
                user_id = %user_id,
                quote_request_id = %request.id.0,
                delivered = report.delivered.len(),
                failed = report.failures.len(),
                "quote request submitted"
            );
            messages.push(replies::submission_reply(&report));
        }

        if outcome.ends_session() {
            self.store.delete(user_id).await.map_err(persistence_failure)?;
        } else {
            self.store.update(session).await.map_err(persistence_failure)?;
        }

        Ok(messages)
    }
}
