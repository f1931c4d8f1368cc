use async_trait::async_trait;
use thiserror::Error;

use moldquote_core::domain::session::UserId;

use crate::catalog;
use crate::events::EventContext;
use crate::messages::LineMessage;

pub const CONTACT_KEYWORD: &str = "ติดต่อ";
pub const FAQ_PREFIX: &str = "FAQ";
pub const SERVICES_KEYWORD: &str = "สินค้าและบริการ";
pub const START_KEYWORD: &str = "เริ่มคำนวณ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaqTopic {
    Email,
    Phone,
    BusinessHours,
    Address,
    Location,
}

impl FaqTopic {
    /// `FAQ 1` through `FAQ 5`, compared after trim and uppercase.
    pub fn from_code(text: &str) -> Option<Self> {
        match text.trim().to_uppercase().as_str() {
            "FAQ 1" => Some(Self::Email),
            "FAQ 2" => Some(Self::Phone),
            "FAQ 3" => Some(Self::BusinessHours),
            "FAQ 4" => Some(Self::Address),
            "FAQ 5" => Some(Self::Location),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceTopic {
    OurServices,
    SampleProducts,
    ProductionProcess,
}

impl ServiceTopic {
    pub const ALL: [Self; 3] = [Self::OurServices, Self::SampleProducts, Self::ProductionProcess];

    pub fn label(self) -> &'static str {
        match self {
            Self::OurServices => "บริการของเรา",
            Self::SampleProducts => "สินค้าตัวอย่าง",
            Self::ProductionProcess => "กระบวนการผลิตสินค้า",
        }
    }

    pub fn from_label(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|topic| topic.label() == text)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    ContactMenu,
    /// `None` when the text starts with `FAQ` but names no known entry.
    Faq(Option<FaqTopic>),
    ServicesMenu,
    ServiceSelection(ServiceTopic),
    StartQuestionnaire,
    Continue(String),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ContactMenu => "contact_menu",
            Self::Faq(_) => "faq",
            Self::ServicesMenu => "services_menu",
            Self::ServiceSelection(_) => "service_selection",
            Self::StartQuestionnaire => "start_questionnaire",
            Self::Continue(_) => "continue",
        }
    }

    /// Menu commands are answered from static content and never touch sessions.
    pub fn is_menu(&self) -> bool {
        !matches!(self, Self::StartQuestionnaire | Self::Continue(_))
    }
}

struct RoutingRule {
    name: &'static str,
    matches: fn(&str) -> Option<Command>,
}

/// Evaluated top to bottom; the first rule that matches wins.
const ROUTING_RULES: [RoutingRule; 5] = [
    RoutingRule { name: "contact", matches: match_contact },
    RoutingRule { name: "faq", matches: match_faq },
    RoutingRule { name: "services_menu", matches: match_services_menu },
    RoutingRule { name: "service_selection", matches: match_service_selection },
    RoutingRule { name: "start", matches: match_start },
];

fn match_contact(text: &str) -> Option<Command> {
    (text.to_lowercase() == CONTACT_KEYWORD).then_some(Command::ContactMenu)
}

fn match_faq(text: &str) -> Option<Command> {
    text.to_uppercase().starts_with(FAQ_PREFIX).then(|| Command::Faq(FaqTopic::from_code(text)))
}

fn match_services_menu(text: &str) -> Option<Command> {
    (text.to_lowercase() == SERVICES_KEYWORD).then_some(Command::ServicesMenu)
}

fn match_service_selection(text: &str) -> Option<Command> {
    ServiceTopic::from_label(text).map(Command::ServiceSelection)
}

fn match_start(text: &str) -> Option<Command> {
    (text.to_lowercase() == START_KEYWORD).then_some(Command::StartQuestionnaire)
}

/// Classifies inbound text. Leading and trailing whitespace is ignored.
pub fn classify_message(text: &str) -> Command {
    let text = text.trim();
    for rule in &ROUTING_RULES {
        if let Some(command) = (rule.matches)(text) {
            tracing::debug!(event_name = "ingress.line.command_matched", rule = rule.name);
            return command;
        }
    }
    Command::Continue(text.to_owned())
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("questionnaire service failed: {0}")]
    Service(String),
}

/// The stateful half of the conversation, implemented by the intake service.
#[async_trait]
pub trait QuestionnaireService: Send + Sync {
    async fn start(
        &self,
        user_id: &UserId,
        ctx: &EventContext,
    ) -> Result<Vec<LineMessage>, CommandRouteError>;

    async fn continue_with(
        &self,
        user_id: &UserId,
        text: &str,
        ctx: &EventContext,
    ) -> Result<Vec<LineMessage>, CommandRouteError>;
}

pub struct CommandRouter<S> {
    service: S,
}

impl<S> CommandRouter<S>
where
    S: QuestionnaireService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub async fn route(
        &self,
        user_id: &UserId,
        command: Command,
        ctx: &EventContext,
    ) -> Result<Vec<LineMessage>, CommandRouteError> {
        match command {
            Command::ContactMenu => Ok(vec![catalog::contact_menu()]),
            Command::Faq(topic) => Ok(vec![catalog::faq_answer(topic)]),
            Command::ServicesMenu => Ok(vec![catalog::services_menu()]),
            Command::ServiceSelection(topic) => Ok(vec![catalog::service_detail(topic)]),
            Command::StartQuestionnaire => self.service.start(user_id, ctx).await,
            Command::Continue(text) => self.service.continue_with(user_id, &text, ctx).await,
        }
    }

    pub async fn route_text(
        &self,
        user_id: &UserId,
        text: &str,
        ctx: &EventContext,
    ) -> Result<Vec<LineMessage>, CommandRouteError> {
        self.route(user_id, classify_message(text), ctx).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use moldquote_core::domain::session::UserId;

    use super::{
        classify_message, Command, CommandRouteError, CommandRouter, FaqTopic,
        QuestionnaireService, ServiceTopic,
    };
    use crate::events::EventContext;
    use crate::messages::LineMessage;

    #[derive(Default)]
    struct RecordingService {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingService {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl QuestionnaireService for RecordingService {
        async fn start(
            &self,
            user_id: &UserId,
            _ctx: &EventContext,
        ) -> Result<Vec<LineMessage>, CommandRouteError> {
            self.calls.lock().expect("lock").push(format!("start:{user_id}"));
            Ok(vec![LineMessage::text("started")])
        }

        async fn continue_with(
            &self,
            user_id: &UserId,
            text: &str,
            _ctx: &EventContext,
        ) -> Result<Vec<LineMessage>, CommandRouteError> {
            self.calls.lock().expect("lock").push(format!("continue:{user_id}:{text}"));
            Ok(vec![LineMessage::text("continued")])
        }
    }

    #[test]
    fn classification_follows_rule_order() {
        assert_eq!(classify_message("ติดต่อ"), Command::ContactMenu);
        assert_eq!(classify_message("  ติดต่อ  "), Command::ContactMenu);
        assert_eq!(classify_message("faq 2"), Command::Faq(Some(FaqTopic::Phone)));
        assert_eq!(classify_message("FAQ 5"), Command::Faq(Some(FaqTopic::Location)));
        assert_eq!(classify_message("FAQ 9"), Command::Faq(None));
        assert_eq!(classify_message("faqs please"), Command::Faq(None));
        assert_eq!(classify_message("สินค้าและบริการ"), Command::ServicesMenu);
        assert_eq!(
            classify_message("สินค้าตัวอย่าง"),
            Command::ServiceSelection(ServiceTopic::SampleProducts)
        );
        assert_eq!(classify_message("เริ่มคำนวณ"), Command::StartQuestionnaire);
        assert_eq!(classify_message(" ABS "), Command::Continue("ABS".to_owned()));
    }

    #[test]
    fn faq_prefix_wins_over_questionnaire_input() {
        // A material or contact answer that happens to start with FAQ is still a FAQ lookup.
        assert_eq!(classify_message("FAQ Corp, 0812345678, Acme, a@b.c"), Command::Faq(None));
    }

    #[test]
    fn questionnaire_keywords_are_not_menu_commands() {
        assert!(classify_message("ติดต่อ").is_menu());
        assert!(classify_message("บริการของเรา").is_menu());
        assert!(!classify_message("เริ่มคำนวณ").is_menu());
        assert!(!classify_message("50").is_menu());
        assert_eq!(classify_message("ต้องการ").name(), "continue");
    }

    #[test]
    fn service_topics_round_trip_through_labels() {
        for topic in ServiceTopic::ALL {
            assert_eq!(ServiceTopic::from_label(topic.label()), Some(topic));
        }
        assert_eq!(ServiceTopic::from_label("บริการ"), None);
    }

    #[tokio::test]
    async fn menu_commands_never_reach_questionnaire_service() {
        let router = CommandRouter::new(RecordingService::default());
        let user = UserId("U-menu".to_owned());
        let ctx = EventContext::default();

        for text in ["ติดต่อ", "FAQ 1", "FAQ 7", "สินค้าและบริการ", "กระบวนการผลิตสินค้า"] {
            let replies = router.route_text(&user, text, &ctx).await.expect("menu reply");
            assert_eq!(replies.len(), 1, "one reply for `{text}`");
        }

        assert!(router.service().calls().is_empty());
    }

    #[tokio::test]
    async fn questionnaire_commands_are_delegated() {
        let router = CommandRouter::new(RecordingService::default());
        let user = UserId("U-q".to_owned());
        let ctx = EventContext::default();

        router.route_text(&user, "เริ่มคำนวณ", &ctx).await.expect("start");
        router.route_text(&user, " 10x5x2 ", &ctx).await.expect("continue");

        assert_eq!(router.service().calls(), vec!["start:U-q", "continue:U-q:10x5x2"]);
    }
}
