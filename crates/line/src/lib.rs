//! LINE Messaging API integration - webhook intake and push replies
//!
//! This crate provides the LINE interface for moldquote:
//! - **Events** (`events`) - webhook payload parsing and per-event dispatch
//! - **Signature** (`signature`) - `X-Line-Signature` verification
//! - **Commands** (`commands`) - ordered command classification and routing
//! - **Messages** (`messages`) - outbound message model (text, location, flex, template)
//! - **Catalog** (`catalog`) - contact, FAQ and services menus
//! - **Replies** (`replies`) - questionnaire prompts and estimate summaries
//! - **Client** (`client`) - push-message API client
//!
//! # Architecture
//!
//! ```text
//! POST /webhook → verify_signature → parse_webhook → EventDispatcher
//!                                                        ↓
//!                              CommandRouter → catalog | QuestionnaireService
//!                                                        ↓
//!                                   Messenger::push ← Vec<LineMessage>
//! ```

pub mod catalog;
pub mod client;
pub mod commands;
pub mod events;
pub mod messages;
pub mod replies;
pub mod signature;

pub use client::{LinePushClient, Messenger, MessengerError, RecordingMessenger};
pub use commands::{classify_message, Command, CommandRouter, QuestionnaireService};
pub use events::{parse_webhook, EventContext, EventDispatcher, LineEvent, WebhookParseError};
pub use messages::LineMessage;
pub use signature::{verify_signature, SignatureError};
