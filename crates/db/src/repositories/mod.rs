use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;

use moldquote_core::domain::session::{Session, UserId};

pub mod memory;
pub mod quote_request;

pub use memory::InMemorySessionStore;
pub use quote_request::SqlQuoteSink;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("no active session for `{0}`")]
    SessionNotFound(String),
}

/// Exclusive access to one user's session; dropping it releases the user.
pub struct SessionLease {
    user_id: UserId,
    guard: Option<OwnedMutexGuard<()>>,
    on_release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl SessionLease {
    pub fn new(user_id: UserId, guard: OwnedMutexGuard<()>) -> Self {
        Self { user_id, guard: Some(guard), on_release: None }
    }

    /// Runs `release` after the guard is dropped, so stores can prune
    /// bookkeeping for users nobody is waiting on.
    pub fn with_release(mut self, release: impl FnOnce() + Send + Sync + 'static) -> Self {
        self.on_release = Some(Box::new(release));
        self
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        drop(self.guard.take());
        if let Some(release) = self.on_release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for SessionLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLease").field("user_id", &self.user_id).finish()
    }
}

/// Process-wide questionnaire state keyed by user.
///
/// Callers hold the [`SessionLease`] for a user across read, validate and
/// write so that two messages from the same user never interleave.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn lease(&self, user_id: &UserId) -> SessionLease;

    async fn get(&self, user_id: &UserId) -> Result<Option<Session>, RepositoryError>;

    /// Starts a fresh session, replacing whatever the user had before.
    async fn create(&self, user_id: &UserId) -> Result<Session, RepositoryError>;

    async fn update(&self, session: Session) -> Result<(), RepositoryError>;

    /// Returns whether a session was removed.
    async fn delete(&self, user_id: &UserId) -> Result<bool, RepositoryError>;

    /// Drops sessions untouched for longer than `max_idle`; returns how many.
    async fn evict_idle(&self, max_idle: Duration) -> Result<usize, RepositoryError>;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
