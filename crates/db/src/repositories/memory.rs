use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use moldquote_core::domain::session::{Session, UserId};

use super::{RepositoryError, SessionLease, SessionStore};

type LockMap = HashMap<UserId, Arc<Mutex<()>>>;

/// Per-user locks live only while a lease is held or awaited, so users
/// without a session leave nothing behind.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<UserId, Session>>,
    locks: Arc<StdMutex<LockMap>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn user_lock(&self, user_id: &UserId) -> Arc<Mutex<()>> {
        let mut locks = lock_map(&self.locks);
        locks.entry(user_id.clone()).or_default().clone()
    }

    #[cfg(test)]
    fn lock_entries(&self) -> usize {
        lock_map(&self.locks).len()
    }
}

fn lock_map(locks: &StdMutex<LockMap>) -> MutexGuard<'_, LockMap> {
    match locks.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Drops the user's lock once no lease holds it and no caller waits on it.
fn prune_lock(locks: &StdMutex<LockMap>, user_id: &UserId) {
    let mut locks = lock_map(locks);
    if locks.get(user_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
        locks.remove(user_id);
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn lease(&self, user_id: &UserId) -> SessionLease {
        let lock = self.user_lock(user_id);
        let guard = lock.lock_owned().await;
        let locks = Arc::clone(&self.locks);
        let released = user_id.clone();
        SessionLease::new(user_id.clone(), guard)
            .with_release(move || prune_lock(&locks, &released))
    }

    async fn get(&self, user_id: &UserId) -> Result<Option<Session>, RepositoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(user_id).cloned())
    }

    async fn create(&self, user_id: &UserId) -> Result<Session, RepositoryError> {
        let session = Session::new(user_id.clone(), Utc::now());
        let mut sessions = self.sessions.write().await;
        if sessions.insert(user_id.clone(), session.clone()).is_some() {
            tracing::debug!(
                event_name = "session.replaced",
                user_id = %user_id,
                "existing session replaced by a new questionnaire"
            );
        }
        Ok(session)
    }

    async fn update(&self, mut session: Session) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        let Some(slot) = sessions.get_mut(&session.user_id) else {
            return Err(RepositoryError::SessionNotFound(session.user_id.0));
        };
        session.touch(Utc::now());
        *slot = session;
        Ok(())
    }

    async fn delete(&self, user_id: &UserId) -> Result<bool, RepositoryError> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions.remove(user_id).is_some())
    }

    async fn evict_idle(&self, max_idle: Duration) -> Result<usize, RepositoryError> {
        let Ok(max_idle) = chrono::Duration::from_std(max_idle) else {
            return Ok(0);
        };
        let cutoff = Utc::now() - max_idle;

        let mut sessions = self.sessions.write().await;
        let locks = lock_map(&self.locks);

        // A lock entry exists only while a transition is in flight or queued.
        let idle = sessions
            .values()
            .filter(|session| session.is_idle_since(cutoff) && !locks.contains_key(&session.user_id))
            .map(|session| session.user_id.clone())
            .collect::<Vec<_>>();
        drop(locks);

        for user_id in &idle {
            sessions.remove(user_id);
        }

        Ok(idle.len())
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;

    use moldquote_core::domain::session::{QuestionnaireStep, UserId};

    use crate::repositories::{InMemorySessionStore, RepositoryError, SessionStore};

    fn user(id: &str) -> UserId {
        UserId(id.to_owned())
    }

    #[tokio::test]
    async fn create_get_update_delete_lifecycle() {
        let store = InMemorySessionStore::new();
        let alice = user("U-alice");

        assert!(store.get(&alice).await.expect("get").is_none());

        let mut session = store.create(&alice).await.expect("create");
        assert_eq!(session.step, QuestionnaireStep::AwaitingMaterial);
        assert_eq!(store.len().await, 1);

        session.step = QuestionnaireStep::AwaitingSize;
        store.update(session).await.expect("update");
        let stored = store.get(&alice).await.expect("get").expect("present");
        assert_eq!(stored.step, QuestionnaireStep::AwaitingSize);

        assert!(store.delete(&alice).await.expect("delete"));
        assert!(!store.delete(&alice).await.expect("second delete"));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn create_replaces_existing_session() {
        let store = InMemorySessionStore::new();
        let bob = user("U-bob");

        let mut session = store.create(&bob).await.expect("create");
        session.step = QuestionnaireStep::AwaitingQuantity;
        store.update(session).await.expect("update");

        let fresh = store.create(&bob).await.expect("restart");

        assert_eq!(fresh.step, QuestionnaireStep::AwaitingMaterial);
        assert_eq!(store.len().await, 1);
        let stored = store.get(&bob).await.expect("get").expect("present");
        assert_eq!(stored.step, QuestionnaireStep::AwaitingMaterial);
    }

    #[tokio::test]
    async fn update_without_session_is_rejected() {
        let store = InMemorySessionStore::new();
        let session = moldquote_core::domain::session::Session::new(user("U-ghost"), Utc::now());

        let error = store.update(session).await.expect_err("nothing to update");

        assert!(matches!(error, RepositoryError::SessionNotFound(ref id) if id == "U-ghost"));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn lease_serializes_same_user_but_not_others() {
        let store = Arc::new(InMemorySessionStore::new());
        let carol = user("U-carol");

        let lease = store.lease(&carol).await;
        assert_eq!(lease.user_id(), &carol);

        let blocked = tokio::time::timeout(Duration::from_millis(50), store.lease(&carol)).await;
        assert!(blocked.is_err(), "second lease for same user must wait");

        let other = tokio::time::timeout(Duration::from_millis(50), store.lease(&user("U-dave")))
            .await;
        assert!(other.is_ok(), "different user must not wait");

        drop(lease);
        let reacquired =
            tokio::time::timeout(Duration::from_millis(50), store.lease(&carol)).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn released_leases_leave_no_lock_entries() {
        let store = InMemorySessionStore::new();

        for n in 0..1000 {
            let visitor = user(&format!("U-visitor-{n}"));
            let _lease = store.lease(&visitor).await;
            assert!(store.get(&visitor).await.expect("get").is_none());
        }

        assert!(store.is_empty().await);
        assert_eq!(store.lock_entries(), 0);
    }

    #[tokio::test]
    async fn lock_entry_survives_while_another_caller_waits() {
        let store = Arc::new(InMemorySessionStore::new());
        let erin = user("U-erin");

        let first = store.lease(&erin).await;
        let waiter = {
            let store = Arc::clone(&store);
            let erin = erin.clone();
            tokio::spawn(async move {
                let _second = store.lease(&erin).await;
                store.create(&erin).await.expect("create")
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.lock_entries(), 1);

        drop(first);
        let session = waiter.await.expect("waiter joins");

        assert_eq!(session.user_id, erin);
        assert_eq!(store.lock_entries(), 0);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn evict_idle_removes_only_stale_unleased_sessions() {
        let store = InMemorySessionStore::new();
        let stale = user("U-stale");
        let busy = user("U-busy");
        let fresh = user("U-fresh");

        for id in [&stale, &busy, &fresh] {
            let mut session = store.create(id).await.expect("create");
            session.updated_at = Utc::now() - chrono::Duration::hours(2);
            let mut sessions = store.sessions.write().await;
            sessions.insert(id.clone(), session);
        }
        let fresh_session = store.get(&fresh).await.expect("get").expect("present");
        store.update(fresh_session).await.expect("touch fresh session");

        let lease = store.lease(&busy).await;
        let evicted = store.evict_idle(Duration::from_secs(30 * 60)).await.expect("evict");

        assert_eq!(evicted, 1);
        assert!(store.get(&stale).await.expect("get").is_none());
        assert!(store.get(&busy).await.expect("get").is_some());
        assert!(store.get(&fresh).await.expect("get").is_some());
        drop(lease);
    }
}
