use std::sync::Arc;
use std::time::Duration;

use moldquote_core::config::SessionConfig;
use moldquote_db::{RepositoryError, SessionStore};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Runs one eviction pass and logs what it removed.
pub async fn sweep_once(
    store: &dyn SessionStore,
    max_idle: Duration,
) -> Result<usize, RepositoryError> {
    let evicted = store.evict_idle(max_idle).await?;
    if evicted > 0 {
        info!(
            event_name = "session.idle_evicted",
            correlation_id = "sweeper",
            evicted,
            max_idle_secs = max_idle.as_secs(),
            "idle sessions evicted"
        );
    }
    Ok(evicted)
}

/// Starts the background sweeper when `session.idle_ttl_secs` is set.
pub fn spawn(store: Arc<dyn SessionStore>, config: &SessionConfig) -> Option<JoinHandle<()>> {
    let max_idle = Duration::from_secs(config.idle_ttl_secs?);
    let period = Duration::from_secs(config.sweep_interval_secs.max(1));

    info!(
        event_name = "session.sweeper_started",
        correlation_id = "bootstrap",
        idle_ttl_secs = max_idle.as_secs(),
        sweep_interval_secs = period.as_secs(),
        "idle session sweeper started"
    );

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(error) = sweep_once(store.as_ref(), max_idle).await {
                warn!(
                    event_name = "session.sweep_failed",
                    correlation_id = "sweeper",
                    error = %error,
                    "idle session sweep failed"
                );
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use moldquote_core::config::SessionConfig;
    use moldquote_core::domain::session::UserId;
    use moldquote_db::{InMemorySessionStore, SessionStore};

    use super::{spawn, sweep_once};

    #[tokio::test]
    async fn sweep_removes_sessions_past_ttl() {
        let store = InMemorySessionStore::new();
        store.create(&UserId("U-1".to_owned())).await.expect("session");
        store.create(&UserId("U-2".to_owned())).await.expect("session");

        assert_eq!(sweep_once(&store, Duration::from_secs(3_600)).await.expect("sweep"), 0);
        assert_eq!(store.len().await, 2);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(sweep_once(&store, Duration::from_millis(5)).await.expect("sweep"), 2);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn sweeper_is_disabled_without_ttl() {
        let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let config = SessionConfig { idle_ttl_secs: None, sweep_interval_secs: 1 };

        assert!(spawn(store, &config).is_none());
    }

    #[tokio::test]
    async fn sweeper_task_runs_when_ttl_is_set() {
        let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let config = SessionConfig { idle_ttl_secs: Some(60), sweep_interval_secs: 1 };

        let handle = spawn(store, &config).expect("sweeper");
        assert!(!handle.is_finished());
        handle.abort();
    }
}
