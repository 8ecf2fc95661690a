//! Session registry
//!
//! Sessions are opaque tokens handed out by `initialize`. They carry no
//! authorization meaning; the registry only tracks liveness so idle ones can
//! be swept.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

/// In-memory registry of live sessions, owned by one gateway instance
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock must not take every other session down
    // with it, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(|poisoned| {
            warn!("Session registry lock was poisoned; recovering");
            poisoned.into_inner()
        })
    }

    /// Create a new session and return its id
    pub fn create(&self) -> String {
        let now = Utc::now();
        let session_id = format!("session_{}", Uuid::new_v4().simple());
        self.lock().insert(
            session_id.clone(),
            Session { session_id: session_id.clone(), created_at: now, last_active_at: now },
        );
        info!("Session created: {}", session_id);
        session_id
    }

    /// Remove a session. Idempotent: unknown ids succeed too.
    pub fn terminate(&self, session_id: &str) -> bool {
        if self.lock().remove(session_id).is_some() {
            info!("Session terminated: {}", session_id);
        } else {
            debug!("Terminate for unknown session: {}", session_id);
        }
        true
    }

    /// Refresh `last_active_at`; no-op for unknown ids
    pub fn touch(&self, session_id: &str) {
        if let Some(session) = self.lock().get_mut(session_id) {
            session.last_active_at = Utc::now();
        }
    }

    pub fn get(&self, session_id: &str) -> Option<Session> {
        self.lock().get(session_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop sessions idle for longer than `max_idle`; returns how many
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        let max_idle = match chrono::Duration::from_std(max_idle) {
            Ok(d) => d,
            Err(_) => return 0,
        };
        let cutoff = Utc::now() - max_idle;
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, s| s.last_active_at >= cutoff);
        let removed = before - sessions.len();
        if removed > 0 {
            info!("Swept {} idle session(s)", removed);
        }
        removed
    }
}

/// Periodically sweep idle sessions until the returned handle is aborted
pub fn spawn_idle_sweeper(
    registry: Arc<SessionRegistry>,
    max_idle: Duration,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            registry.sweep_idle(max_idle);
        }
    })
}
