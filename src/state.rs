//! Application state: quiz sessions, persistent store, prompts, and the Gemini client.
//!
//! This module owns:
//!   - the in-memory session map (by session id), one lock per session
//!   - the key/value store behind achievements and the performance log
//!   - the prompts struct (from TOML or defaults)
//!   - optional Gemini client (None when GEMINI_API_KEY is missing)
//!
//! The map lock is only held to look up, insert or remove a slot. Engine operations
//! (including the store writes done by `submit`) run under the slot's own mutex, so
//! work on one session never waits on another.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use tokio::sync::RwLock;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::achievements::AchievementLedger;
use crate::config::{load_app_config_from_env, Prompts};
use crate::gemini::Gemini;
use crate::performance::PerformanceTracker;
use crate::session::QuizSession;
use crate::store::{FileStore, MemoryStore, SharedStore};

pub const DEFAULT_SESSION_IDLE_TTL: Duration = Duration::from_secs(2 * 60 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

/// Bounds on the session map, enforced whenever a session is inserted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionLimits {
    /// Sessions untouched for this long are dropped.
    pub idle_ttl: Duration,
    /// Least recently used sessions are dropped to stay under this count.
    pub max_sessions: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self { idle_ttl: DEFAULT_SESSION_IDLE_TTL, max_sessions: DEFAULT_MAX_SESSIONS }
    }
}

impl SessionLimits {
    /// EDUBOT_SESSION_TTL_SECS / EDUBOT_MAX_SESSIONS, defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let idle_ttl = std::env::var("EDUBOT_SESSION_TTL_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.idle_ttl);
        let max_sessions = std::env::var("EDUBOT_MAX_SESSIONS")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_sessions);
        Self { idle_ttl, max_sessions }
    }
}

struct SessionSlot {
    session: Mutex<QuizSession>,
    last_used: Mutex<Instant>,
}

impl SessionSlot {
    fn new(session: QuizSession) -> Self {
        Self { session: Mutex::new(session), last_used: Mutex::new(Instant::now()) }
    }

    fn touch(&self) {
        *lock(&self.last_used) = Instant::now();
    }

    fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(*lock(&self.last_used))
    }
}

// A poisoned slot stays usable.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

type SessionMap = HashMap<String, Arc<SessionSlot>>;

/// Drop idle sessions, then the least recently used ones until there is room for one more.
fn evict_stale(sessions: &mut SessionMap, limits: SessionLimits, now: Instant) -> usize {
    let before = sessions.len();
    sessions.retain(|_, slot| slot.idle_for(now) < limits.idle_ttl);
    while sessions.len() >= limits.max_sessions.max(1) {
        let oldest = sessions
            .iter()
            .max_by_key(|(_, slot)| slot.idle_for(now))
            .map(|(id, _)| id.clone());
        match oldest {
            Some(id) => {
                sessions.remove(&id);
            }
            None => break,
        }
    }
    before - sessions.len()
}

#[derive(Clone)]
pub struct AppState {
    sessions: Arc<RwLock<SessionMap>>,
    limits: SessionLimits,
    pub store: SharedStore,
    pub gemini: Option<Gemini>,
    pub prompts: Prompts,
}

impl AppState {
    /// Build state from env: load config, open the store, init Gemini.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let prompts = load_app_config_from_env()
            .map(|c| c.prompts)
            .unwrap_or_default();

        let store: SharedStore = match std::env::var("EDUBOT_DATA_DIR") {
            Ok(dir) => match FileStore::open(&dir) {
                Ok(fs) => {
                    info!(target: "edubot_backend", %dir, "Using file-backed store");
                    Arc::new(fs)
                }
                Err(e) => {
                    error!(target: "edubot_backend", %dir, error = %e, "Cannot open data dir; falling back to in-memory store");
                    Arc::new(MemoryStore::new())
                }
            },
            Err(_) => {
                info!(target: "edubot_backend", "EDUBOT_DATA_DIR not set; achievements and performance are kept in memory");
                Arc::new(MemoryStore::new())
            }
        };

        let gemini = Gemini::from_env();
        if let Some(g) = &gemini {
            info!(target: "edubot_backend", base_url = %g.base_url, model = %g.model, "Gemini enabled.");
        } else {
            error!(target: "edubot_backend", "Gemini disabled (no GEMINI_API_KEY). Generation endpoints will answer 500.");
        }

        let limits = SessionLimits::from_env();
        info!(target: "edubot_backend", idle_ttl_secs = limits.idle_ttl.as_secs(), max_sessions = limits.max_sessions, "Session limits");

        Self::with_parts(gemini, prompts, store).with_session_limits(limits)
    }

    pub fn with_parts(gemini: Option<Gemini>, prompts: Prompts, store: SharedStore) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            limits: SessionLimits::default(),
            store,
            gemini,
            prompts,
        }
    }

    pub fn with_session_limits(mut self, limits: SessionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn tracker(&self) -> PerformanceTracker {
        PerformanceTracker::new(self.store.clone())
    }

    pub fn ledger(&self) -> AchievementLedger {
        AchievementLedger::new(self.store.clone())
    }

    /// Store a new session and return its id. Stale sessions are evicted first.
    #[instrument(level = "debug", skip(self, session), fields(topic = %session.quiz().topic))]
    pub async fn insert_session(&self, session: QuizSession) -> String {
        let id = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.write().await;
        let evicted = evict_stale(&mut sessions, self.limits, Instant::now());
        if evicted > 0 {
            info!(target: "quiz", evicted, remaining = sessions.len(), "Evicted stale sessions");
        }
        sessions.insert(id.clone(), Arc::new(SessionSlot::new(session)));
        id
    }

    /// Run `f` against a session under that session's own lock.
    /// `f` is synchronous, so nothing it creates is held across an await.
    pub async fn with_session<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut QuizSession) -> T,
    ) -> Option<T> {
        let slot = self.sessions.read().await.get(id).cloned()?;
        slot.touch();
        let mut session = lock(&slot.session);
        Some(f(&mut *session))
    }

    pub async fn remove_session(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{sample_question, Quiz};

    fn state(limits: SessionLimits) -> AppState {
        AppState::with_parts(None, Prompts::default(), Arc::new(MemoryStore::new())).with_session_limits(limits)
    }

    fn session(topic: &str) -> QuizSession {
        QuizSession::new(Quiz::new(topic, vec![sample_question("Q0", "A0")]).unwrap())
    }

    fn pause() {
        std::thread::sleep(Duration::from_millis(5));
    }

    async fn topic_of(state: &AppState, id: &str) -> Option<String> {
        state.with_session(id, |s| s.quiz().topic.clone()).await
    }

    #[tokio::test]
    async fn idle_sessions_are_evicted_on_insert() {
        let state = state(SessionLimits { idle_ttl: Duration::ZERO, max_sessions: 10 });
        let first = state.insert_session(session("Old")).await;
        let second = state.insert_session(session("New")).await;
        assert_eq!(topic_of(&state, &first).await, None);
        assert_eq!(topic_of(&state, &second).await.as_deref(), Some("New"));
        assert_eq!(state.sessions.read().await.len(), 1);
    }

    #[tokio::test]
    async fn least_recently_used_session_makes_room() {
        let state = state(SessionLimits { idle_ttl: Duration::from_secs(3600), max_sessions: 2 });
        let a = state.insert_session(session("A")).await;
        pause();
        let b = state.insert_session(session("B")).await;
        pause();
        assert!(topic_of(&state, &a).await.is_some());
        pause();
        let c = state.insert_session(session("C")).await;

        assert_eq!(topic_of(&state, &a).await.as_deref(), Some("A"));
        assert_eq!(topic_of(&state, &b).await, None);
        assert_eq!(topic_of(&state, &c).await.as_deref(), Some("C"));
        assert_eq!(state.sessions.read().await.len(), 2);
    }

    #[tokio::test]
    async fn repeated_creation_stays_bounded() {
        let state = state(SessionLimits { idle_ttl: Duration::from_secs(3600), max_sessions: 3 });
        for i in 0..10 {
            state.insert_session(session(&format!("T{i}"))).await;
        }
        assert_eq!(state.sessions.read().await.len(), 3);
    }

    #[tokio::test]
    async fn busy_session_does_not_block_others() {
        let state = state(SessionLimits::default());
        let a = state.insert_session(session("A")).await;
        let b = state.insert_session(session("B")).await;

        let slot_a = state.sessions.read().await.get(&a).cloned().unwrap();
        let _held = slot_a.session.lock().unwrap();

        assert_eq!(topic_of(&state, &b).await.as_deref(), Some("B"));
        assert!(state.sessions.try_write().is_ok());
    }

    #[tokio::test]
    async fn removed_session_is_gone() {
        let state = state(SessionLimits::default());
        let id = state.insert_session(session("A")).await;
        assert!(state.remove_session(&id).await);
        assert!(!state.remove_session(&id).await);
        assert_eq!(topic_of(&state, &id).await, None);
    }
}
