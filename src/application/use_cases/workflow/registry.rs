use crate::domain::error::{AppError, Result};
use crate::domain::workflow::{WorkflowAction, WorkflowSession, WorkflowView};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Shared handle to one session. The lock is only ever held for synchronous
/// reads and writes, never across an adapter call.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<WorkflowSession>>,
}

impl SessionHandle {
    pub fn new(session: WorkflowSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WorkflowSession> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn snapshot(&self) -> WorkflowSession {
        self.lock().clone()
    }

    pub fn view(&self) -> WorkflowView {
        self.lock().view()
    }

    /// Idle means no action is running and nothing changed for longer than `ttl`.
    fn is_idle_longer_than(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        let session = self.lock();
        !session.busy && now - session.updated_at > ttl
    }

    #[cfg(test)]
    pub(crate) fn backdate(&self, by: Duration) {
        let mut session = self.lock();
        session.updated_at = session.updated_at - by;
    }

    /// Marks the session busy for `action`. Fails with `Busy` while another
    /// action runs and with `InvalidTransition` when the stage forbids it.
    pub fn begin(&self, action: WorkflowAction) -> Result<BusyGuard> {
        let mut session = self.lock();
        if session.busy {
            return Err(AppError::Busy(format!(
                "Another action is still running; {} was rejected",
                action.as_str()
            )));
        }
        session.ensure_allowed(action)?;
        session.busy = true;

        Ok(BusyGuard {
            handle: self.clone(),
            snapshot: session.clone(),
            action,
            released: false,
        })
    }
}

/// Holds the busy flag for one action. `commit` applies the outcome and
/// clears the flag; dropping without commit (failure, timeout, cancelled
/// request) clears the flag and leaves the session untouched.
pub struct BusyGuard {
    handle: SessionHandle,
    snapshot: WorkflowSession,
    action: WorkflowAction,
    released: bool,
}

impl BusyGuard {
    /// Session as it was when the action started.
    pub fn session(&self) -> &WorkflowSession {
        &self.snapshot
    }

    pub fn action(&self) -> WorkflowAction {
        self.action
    }

    pub fn commit<F>(mut self, apply: F) -> WorkflowView
    where
        F: FnOnce(&mut WorkflowSession),
    {
        let mut session = self.handle.lock();
        apply(&mut session);
        session.busy = false;
        self.released = true;
        session.view()
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        if !self.released {
            self.handle.lock().busy = false;
        }
    }
}

/// Live sessions by id. Lock order is registry map first, then a session.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, SessionHandle>>,
    idle_ttl: Option<Duration>,
}

impl SessionRegistry {
    /// Sessions idle for longer than `idle_ttl` are dropped; `None` keeps them
    /// until deleted.
    pub fn new(idle_ttl: Option<std::time::Duration>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_ttl: idle_ttl.and_then(|ttl| Duration::from_std(ttl).ok()),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<Uuid, SessionHandle>> {
        self.sessions.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn is_expired(&self, handle: &SessionHandle, now: DateTime<Utc>) -> bool {
        self.idle_ttl
            .map_or(false, |ttl| handle.is_idle_longer_than(ttl, now))
    }

    pub fn create(&self) -> SessionHandle {
        let id = Uuid::new_v4();
        let handle = SessionHandle::new(WorkflowSession::new(id));
        self.sessions().insert(id, handle.clone());
        handle
    }

    /// An expired session is removed on lookup and reported as not found.
    pub fn get(&self, id: Uuid) -> Result<SessionHandle> {
        let mut sessions = self.sessions();
        let handle = sessions
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", id)))?;
        if self.is_expired(&handle, Utc::now()) {
            sessions.remove(&id);
            return Err(AppError::NotFound(format!("Session {} expired", id)));
        }
        Ok(handle)
    }

    pub fn remove(&self, id: Uuid) -> Result<()> {
        self.sessions()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", id)))
    }

    /// Removes every session idle past the TTL and returns their ids. Busy
    /// sessions are never evicted.
    pub fn evict_idle(&self, now: DateTime<Utc>) -> Vec<Uuid> {
        if self.idle_ttl.is_none() {
            return Vec::new();
        }
        let mut sessions = self.sessions();
        let expired: Vec<Uuid> = sessions
            .iter()
            .filter(|(_, handle)| self.is_expired(handle, now))
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            sessions.remove(id);
        }
        expired
    }

    /// Corpus references held by live sessions, or `None` while any action
    /// runs, since a running ingestion may hold a corpus not committed yet.
    pub fn live_corpora(&self) -> Option<HashSet<String>> {
        let sessions = self.sessions();
        let mut live = HashSet::new();
        for handle in sessions.values() {
            let session = handle.lock();
            if session.busy {
                return None;
            }
            if let Some(parsed) = &session.parsed {
                live.insert(parsed.corpus_reference.clone());
            }
        }
        Some(live)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::WorkflowStage;

    #[test]
    fn test_second_begin_is_rejected_while_busy() {
        let handle = SessionHandle::new(WorkflowSession::new(Uuid::new_v4()));
        let guard = handle.begin(WorkflowAction::SubmitDocument).unwrap();
        assert!(handle.snapshot().busy);

        let second = handle.begin(WorkflowAction::Restart);
        assert!(matches!(second, Err(AppError::Busy(_))));

        drop(guard);
        assert!(!handle.snapshot().busy);
    }

    #[test]
    fn test_dropped_guard_leaves_state_unchanged() {
        let handle = SessionHandle::new(WorkflowSession::new(Uuid::new_v4()));
        let before = handle.snapshot();
        {
            let _guard = handle.begin(WorkflowAction::SubmitDocument).unwrap();
        }
        assert_eq!(handle.snapshot(), before);
    }

    #[test]
    fn test_commit_applies_and_clears_busy() {
        let handle = SessionHandle::new(WorkflowSession::new(Uuid::new_v4()));
        let guard = handle.begin(WorkflowAction::Restart).unwrap();
        assert_eq!(guard.action(), WorkflowAction::Restart);

        let view = guard.commit(|session| session.stage = WorkflowStage::Parse);
        assert_eq!(view.stage, WorkflowStage::Parse);
        assert!(!view.busy);
        assert!(!handle.snapshot().busy);
    }

    #[test]
    fn test_begin_checks_stage() {
        let handle = SessionHandle::new(WorkflowSession::new(Uuid::new_v4()));
        let result = handle.begin(WorkflowAction::Export);
        assert!(matches!(result, Err(AppError::InvalidTransition(_))));
        assert!(!handle.snapshot().busy);
    }

    #[test]
    fn test_registry_lookup_and_removal() {
        let registry = SessionRegistry::new(None);
        let handle = registry.create();
        let id = handle.snapshot().id;

        assert!(registry.get(id).is_ok());
        registry.remove(id).unwrap();
        assert!(matches!(registry.get(id), Err(AppError::NotFound(_))));
        assert!(matches!(registry.remove(id), Err(AppError::NotFound(_))));
    }

    fn ttl_registry() -> SessionRegistry {
        SessionRegistry::new(Some(std::time::Duration::from_secs(60)))
    }

    #[test]
    fn test_idle_sessions_are_evicted() {
        let registry = ttl_registry();
        let stale = registry.create();
        let fresh = registry.create();
        stale.backdate(Duration::seconds(120));

        let evicted = registry.evict_idle(Utc::now());

        assert_eq!(evicted, vec![stale.snapshot().id]);
        assert!(matches!(registry.get(stale.snapshot().id), Err(AppError::NotFound(_))));
        assert!(registry.get(fresh.snapshot().id).is_ok());
    }

    #[test]
    fn test_expired_session_is_not_found_on_lookup() {
        let registry = ttl_registry();
        let handle = registry.create();
        let id = handle.snapshot().id;
        handle.backdate(Duration::seconds(61));

        assert!(matches!(registry.get(id), Err(AppError::NotFound(_))));
        assert!(matches!(registry.remove(id), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_busy_session_is_never_evicted() {
        let registry = ttl_registry();
        let handle = registry.create();
        let id = handle.snapshot().id;
        let guard = handle.begin(WorkflowAction::SubmitDocument).unwrap();
        handle.backdate(Duration::hours(2));

        assert!(registry.evict_idle(Utc::now()).is_empty());
        assert!(registry.get(id).is_ok());
        assert!(registry.live_corpora().is_none());

        drop(guard);
        assert_eq!(registry.evict_idle(Utc::now()), vec![id]);
    }

    #[test]
    fn test_without_ttl_nothing_expires() {
        let registry = SessionRegistry::new(None);
        let handle = registry.create();
        handle.backdate(Duration::days(30));

        assert!(registry.evict_idle(Utc::now()).is_empty());
        assert!(registry.get(handle.snapshot().id).is_ok());
        assert_eq!(registry.live_corpora(), Some(HashSet::new()));
    }
}
