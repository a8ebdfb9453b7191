//! In-memory session store.
//!
//! Each session sits behind its own `tokio::sync::Mutex` so a long
//! completion call on one session never blocks another. The outer map lock
//! is only held for lookups and inserts.
//!
//! Readers never take the session mutex. Every slot also carries a
//! [`SessionView`] snapshot that writers republish when they let go of the
//! session, so history and status stay readable while a question is in
//! flight.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, RwLock as SyncRwLock};

use chrono::{DateTime, Utc};
use docchat_core::history::{HistoryEntry, OrderingPolicy};
use docchat_core::session::{LoopState, Session, SessionId};
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info};

pub type SharedSession = Arc<SessionSlot>;

/// Attached document as shown to clients.
#[derive(Debug, Clone)]
pub struct DocumentSummary {
    pub file_name: String,
    pub bytes: usize,
    pub chars: usize,
}

/// Read-only copy of a session's visible state.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub id: SessionId,
    pub ordering: OrderingPolicy,
    pub state: LoopState,
    /// History in display order.
    pub history: Vec<HistoryEntry>,
    pub document: Option<DocumentSummary>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl SessionView {
    fn of(session: &Session) -> Self {
        Self {
            id: session.id().clone(),
            ordering: session.history().ordering(),
            state: session.state(),
            history: session.list_history(),
            document: session.document().map(|d| DocumentSummary {
                file_name: d.file_name.clone(),
                bytes: d.bytes,
                chars: d.chars(),
            }),
            created_at: session.created_at(),
            last_active: session.last_active(),
        }
    }
}

/// One stored session plus its published snapshot.
pub struct SessionSlot {
    session: Mutex<Session>,
    view: SyncRwLock<SessionView>,
}

impl SessionSlot {
    fn new(session: Session) -> Self {
        Self {
            view: SyncRwLock::new(SessionView::of(&session)),
            session: Mutex::new(session),
        }
    }

    /// The last published snapshot. Never waits on a submission.
    pub fn view(&self) -> SessionView {
        match self.view.read() {
            Ok(view) => view.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn publish(&self, view: SessionView) {
        match self.view.write() {
            Ok(mut slot) => *slot = view,
            Err(poisoned) => *poisoned.into_inner() = view,
        }
    }

    /// Take the session for a mutation, or `None` if another request holds it.
    pub fn try_update(&self) -> Option<SessionGuard<'_>> {
        let session = self.session.try_lock().ok()?;
        Some(SessionGuard { slot: self, session })
    }

    /// Wait for the session and take it for a mutation.
    pub async fn update(&self) -> SessionGuard<'_> {
        SessionGuard {
            slot: self,
            session: self.session.lock().await,
        }
    }

    fn is_busy(&self) -> bool {
        self.session.try_lock().is_err()
    }
}

/// Exclusive access to a session. Publishes a fresh [`SessionView`] when
/// dropped, including when the owning request is abandoned mid-call.
pub struct SessionGuard<'a> {
    slot: &'a SessionSlot,
    session: MutexGuard<'a, Session>,
}

impl SessionGuard<'_> {
    /// Publish the session as submitting while the completion call runs.
    pub fn mark_submitting(&self) {
        let mut view = SessionView::of(&self.session);
        view.state = LoopState::Submitting;
        self.slot.publish(view);
    }
}

impl Deref for SessionGuard<'_> {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.session
    }
}

impl DerefMut for SessionGuard<'_> {
    fn deref_mut(&mut self) -> &mut Session {
        &mut self.session
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.slot.publish(SessionView::of(&self.session));
    }
}

pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, SharedSession>>,
    ordering: OrderingPolicy,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(ordering: OrderingPolicy, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ordering,
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn ordering(&self) -> OrderingPolicy {
        self.ordering
    }

    /// Start a new, empty session.
    pub async fn create(&self) -> SessionId {
        let session = Session::new(self.ordering);
        let id = session.id().clone();

        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.max_sessions {
            evict_least_recent(&mut sessions);
        }
        sessions.insert(id.clone(), Arc::new(SessionSlot::new(session)));

        debug!(session = %id, active = sessions.len(), "Session created");
        id
    }

    pub async fn get(&self, id: &SessionId) -> Option<SharedSession> {
        self.sessions.read().await.get(id).cloned()
    }

    /// End a session, discarding its history. Returns whether it existed.
    pub async fn remove(&self, id: &SessionId) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            debug!(session = %id, "Session ended");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// Drop the idle session that was active least recently. Sessions held by
/// a request are never evicted.
fn evict_least_recent(sessions: &mut HashMap<SessionId, SharedSession>) {
    let oldest = sessions
        .iter()
        .filter(|(_, slot)| !slot.is_busy())
        .map(|(id, slot)| (id.clone(), slot.view().last_active))
        .min_by_key(|(_, last_active)| *last_active)
        .map(|(id, _)| id);

    if let Some(id) = oldest {
        sessions.remove(&id);
        info!(session = %id, "Evicted least recently active session");
    }
}
