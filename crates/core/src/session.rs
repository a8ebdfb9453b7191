//! One interactive session: its history, its attached document, and where
//! its submission loop currently stands.
//!
//! A session is an explicit value owned by whoever serves the user (the
//! gateway's session store, or the terminal chat command). It is handed to
//! [`InteractionLoop`](crate::interaction::InteractionLoop) by `&mut`
//! reference, so at most one submission per session can be in flight.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::extractor::DocumentContext;
use crate::history::{HistoryEntry, HistoryStore, OrderingPolicy};

/// Unique identifier for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Submission loop state. Outcomes are returned to the caller; the state
/// itself only ever rests at `Idle`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopState {
    #[default]
    Idle,
    Submitting,
}

#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    pub(crate) history: HistoryStore,
    pub(crate) document: Option<DocumentContext>,
    pub(crate) state: LoopState,
    created_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
}

impl Session {
    /// Create an empty session with a fresh id.
    pub fn new(ordering: OrderingPolicy) -> Self {
        Self::with_id(SessionId::new(), ordering)
    }

    pub fn with_id(id: SessionId, ordering: OrderingPolicy) -> Self {
        let now = Utc::now();
        Self {
            id,
            history: HistoryStore::new(ordering),
            document: None,
            state: LoopState::Idle,
            created_at: now,
            last_active: now,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    pub(crate) fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// History entries in display order.
    pub fn list_history(&self) -> Vec<HistoryEntry> {
        self.history.list()
    }

    pub fn clear_history(&mut self) {
        self.touch();
        self.history.clear();
    }

    pub fn document(&self) -> Option<&DocumentContext> {
        self.document.as_ref()
    }

    /// The context text embedded into prompts, if a document is attached.
    pub fn context(&self) -> Option<&str> {
        self.document.as_ref().map(|d| d.text.as_str())
    }

    pub fn attach_document(&mut self, document: DocumentContext) {
        self.touch();
        self.document = Some(document);
    }

    /// Detach the current document, returning it.
    pub fn detach_document(&mut self) -> Option<DocumentContext> {
        self.touch();
        self.document.take()
    }
}
