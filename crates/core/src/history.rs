//! Session-scoped question/response history.
//!
//! The store keeps entries in display order according to its
//! [`OrderingPolicy`]. Every entry carries a stable 1-based chronological
//! index, so "Question N" always names the Nth successful submission no
//! matter where it sits in the list.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HistoryError;

/// Where new entries go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderingPolicy {
    /// Chronological: oldest first.
    Append,
    /// Most recent first.
    #[default]
    Prepend,
}

impl fmt::Display for OrderingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Append => f.write_str("append"),
            Self::Prepend => f.write_str("prepend"),
        }
    }
}

impl std::str::FromStr for OrderingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "append" | "oldest_first" | "chronological" => Ok(Self::Append),
            "prepend" | "newest_first" | "most_recent_first" => Ok(Self::Prepend),
            other => Err(format!(
                "unknown history ordering '{other}', expected 'append' or 'prepend'"
            )),
        }
    }
}

/// One recorded question/response pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// 1-based chronological position among successful submissions
    pub index: usize,
    pub question: String,
    pub response: String,
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Sidebar label for the question, e.g. "Question 3".
    pub fn question_label(&self) -> String {
        format!("Question {}", self.index)
    }

    /// Sidebar label for the response, e.g. "Response 3".
    pub fn response_label(&self) -> String {
        format!("Response {}", self.index)
    }
}

/// Ordered log of successful submissions for one session.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    entries: VecDeque<HistoryEntry>,
    ordering: OrderingPolicy,
    next_index: usize,
}

impl HistoryStore {
    pub fn new(ordering: OrderingPolicy) -> Self {
        Self {
            entries: VecDeque::new(),
            ordering,
            next_index: 1,
        }
    }

    pub fn ordering(&self) -> OrderingPolicy {
        self.ordering
    }

    /// Record a successful submission and return the stored entry.
    ///
    /// Empty or whitespace-only arguments are rejected with an error and
    /// leave the store untouched.
    pub fn record(
        &mut self,
        question: impl Into<String>,
        response: impl Into<String>,
    ) -> Result<&HistoryEntry, HistoryError> {
        let question = question.into();
        let response = response.into();

        if question.trim().is_empty() {
            return Err(HistoryError::EmptyQuestion);
        }
        if response.trim().is_empty() {
            return Err(HistoryError::EmptyResponse);
        }

        // A default-constructed store starts at 0; indices are 1-based.
        let index = self.next_index.max(1);
        self.next_index = index + 1;

        let entry = HistoryEntry {
            index,
            question,
            response,
            recorded_at: Utc::now(),
        };

        let position = match self.ordering {
            OrderingPolicy::Append => {
                self.entries.push_back(entry);
                self.entries.len() - 1
            }
            OrderingPolicy::Prepend => {
                self.entries.push_front(entry);
                0
            }
        };

        Ok(&self.entries[position])
    }

    /// Borrow the entries in display order.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> + '_ {
        self.entries.iter()
    }

    /// Snapshot of the entries in display order. Does not mutate the store.
    pub fn list(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Look up an entry by its chronological index.
    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.index == index)
    }

    /// The most recently recorded entry.
    pub fn latest(&self) -> Option<&HistoryEntry> {
        match self.ordering {
            OrderingPolicy::Append => self.entries.back(),
            OrderingPolicy::Prepend => self.entries.front(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries and restart numbering at 1.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_index = 1;
    }
}
