//! Suggestion tracking: a bounded, insertion-ordered ledger of the text
//! options the AI collaborator has offered, consulted by the intent
//! classifier to resolve references like "the second one" or "yes".

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Stage;

/// Default recency window: how many suggestions stay referenceable,
/// session-wide rather than per stage.
pub const DEFAULT_SUGGESTION_WINDOW: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSource {
    Ai,
    User,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: Uuid,
    pub stage: Stage,
    pub text: String,
    pub source: SuggestionSource,
    pub offered_at: DateTime<Utc>,
    pub selected: bool,
}

/// Bounded most-recent-first ledger. Only the tracker mutates it; the
/// intent classifier sees read-only views. Entries fall off the back when
/// the window is exceeded, keeping "that one" references unambiguous.
#[derive(Clone, Debug, Default)]
pub struct SuggestionTracker {
    entries: VecDeque<Suggestion>,
    capacity: usize,
    /// Ids of the most recently offered batch, in display order. Ordinal
    /// references resolve against this, so "the second one" always means
    /// item 2 of the list the user last saw.
    last_batch: Vec<Uuid>,
}

impl SuggestionTracker {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SUGGESTION_WINDOW)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: VecDeque::new(), capacity: capacity.max(1), last_batch: Vec::new() }
    }

    /// Records a batch of offered options in display order, returning
    /// their ids. Older entries beyond the window are dropped.
    pub fn track_multiple(
        &mut self,
        stage: Stage,
        texts: &[String],
        source: SuggestionSource,
    ) -> Vec<Uuid> {
        let mut ids = Vec::with_capacity(texts.len());
        for text in texts {
            let suggestion = Suggestion {
                id: Uuid::new_v4(),
                stage,
                text: text.clone(),
                source,
                offered_at: Utc::now(),
                selected: false,
            };
            ids.push(suggestion.id);
            self.entries.push_front(suggestion);
        }
        self.entries.truncate(self.capacity);
        self.last_batch = ids.clone();
        ids
    }

    /// The `n` most recent texts in display order (oldest of the window
    /// first), matching how they were shown to the user.
    pub fn get_recent_texts(&self, n: usize) -> Vec<String> {
        let mut texts: Vec<String> =
            self.entries.iter().take(n).map(|entry| entry.text.clone()).collect();
        texts.reverse();
        texts
    }

    /// The `n` most recent entries, newest first.
    pub fn get_most_recent(&self, n: usize) -> Vec<&Suggestion> {
        self.entries.iter().take(n).collect()
    }

    /// Marks a suggestion as chosen. Idempotent; purely an audit trail
    /// with no effect on future classification.
    pub fn record_selection(&mut self, id: Uuid) {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) {
            entry.selected = true;
        }
    }

    /// Resolves a classifier index (`-1` = most recent, otherwise a
    /// zero-based index into the most recently offered batch) to the
    /// referenced suggestion. Resolving against the last batch rather
    /// than the whole window keeps the numbering the user saw and the
    /// numbering that is honored identical.
    pub fn resolve_index(&self, index: i32) -> Option<&Suggestion> {
        if index < 0 {
            return self.entries.front();
        }
        let id = self.last_batch.get(index as usize)?;
        self.entries.iter().find(|entry| entry.id == *id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
