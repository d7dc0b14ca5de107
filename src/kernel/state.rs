use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::event::ConversationKey;
use super::resolver::MAX_CANDIDATES;
use crate::memory::EventSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingAction {
    Remove,
    Move,
}

/// A numbered list of candidates waiting for the user's pick.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDisambiguation {
    pub action: PendingAction,
    /// Never more than `MAX_CANDIDATES`, in the order they were shown.
    pub candidates: Vec<EventSnapshot>,
    /// Move only: where the chosen event goes.
    pub new_start_ts: Option<i64>,
}

impl PendingDisambiguation {
    pub fn new(action: PendingAction, mut candidates: Vec<EventSnapshot>, new_start_ts: Option<i64>) -> Self {
        candidates.truncate(MAX_CANDIDATES);
        Self {
            action,
            candidates,
            new_start_ts,
        }
    }

    /// Highest acceptable reply.
    pub fn max_choice(&self) -> usize {
        self.candidates.len().min(MAX_CANDIDATES)
    }
}

/// Strict state delta. This is the ONLY way conversation state mutates.
#[derive(Debug, Clone)]
pub enum StateDelta {
    /// Replaces whatever was pending for the conversation.
    AwaitChoice(ConversationKey, PendingDisambiguation),
    Resolved(ConversationKey),
}

/// Result of feeding a message to the choice step.
#[derive(Debug, Clone, PartialEq)]
pub enum ChoiceOutcome {
    /// Not a bare number; route through the intent pipeline.
    NotAChoice,
    /// A number, but nothing is pending for this conversation.
    NoPending,
    /// Out of range. The pending list is kept for a retry.
    Invalid { choice: u64, max: usize },
    /// Valid pick. The pending state is already gone.
    Selected {
        action: PendingAction,
        candidate: EventSnapshot,
        new_start_ts: Option<i64>,
    },
}

/// Per-conversation disambiguation state: Idle (absent) or AwaitingChoice (present).
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pending: HashMap<ConversationKey, PendingDisambiguation>,
    /// Monotonic, bumped by every reduction.
    pub version: u64,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reduce(&mut self, delta: StateDelta) {
        self.version += 1;
        match delta {
            StateDelta::AwaitChoice(key, pending) => {
                debug!(chat_id = %key.chat, candidates = pending.candidates.len(), "awaiting choice");
                self.pending.insert(key, pending);
            }
            StateDelta::Resolved(key) => {
                self.pending.remove(&key);
            }
        }
    }

    pub fn begin(&mut self, key: ConversationKey, pending: PendingDisambiguation) {
        self.reduce(StateDelta::AwaitChoice(key, pending));
    }

    pub fn clear(&mut self, key: ConversationKey) {
        self.reduce(StateDelta::Resolved(key));
    }

    pub fn pending(&self, key: &ConversationKey) -> Option<&PendingDisambiguation> {
        self.pending.get(key)
    }

    pub fn is_awaiting(&self, key: &ConversationKey) -> bool {
        self.pending.contains_key(key)
    }

    /// Resolves a bare-number reply against the pending list.
    /// A valid pick clears the state before the action runs, whatever its outcome.
    pub fn advance_pending_choice(&mut self, key: ConversationKey, text: &str) -> ChoiceOutcome {
        let Some(choice) = parse_choice(text) else {
            return ChoiceOutcome::NotAChoice;
        };
        let Some(pending) = self.pending.get(&key) else {
            return ChoiceOutcome::NoPending;
        };

        let max = pending.max_choice();
        if choice < 1 || choice > max as u64 {
            return ChoiceOutcome::Invalid { choice, max };
        }

        let candidate = pending.candidates[(choice - 1) as usize].clone();
        let action = pending.action;
        let new_start_ts = pending.new_start_ts;
        self.clear(key);

        ChoiceOutcome::Selected {
            action,
            candidate,
            new_start_ts,
        }
    }
}

/// `" 2 "` -> 2. Anything with a non-digit is not a choice.
fn parse_choice(text: &str) -> Option<u64> {
    let t = text.trim();
    if t.is_empty() || !t.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    // absurdly long numbers saturate; they are out of range either way
    Some(t.parse().unwrap_or(u64::MAX))
}
