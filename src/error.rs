use thiserror::Error;

use crate::kernel::templates;
use crate::memory::StoreError;

/// What was missing from a message the bot could not act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmbiguityKind {
    NoDate,
    NoNewDate,
    NoRemoveCandidates,
    NoMoveCandidates,
}

/// Failures of a single conversation turn. None of them escapes the turn.
#[derive(Debug, Error)]
pub enum AgendaError {
    #[error("could not interpret the message: {0:?}")]
    InputAmbiguity(AmbiguityKind),
    #[error("choice {choice} is outside 1..={max}")]
    SelectionOutOfRange { choice: u64, max: usize },
    #[error("pending move carries no target instant")]
    MissingFollowupData,
    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

impl AgendaError {
    /// Clarification text sent back to the user.
    pub fn user_prompt(&self) -> &'static str {
        match self {
            AgendaError::InputAmbiguity(AmbiguityKind::NoDate) => templates::NO_DATE,
            AgendaError::InputAmbiguity(AmbiguityKind::NoNewDate) => templates::NO_NEW_DATE,
            AgendaError::InputAmbiguity(AmbiguityKind::NoRemoveCandidates) => templates::NOTHING_TO_REMOVE,
            AgendaError::InputAmbiguity(AmbiguityKind::NoMoveCandidates) => templates::NOTHING_TO_MOVE,
            AgendaError::SelectionOutOfRange { .. } => templates::INVALID_CHOICE,
            AgendaError::MissingFollowupData => templates::MISSING_FOLLOWUP,
            AgendaError::Store(_) => templates::STORE_FAILURE,
        }
    }
}
