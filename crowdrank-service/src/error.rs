//! Error types for crowdrank-service.

use thiserror::Error;

use crate::model::{ItemId, JudgeId};

pub type Result<T> = std::result::Result<T, JudgingError>;

/// Failures surfaced to the caller of the judging API.
///
/// Stale items (an assigned item deactivated between fetch and vote) are
/// deliberately *not* here — the state machine recovers from those
/// internally and hands back a fresh assignment instead.
#[derive(Error, Debug)]
pub enum JudgingError {
    #[error("judge not found: {0}")]
    JudgeNotFound(JudgeId),

    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("judge {0} is disabled")]
    JudgeInactive(JudgeId),

    #[error("submitted items do not match the judge's current assignment")]
    InvalidAssignment,

    #[error("judge has no comparison pair assigned")]
    NoActivePair,

    #[error("storage error: {0}")]
    Storage(String),
}
