/// crowdrank-service: the stateful half of the adaptive judging engine.
///
/// Sits between a storage backend (anything implementing [`Store`]) and a
/// presentation layer. Three responsibilities:
///
/// - **Selector** — given a judge's anchor item and the live pool, pick the
///   next comparison candidate (tiered filtering, then epsilon-greedy
///   exploration vs. information-gain maximization).
/// - **Assignment state machine** — per-judge sequencing of
///   "show A" → "show B" → "vote or skip", driven entirely by the judge's
///   persisted `prev`/`next` cursor. No in-memory session state.
/// - **Vote commit** — one atomic transaction per vote: rating updates,
///   decision record, and exposure bookkeeping land together or not at all.
///
/// Judges operate concurrently with no cross-judge locking; the only
/// coordination is the advisory busy-item window inside the selector.

pub mod assignment;
pub mod error;
pub mod memory;
pub mod model;
pub mod selector;
pub mod store;

pub use assignment::{Assignment, JudgingService, VoteOutcome};
pub use error::{JudgingError, Result};
pub use memory::MemoryStore;
pub use model::{Decision, Item, ItemId, ItemStats, Judge, JudgeId};
pub use selector::{SelectorConfig, choose_next_item};
pub use store::{Store, VoteCommit};
