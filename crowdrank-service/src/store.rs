//! Minimal storage contract the judging engine requires.
//!
//! Anything that can do point reads, a couple of filtered scans, idempotent
//! association upserts, and one atomic multi-record commit can back the
//! engine. Different judges' operations may interleave freely; the only
//! atomicity unit is a single judge's own transition.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use crowdrank_core::{Reliability, Skill};

use crate::error::Result;
use crate::model::{Item, ItemId, Judge, JudgeId};

/// Everything a completed vote writes, committed all-or-nothing.
///
/// `expected_anchor`/`expected_candidate` are re-validated against the
/// judge's stored cursor *inside* the commit. If they no longer match (a
/// concurrent submission won the race), the commit fails with
/// [`crate::JudgingError::InvalidAssignment`] and no record changes.
#[derive(Debug, Clone)]
pub struct VoteCommit {
    pub judge_id: JudgeId,
    pub expected_anchor: ItemId,
    pub expected_candidate: ItemId,

    /// Judge reliability after the update.
    pub reliability: Reliability,
    pub winner_id: ItemId,
    pub winner_skill: Skill,
    pub loser_id: ItemId,
    pub loser_skill: Skill,

    pub decided_at: DateTime<Utc>,
}

/// Storage backend contract.
pub trait Store: Send + Sync {
    fn item(&self, id: ItemId) -> Result<Item>;

    fn judge(&self, id: JudgeId) -> Result<Judge>;

    /// All items currently eligible for comparison.
    fn active_items(&self) -> Result<Vec<Item>>;

    /// Candidate ids held by active judges whose cursor moved after
    /// `since` — the "busy" set for the soft mutual-exclusion heuristic.
    fn busy_candidates(&self, since: DateTime<Utc>) -> Result<HashSet<ItemId>>;

    /// How many judges have viewed each of the given items. Items nobody has
    /// viewed may be absent from the map.
    fn view_counts(&self, ids: &[ItemId]) -> Result<HashMap<ItemId, usize>>;

    /// The judge's exclusion set: items never to offer again.
    fn ignored_items(&self, judge_id: JudgeId) -> Result<HashSet<ItemId>>;

    /// Idempotent: repeated calls after the first are no-ops.
    fn mark_viewed(&self, judge_id: JudgeId, item_id: ItemId) -> Result<()>;

    /// Idempotent: repeated calls after the first are no-ops.
    fn ignore_item(&self, judge_id: JudgeId, item_id: ItemId) -> Result<()>;

    /// Set (or clear) the judge's offered candidate and refresh `updated`.
    fn set_candidate(&self, judge_id: JudgeId, item_id: Option<ItemId>) -> Result<()>;

    /// Set (or clear) the judge's anchor.
    fn set_anchor(&self, judge_id: JudgeId, item_id: Option<ItemId>) -> Result<()>;

    /// Atomically apply a completed vote: validate the expected cursor,
    /// write the judge's reliability, promote the candidate to anchor, write
    /// both items' skills, append the decision, and upsert the candidate
    /// into the judge's viewed and ignored sets.
    fn commit_vote(&self, commit: VoteCommit) -> Result<()>;
}
