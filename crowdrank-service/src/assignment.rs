//! Per-judge assignment state machine.
//!
//! A judge's state is fully encoded in the persisted cursor (`prev_id`,
//! `next_id`) plus the viewed/ignored sets:
//!
//! - both empty: uninitialized — first fetch offers a candidate, no anchor;
//! - candidate only: awaiting first confirmation (confirm or skip);
//! - anchor + candidate: comparing (vote, skip, or stale-item recovery);
//! - anchor only / neither, selector dry: exhausted until the pool changes.
//!
//! Every submitted transition is validated against the *stored* cursor, and
//! the vote itself commits through the store's atomic primitive, so a
//! duplicate or stale submission loses cleanly with `InvalidAssignment`
//! instead of double-counting.

use std::sync::Arc;

use chrono::Utc;
use crowdrank_core::update;
use tracing::{info, warn};

use crate::error::{JudgingError, Result};
use crate::model::{Item, ItemId, Judge, JudgeId};
use crate::selector::{SelectorConfig, choose_next_item};
use crate::store::{Store, VoteCommit};

/// The pair a judge currently has in front of them. `candidate: None` means
/// the pool is exhausted for this judge — a normal condition, not an error.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub anchor: Option<Item>,
    pub candidate: Option<Item>,
}

/// Result of a vote submission. `recorded` is false when the pair had gone
/// stale (an item was deactivated between fetch and vote) and the engine
/// recovered by reassigning instead of counting the vote.
#[derive(Debug, Clone)]
pub struct VoteOutcome {
    pub recorded: bool,
    pub assignment: Assignment,
}

/// The judging engine: selector plus state machine over a storage backend.
pub struct JudgingService<S: Store> {
    store: Arc<S>,
    config: SelectorConfig,
}

impl<S: Store> Clone for JudgingService<S> {
    fn clone(&self) -> Self {
        JudgingService { store: Arc::clone(&self.store), config: self.config.clone() }
    }
}

impl<S: Store> JudgingService<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, SelectorConfig::default())
    }

    pub fn with_config(store: S, config: SelectorConfig) -> Self {
        JudgingService { store: Arc::new(store), config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch (and if necessary repair) the judge's current pair.
    ///
    /// Self-heals a missing, deactivated, or anchor-colliding candidate and
    /// an anchor that was deactivated since it was confirmed; in either case
    /// the selector is re-invoked for a fresh candidate.
    pub fn assignment(&self, judge_id: JudgeId) -> Result<Assignment> {
        let mut judge = self.active_judge(judge_id)?;

        // A deactivated anchor can no longer be compared against. Drop it
        // from the cursor and never offer it again.
        if let Some(prev_id) = judge.prev_id {
            let anchor_gone = match self.store.item(prev_id) {
                Ok(item) => !item.active,
                Err(JudgingError::ItemNotFound(_)) => true,
                Err(e) => return Err(e),
            };
            if anchor_gone {
                warn!(judge_id, item_id = prev_id, "anchor deactivated, clearing");
                self.store.ignore_item(judge_id, prev_id)?;
                self.store.set_anchor(judge_id, None)?;
                judge = self.store.judge(judge_id)?;
            }
        }

        let candidate_ok = match judge.next_id {
            Some(next_id) if judge.prev_id == Some(next_id) => {
                // Cursor collision: the same item in both slots means the
                // judge is stuck. Clear the anchor and pick fresh.
                self.store.set_anchor(judge_id, None)?;
                false
            }
            Some(next_id) => match self.store.item(next_id) {
                Ok(item) => item.active,
                Err(JudgingError::ItemNotFound(_)) => false,
                Err(e) => return Err(e),
            },
            None => false,
        };

        if !candidate_ok {
            return self.refresh_candidate(judge_id);
        }
        self.current_assignment(&judge)
    }

    /// Awaiting-first-confirmation: the judge accepts the offered item as
    /// their anchor, and a comparison candidate is selected against it.
    pub fn confirm_first(&self, judge_id: JudgeId, item_id: ItemId) -> Result<Assignment> {
        let judge = self.active_judge(judge_id)?;
        self.expect_candidate(&judge, item_id)?;

        self.store.set_anchor(judge_id, Some(item_id))?;
        self.refresh_candidate(judge_id)
    }

    /// Awaiting-first-confirmation: the judge rejects the offered item. It
    /// goes into their exclusion set and a new first item is offered.
    pub fn skip_first(&self, judge_id: JudgeId, item_id: ItemId) -> Result<Assignment> {
        let judge = self.active_judge(judge_id)?;
        self.expect_candidate(&judge, item_id)?;

        self.store.ignore_item(judge_id, item_id)?;
        self.store.set_anchor(judge_id, None)?;
        self.refresh_candidate(judge_id)
    }

    /// Comparing: skip the candidate, keep the anchor, select a new one.
    pub fn skip_candidate(
        &self,
        judge_id: JudgeId,
        anchor_id: ItemId,
        candidate_id: ItemId,
    ) -> Result<Assignment> {
        let judge = self.active_judge(judge_id)?;
        self.expect_pair(&judge, anchor_id, candidate_id)?;

        self.store.ignore_item(judge_id, candidate_id)?;
        self.refresh_candidate(judge_id)
    }

    /// Comparing: record a vote. `candidate_won` = the newly shown item beat
    /// the anchor.
    ///
    /// The submitted pair is validated against the stored cursor here and
    /// again inside the atomic commit, so of two concurrent submissions for
    /// the same pair exactly one records a decision. A pair that went stale
    /// (either item deactivated) records nothing and reassigns instead.
    pub fn vote(
        &self,
        judge_id: JudgeId,
        anchor_id: ItemId,
        candidate_id: ItemId,
        candidate_won: bool,
    ) -> Result<VoteOutcome> {
        let judge = self.active_judge(judge_id)?;
        self.expect_pair(&judge, anchor_id, candidate_id)?;

        let anchor = self.store.item(anchor_id)?;
        let candidate = self.store.item(candidate_id)?;

        if !anchor.active || !candidate.active {
            return self.recover_stale(&judge, &anchor, &candidate);
        }

        let (winner, loser) = if candidate_won { (&candidate, &anchor) } else { (&anchor, &candidate) };
        let posterior = update(judge.reliability(), winner.skill(), loser.skill());

        self.store.commit_vote(VoteCommit {
            judge_id,
            expected_anchor: anchor_id,
            expected_candidate: candidate_id,
            reliability: posterior.reliability,
            winner_id: winner.id,
            winner_skill: posterior.winner,
            loser_id: loser.id,
            loser_skill: posterior.loser,
            decided_at: Utc::now(),
        })?;

        info!(
            judge_id,
            winner_id = winner.id,
            loser_id = loser.id,
            "decision recorded"
        );

        let assignment = self.refresh_candidate(judge_id)?;
        Ok(VoteOutcome { recorded: true, assignment })
    }

    /// Run the selector for this judge without persisting anything.
    pub fn choose_next_item(&self, judge_id: JudgeId) -> Result<Option<Item>> {
        let judge = self.store.judge(judge_id)?;
        choose_next_item(self.store.as_ref(), &judge, &self.config, &mut rand::rng())
    }

    /// Add an item to the judge's exclusion set. Idempotent.
    pub fn ignore_item(&self, judge_id: JudgeId, item_id: ItemId) -> Result<()> {
        self.store.judge(judge_id)?;
        self.store.item(item_id)?;
        self.store.ignore_item(judge_id, item_id)
    }

    /// Record that the judge has viewed and voted on an item. Idempotent.
    pub fn mark_viewed(&self, judge_id: JudgeId, item_id: ItemId) -> Result<()> {
        self.store.judge(judge_id)?;
        self.store.item(item_id)?;
        self.store.mark_viewed(judge_id, item_id)
    }

    /// Directly set (or clear) the judge's offered candidate.
    pub fn set_candidate(&self, judge_id: JudgeId, item_id: Option<ItemId>) -> Result<()> {
        if let Some(id) = item_id {
            self.store.item(id)?;
        }
        self.store.set_candidate(judge_id, item_id)
    }

    fn active_judge(&self, judge_id: JudgeId) -> Result<Judge> {
        let judge = self.store.judge(judge_id)?;
        if !judge.active {
            return Err(JudgingError::JudgeInactive(judge_id));
        }
        Ok(judge)
    }

    fn expect_candidate(&self, judge: &Judge, item_id: ItemId) -> Result<()> {
        match judge.next_id {
            None => Err(JudgingError::NoActivePair),
            Some(next_id) if next_id == item_id => Ok(()),
            Some(_) => Err(JudgingError::InvalidAssignment),
        }
    }

    fn expect_pair(&self, judge: &Judge, anchor_id: ItemId, candidate_id: ItemId) -> Result<()> {
        match (judge.prev_id, judge.next_id) {
            (Some(prev_id), Some(next_id)) if prev_id == anchor_id && next_id == candidate_id => {
                Ok(())
            }
            // A judge with no pair at all never had anything to vote on; any
            // other mismatch is a stale or duplicate submission.
            (None, None) => Err(JudgingError::NoActivePair),
            _ => Err(JudgingError::InvalidAssignment),
        }
    }

    /// Stale-item guard: ignore whichever item(s) went inactive, clear the
    /// anchor if it was one of them, and reassign. No decision is recorded.
    fn recover_stale(&self, judge: &Judge, anchor: &Item, candidate: &Item) -> Result<VoteOutcome> {
        warn!(
            judge_id = judge.id,
            anchor_active = anchor.active,
            candidate_active = candidate.active,
            "assigned pair went stale, reassigning"
        );

        if !candidate.active {
            self.store.ignore_item(judge.id, candidate.id)?;
        }
        if !anchor.active {
            self.store.ignore_item(judge.id, anchor.id)?;
            self.store.set_anchor(judge.id, None)?;
        }

        let assignment = self.refresh_candidate(judge.id)?;
        Ok(VoteOutcome { recorded: false, assignment })
    }

    /// Invoke the selector and persist the pick as the judge's candidate.
    fn refresh_candidate(&self, judge_id: JudgeId) -> Result<Assignment> {
        let judge = self.store.judge(judge_id)?;
        let pick = choose_next_item(self.store.as_ref(), &judge, &self.config, &mut rand::rng())?;
        self.store.set_candidate(judge_id, pick.as_ref().map(|i| i.id))?;

        let anchor = match judge.prev_id {
            Some(prev_id) => Some(self.store.item(prev_id)?),
            None => None,
        };
        Ok(Assignment { anchor, candidate: pick })
    }

    fn current_assignment(&self, judge: &Judge) -> Result<Assignment> {
        let anchor = match judge.prev_id {
            Some(id) => Some(self.store.item(id)?),
            None => None,
        };
        let candidate = match judge.next_id {
            Some(id) => Some(self.store.item(id)?),
            None => None,
        };
        Ok(Assignment { anchor, candidate })
    }
}
