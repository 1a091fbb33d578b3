//! Persistent records: items, judges, decisions.
//!
//! These are plain data owned by the storage layer. The update engine is the
//! only writer of rating fields, the state machine the only writer of the
//! judge cursor, and decisions are append-only.

use chrono::{DateTime, Utc};
use crowdrank_core::{Reliability, Skill};
use serde::{Deserialize, Serialize};

pub type ItemId = i64;
pub type JudgeId = i64;

/// A competing entry being ranked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    /// Gaussian log-skill mean.
    pub mu: f64,
    /// Gaussian log-skill variance. Kept positive by the update engine.
    pub sigma_sq: f64,
    /// Eligible for comparison.
    pub active: bool,
    /// Soft priority flag: while any prioritized item is available to a
    /// judge, the selector only offers prioritized items.
    pub prioritized: bool,
}

impl Item {
    /// New item seeded with the rating priors.
    pub fn new(id: ItemId, name: impl Into<String>) -> Self {
        let prior = Skill::prior();
        Item {
            id,
            name: name.into(),
            mu: prior.mu,
            sigma_sq: prior.sigma_sq,
            active: true,
            prioritized: false,
        }
    }

    pub fn skill(&self) -> Skill {
        Skill::new(self.mu, self.sigma_sq)
    }

    pub fn set_skill(&mut self, skill: Skill) {
        self.mu = skill.mu;
        self.sigma_sq = skill.sigma_sq;
    }
}

/// An evaluator producing pairwise comparisons.
///
/// The entire assignment state machine is encoded in `prev_id` (anchor:
/// confirmed-seen item) and `next_id` (candidate currently offered) plus the
/// viewed/ignored association sets held by the store. Invariant: when both
/// are set they never reference the same item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Judge {
    pub id: JudgeId,
    pub name: String,
    /// Beta reliability alpha.
    pub alpha: f64,
    /// Beta reliability beta.
    pub beta: f64,
    pub active: bool,
    /// Candidate currently offered to this judge.
    pub next_id: Option<ItemId>,
    /// Anchor: the item this judge last confirmed or voted on.
    pub prev_id: Option<ItemId>,
    /// Last assignment change. Doubles as the liveness signal for the
    /// busy-item heuristic.
    pub updated: Option<DateTime<Utc>>,
}

impl Judge {
    /// New judge seeded with the reliability priors.
    pub fn new(id: JudgeId, name: impl Into<String>) -> Self {
        let prior = Reliability::prior();
        Judge {
            id,
            name: name.into(),
            alpha: prior.alpha,
            beta: prior.beta,
            active: true,
            next_id: None,
            prev_id: None,
            updated: None,
        }
    }

    pub fn reliability(&self) -> Reliability {
        Reliability::new(self.alpha, self.beta)
    }

    pub fn set_reliability(&mut self, reliability: Reliability) {
        self.alpha = reliability.alpha;
        self.beta = reliability.beta;
    }
}

/// Immutable record of one completed vote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub judge_id: JudgeId,
    pub winner_id: ItemId,
    pub loser_id: ItemId,
    pub decided_at: DateTime<Utc>,
}

/// Exposure and outcome counts for one item.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ItemStats {
    /// Judges who viewed and voted on this item.
    pub views: usize,
    /// Judges who ignored this item without ever voting on it.
    pub skips: usize,
    pub wins: usize,
    pub losses: usize,
}
