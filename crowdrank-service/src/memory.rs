//! In-memory reference store.
//!
//! A single mutex over plain maps. Every trait method is one short critical
//! section, which is exactly the transaction granularity the contract asks
//! for — `commit_vote` validates and applies under one lock acquisition, so
//! a losing concurrent submission observes either the full commit or none
//! of it.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::error::{JudgingError, Result};
use crate::model::{Decision, Item, ItemId, ItemStats, Judge, JudgeId};
use crate::store::{Store, VoteCommit};

#[derive(Default)]
struct Inner {
    items: BTreeMap<ItemId, Item>,
    judges: BTreeMap<JudgeId, Judge>,
    decisions: Vec<Decision>,
    /// (judge, item) pairs: voted-on exposures.
    viewed: HashSet<(JudgeId, ItemId)>,
    /// (judge, item) pairs: never offer again.
    ignored: HashSet<(JudgeId, ItemId)>,
    next_item_id: ItemId,
    next_judge_id: JudgeId,
}

/// Mutex-backed [`Store`] used by tests and the simulation harness.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|e| JudgingError::Storage(format!("lock poisoned: {e}")))
    }

    /// Create an item seeded with the rating priors.
    pub fn add_item(&self, name: impl Into<String>) -> Result<Item> {
        let mut inner = self.lock()?;
        inner.next_item_id += 1;
        let item = Item::new(inner.next_item_id, name);
        inner.items.insert(item.id, item.clone());
        Ok(item)
    }

    /// Register a judge seeded with the reliability priors.
    pub fn add_judge(&self, name: impl Into<String>) -> Result<Judge> {
        let mut inner = self.lock()?;
        inner.next_judge_id += 1;
        let judge = Judge::new(inner.next_judge_id, name);
        inner.judges.insert(judge.id, judge.clone());
        Ok(judge)
    }

    /// Administrative enable/disable toggle.
    pub fn set_item_active(&self, id: ItemId, active: bool) -> Result<()> {
        let mut inner = self.lock()?;
        let item = inner.items.get_mut(&id).ok_or(JudgingError::ItemNotFound(id))?;
        item.active = active;
        Ok(())
    }

    /// Soft priority toggle.
    pub fn set_item_prioritized(&self, id: ItemId, prioritized: bool) -> Result<()> {
        let mut inner = self.lock()?;
        let item = inner.items.get_mut(&id).ok_or(JudgingError::ItemNotFound(id))?;
        item.prioritized = prioritized;
        Ok(())
    }

    pub fn set_judge_active(&self, id: JudgeId, active: bool) -> Result<()> {
        let mut inner = self.lock()?;
        let judge = inner.judges.get_mut(&id).ok_or(JudgingError::JudgeNotFound(id))?;
        judge.active = active;
        Ok(())
    }

    /// Active items ordered by descending skill mean — the current ranking.
    pub fn leaderboard(&self) -> Result<Vec<Item>> {
        let inner = self.lock()?;
        let mut items: Vec<Item> = inner.items.values().filter(|i| i.active).cloned().collect();
        items.sort_by(|a, b| b.mu.partial_cmp(&a.mu).unwrap_or(std::cmp::Ordering::Equal));
        Ok(items)
    }

    /// Exposure and win/loss counts for one item. Skips are ignores that
    /// never became views.
    pub fn item_stats(&self, id: ItemId) -> Result<ItemStats> {
        let inner = self.lock()?;
        if !inner.items.contains_key(&id) {
            return Err(JudgingError::ItemNotFound(id));
        }

        let views = inner.viewed.iter().filter(|(_, i)| *i == id).count();
        let skips = inner
            .ignored
            .iter()
            .filter(|(j, i)| *i == id && !inner.viewed.contains(&(*j, id)))
            .count();
        let wins = inner.decisions.iter().filter(|d| d.winner_id == id).count();
        let losses = inner.decisions.iter().filter(|d| d.loser_id == id).count();

        Ok(ItemStats { views, skips, wins, losses })
    }

    pub fn decisions(&self) -> Result<Vec<Decision>> {
        Ok(self.lock()?.decisions.clone())
    }

    pub fn decision_count(&self) -> Result<usize> {
        Ok(self.lock()?.decisions.len())
    }
}

impl Store for MemoryStore {
    fn item(&self, id: ItemId) -> Result<Item> {
        self.lock()?.items.get(&id).cloned().ok_or(JudgingError::ItemNotFound(id))
    }

    fn judge(&self, id: JudgeId) -> Result<Judge> {
        self.lock()?.judges.get(&id).cloned().ok_or(JudgingError::JudgeNotFound(id))
    }

    fn active_items(&self) -> Result<Vec<Item>> {
        Ok(self.lock()?.items.values().filter(|i| i.active).cloned().collect())
    }

    fn busy_candidates(&self, since: DateTime<Utc>) -> Result<HashSet<ItemId>> {
        let inner = self.lock()?;
        Ok(inner
            .judges
            .values()
            .filter(|j| j.active && j.updated.is_some_and(|t| t > since))
            .filter_map(|j| j.next_id)
            .collect())
    }

    fn view_counts(&self, ids: &[ItemId]) -> Result<HashMap<ItemId, usize>> {
        let inner = self.lock()?;
        let wanted: HashSet<ItemId> = ids.iter().copied().collect();
        let mut counts = HashMap::new();
        for &(_, item_id) in &inner.viewed {
            if wanted.contains(&item_id) {
                *counts.entry(item_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    fn ignored_items(&self, judge_id: JudgeId) -> Result<HashSet<ItemId>> {
        let inner = self.lock()?;
        Ok(inner
            .ignored
            .iter()
            .filter(|(j, _)| *j == judge_id)
            .map(|&(_, i)| i)
            .collect())
    }

    fn mark_viewed(&self, judge_id: JudgeId, item_id: ItemId) -> Result<()> {
        self.lock()?.viewed.insert((judge_id, item_id));
        Ok(())
    }

    fn ignore_item(&self, judge_id: JudgeId, item_id: ItemId) -> Result<()> {
        self.lock()?.ignored.insert((judge_id, item_id));
        Ok(())
    }

    fn set_candidate(&self, judge_id: JudgeId, item_id: Option<ItemId>) -> Result<()> {
        let mut inner = self.lock()?;
        let judge = inner
            .judges
            .get_mut(&judge_id)
            .ok_or(JudgingError::JudgeNotFound(judge_id))?;
        judge.next_id = item_id;
        judge.updated = Some(Utc::now());
        Ok(())
    }

    fn set_anchor(&self, judge_id: JudgeId, item_id: Option<ItemId>) -> Result<()> {
        let mut inner = self.lock()?;
        let judge = inner
            .judges
            .get_mut(&judge_id)
            .ok_or(JudgingError::JudgeNotFound(judge_id))?;
        judge.prev_id = item_id;
        Ok(())
    }

    fn commit_vote(&self, commit: VoteCommit) -> Result<()> {
        let mut inner = self.lock()?;

        // Validate the cursor before touching anything. A concurrent
        // submission that already won the race leaves a different cursor, so
        // the loser fails here with every record untouched.
        {
            let judge = inner
                .judges
                .get(&commit.judge_id)
                .ok_or(JudgingError::JudgeNotFound(commit.judge_id))?;
            if judge.prev_id != Some(commit.expected_anchor)
                || judge.next_id != Some(commit.expected_candidate)
            {
                return Err(JudgingError::InvalidAssignment);
            }
        }
        if !inner.items.contains_key(&commit.winner_id) {
            return Err(JudgingError::ItemNotFound(commit.winner_id));
        }
        if !inner.items.contains_key(&commit.loser_id) {
            return Err(JudgingError::ItemNotFound(commit.loser_id));
        }

        let judge = inner
            .judges
            .get_mut(&commit.judge_id)
            .ok_or(JudgingError::JudgeNotFound(commit.judge_id))?;
        judge.set_reliability(commit.reliability);
        // The voted-on candidate becomes the new anchor; the candidate slot
        // is cleared until the selector refills it.
        judge.prev_id = Some(commit.expected_candidate);
        judge.next_id = None;
        judge.updated = Some(commit.decided_at);

        let winner_id = commit.winner_id;
        let loser_id = commit.loser_id;
        if let Some(winner) = inner.items.get_mut(&winner_id) {
            winner.set_skill(commit.winner_skill);
        }
        if let Some(loser) = inner.items.get_mut(&loser_id) {
            loser.set_skill(commit.loser_skill);
        }

        inner.decisions.push(Decision {
            judge_id: commit.judge_id,
            winner_id,
            loser_id,
            decided_at: commit.decided_at,
        });
        inner.viewed.insert((commit.judge_id, commit.expected_candidate));
        inner.ignored.insert((commit.judge_id, commit.expected_candidate));

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crowdrank_core::{Reliability, Skill};

    fn seeded_store() -> (MemoryStore, Judge, Item, Item) {
        let store = MemoryStore::new();
        let judge = store.add_judge("alex").unwrap();
        let a = store.add_item("alpha").unwrap();
        let b = store.add_item("bravo").unwrap();
        (store, judge, a, b)
    }

    fn commit_for(judge: &Judge, anchor: &Item, candidate: &Item) -> VoteCommit {
        VoteCommit {
            judge_id: judge.id,
            expected_anchor: anchor.id,
            expected_candidate: candidate.id,
            reliability: Reliability::new(10.5, 1.1),
            winner_id: candidate.id,
            winner_skill: Skill::new(0.2, 0.9),
            loser_id: anchor.id,
            loser_skill: Skill::new(-0.2, 0.9),
            decided_at: Utc::now(),
        }
    }

    #[test]
    fn test_upserts_are_idempotent() {
        let (store, judge, a, _) = seeded_store();

        store.mark_viewed(judge.id, a.id).unwrap();
        store.mark_viewed(judge.id, a.id).unwrap();
        store.ignore_item(judge.id, a.id).unwrap();
        store.ignore_item(judge.id, a.id).unwrap();

        assert_eq!(store.view_counts(&[a.id]).unwrap()[&a.id], 1);
        assert_eq!(store.ignored_items(judge.id).unwrap().len(), 1);
    }

    #[test]
    fn test_busy_candidates_respects_window() {
        let (store, judge, a, _) = seeded_store();
        store.set_candidate(judge.id, Some(a.id)).unwrap();

        let long_ago = Utc::now() - chrono::Duration::minutes(10);
        assert!(store.busy_candidates(long_ago).unwrap().contains(&a.id));

        let future = Utc::now() + chrono::Duration::minutes(1);
        assert!(store.busy_candidates(future).unwrap().is_empty());
    }

    #[test]
    fn test_commit_vote_applies_everything() {
        let (store, judge, a, b) = seeded_store();
        store.set_anchor(judge.id, Some(a.id)).unwrap();
        store.set_candidate(judge.id, Some(b.id)).unwrap();

        store.commit_vote(commit_for(&judge, &a, &b)).unwrap();

        let judge = store.judge(judge.id).unwrap();
        assert_eq!(judge.prev_id, Some(b.id), "candidate promoted to anchor");
        assert_eq!(judge.next_id, None);
        assert!((judge.alpha - 10.5).abs() < 1e-12);

        assert!((store.item(b.id).unwrap().mu - 0.2).abs() < 1e-12);
        assert!((store.item(a.id).unwrap().mu + 0.2).abs() < 1e-12);
        assert_eq!(store.decision_count().unwrap(), 1);
        assert!(store.ignored_items(judge.id).unwrap().contains(&b.id));
        assert_eq!(store.view_counts(&[b.id]).unwrap()[&b.id], 1);
    }

    #[test]
    fn test_commit_vote_rejects_stale_cursor_untouched() {
        let (store, judge, a, b) = seeded_store();
        store.set_anchor(judge.id, Some(b.id)).unwrap();
        store.set_candidate(judge.id, Some(a.id)).unwrap();

        // Client submits the reversed (stale) pair.
        let err = store.commit_vote(commit_for(&judge, &a, &b)).unwrap_err();
        assert!(matches!(err, JudgingError::InvalidAssignment));

        // Nothing moved.
        assert_eq!(store.decision_count().unwrap(), 0);
        let judge = store.judge(judge.id).unwrap();
        assert_eq!(judge.prev_id, Some(b.id));
        assert_eq!(judge.next_id, Some(a.id));
        assert_eq!(store.item(a.id).unwrap().mu, Skill::prior().mu);
    }

    #[test]
    fn test_leaderboard_orders_by_mu() {
        let (store, judge, a, b) = seeded_store();
        store.set_anchor(judge.id, Some(a.id)).unwrap();
        store.set_candidate(judge.id, Some(b.id)).unwrap();
        store.commit_vote(commit_for(&judge, &a, &b)).unwrap();

        let board = store.leaderboard().unwrap();
        assert_eq!(board[0].id, b.id);
        assert_eq!(board[1].id, a.id);
    }

    #[test]
    fn test_item_stats_counts_skips_separately() {
        let (store, judge, a, b) = seeded_store();
        let other = store.add_judge("sam").unwrap();

        store.set_anchor(judge.id, Some(a.id)).unwrap();
        store.set_candidate(judge.id, Some(b.id)).unwrap();
        store.commit_vote(commit_for(&judge, &a, &b)).unwrap();

        // `other` skipped b without voting on it.
        store.ignore_item(other.id, b.id).unwrap();

        let stats = store.item_stats(b.id).unwrap();
        assert_eq!(stats.views, 1);
        assert_eq!(stats.skips, 1);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.losses, 0);
    }
}
