/// Synthetic judging sessions against a hidden ground truth.
///
/// Items get log-normal true strengths, judges get a per-judge accuracy
/// (reliable or noisy), and the whole assignment/vote loop runs through the
/// real service: fetch, confirm, skip, vote, repeat. At the end the
/// recovered mu-ordering is compared to the truth.
use std::collections::HashMap;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crowdrank_service::{
    Item, ItemId, ItemStats, JudgingError, JudgingService, MemoryStore,
};

/// Accuracy of a reliable simulated judge: probability of reporting the
/// ground-truth-better item as the winner.
const RELIABLE_ACCURACY: f64 = 0.9;

/// Accuracy of a noisy judge — barely better than a coin flip.
const NOISY_ACCURACY: f64 = 0.55;

#[derive(Debug, Clone)]
pub struct SimOptions {
    pub items: usize,
    pub judges: usize,
    pub votes: usize,
    pub noisy: f64,
    pub skip_rate: f64,
    pub seed: u64,
}

pub struct SimReport {
    /// Final ranking: active items by descending mu.
    pub leaderboard: Vec<Item>,
    pub stats: HashMap<ItemId, ItemStats>,
    /// True rank per item (0 = strongest).
    pub true_ranks: HashMap<ItemId, usize>,
    pub decisions: usize,
    /// Spearman rank correlation between true and recovered order.
    pub spearman: f64,
}

/// Run one simulated session.
pub fn run(opts: &SimOptions) -> Result<SimReport, JudgingError> {
    let mut rng = SmallRng::seed_from_u64(opts.seed);

    let store = MemoryStore::new();
    let mut strengths: HashMap<ItemId, f64> = HashMap::new();
    for i in 0..opts.items {
        let item = store.add_item(format!("item-{:03}", i + 1))?;
        strengths.insert(item.id, gaussian(&mut rng).exp());
    }

    let mut judges = Vec::with_capacity(opts.judges);
    for i in 0..opts.judges {
        let judge = store.add_judge(format!("judge-{:02}", i + 1))?;
        let accuracy = if rng.random::<f64>() < opts.noisy {
            NOISY_ACCURACY
        } else {
            RELIABLE_ACCURACY
        };
        judges.push((judge.id, accuracy));
    }

    let service = JudgingService::new(store);

    // Round-robin over judges until the vote target is reached or every
    // judge has run out of items.
    let mut exhausted = 0;
    while service.store().decision_count()? < opts.votes && exhausted < judges.len() {
        exhausted = 0;

        for &(judge_id, accuracy) in &judges {
            if service.store().decision_count()? >= opts.votes {
                break;
            }

            let assignment = service.assignment(judge_id)?;
            let Some(candidate) = assignment.candidate else {
                exhausted += 1;
                continue;
            };

            let Some(anchor) = assignment.anchor else {
                service.confirm_first(judge_id, candidate.id)?;
                continue;
            };

            if rng.random::<f64>() < opts.skip_rate {
                debug!(judge_id, item_id = candidate.id, "judge skips");
                service.skip_candidate(judge_id, anchor.id, candidate.id)?;
                continue;
            }

            // Ground truth picks the better item; the judge reports it with
            // their personal accuracy.
            let truth_prefers_candidate = strengths[&candidate.id] > strengths[&anchor.id];
            let agrees = rng.random::<f64>() < accuracy;
            let candidate_won = truth_prefers_candidate == agrees;

            service.vote(judge_id, anchor.id, candidate.id, candidate_won)?;
        }
    }

    let leaderboard = service.store().leaderboard()?;
    let mut stats = HashMap::new();
    for item in &leaderboard {
        stats.insert(item.id, service.store().item_stats(item.id)?);
    }

    let true_ranks = rank_by_strength(&strengths);
    let recovered: Vec<ItemId> = leaderboard.iter().map(|i| i.id).collect();
    let spearman = spearman_rho(&recovered, &true_ranks);

    Ok(SimReport {
        leaderboard,
        stats,
        true_ranks,
        decisions: service.store().decision_count()?,
        spearman,
    })
}

/// Standard normal sample via Box-Muller.
fn gaussian(rng: &mut impl Rng) -> f64 {
    let u1: f64 = rng.random::<f64>().max(1e-10);
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Map item id -> true rank (0 = strongest).
fn rank_by_strength(strengths: &HashMap<ItemId, f64>) -> HashMap<ItemId, usize> {
    let mut ids: Vec<ItemId> = strengths.keys().copied().collect();
    ids.sort_by(|a, b| {
        strengths[b].partial_cmp(&strengths[a]).unwrap_or(std::cmp::Ordering::Equal)
    });
    ids.into_iter().enumerate().map(|(rank, id)| (id, rank)).collect()
}

/// Spearman rank correlation between a recovered ordering and true ranks.
fn spearman_rho(recovered: &[ItemId], true_ranks: &HashMap<ItemId, usize>) -> f64 {
    let n = recovered.len();
    if n < 2 {
        return 1.0;
    }

    let sum_d_sq: f64 = recovered
        .iter()
        .enumerate()
        .map(|(rank, id)| {
            let d = rank as f64 - true_ranks[id] as f64;
            d * d
        })
        .sum();

    1.0 - 6.0 * sum_d_sq / (n as f64 * (n as f64 * n as f64 - 1.0))
}
