/// crowdrank-core: Pure-computation Crowd-BT rating engine.
///
/// One pairwise human judgment in, revised beliefs out. Item skill is modeled
/// as Gaussian (`mu`, `sigma_sq`) in log space, judge reliability as
/// Beta(`alpha`, `beta`). No IO, no clock, no randomness — just math.
///
/// # Quick start
///
/// ```rust
/// use crowdrank_core::{update, expected_information_gain, Reliability, Skill};
///
/// let judge = Reliability::prior();
/// let winner = Skill::prior();
/// let loser = Skill::prior();
///
/// // How much would we expect to learn from this matchup?
/// let gain = expected_information_gain(judge, winner, loser);
/// assert!(gain >= 0.0);
///
/// // The judge picked `winner`. Fold that in.
/// let posterior = update(judge, winner, loser);
/// assert!(posterior.winner.mu > posterior.loser.mu);
/// ```

pub mod constants;
pub mod crowd_bt;
pub mod types;

pub use crowd_bt::{divergence_beta, divergence_gaussian, expected_information_gain, update};
pub use types::{Reliability, Skill, VoteUpdate};
