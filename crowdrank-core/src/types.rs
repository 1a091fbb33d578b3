use crate::constants::{ALPHA_PRIOR, BETA_PRIOR, MU_PRIOR, SIGMA_SQ_PRIOR};

/// Gaussian estimate of an item's latent log-skill.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Skill {
    /// Mean log-skill. `exp(mu)` is the Bradley-Terry strength.
    pub mu: f64,
    /// Variance of the log-skill estimate. Always positive.
    pub sigma_sq: f64,
}

impl Skill {
    pub fn new(mu: f64, sigma_sq: f64) -> Self {
        Skill { mu, sigma_sq }
    }

    /// The prior every item starts from: N(0, 1).
    pub fn prior() -> Self {
        Skill { mu: MU_PRIOR, sigma_sq: SIGMA_SQ_PRIOR }
    }
}

/// Beta-distributed estimate of a judge's consistency with the emerging
/// consensus ranking.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reliability {
    pub alpha: f64,
    pub beta: f64,
}

impl Reliability {
    pub fn new(alpha: f64, beta: f64) -> Self {
        Reliability { alpha, beta }
    }

    /// The prior every judge starts from: Beta(10, 1).
    pub fn prior() -> Self {
        Reliability { alpha: ALPHA_PRIOR, beta: BETA_PRIOR }
    }

    /// Posterior mean probability that this judge agrees with the consensus.
    pub fn mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }
}

/// Posterior beliefs after folding in one observed outcome.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VoteUpdate {
    pub reliability: Reliability,
    pub winner: Skill,
    pub loser: Skill,
}
