/// Crowd-BT update rules.
///
/// Each vote is a (winner, loser, judge) triple. The update is a single
/// closed-form step: a logistic (Bradley-Terry) link on `exp(mu)` with a
/// first-order variance correction gives the probability of the observed
/// outcome, the judge's Beta reliability is refit by moment matching, and
/// both items get a gradient-style mu nudge plus a multiplicative variance
/// update floored at KAPPA.
///
/// Everything here is pure and deterministic. Sequencing, persistence, and
/// candidate selection live in the service crate.
use crate::constants::{GAMMA, KAPPA};
use crate::types::{Reliability, Skill, VoteUpdate};

/// Guard for the moment-matching variance denominator. The refit divides by
/// `E[q^2] - E[q]^2`, which can underflow to zero at extreme alpha/beta.
const VARIANCE_FLOOR: f64 = 1e-12;

/// Fold one observed outcome (winner beat loser) into the judge's reliability
/// and both items' skill estimates.
///
/// Neither posterior `sigma_sq` can drop below `KAPPA` times its prior in a
/// single step, and whenever the judge's reliability is informative
/// (alpha != beta) a vote moves both means.
pub fn update(reliability: Reliability, winner: Skill, loser: Skill) -> VoteUpdate {
    let (alpha, beta, _) = updated_annotator(reliability, winner, loser);
    let (mu_winner, mu_loser) = updated_mus(reliability, winner, loser);
    let (sigma_sq_winner, sigma_sq_loser) = updated_sigma_sqs(reliability, winner, loser);

    VoteUpdate {
        reliability: Reliability::new(alpha, beta),
        winner: Skill::new(mu_winner, sigma_sq_winner),
        loser: Skill::new(mu_loser, sigma_sq_loser),
    }
}

/// Expected shift in the combined belief state if `a` and `b` were compared
/// next by this judge, without performing the update.
///
/// Simulates both outcomes, weights each by its reliability-adjusted win
/// probability, and sums the resulting KL divergences: Gaussian for each
/// item's skill, Beta (scaled by GAMMA) for the judge. Non-negative for all
/// valid parameters.
pub fn expected_information_gain(reliability: Reliability, a: Skill, b: Skill) -> f64 {
    // Outcome 1: a beats b.
    let (alpha1, beta1, prob_a_wins) = updated_annotator(reliability, a, b);
    let (mu_a1, mu_b1) = updated_mus(reliability, a, b);
    let (sigma_sq_a1, sigma_sq_b1) = updated_sigma_sqs(reliability, a, b);

    // Outcome 2: b beats a.
    let (alpha2, beta2, _) = updated_annotator(reliability, b, a);
    let (mu_b2, mu_a2) = updated_mus(reliability, b, a);
    let (sigma_sq_b2, sigma_sq_a2) = updated_sigma_sqs(reliability, b, a);

    prob_a_wins
        * (divergence_gaussian(mu_a1, sigma_sq_a1, a.mu, a.sigma_sq)
            + divergence_gaussian(mu_b1, sigma_sq_b1, b.mu, b.sigma_sq)
            + GAMMA * divergence_beta(alpha1, beta1, reliability.alpha, reliability.beta))
        + (1.0 - prob_a_wins)
            * (divergence_gaussian(mu_a2, sigma_sq_a2, a.mu, a.sigma_sq)
                + divergence_gaussian(mu_b2, sigma_sq_b2, b.mu, b.sigma_sq)
                + GAMMA * divergence_beta(alpha2, beta2, reliability.alpha, reliability.beta))
}

/// KL divergence between two Gaussians, KL(N1 || N2). Closed form.
pub fn divergence_gaussian(mu1: f64, sigma_sq1: f64, mu2: f64, sigma_sq2: f64) -> f64 {
    let ratio = sigma_sq1 / sigma_sq2;
    (mu1 - mu2).powi(2) / (2.0 * sigma_sq2) + (ratio - 1.0 - ratio.ln()) / 2.0
}

/// KL divergence between two Beta distributions, KL(B1 || B2). Closed form
/// via log-beta and digamma.
pub fn divergence_beta(alpha1: f64, beta1: f64, alpha2: f64, beta2: f64) -> f64 {
    ln_beta(alpha2, beta2) - ln_beta(alpha1, beta1)
        + (alpha1 - alpha2) * digamma(alpha1)
        + (beta1 - beta2) * digamma(beta1)
        + (alpha2 - alpha1 + beta2 - beta1) * digamma(alpha1 + beta1)
}

/// Gradient-style nudge to both means: proportional to each item's variance
/// and the gap between the reliability-weighted and unweighted win
/// probabilities.
fn updated_mus(reliability: Reliability, winner: Skill, loser: Skill) -> (f64, f64) {
    let Reliability { alpha, beta } = reliability;
    let ew = winner.mu.exp();
    let el = loser.mu.exp();

    let mult = (alpha * ew) / (alpha * ew + beta * el) - ew / (ew + el);

    (winner.mu + winner.sigma_sq * mult, loser.mu - loser.sigma_sq * mult)
}

/// Multiplicative variance update, floored at KAPPA.
fn updated_sigma_sqs(reliability: Reliability, winner: Skill, loser: Skill) -> (f64, f64) {
    let Reliability { alpha, beta } = reliability;
    let ew = winner.mu.exp();
    let el = loser.mu.exp();

    let mult = (alpha * ew * beta * el) / (alpha * ew + beta * el).powi(2)
        - (ew * el) / (ew + el).powi(2);

    (
        winner.sigma_sq * (1.0 + winner.sigma_sq * mult).max(KAPPA),
        loser.sigma_sq * (1.0 + loser.sigma_sq * mult).max(KAPPA),
    )
}

/// Refit the judge's Beta reliability by matching the first two moments of
/// the mixture implied by the observed outcome.
///
/// Returns (alpha', beta', c) where c is the reliability-weighted probability
/// that the winner genuinely ranks above the loser.
fn updated_annotator(reliability: Reliability, winner: Skill, loser: Skill) -> (f64, f64, f64) {
    let Reliability { alpha, beta } = reliability;
    let ew = winner.mu.exp();
    let el = loser.mu.exp();

    // P(winner > loser) under the logistic link, with a first-order variance
    // correction term.
    let c1 = ew / (ew + el)
        + 0.5 * (winner.sigma_sq + loser.sigma_sq) * (ew * el * (el - ew)) / (ew + el).powi(3);
    let c2 = 1.0 - c1;
    let c = (c1 * alpha + c2 * beta) / (alpha + beta);

    let expt = (c1 * (alpha + 1.0) * alpha + c2 * alpha * beta)
        / (c * (alpha + beta + 1.0) * (alpha + beta));
    let expt_sq = (c1 * (alpha + 2.0) * (alpha + 1.0) * alpha
        + c2 * (alpha + 1.0) * alpha * beta)
        / (c * (alpha + beta + 2.0) * (alpha + beta + 1.0) * (alpha + beta));

    let variance = (expt_sq - expt * expt).max(VARIANCE_FLOOR);
    let updated_alpha = ((expt - expt_sq) * expt) / variance;
    let updated_beta = ((expt - expt_sq) * (1.0 - expt)) / variance;

    (updated_alpha, updated_beta, c)
}

fn ln_beta(a: f64, b: f64) -> f64 {
    gamma(a).ln() + gamma(b).ln() - gamma(a + b).ln()
}

/// Lanczos approximation of the gamma function (g = 7, n = 9).
fn gamma(z: f64) -> f64 {
    const P: [f64; 8] = [
        676.5203681218851,
        -1259.1392167224028,
        771.32342877765313,
        -176.61502916214059,
        12.507343278686905,
        -0.13857109526572012,
        9.9843695780195716e-6,
        1.5056327351493116e-7,
    ];

    if z < 0.5 {
        // Reflection formula.
        return std::f64::consts::PI / ((std::f64::consts::PI * z).sin() * gamma(1.0 - z));
    }

    let z = z - 1.0;
    let mut x = 0.99999999999980993;
    for (i, &p) in P.iter().enumerate() {
        x += p / (z + i as f64 + 1.0);
    }

    let t = z + P.len() as f64 - 0.5;
    (2.0 * std::f64::consts::PI).sqrt() * t.powf(z + 0.5) * (-t).exp() * x
}

/// Digamma via the recurrence psi(x+1) = psi(x) + 1/x to push x above 10,
/// then the asymptotic expansion.
fn digamma(x: f64) -> f64 {
    let mut x = x;
    let mut result = 0.0;
    while x < 10.0 {
        result -= 1.0 / x;
        x += 1.0;
    }

    result += x.ln() - 0.5 / x;
    let r2 = 1.0 / (x * x);
    result -= r2 * (1.0 / 12.0 - r2 * (1.0 / 120.0 - r2 * (1.0 / 252.0)));
    result
}
