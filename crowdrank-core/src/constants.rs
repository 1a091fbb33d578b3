/// Crowd-BT tuning constants.
///
/// Values follow the experiments in Chen et al., "Pairwise Ranking Aggregation
/// in a Crowdsourced Setting" (WSDM 2013). They are deliberately not
/// configurable: every deployment of the model the authors report uses these.

/// Tradeoff between learning about items and learning about judges.
/// Scales the Beta (judge reliability) term inside the expected information
/// gain; item-skill divergence always counts at full weight.
pub const GAMMA: f64 = 0.1;

/// Regularization parameter from the paper's batch objective. Unused by the
/// online update path but kept so the constant set matches the publication.
pub const LAMBDA: f64 = 1.0;

/// Positivity floor for the multiplicative variance update. A vote can shrink
/// an item's `sigma_sq` by at most this factor per step, so variance never
/// collapses to zero and the system always retains willingness to revise.
pub const KAPPA: f64 = 1e-4;

/// Prior mean of an item's log-skill.
pub const MU_PRIOR: f64 = 0.0;

/// Prior variance of an item's log-skill.
pub const SIGMA_SQ_PRIOR: f64 = 1.0;

/// Prior alpha of a judge's Beta reliability. With BETA_PRIOR = 1 this starts
/// every judge off as presumed-consistent (mean 10/11).
pub const ALPHA_PRIOR: f64 = 10.0;

/// Prior beta of a judge's Beta reliability.
pub const BETA_PRIOR: f64 = 1.0;

/// Epsilon-greedy exploration rate for candidate selection: with this
/// probability the selector picks uniformly at random instead of maximizing
/// expected information gain.
pub const EPSILON: f64 = 0.25;
