//! Distribution sampling: central-tendency values for deterministic runs,
//! and real random draws (respecting cross-parameter correlation) for
//! Monte Carlo runs.

use rand::Rng;
use rand_distr::{Bernoulli, Beta, Distribution as RandDistribution, LogNormal, Normal, Triangular, Uniform};

/// A distribution shape with its parameters already evaluated to `f64`.
#[derive(Debug, Clone, Copy)]
pub enum ResolvedShape {
    Normal { mean: f64, stddev: f64 },
    LogNormal { mean: f64, stddev: f64 },
    Uniform { low: f64, high: f64 },
    Triangular { low: f64, mode: f64, high: f64 },
    Bernoulli { p: f64 },
    Beta { alpha: f64, beta: f64 },
}

impl ResolvedShape {
    /// The value a deterministic run uses in place of a random draw. Per
    /// spec, `LogNormal` returns its `mu` parameter directly rather than
    /// the distribution's actual mean `exp(mu + sigma^2/2)` — a
    /// simplification carried over verbatim from the reference, which
    /// comments this exact shortcut as "Simplified".
    pub fn central_tendency(&self) -> f64 {
        match *self {
            ResolvedShape::Normal { mean, .. } => mean,
            ResolvedShape::LogNormal { mean, .. } => mean,
            ResolvedShape::Uniform { low, high } => (low + high) / 2.0,
            ResolvedShape::Triangular { low, mode, high } => (low + mode + high) / 3.0,
            ResolvedShape::Bernoulli { p } => p,
            ResolvedShape::Beta { alpha, beta } => alpha / (alpha + beta),
        }
    }

    /// Draws one sample using `z`, a standard-normal variate supplied by
    /// the caller so jointly-normal (correlated) params can be sampled
    /// through a shared Cholesky-transformed `z` vector. Non-normal
    /// shapes fall back to their own independent RNG draw and ignore `z`.
    pub fn sample_correlated(&self, z: f64, rng: &mut impl Rng) -> f64 {
        match *self {
            ResolvedShape::Normal { mean, stddev } => mean + stddev * z,
            ResolvedShape::LogNormal { mean, stddev } => (mean + stddev * z).exp(),
            ResolvedShape::Uniform { low, high } => Uniform::new(low, high).sample(rng),
            ResolvedShape::Triangular { low, mode, high } => {
                Triangular::new(low, high, mode).map(|d| d.sample(rng)).unwrap_or((low + high) / 2.0)
            }
            ResolvedShape::Bernoulli { p } => {
                let p = p.clamp(0.0, 1.0);
                Bernoulli::new(p)
                    .map(|d| if d.sample(rng) { 1.0 } else { 0.0 })
                    .unwrap_or(0.0)
            }
            ResolvedShape::Beta { alpha, beta } => Beta::new(alpha, beta)
                .map(|d| d.sample(rng))
                .unwrap_or_else(|_| self.central_tendency()),
        }
    }

    /// Draws one independent sample with no correlation structure.
    pub fn sample_independent(&self, rng: &mut impl Rng) -> f64 {
        match *self {
            ResolvedShape::Normal { mean, stddev } => {
                Normal::new(mean, stddev).map(|d| d.sample(rng)).unwrap_or(mean)
            }
            ResolvedShape::LogNormal { mean, stddev } => LogNormal::new(mean, stddev)
                .map(|d| d.sample(rng))
                .unwrap_or_else(|_| self.central_tendency()),
            other => other.sample_correlated(0.0, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn normal_central_tendency_is_the_mean() {
        let shape = ResolvedShape::Normal { mean: 100.0, stddev: 10.0 };
        assert_eq!(shape.central_tendency(), 100.0);
    }

    #[test]
    fn same_seed_gives_reproducible_draws() {
        let shape = ResolvedShape::Normal { mean: 0.0, stddev: 1.0 };
        let mut r1 = StdRng::seed_from_u64(42);
        let mut r2 = StdRng::seed_from_u64(42);
        assert_eq!(
            shape.sample_independent(&mut r1),
            shape.sample_independent(&mut r2)
        );
    }

    #[test]
    fn bernoulli_central_tendency_is_p() {
        let shape = ResolvedShape::Bernoulli { p: 0.3 };
        assert_eq!(shape.central_tendency(), 0.3);
    }

    #[test]
    fn lognormal_central_tendency_is_mu_not_the_transformed_mean() {
        let shape = ResolvedShape::LogNormal { mean: 2.0, stddev: 1.0 };
        assert_eq!(shape.central_tendency(), 2.0);
    }

    #[test]
    fn beta_central_tendency_is_alpha_over_alpha_plus_beta() {
        let shape = ResolvedShape::Beta { alpha: 2.0, beta: 3.0 };
        assert_eq!(shape.central_tendency(), 0.4);
    }
}
