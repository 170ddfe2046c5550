//! Termination criteria for the consensus loop.

use log::debug;

use crate::core::{required_iterations, TerminationCriterion};
use crate::scoring::{MedianScoring, Score};

/// Probability that a sample is an inlier of an unrelated model, used by the
/// PROSAC non-randomness test.
pub const PROSAC_BETA: f64 = 0.05;
/// χ² quantile for a 5 % tail probability, used to approximate the binomial
/// bound of the PROSAC non-randomness test.
pub const PROSAC_CHI_SQUARED: f64 = 2.706;

/// Standard RANSAC adaptive bound driven by the champion's inlier ratio.
#[derive(Debug, Clone)]
pub struct AdaptiveTermination {
    /// Desired confidence in \[0, 1\].
    pub confidence: f64,
}

impl AdaptiveTermination {
    pub fn new(confidence: f64) -> Self {
        Self { confidence }
    }
}

impl TerminationCriterion for AdaptiveTermination {
    fn check(
        &mut self,
        best_score: &Score,
        inliers: &[bool],
        sample_size: usize,
        max_iterations: &mut usize,
    ) -> bool {
        if inliers.is_empty() {
            return false;
        }
        let inlier_ratio = (best_score.inlier_count as f64 / inliers.len() as f64).clamp(0.0, 1.0);
        if let Some(required) = required_iterations(self.confidence, inlier_ratio, sample_size) {
            *max_iterations = (*max_iterations).min(required);
        }
        // The loop stops once the (possibly lowered) bound is exhausted.
        false
    }
}

/// Inlier ratio assumed by the median methods when bounding the loop.
///
/// The least-median residual is only guaranteed to come from an inlier while
/// at least half of the samples are inliers, so that is the ratio the bound
/// has to cover.
pub const MEDIAN_BREAKDOWN_INLIER_RATIO: f64 = 0.5;

/// LMedS/PROMedS: stop as soon as the median residual reaches the stop
/// threshold.
///
/// Otherwise the bound is the number of draws needed to hit an all-inlier
/// sample at the breakdown ratio. The champion's own inlier mask is not used:
/// it comes from a threshold scaled by the champion's median, so a poor
/// champion would count most samples as inliers and cut the loop short.
#[derive(Debug, Clone)]
pub struct MedianTermination {
    pub stop_threshold: f64,
    pub confidence: f64,
}

impl MedianTermination {
    pub fn new(stop_threshold: f64, confidence: f64) -> Self {
        Self {
            stop_threshold,
            confidence,
        }
    }
}

impl TerminationCriterion for MedianTermination {
    fn check(
        &mut self,
        best_score: &Score,
        _inliers: &[bool],
        sample_size: usize,
        max_iterations: &mut usize,
    ) -> bool {
        let median = MedianScoring::median_residual(best_score);
        if median <= self.stop_threshold {
            debug!("median residual {median:.3e} reached stop threshold {:.3e}", self.stop_threshold);
            return true;
        }
        if let Some(required) =
            required_iterations(self.confidence, MEDIAN_BREAKDOWN_INLIER_RATIO, sample_size)
        {
            *max_iterations = (*max_iterations).min(required);
        }
        false
    }
}

/// PROSAC termination: non-randomness and maximality over quality-ordered
/// prefixes.
///
/// For every prefix `U_n` (n > m) whose inlier count passes the
/// non-randomness test, the number of samples needed to find a better
/// solution with the requested confidence is computed; the loop bound is
/// lowered to the smallest of them.
#[derive(Debug, Clone)]
pub struct ProsacTermination {
    pub confidence: f64,
    pub beta: f64,
    pub chi_squared: f64,
    order: Vec<usize>,
}

impl ProsacTermination {
    /// `order` lists sample indices by descending quality.
    pub fn new(confidence: f64, order: Vec<usize>) -> Self {
        Self {
            confidence,
            beta: PROSAC_BETA,
            chi_squared: PROSAC_CHI_SQUARED,
            order,
        }
    }

    /// Minimum inlier count of a prefix of size `n` that is unlikely to be
    /// explained by an unrelated model.
    pub fn non_random_inliers(&self, n: usize, sample_size: usize) -> f64 {
        let others = n.saturating_sub(sample_size) as f64;
        let mean = others * self.beta;
        let sigma = (others * self.beta * (1.0 - self.beta)).sqrt();
        sample_size as f64 + mean + sigma * self.chi_squared.sqrt()
    }
}

impl TerminationCriterion for ProsacTermination {
    fn check(
        &mut self,
        _best_score: &Score,
        inliers: &[bool],
        sample_size: usize,
        max_iterations: &mut usize,
    ) -> bool {
        if self.order.len() != inliers.len() {
            return false;
        }

        let mut best_bound: Option<usize> = None;
        let mut inliers_in_prefix = 0usize;
        for (position, &index) in self.order.iter().enumerate() {
            if inliers[index] {
                inliers_in_prefix += 1;
            }
            let n = position + 1;
            if n <= sample_size
                || (inliers_in_prefix as f64) < self.non_random_inliers(n, sample_size)
            {
                continue;
            }
            let ratio = inliers_in_prefix as f64 / n as f64;
            if let Some(k) = required_iterations(self.confidence, ratio, sample_size) {
                best_bound = Some(best_bound.map_or(k, |b| b.min(k)));
            }
        }

        if let Some(bound) = best_bound {
            *max_iterations = (*max_iterations).min(bound);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adaptive_bound_only_decreases() {
        let mut term = AdaptiveTermination::new(0.99);
        let mut max_iterations = 1000;
        let inliers = vec![true; 10];
        term.check(&Score::new(5, 5.0), &inliers, 2, &mut max_iterations);
        assert_eq!(max_iterations, 17);
        term.check(&Score::new(1, 1.0), &inliers, 2, &mut max_iterations);
        assert_eq!(max_iterations, 17);
    }

    #[test]
    fn median_termination_stops_on_small_median() {
        let mut term = MedianTermination::new(1e-3, 0.99);
        let mut max_iterations = 1000;
        let inliers = vec![true; 4];
        // value = -median(r²)
        assert!(term.check(&Score::new(4, -1e-8), &inliers, 2, &mut max_iterations));
        assert!(!term.check(&Score::new(2, -1.0), &inliers, 2, &mut max_iterations));
    }

    #[test]
    fn median_bound_ignores_the_champion_inlier_mask() {
        let mut term = MedianTermination::new(1e-6, 0.99);
        let mut max_iterations = 1000;
        // A poor champion whose scaled threshold marks every sample an inlier.
        let inliers = vec![true; 200];
        assert!(!term.check(&Score::new(200, -1.0), &inliers, 2, &mut max_iterations));
        assert_eq!(max_iterations, 17);

        let mut max_iterations = 1000;
        term.check(&Score::new(200, -1.0), &inliers, 3, &mut max_iterations);
        assert_eq!(max_iterations, 35);
    }

    #[test]
    fn prosac_termination_uses_quality_prefix() {
        // Ten best samples are inliers, the ten worst are outliers.
        let order: Vec<usize> = (0..20).collect();
        let inliers: Vec<bool> = (0..20).map(|i| i < 10).collect();
        let mut term = ProsacTermination::new(0.99, order);
        let mut max_iterations = 1000;
        term.check(&Score::new(10, 10.0), &inliers, 2, &mut max_iterations);
        // The all-inlier prefixes make one more sample sufficient.
        assert_eq!(max_iterations, 1);
    }

    #[test]
    fn prosac_termination_ignores_random_looking_prefixes() {
        let order: Vec<usize> = (0..20).collect();
        let mut inliers = vec![false; 20];
        inliers[0] = true;
        inliers[1] = true;
        let mut term = ProsacTermination::new(0.99, order);
        let mut max_iterations = 1000;
        term.check(&Score::new(2, 2.0), &inliers, 2, &mut max_iterations);
        assert_eq!(max_iterations, 1000);
    }
}
