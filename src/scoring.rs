//! Scoring rules ranking candidate models.
//!
//! All scores are "higher is better": costs (truncated sums, medians) are
//! stored negated so that the engine compares every variant the same way.

use std::cmp::Ordering;

use crate::core::Scoring;
use crate::utils::median_in_place;

/// Consistency constant turning a median absolute residual into a standard
/// deviation under Gaussian noise.
pub const MEDIAN_TO_SIGMA: f64 = 1.4826;

/// Score of a candidate model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    /// Samples classified as inliers by the rule that produced the score.
    pub inlier_count: usize,
    /// Ranking value, higher is better.
    pub value: f64,
}

impl Score {
    pub fn new(inlier_count: usize, value: f64) -> Self {
        Self {
            inlier_count,
            value,
        }
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.value.partial_cmp(&other.value)
    }
}

/// RANSAC/PROSAC: number of residuals below the threshold.
#[derive(Debug, Clone)]
pub struct InlierCountScoring {
    threshold: f64,
}

impl InlierCountScoring {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Scoring for InlierCountScoring {
    fn score(&self, residuals: &[f64], _sample_size: usize) -> Score {
        let count = residuals.iter().filter(|&&r| r < self.threshold).count();
        Score::new(count, count as f64)
    }

    fn inlier_threshold(&self, _score: &Score, _point_count: usize, _sample_size: usize) -> f64 {
        self.threshold
    }
}

/// MSAC: sum of residuals truncated at the threshold, negated.
#[derive(Debug, Clone)]
pub struct TruncatedScoring {
    threshold: f64,
}

impl TruncatedScoring {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Scoring for TruncatedScoring {
    fn score(&self, residuals: &[f64], _sample_size: usize) -> Score {
        let mut count = 0;
        let mut cost = 0.0;
        for &r in residuals {
            if r < self.threshold {
                count += 1;
                cost += r;
            } else {
                cost += self.threshold;
            }
        }
        Score::new(count, -cost)
    }

    fn inlier_threshold(&self, _score: &Score, _point_count: usize, _sample_size: usize) -> f64 {
        self.threshold
    }
}

/// LMedS/PROMedS: median of squared residuals, negated.
///
/// Inliers are the residuals below a robust multiple of the median
/// (`inlier_factor · 1.4826 · (1 + 5 / (n - m)) · √median`), never below the
/// stop threshold.
#[derive(Debug, Clone)]
pub struct MedianScoring {
    stop_threshold: f64,
    inlier_factor: f64,
}

impl MedianScoring {
    pub fn new(stop_threshold: f64, inlier_factor: f64) -> Self {
        Self {
            stop_threshold,
            inlier_factor,
        }
    }

    /// Median residual (not squared) encoded in `score`.
    pub fn median_residual(score: &Score) -> f64 {
        (-score.value).max(0.0).sqrt()
    }

    fn robust_threshold(&self, median_squared: f64, point_count: usize, sample_size: usize) -> f64 {
        let dof = point_count.saturating_sub(sample_size).max(1) as f64;
        let sigma = MEDIAN_TO_SIGMA * (1.0 + 5.0 / dof) * median_squared.max(0.0).sqrt();
        (self.inlier_factor * sigma).max(self.stop_threshold)
    }
}

impl Scoring for MedianScoring {
    fn score(&self, residuals: &[f64], sample_size: usize) -> Score {
        let mut squared: Vec<f64> = residuals.iter().map(|r| r * r).collect();
        let median = median_in_place(&mut squared).unwrap_or(f64::INFINITY);

        let threshold = self.robust_threshold(median, residuals.len(), sample_size);
        let count = residuals.iter().filter(|&&r| r < threshold).count();
        Score::new(count, -median)
    }

    fn inlier_threshold(&self, score: &Score, point_count: usize, sample_size: usize) -> f64 {
        self.robust_threshold(-score.value, point_count, sample_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const RESIDUALS: [f64; 5] = [0.1, 0.4, 0.6, 1.0, 0.3];

    #[test]
    fn inlier_count_scoring_counts_correctly() {
        let scoring = InlierCountScoring::new(0.5);
        let s = scoring.score(&RESIDUALS, 2);
        assert_eq!(s.inlier_count, 3);
        assert_eq!(s.value, 3.0);
        assert_eq!(scoring.inlier_threshold(&s, 5, 2), 0.5);
    }

    #[test]
    fn truncated_scoring_caps_outliers() {
        let s = TruncatedScoring::new(0.5).score(&RESIDUALS, 2);
        assert_eq!(s.inlier_count, 3);
        assert_relative_eq!(s.value, -(0.1 + 0.4 + 0.5 + 0.5 + 0.3));
    }

    #[test]
    fn median_scoring_prefers_smaller_median() {
        let scoring = MedianScoring::new(1e-6, 1.5);
        let good = scoring.score(&[0.0, 0.0, 0.1, 5.0, 9.0], 2);
        let bad = scoring.score(&[0.2, 0.3, 0.4, 0.0, 0.0], 2);
        assert!(good > bad);
        assert_relative_eq!(MedianScoring::median_residual(&good), 0.1);
    }

    #[test]
    fn median_threshold_never_drops_below_stop_threshold() {
        let scoring = MedianScoring::new(1e-3, 1.5);
        let s = scoring.score(&[0.0; 7], 2);
        assert_eq!(scoring.inlier_threshold(&s, 7, 2), 1e-3);
        assert_eq!(s.inlier_count, 7);
    }

    #[test]
    fn scorings_can_be_shared_across_threads() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<InlierCountScoring>();
        assert_sync::<TruncatedScoring>();
        assert_sync::<MedianScoring>();

        let scoring = MedianScoring::new(1e-6, 1.5);
        let first = scoring.score(&RESIDUALS, 2);
        let second = scoring.score(&[9.0, 9.0, 9.0], 2);
        // Nothing carries over between calls.
        assert_eq!(scoring.score(&RESIDUALS, 2), first);
        assert_relative_eq!(MedianScoring::median_residual(&second), 9.0);
    }

    #[test]
    fn ties_do_not_compare_as_improvements() {
        let a = Score::new(3, 3.0);
        let b = Score::new(3, 3.0);
        assert!(!(a > b));
    }
}
