//! Configuration types for robust estimators.
//!
//! Every estimator starts from [`RobustEstimatorSettings::default`] and the
//! per-family thresholds exposed by [`Estimator`](crate::core::Estimator).

/// Default probability that at least one outlier-free sample is drawn.
pub const DEFAULT_CONFIDENCE: f64 = 0.99;
/// Default upper bound on consensus iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 5000;
/// Default minimum progress change between two progress notifications.
pub const DEFAULT_PROGRESS_DELTA: f32 = 0.05;
/// Lowest accepted confidence.
pub const MIN_CONFIDENCE: f64 = 0.0;
/// Highest accepted confidence.
pub const MAX_CONFIDENCE: f64 = 1.0;
/// Lowest accepted iteration bound.
pub const MIN_ITERATIONS: usize = 1;
/// Lowest accepted progress delta.
pub const MIN_PROGRESS_DELTA: f32 = 0.0;
/// Highest accepted progress delta.
pub const MAX_PROGRESS_DELTA: f32 = 1.0;
/// Thresholds must be strictly greater than this value.
pub const MIN_THRESHOLD: f64 = 0.0;
/// Default multiplier applied to the robust standard deviation of median
/// based methods to classify inliers.
pub const DEFAULT_INLIER_FACTOR: f64 = 1.5;
/// Lowest accepted inlier factor.
pub const MIN_INLIER_FACTOR: f64 = 1.0;
/// Refinement is enabled by default.
pub const DEFAULT_REFINE_RESULT: bool = true;
/// Covariance is not kept by default.
pub const DEFAULT_KEEP_COVARIANCE: bool = false;
/// Levenberg-Marquardt iteration cap used by the refiner.
pub const DEFAULT_REFINE_MAX_ITERATIONS: usize = 100;

/// Consensus algorithm driving a robust estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RobustEstimatorMethod {
    /// Uniform sampling, inlier-count scoring.
    Ransac,
    /// Uniform sampling, least median of squared residuals.
    Lmeds,
    /// Uniform sampling, truncated residual sum.
    Msac,
    /// Quality-ordered progressive sampling, inlier-count scoring.
    Prosac,
    /// Quality-ordered progressive sampling, least median of squared residuals.
    #[default]
    Promeds,
}

impl RobustEstimatorMethod {
    /// All supported methods, in declaration order.
    pub const ALL: [RobustEstimatorMethod; 5] = [
        RobustEstimatorMethod::Ransac,
        RobustEstimatorMethod::Lmeds,
        RobustEstimatorMethod::Msac,
        RobustEstimatorMethod::Prosac,
        RobustEstimatorMethod::Promeds,
    ];

    /// Whether samples must come with quality scores.
    pub fn requires_quality_scores(self) -> bool {
        matches!(
            self,
            RobustEstimatorMethod::Prosac | RobustEstimatorMethod::Promeds
        )
    }

    /// Whether the method scores by median residual and stops on a stop threshold.
    pub fn uses_stop_threshold(self) -> bool {
        matches!(
            self,
            RobustEstimatorMethod::Lmeds | RobustEstimatorMethod::Promeds
        )
    }
}

/// Coordinate representation used when reporting a covariance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinatesType {
    /// Full homogeneous parameter vector.
    Homogeneous,
    /// Dehomogenised coordinates (only meaningful for point models).
    #[default]
    Inhomogeneous,
}

/// Tunable parameters shared by every robust estimator.
#[derive(Debug, Clone, PartialEq)]
pub struct RobustEstimatorSettings {
    /// Residual below which a sample is an inlier (RANSAC, MSAC, PROSAC).
    pub threshold: f64,
    /// Median residual below which LMedS/PROMedS stop early.
    pub stop_threshold: f64,
    /// Desired confidence in \[0, 1\].
    pub confidence: f64,
    /// Maximum number of consensus iterations.
    pub max_iterations: usize,
    /// Minimum progress change between progress notifications, in \[0, 1\].
    pub progress_delta: f32,
    /// Refine the consensus model over its inliers.
    pub refine_result: bool,
    /// Keep the covariance of the refined model.
    pub keep_covariance: bool,
    /// Keep the inlier mask after estimation.
    pub compute_and_keep_inliers: bool,
    /// Keep the residual of every sample after estimation.
    pub compute_and_keep_residuals: bool,
    /// Multiplier of the robust standard deviation for median methods.
    pub inlier_factor: f64,
    /// Representation of the reported covariance for point models.
    pub covariance_coordinates: CoordinatesType,
    /// Iteration cap of the refiner.
    pub refine_max_iterations: usize,
    /// Fixed seed for the random source; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl RobustEstimatorSettings {
    /// Defaults with family-specific thresholds.
    pub fn with_thresholds(threshold: f64, stop_threshold: f64) -> Self {
        Self {
            threshold,
            stop_threshold,
            ..Self::default()
        }
    }
}

impl Default for RobustEstimatorSettings {
    fn default() -> Self {
        Self {
            threshold: 1e-7,
            stop_threshold: 1e-6,
            confidence: DEFAULT_CONFIDENCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            progress_delta: DEFAULT_PROGRESS_DELTA,
            refine_result: DEFAULT_REFINE_RESULT,
            keep_covariance: DEFAULT_KEEP_COVARIANCE,
            compute_and_keep_inliers: true,
            compute_and_keep_residuals: false,
            inlier_factor: DEFAULT_INLIER_FACTOR,
            covariance_coordinates: CoordinatesType::default(),
            refine_max_iterations: DEFAULT_REFINE_MAX_ITERATIONS,
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_match_constants() {
        let cfg = RobustEstimatorSettings::default();
        assert_eq!(cfg.confidence, DEFAULT_CONFIDENCE);
        assert_eq!(cfg.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(cfg.progress_delta, DEFAULT_PROGRESS_DELTA);
        assert_eq!(cfg.inlier_factor, DEFAULT_INLIER_FACTOR);
        assert!(cfg.refine_result);
        assert!(!cfg.keep_covariance);
        assert!(cfg.compute_and_keep_inliers);
        assert!(!cfg.compute_and_keep_residuals);
        assert_eq!(cfg.seed, None);
    }

    #[test]
    fn quality_scores_are_required_only_by_progressive_methods() {
        let requiring: Vec<_> = RobustEstimatorMethod::ALL
            .into_iter()
            .filter(|m| m.requires_quality_scores())
            .collect();
        assert_eq!(
            requiring,
            vec![RobustEstimatorMethod::Prosac, RobustEstimatorMethod::Promeds]
        );
        assert!(RobustEstimatorMethod::Lmeds.uses_stop_threshold());
        assert!(!RobustEstimatorMethod::Msac.uses_stop_threshold());
        assert_eq!(RobustEstimatorMethod::default(), RobustEstimatorMethod::Promeds);
    }
}
