//! High-level API.
//!
//! Type aliases naming the robust estimator of every model family, plus
//! one-call helpers for the most common fits.

use crate::core::Estimator;
use crate::error::Result;
use crate::estimator::{InliersData, RobustEstimator};
use crate::estimators::{
    AffineTransformation2DEstimator, AffineTransformation3DEstimator, ConicEstimator,
    DualConicEstimator, DualQuadricEstimator, Line2DEstimator,
    LineCorrespondenceAffineTransformation2DEstimator,
    LineCorrespondenceProjectiveTransformation2DEstimator, MetricTransformation3DEstimator,
    PlaneCorrespondenceAffineTransformation3DEstimator,
    PlaneCorrespondenceProjectiveTransformation3DEstimator, PlaneEstimator, Point2DEstimator,
    Point3DEstimator, ProjectiveTransformation2DEstimator, ProjectiveTransformation3DEstimator,
    QuadricEstimator,
};
use crate::models::{AffineTransformation2D, Line2D, Plane, Point2D, Point3D};
use crate::settings::{RobustEstimatorMethod, RobustEstimatorSettings};
use crate::types::{Correspondences, SampleData};

pub type Point2DRobustEstimator<'a> = RobustEstimator<'a, Point2DEstimator, &'a [Line2D]>;
pub type Point3DRobustEstimator<'a> = RobustEstimator<'a, Point3DEstimator, &'a [Plane]>;
pub type Line2DRobustEstimator<'a> = RobustEstimator<'a, Line2DEstimator, &'a [Point2D]>;
pub type PlaneRobustEstimator<'a> = RobustEstimator<'a, PlaneEstimator, &'a [Point3D]>;
pub type ConicRobustEstimator<'a> = RobustEstimator<'a, ConicEstimator, &'a [Point2D]>;
pub type DualConicRobustEstimator<'a> = RobustEstimator<'a, DualConicEstimator, &'a [Line2D]>;
pub type QuadricRobustEstimator<'a> = RobustEstimator<'a, QuadricEstimator, &'a [Point3D]>;
pub type DualQuadricRobustEstimator<'a> = RobustEstimator<'a, DualQuadricEstimator, &'a [Plane]>;

pub type AffineTransformation2DRobustEstimator<'a> =
    RobustEstimator<'a, AffineTransformation2DEstimator, Correspondences<'a, Point2D, Point2D>>;
pub type LineCorrespondenceAffineTransformation2DRobustEstimator<'a> = RobustEstimator<
    'a,
    LineCorrespondenceAffineTransformation2DEstimator,
    Correspondences<'a, Line2D, Line2D>,
>;
pub type AffineTransformation3DRobustEstimator<'a> =
    RobustEstimator<'a, AffineTransformation3DEstimator, Correspondences<'a, Point3D, Point3D>>;
pub type PlaneCorrespondenceAffineTransformation3DRobustEstimator<'a> = RobustEstimator<
    'a,
    PlaneCorrespondenceAffineTransformation3DEstimator,
    Correspondences<'a, Plane, Plane>,
>;
pub type ProjectiveTransformation2DRobustEstimator<'a> =
    RobustEstimator<'a, ProjectiveTransformation2DEstimator, Correspondences<'a, Point2D, Point2D>>;
pub type LineCorrespondenceProjectiveTransformation2DRobustEstimator<'a> = RobustEstimator<
    'a,
    LineCorrespondenceProjectiveTransformation2DEstimator,
    Correspondences<'a, Line2D, Line2D>,
>;
pub type ProjectiveTransformation3DRobustEstimator<'a> =
    RobustEstimator<'a, ProjectiveTransformation3DEstimator, Correspondences<'a, Point3D, Point3D>>;
pub type PlaneCorrespondenceProjectiveTransformation3DRobustEstimator<'a> = RobustEstimator<
    'a,
    PlaneCorrespondenceProjectiveTransformation3DEstimator,
    Correspondences<'a, Plane, Plane>,
>;
pub type MetricTransformation3DRobustEstimator<'a> =
    RobustEstimator<'a, MetricTransformation3DEstimator, Correspondences<'a, Point3D, Point3D>>;

/// Result of a one-call estimation.
#[derive(Debug, Clone)]
pub struct EstimationResult<M> {
    /// The estimated (and, by default, refined) model.
    pub model: M,
    /// Indices of the consensus inliers.
    pub inliers: Vec<usize>,
    /// Residual of every sample under the consensus model.
    pub residuals: Vec<f64>,
}

fn run<'a, E, D>(mut robust: RobustEstimator<'a, E, D>, settings: Option<RobustEstimatorSettings>) -> Result<EstimationResult<E::Model>>
where
    E: Estimator + Clone,
    D: SampleData<Item = E::Sample> + Copy,
{
    if let Some(settings) = settings {
        robust.set_settings(settings)?;
    }
    robust.set_compute_and_keep_inliers(true)?;
    robust.set_compute_and_keep_residuals(true)?;
    let model = robust.estimate()?;

    let (inliers, residuals) = match robust.inliers_data() {
        Some(InliersData { inliers, residuals, .. }) => (
            inliers
                .iter()
                .enumerate()
                .filter_map(|(i, &inlier)| inlier.then_some(i))
                .collect(),
            residuals.clone().unwrap_or_default(),
        ),
        None => (Vec::new(), Vec::new()),
    };
    Ok(EstimationResult { model, inliers, residuals })
}

/// Fit a 2D line to `points` with RANSAC.
///
/// `settings` defaults to the line family's thresholds.
///
/// ```rust
/// use robust_geometry::api::estimate_line;
/// use robust_geometry::models::Point2D;
///
/// let mut points: Vec<Point2D> = (0..20).map(|i| Point2D::new(i as f64, 1.0 - i as f64)).collect();
/// points.push(Point2D::new(3.0, 40.0));
///
/// let result = estimate_line(&points, None).unwrap();
/// assert_eq!(result.inliers.len(), 20);
/// assert!(!result.inliers.contains(&20));
/// ```
pub fn estimate_line(points: &[Point2D], settings: Option<RobustEstimatorSettings>) -> Result<EstimationResult<Line2D>> {
    run(
        Line2DRobustEstimator::with_samples(RobustEstimatorMethod::Ransac, points)?,
        settings,
    )
}

/// Fit a plane to `points` with RANSAC.
pub fn estimate_plane(points: &[Point3D], settings: Option<RobustEstimatorSettings>) -> Result<EstimationResult<Plane>> {
    run(
        PlaneRobustEstimator::with_samples(RobustEstimatorMethod::Ransac, points)?,
        settings,
    )
}

/// Estimate the 2D affinity mapping `inputs[i]` onto `outputs[i]` with MSAC.
pub fn estimate_affine_transformation_2d(
    inputs: &[Point2D],
    outputs: &[Point2D],
    settings: Option<RobustEstimatorSettings>,
) -> Result<EstimationResult<AffineTransformation2D>> {
    run(
        AffineTransformation2DRobustEstimator::with_correspondences(RobustEstimatorMethod::Msac, inputs, outputs)?,
        settings,
    )
}
