//! Integration tests for the high-level Rust API.
//!
//! These tests verify that the one-call estimation functions recover the
//! model behind synthetic data contaminated with outliers.

mod common;

use common::{init_logging, Synthetic, ABSOLUTE_ERROR, PERCENTAGE_OUTLIER};
use nalgebra::{Matrix2, Vector2};
use robust_geometry::models::{AffineTransformation2D, Point2D, Point3D};
use robust_geometry::*;

#[test]
fn test_estimate_line_synthetic() {
    init_logging();
    let mut synth = Synthetic::new(41, 5.0);
    let outliers = synth.outlier_mask(80, PERCENTAGE_OUTLIER);
    let points: Vec<Point2D> = outliers
        .iter()
        .map(|&outlier| {
            let x = synth.uniform(-10.0, 10.0);
            let p = Point2D::new(x, 2.0 * x + 1.0);
            if outlier {
                synth.perturb_point2(&p)
            } else {
                p
            }
        })
        .collect();

    let mut settings = RobustEstimatorSettings::with_thresholds(1e-6, 1e-6);
    settings.seed = Some(1);
    let result = estimate_line(&points, Some(settings)).unwrap();

    let expected: Vec<usize> = (0..points.len()).filter(|&i| !outliers[i]).collect();
    assert_eq!(result.inliers, expected);
    assert_eq!(result.residuals.len(), points.len());
    assert!(result.model.distance(&Point2D::new(3.0, 7.0)) < ABSOLUTE_ERROR);
}

#[test]
fn test_estimate_line_uses_family_defaults() {
    let points: Vec<Point2D> = (0..10).map(|i| Point2D::new(1.0, i as f64)).collect();
    let result = estimate_line(&points, None).unwrap();
    assert_eq!(result.inliers.len(), 10);
    assert!(result.model.distance(&Point2D::new(1.0, -50.0)) < 1e-9);
}

#[test]
fn test_estimate_plane_synthetic() {
    init_logging();
    let mut synth = Synthetic::new(42, 5.0);
    let outliers = synth.outlier_mask(80, PERCENTAGE_OUTLIER);
    let points: Vec<Point3D> = outliers
        .iter()
        .map(|&outlier| {
            let x = synth.uniform(-10.0, 10.0);
            let y = synth.uniform(-10.0, 10.0);
            let p = Point3D::new(x, y, 0.5 * x - 2.0 * y + 3.0);
            if outlier {
                synth.perturb_point3(&p)
            } else {
                p
            }
        })
        .collect();

    let mut settings = RobustEstimatorSettings::with_thresholds(1e-6, 1e-6);
    settings.seed = Some(2);
    let result = estimate_plane(&points, Some(settings)).unwrap();
    assert_eq!(
        result.inliers.len(),
        outliers.iter().filter(|&&o| !o).count()
    );
    assert!(result.model.distance(&Point3D::new(0.0, 0.0, 3.0)) < ABSOLUTE_ERROR);
}

#[test]
fn test_estimate_affine_transformation_2d_synthetic() {
    init_logging();
    let mut synth = Synthetic::new(43, 5.0);
    let t = AffineTransformation2D::new(Matrix2::new(1.1, -0.3, 0.2, 0.9), Vector2::new(-2.0, 4.0));
    let outliers = synth.outlier_mask(60, PERCENTAGE_OUTLIER);
    let inputs: Vec<Point2D> = (0..60).map(|_| synth.point2(10.0)).collect();
    let outputs: Vec<Point2D> = inputs
        .iter()
        .zip(&outliers)
        .map(|(p, &outlier)| {
            let q = t.transform_point(p);
            if outlier {
                synth.perturb_point2(&q)
            } else {
                q
            }
        })
        .collect();

    let mut settings = RobustEstimatorSettings::with_thresholds(1e-6, 1e-6);
    settings.seed = Some(3);
    let result = estimate_affine_transformation_2d(&inputs, &outputs, Some(settings)).unwrap();
    for (i, &outlier) in outliers.iter().enumerate() {
        assert_eq!(result.inliers.contains(&i), !outlier);
    }
    assert!((result.model.linear - t.linear).norm() < ABSOLUTE_ERROR);
    assert!((result.model.translation - t.translation).norm() < ABSOLUTE_ERROR);
}

#[test]
fn test_estimate_reports_invalid_input() {
    let inputs = vec![Point2D::new(0.0, 0.0); 5];
    let outputs = vec![Point2D::new(0.0, 0.0); 4];
    assert!(matches!(
        estimate_affine_transformation_2d(&inputs, &outputs, None),
        Err(EstimatorError::InvalidArgument(_))
    ));
    assert!(matches!(
        estimate_plane(&[Point3D::new(0.0, 0.0, 0.0)], None),
        Err(EstimatorError::InvalidArgument(_))
    ));
}
