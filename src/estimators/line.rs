//! Line and plane estimators fitted to points.

use nalgebra::{DVector, Vector3, Vector4};

use super::normalize_unit;
use crate::core::Estimator;
use crate::models::{Line2D, Plane, Point2D, Point3D};

/// 2D line estimator.
///
/// Estimates lines `a x + b y + c = 0` through pairs of points; the residual
/// is the Euclidean point-line distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct Line2DEstimator;

impl Estimator for Line2DEstimator {
    type Sample = Point2D;
    type Model = Line2D;

    const DEFAULT_THRESHOLD: f64 = 1e-7;
    const DEFAULT_STOP_THRESHOLD: f64 = 1e-6;

    fn sample_size(&self) -> usize {
        2 // A line requires 2 points
    }

    fn is_valid_sample(&self, sample: &[Point2D]) -> bool {
        sample.iter().all(|p| !p.is_at_infinity())
    }

    fn estimate_model(&self, sample: &[Point2D]) -> Vec<Line2D> {
        match sample {
            // Cross product of the homogeneous points; `None` when they coincide.
            [p, q] => Line2D::through(p, q)
                .filter(|l| !l.is_at_infinity())
                .map(|l| l.normalized())
                .into_iter()
                .collect(),
            _ => Vec::new(),
        }
    }

    fn residual(&self, model: &Line2D, sample: &Point2D) -> f64 {
        model.distance(sample)
    }

    fn signed_residuals(&self, model: &Line2D, sample: &Point2D, out: &mut Vec<f64>) {
        out.push(model.signed_distance(sample));
    }

    fn to_params(&self, model: &Line2D) -> DVector<f64> {
        DVector::from_column_slice(model.normalized().coords.as_slice())
    }

    fn from_params(&self, params: &DVector<f64>) -> Option<Line2D> {
        (params.len() == 3 && params.norm() > 0.0)
            .then(|| Line2D::from_homogeneous(Vector3::new(params[0], params[1], params[2])))
    }

    fn normalize_params(&self, params: &mut DVector<f64>) {
        normalize_unit(params);
    }
}

/// Plane estimator through triples of non-collinear points; the residual is
/// the Euclidean point-plane distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaneEstimator;

impl Estimator for PlaneEstimator {
    type Sample = Point3D;
    type Model = Plane;

    const DEFAULT_THRESHOLD: f64 = 1e-7;
    const DEFAULT_STOP_THRESHOLD: f64 = 1e-6;

    fn sample_size(&self) -> usize {
        3
    }

    fn is_valid_sample(&self, sample: &[Point3D]) -> bool {
        sample.iter().all(|p| !p.is_at_infinity())
    }

    fn estimate_model(&self, sample: &[Point3D]) -> Vec<Plane> {
        match sample {
            [p, q, r] => Plane::through(p, q, r).into_iter().collect(),
            _ => Vec::new(),
        }
    }

    fn residual(&self, model: &Plane, sample: &Point3D) -> f64 {
        model.distance(sample)
    }

    fn signed_residuals(&self, model: &Plane, sample: &Point3D, out: &mut Vec<f64>) {
        out.push(model.signed_distance(sample));
    }

    fn to_params(&self, model: &Plane) -> DVector<f64> {
        DVector::from_column_slice(model.normalized().coords.as_slice())
    }

    fn from_params(&self, params: &DVector<f64>) -> Option<Plane> {
        (params.len() == 4 && params.norm() > 0.0).then(|| {
            Plane::from_homogeneous(Vector4::new(params[0], params[1], params[2], params[3]))
        })
    }

    fn normalize_params(&self, params: &mut DVector<f64>) {
        normalize_unit(params);
    }
}
