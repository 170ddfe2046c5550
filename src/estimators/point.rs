//! Point estimators: the common point of a pencil of lines (2D) or a
//! bundle of planes (3D).

use nalgebra::{DMatrix, DVector, Vector3, Vector4};

use super::normalize_unit;
use crate::core::Estimator;
use crate::models::{Line2D, Plane, Point2D, Point3D, INFINITY_TOLERANCE};
use crate::settings::CoordinatesType;
use crate::utils::null_vector;

/// Dehomogenised coordinates, or the homogeneous vector unchanged.
///
/// Points at infinity have no Euclidean coordinates and map to infinities.
fn represent_point(params: &DVector<f64>, coordinates: CoordinatesType) -> DVector<f64> {
    match coordinates {
        CoordinatesType::Homogeneous => params.clone(),
        CoordinatesType::Inhomogeneous => {
            let n = params.len();
            let w = params[n - 1];
            if w.abs() <= INFINITY_TOLERANCE * params.norm() {
                return DVector::from_element(n - 1, f64::INFINITY);
            }
            DVector::from_iterator(n - 1, params.iter().take(n - 1).map(|v| v / w))
        }
    }
}

/// Intersection point of 2D lines. Residual: Euclidean distance from the
/// point to each line.
#[derive(Debug, Clone, Copy, Default)]
pub struct Point2DEstimator;

impl Estimator for Point2DEstimator {
    type Sample = Line2D;
    type Model = Point2D;

    const DEFAULT_THRESHOLD: f64 = 1e-7;
    const DEFAULT_STOP_THRESHOLD: f64 = 1e-6;

    fn sample_size(&self) -> usize {
        2
    }

    fn estimate_model(&self, sample: &[Line2D]) -> Vec<Point2D> {
        match sample {
            [l1, l2] => l1.intersection(l2).map(|p| p.normalized()).into_iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Parallel lines meet at infinity, which no residual can measure.
    fn is_valid_model(&self, model: &Point2D) -> bool {
        !model.is_at_infinity()
    }

    fn residual(&self, model: &Point2D, sample: &Line2D) -> f64 {
        sample.distance(model)
    }

    fn signed_residuals(&self, model: &Point2D, sample: &Line2D, out: &mut Vec<f64>) {
        out.push(sample.signed_distance(model));
    }

    fn to_params(&self, model: &Point2D) -> DVector<f64> {
        DVector::from_column_slice(model.normalized().coords.as_slice())
    }

    fn from_params(&self, params: &DVector<f64>) -> Option<Point2D> {
        (params.len() == 3 && params.norm() > 0.0)
            .then(|| Point2D::from_homogeneous(Vector3::new(params[0], params[1], params[2])))
    }

    fn normalize_params(&self, params: &mut DVector<f64>) {
        normalize_unit(params);
    }

    fn represent(&self, params: &DVector<f64>, coordinates: CoordinatesType) -> DVector<f64> {
        represent_point(params, coordinates)
    }
}

/// Intersection point of planes. Residual: Euclidean distance from the
/// point to each plane.
#[derive(Debug, Clone, Copy, Default)]
pub struct Point3DEstimator;

impl Estimator for Point3DEstimator {
    type Sample = Plane;
    type Model = Point3D;

    const DEFAULT_THRESHOLD: f64 = 1e-7;
    const DEFAULT_STOP_THRESHOLD: f64 = 1e-6;

    fn sample_size(&self) -> usize {
        3
    }

    fn estimate_model(&self, sample: &[Plane]) -> Vec<Point3D> {
        if sample.len() != 3 {
            return Vec::new();
        }
        let mut a = DMatrix::zeros(3, 4);
        for (row, plane) in sample.iter().enumerate() {
            a.row_mut(row)
                .copy_from(&plane.normalized().coords.transpose());
        }
        null_vector(&a)
            .map(|v| Point3D::from_homogeneous(Vector4::new(v[0], v[1], v[2], v[3])))
            .into_iter()
            .collect()
    }

    fn is_valid_model(&self, model: &Point3D) -> bool {
        !model.is_at_infinity()
    }

    fn residual(&self, model: &Point3D, sample: &Plane) -> f64 {
        sample.distance(model)
    }

    fn signed_residuals(&self, model: &Point3D, sample: &Plane, out: &mut Vec<f64>) {
        out.push(sample.signed_distance(model));
    }

    fn to_params(&self, model: &Point3D) -> DVector<f64> {
        DVector::from_column_slice(model.normalized().coords.as_slice())
    }

    fn from_params(&self, params: &DVector<f64>) -> Option<Point3D> {
        (params.len() == 4 && params.norm() > 0.0).then(|| {
            Point3D::from_homogeneous(Vector4::new(params[0], params[1], params[2], params[3]))
        })
    }

    fn normalize_params(&self, params: &mut DVector<f64>) {
        normalize_unit(params);
    }

    fn represent(&self, params: &DVector<f64>, coordinates: CoordinatesType) -> DVector<f64> {
        represent_point(params, coordinates)
    }
}
