//! Conic and dual conic estimators.
//!
//! Both solve a 5x6 design matrix for its null vector. Points are
//! Hartley-normalised first; lines are normalised to unit norm.

use nalgebra::{DMatrix, DVector};

use super::normalize_unit;
use crate::core::Estimator;
use crate::models::{Conic, DualConic, Line2D, Point2D};
use crate::utils::{normalizing_transform_2d, null_vector};

fn params6(params: &DVector<f64>) -> Option<[f64; 6]> {
    (params.len() == 6 && params.norm() > 0.0).then(|| {
        let mut p = [0.0; 6];
        p.copy_from_slice(params.as_slice());
        p
    })
}

/// Conic through five points. Residual: Sampson distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConicEstimator;

impl Estimator for ConicEstimator {
    type Sample = Point2D;
    type Model = Conic;

    const DEFAULT_THRESHOLD: f64 = 1e-6;
    const DEFAULT_STOP_THRESHOLD: f64 = 1e-5;

    fn sample_size(&self) -> usize {
        5
    }

    fn estimate_model(&self, sample: &[Point2D]) -> Vec<Conic> {
        let Some(points) = sample
            .iter()
            .map(Point2D::inhomogeneous)
            .collect::<Option<Vec<_>>>()
        else {
            return Vec::new();
        };
        let Some(t) = normalizing_transform_2d(&points) else {
            return Vec::new();
        };

        let mut a = DMatrix::zeros(points.len(), 6);
        for (row, p) in points.iter().enumerate() {
            let q = t * p.push(1.0);
            let (x, y) = (q.x, q.y);
            a.row_mut(row)
                .copy_from_slice(&[x * x, x * y, y * y, x, y, 1.0]);
        }
        let Some(v) = null_vector(&a) else {
            return Vec::new();
        };

        let normalized = Conic::from_params([v[0], v[1], v[2], v[3], v[4], v[5]]);
        // pᵀ (Tᵀ C T) p = (T p)ᵀ C (T p)
        vec![Conic {
            matrix: t.transpose() * normalized.matrix * t,
        }
        .normalized()]
    }

    fn residual(&self, model: &Conic, sample: &Point2D) -> f64 {
        model.sampson_distance(sample)
    }

    fn signed_residuals(&self, model: &Conic, sample: &Point2D, out: &mut Vec<f64>) {
        out.push(model.signed_sampson_distance(sample));
    }

    fn to_params(&self, model: &Conic) -> DVector<f64> {
        DVector::from_row_slice(&model.normalized().params())
    }

    fn from_params(&self, params: &DVector<f64>) -> Option<Conic> {
        params6(params).map(Conic::from_params)
    }

    fn normalize_params(&self, params: &mut DVector<f64>) {
        normalize_unit(params);
    }
}

/// Dual conic tangent to five lines. Residual: `|lᵀ C* l|` for unit-norm
/// line and dual conic.
#[derive(Debug, Clone, Copy, Default)]
pub struct DualConicEstimator;

impl Estimator for DualConicEstimator {
    type Sample = Line2D;
    type Model = DualConic;

    const DEFAULT_THRESHOLD: f64 = 1e-6;
    const DEFAULT_STOP_THRESHOLD: f64 = 1e-5;

    fn sample_size(&self) -> usize {
        5
    }

    fn estimate_model(&self, sample: &[Line2D]) -> Vec<DualConic> {
        let mut a = DMatrix::zeros(sample.len(), 6);
        for (row, line) in sample.iter().enumerate() {
            let l = line.normalized().coords;
            let (u, v, w) = (l.x, l.y, l.z);
            a.row_mut(row)
                .copy_from_slice(&[u * u, u * v, v * v, u * w, v * w, w * w]);
        }
        null_vector(&a)
            .map(|v| DualConic::from_params([v[0], v[1], v[2], v[3], v[4], v[5]]).normalized())
            .into_iter()
            .collect()
    }

    fn residual(&self, model: &DualConic, sample: &Line2D) -> f64 {
        model.algebraic_residual(sample).abs()
    }

    fn signed_residuals(&self, model: &DualConic, sample: &Line2D, out: &mut Vec<f64>) {
        out.push(model.algebraic_residual(sample));
    }

    fn to_params(&self, model: &DualConic) -> DVector<f64> {
        DVector::from_row_slice(&model.normalized().params())
    }

    fn from_params(&self, params: &DVector<f64>) -> Option<DualConic> {
        params6(params).map(DualConic::from_params)
    }

    fn normalize_params(&self, params: &mut DVector<f64>) {
        normalize_unit(params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Matrix3, Vector3};

    /// Tangent to `x²/a² + y²/b² = 1` at angle `theta`.
    fn ellipse_tangent(a: f64, b: f64, theta: f64) -> Line2D {
        let (s, c) = theta.sin_cos();
        Line2D::new(c / a, s / b, -1.0)
    }

    fn ellipse_point(theta: f64) -> Point2D {
        Point2D::new(3.0 + 4.0 * theta.cos(), -1.0 + 2.0 * theta.sin())
    }

    #[test]
    fn conic_through_five_ellipse_points() {
        let sample: Vec<Point2D> = (0..5).map(|i| ellipse_point(i as f64 * 1.1)).collect();
        let models = ConicEstimator.estimate_model(&sample);
        assert_eq!(models.len(), 1);
        for i in 0..20 {
            let p = ellipse_point(i as f64 * 0.31);
            assert_relative_eq!(ConicEstimator.residual(&models[0], &p), 0.0, epsilon = 1e-9);
        }
        let off = Point2D::new(3.0 + 4.1, -1.0);
        assert_relative_eq!(ConicEstimator.residual(&models[0], &off), 0.1, epsilon = 1e-2);
    }

    #[test]
    fn coincident_points_are_degenerate() {
        let p = Point2D::new(1.0, 2.0);
        let sample = [p, p, p, Point2D::new(3.0, 4.0), Point2D::new(5.0, 1.0)];
        assert!(ConicEstimator.estimate_model(&sample).is_empty());
    }

    #[test]
    fn dual_conic_from_tangent_lines() {
        let sample: Vec<Line2D> = (0..5).map(|i| ellipse_tangent(2.0, 1.0, i as f64 * 1.2)).collect();
        let models = DualConicEstimator.estimate_model(&sample);
        assert_eq!(models.len(), 1);
        for i in 0..12 {
            let l = ellipse_tangent(2.0, 1.0, 0.5 + i as f64 * 0.4);
            assert_relative_eq!(DualConicEstimator.residual(&models[0], &l), 0.0, epsilon = 1e-9);
        }
        // The dual of diag(1/a², 1/b², -1) is proportional to diag(a², b², -1).
        let expected = DualConic {
            matrix: Matrix3::from_diagonal(&Vector3::new(4.0, 1.0, -1.0)),
        }
        .normalized();
        let sign = models[0].matrix[(0, 0)].signum();
        assert_relative_eq!(models[0].matrix * sign, expected.matrix, epsilon = 1e-9);
    }
}
