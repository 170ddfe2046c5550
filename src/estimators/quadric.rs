//! Quadric and dual quadric estimators (nine samples, 9x10 design matrix).

use nalgebra::{DMatrix, DVector};

use super::normalize_unit;
use crate::core::Estimator;
use crate::models::{DualQuadric, Plane, Point3D, Quadric};
use crate::utils::{normalizing_transform_3d, null_vector};

fn params10(params: &DVector<f64>) -> Option<[f64; 10]> {
    (params.len() == 10 && params.norm() > 0.0).then(|| {
        let mut p = [0.0; 10];
        p.copy_from_slice(params.as_slice());
        p
    })
}

/// Design row for `vᵀ S v` with `S` parameterised as
/// `[xx, yy, zz, xy, xz, yz, xw, yw, zw, ww]`.
fn quadratic_row(v: [f64; 4]) -> [f64; 10] {
    let [x, y, z, w] = v;
    [
        x * x,
        y * y,
        z * z,
        x * y,
        x * z,
        y * z,
        x * w,
        y * w,
        z * w,
        w * w,
    ]
}

fn null_params(rows: &[[f64; 10]]) -> Option<[f64; 10]> {
    let mut a = DMatrix::<f64>::zeros(rows.len(), 10);
    for (i, row) in rows.iter().enumerate() {
        a.row_mut(i).copy_from_slice(row);
    }
    let v = null_vector(&a)?;
    let mut p = [0.0; 10];
    p.copy_from_slice(v.as_slice());
    Some(p)
}

/// Quadric through nine points. Residual: Sampson distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuadricEstimator;

impl Estimator for QuadricEstimator {
    type Sample = Point3D;
    type Model = Quadric;

    const DEFAULT_THRESHOLD: f64 = 1e-6;
    const DEFAULT_STOP_THRESHOLD: f64 = 1e-5;

    fn sample_size(&self) -> usize {
        9
    }

    fn estimate_model(&self, sample: &[Point3D]) -> Vec<Quadric> {
        let Some(points) = sample
            .iter()
            .map(Point3D::inhomogeneous)
            .collect::<Option<Vec<_>>>()
        else {
            return Vec::new();
        };
        let Some(t) = normalizing_transform_3d(&points) else {
            return Vec::new();
        };

        let rows: Vec<[f64; 10]> = points
            .iter()
            .map(|p| {
                let q = t * p.push(1.0);
                quadratic_row([q.x, q.y, q.z, q.w])
            })
            .collect();
        let Some(params) = null_params(&rows) else {
            return Vec::new();
        };

        let normalized = Quadric::from_params(params);
        vec![Quadric {
            matrix: t.transpose() * normalized.matrix * t,
        }
        .normalized()]
    }

    fn residual(&self, model: &Quadric, sample: &Point3D) -> f64 {
        model.sampson_distance(sample)
    }

    fn signed_residuals(&self, model: &Quadric, sample: &Point3D, out: &mut Vec<f64>) {
        out.push(model.signed_sampson_distance(sample));
    }

    fn to_params(&self, model: &Quadric) -> DVector<f64> {
        DVector::from_row_slice(&model.normalized().params())
    }

    fn from_params(&self, params: &DVector<f64>) -> Option<Quadric> {
        params10(params).map(Quadric::from_params)
    }

    fn normalize_params(&self, params: &mut DVector<f64>) {
        normalize_unit(params);
    }
}

/// Dual quadric tangent to nine planes. Residual: `|πᵀ Q* π|` for unit-norm
/// plane and dual quadric.
#[derive(Debug, Clone, Copy, Default)]
pub struct DualQuadricEstimator;

impl Estimator for DualQuadricEstimator {
    type Sample = Plane;
    type Model = DualQuadric;

    const DEFAULT_THRESHOLD: f64 = 1e-6;
    const DEFAULT_STOP_THRESHOLD: f64 = 1e-5;

    fn sample_size(&self) -> usize {
        9
    }

    fn estimate_model(&self, sample: &[Plane]) -> Vec<DualQuadric> {
        let rows: Vec<[f64; 10]> = sample
            .iter()
            .map(|plane| {
                let p = plane.normalized().coords;
                quadratic_row([p.x, p.y, p.z, p.w])
            })
            .collect();
        null_params(&rows)
            .map(|params| DualQuadric::from_params(params).normalized())
            .into_iter()
            .collect()
    }

    fn residual(&self, model: &DualQuadric, sample: &Plane) -> f64 {
        model.algebraic_residual(sample).abs()
    }

    fn signed_residuals(&self, model: &DualQuadric, sample: &Plane, out: &mut Vec<f64>) {
        out.push(model.algebraic_residual(sample));
    }

    fn to_params(&self, model: &DualQuadric) -> DVector<f64> {
        DVector::from_row_slice(&model.normalized().params())
    }

    fn from_params(&self, params: &DVector<f64>) -> Option<DualQuadric> {
        params10(params).map(DualQuadric::from_params)
    }

    fn normalize_params(&self, params: &mut DVector<f64>) {
        normalize_unit(params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Point on the ellipsoid `(x/3)² + (y/2)² + z² = 1` shifted by (1, -1, 2).
    fn ellipsoid_point(u: f64, v: f64) -> Point3D {
        Point3D::new(
            1.0 + 3.0 * u.cos() * v.sin(),
            -1.0 + 2.0 * u.sin() * v.sin(),
            2.0 + v.cos(),
        )
    }

    /// Tangent plane of `x²/a² + y²/b² + z²/c² = 1` at the given angles.
    fn ellipsoid_tangent(u: f64, v: f64) -> Plane {
        let (a, b, c) = (3.0, 2.0, 1.0);
        let (x, y, z) = (u.cos() * v.sin(), u.sin() * v.sin(), v.cos());
        Plane::new(x / a, y / b, z / c, -1.0)
    }

    fn angles() -> Vec<(f64, f64)> {
        (0..9)
            .map(|i| (0.7 * i as f64, 0.3 + 0.29 * i as f64))
            .collect()
    }

    #[test]
    fn quadric_through_nine_ellipsoid_points() {
        let sample: Vec<Point3D> = angles().into_iter().map(|(u, v)| ellipsoid_point(u, v)).collect();
        let models = QuadricEstimator.estimate_model(&sample);
        assert_eq!(models.len(), 1);
        for i in 0..15 {
            let p = ellipsoid_point(0.4 * i as f64, 0.2 + 0.17 * i as f64);
            assert_relative_eq!(QuadricEstimator.residual(&models[0], &p), 0.0, epsilon = 1e-8);
        }
    }

    #[test]
    fn dual_quadric_from_tangent_planes() {
        let sample: Vec<Plane> = angles().into_iter().map(|(u, v)| ellipsoid_tangent(u, v)).collect();
        let models = DualQuadricEstimator.estimate_model(&sample);
        assert_eq!(models.len(), 1);
        for i in 0..15 {
            let plane = ellipsoid_tangent(0.45 * i as f64, 0.25 + 0.18 * i as f64);
            assert_relative_eq!(
                DualQuadricEstimator.residual(&models[0], &plane),
                0.0,
                epsilon = 1e-8
            );
        }
    }

    #[test]
    fn coplanar_points_do_not_define_a_quadric() {
        let sample: Vec<Point3D> = (0..9)
            .map(|i| Point3D::new(i as f64, (i * i) as f64 * 0.1, 0.0))
            .collect();
        assert!(QuadricEstimator.estimate_model(&sample).is_empty());
    }
}
