//! Metric (similarity) transformation estimator using Umeyama's method.

use nalgebra::{DVector, Matrix3, UnitQuaternion, Vector3};

use super::{point_transfer_3d, push_transfer, transfer_norm};
use crate::core::Estimator;
use crate::models::{MetricTransformation3D, Point3D};

/// Relative size below which a singular value of the cross-covariance counts
/// as zero.
const RANK_TOLERANCE: f64 = 1e-10;

/// Similarity `x' = s R x + t` from three (or more) point correspondences.
///
/// Residual: Euclidean distance between the transformed input point and the
/// output point. Parameters: rotation vector, translation, scale.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricTransformation3DEstimator;

impl MetricTransformation3DEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Least-squares similarity between the matched points, `None` for
    /// collinear or coincident inputs.
    pub fn umeyama(&self, inputs: &[Vector3<f64>], outputs: &[Vector3<f64>]) -> Option<MetricTransformation3D> {
        let n = inputs.len();
        if n < 3 || outputs.len() != n {
            return None;
        }
        let inv_n = 1.0 / n as f64;

        // Centroids
        let mu_x = inputs.iter().sum::<Vector3<f64>>() * inv_n;
        let mu_y = outputs.iter().sum::<Vector3<f64>>() * inv_n;

        let mut sigma = Matrix3::<f64>::zeros();
        let mut var_x = 0.0;
        for (x, y) in inputs.iter().zip(outputs) {
            let xc = x - mu_x;
            let yc = y - mu_y;
            sigma += yc * xc.transpose();
            var_x += xc.norm_squared();
        }
        sigma *= inv_n;
        var_x *= inv_n;
        if var_x <= f64::EPSILON {
            return None;
        }

        // SVD: Sigma = U D V^T, then R = U S V^T
        let svd = sigma.svd(true, true);
        let u = svd.u?;
        let v_t = svd.v_t?;
        let d = svd.singular_values;

        let mut order = [0, 1, 2];
        order.sort_by(|&i, &j| d[j].total_cmp(&d[i]));
        // Collinear points leave two vanishing singular values.
        if d[order[1]] <= RANK_TOLERANCE * d[order[0]] {
            return None;
        }

        // Ensure proper rotation (det(R) = 1)
        let mut s = Vector3::new(1.0, 1.0, 1.0);
        if u.determinant() * v_t.determinant() < 0.0 {
            s[order[2]] = -1.0;
        }
        let r = u * Matrix3::from_diagonal(&s) * v_t;
        let scale = d.dot(&s) / var_x;
        if !(scale.is_finite() && scale > 0.0) {
            return None;
        }
        let translation = mu_y - scale * r * mu_x;

        Some(MetricTransformation3D::from_rotation_matrix(r, translation, scale))
    }
}

impl Estimator for MetricTransformation3DEstimator {
    type Sample = (Point3D, Point3D);
    type Model = MetricTransformation3D;

    const DEFAULT_THRESHOLD: f64 = 1e-3;
    const DEFAULT_STOP_THRESHOLD: f64 = 1e-3;

    fn sample_size(&self) -> usize {
        3
    }

    fn is_valid_sample(&self, sample: &[(Point3D, Point3D)]) -> bool {
        sample
            .iter()
            .all(|(x, y)| !x.is_at_infinity() && !y.is_at_infinity())
    }

    fn estimate_model(&self, sample: &[(Point3D, Point3D)]) -> Vec<MetricTransformation3D> {
        let Some(pairs) = sample
            .iter()
            .map(|(x, y)| Some((x.inhomogeneous()?, y.inhomogeneous()?)))
            .collect::<Option<Vec<_>>>()
        else {
            return Vec::new();
        };
        let (inputs, outputs): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        self.umeyama(&inputs, &outputs).into_iter().collect()
    }

    fn residual(&self, model: &MetricTransformation3D, (input, output): &(Point3D, Point3D)) -> f64 {
        transfer_norm(point_transfer_3d(&model.transform_point(input), output))
    }

    fn signed_residuals(
        &self,
        model: &MetricTransformation3D,
        (input, output): &(Point3D, Point3D),
        out: &mut Vec<f64>,
    ) {
        push_transfer(point_transfer_3d(&model.transform_point(input), output), out);
    }

    fn to_params(&self, model: &MetricTransformation3D) -> DVector<f64> {
        let w = model.rotation.scaled_axis();
        let t = model.translation;
        DVector::from_vec(vec![w.x, w.y, w.z, t.x, t.y, t.z, model.scale])
    }

    fn from_params(&self, params: &DVector<f64>) -> Option<MetricTransformation3D> {
        if params.len() != 7 || !(params[6] > 0.0) {
            return None;
        }
        let rotation = UnitQuaternion::from_scaled_axis(Vector3::new(params[0], params[1], params[2]));
        let translation = Vector3::new(params[3], params[4], params[5]);
        Some(MetricTransformation3D::new(rotation, translation, params[6]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn similarity() -> MetricTransformation3D {
        MetricTransformation3D::new(
            UnitQuaternion::from_euler_angles(0.3, -0.2, 1.1),
            Vector3::new(1.0, -2.0, 0.5),
            2.5,
        )
    }

    #[test]
    fn similarity_from_three_points() {
        let t = similarity();
        let sample: Vec<_> = [
            Point3D::new(0.0, 0.0, 0.0),
            Point3D::new(1.0, 0.0, 0.0),
            Point3D::new(0.0, 2.0, 1.0),
        ]
        .iter()
        .map(|p| (*p, t.transform_point(p)))
        .collect();
        let models = MetricTransformation3DEstimator.estimate_model(&sample);
        assert_eq!(models.len(), 1);
        let found = &models[0];
        assert_relative_eq!(found.scale, t.scale, epsilon = 1e-9);
        assert_relative_eq!(found.translation, t.translation, epsilon = 1e-9);
        assert_relative_eq!(found.rotation.angle_to(&t.rotation), 0.0, epsilon = 1e-9);

        let probe = Point3D::new(-4.0, 3.0, 7.0);
        let pair = (probe, t.transform_point(&probe));
        assert_relative_eq!(MetricTransformation3DEstimator.residual(found, &pair), 0.0, epsilon = 1e-8);
    }

    #[test]
    fn collinear_points_are_degenerate() {
        let t = similarity();
        let sample: Vec<_> = (0..3)
            .map(|i| {
                let p = Point3D::new(i as f64, i as f64, i as f64);
                (p, t.transform_point(&p))
            })
            .collect();
        assert!(MetricTransformation3DEstimator.estimate_model(&sample).is_empty());
    }

    #[test]
    fn params_round_trip() {
        let t = similarity();
        let params = MetricTransformation3DEstimator.to_params(&t);
        assert_eq!(params.len(), 7);
        let back = MetricTransformation3DEstimator.from_params(&params).unwrap();
        assert_relative_eq!(back.matrix(), t.matrix(), epsilon = 1e-12);
        let mut negative = params.clone();
        negative[6] = -1.0;
        assert!(MetricTransformation3DEstimator.from_params(&negative).is_none());
    }
}
