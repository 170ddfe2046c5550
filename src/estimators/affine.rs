//! Affine transformation estimators from point, line or plane correspondences.
//!
//! The minimal solvers run the DLT with the bottom row of the homogeneous
//! matrix pinned to `[0, .., 0, s]`.

use nalgebra::{DVector, Matrix2, Matrix3, Vector2, Vector3};

use super::dlt::{self, AFFINE_2D_ZEROS, AFFINE_3D_ZEROS};
use super::{
    line_transfer, plane_transfer, point_transfer_2d, point_transfer_3d, push_transfer,
    transfer_norm, unzip,
};
use crate::core::Estimator;
use crate::models::{AffineTransformation2D, AffineTransformation3D, Line2D, Plane, Point2D, Point3D};

const THRESHOLD: f64 = 1e-3;
const STOP_THRESHOLD: f64 = 1e-3;

fn params_2d(model: &AffineTransformation2D) -> DVector<f64> {
    let a = &model.linear;
    let t = &model.translation;
    DVector::from_vec(vec![a[(0, 0)], a[(0, 1)], a[(1, 0)], a[(1, 1)], t.x, t.y])
}

fn from_params_2d(params: &DVector<f64>) -> Option<AffineTransformation2D> {
    if params.len() != 6 {
        return None;
    }
    let p = params.as_slice();
    Some(AffineTransformation2D::new(
        Matrix2::new(p[0], p[1], p[2], p[3]),
        Vector2::new(p[4], p[5]),
    ))
}

fn params_3d(model: &AffineTransformation3D) -> DVector<f64> {
    let linear = model.linear.transpose();
    DVector::from_iterator(
        12,
        linear.iter().chain(model.translation.iter()).copied(),
    )
}

fn from_params_3d(params: &DVector<f64>) -> Option<AffineTransformation3D> {
    if params.len() != 12 {
        return None;
    }
    let p = params.as_slice();
    Some(AffineTransformation3D::new(
        Matrix3::from_row_slice(&p[..9]),
        Vector3::new(p[9], p[10], p[11]),
    ))
}

fn invertible_2d(model: &AffineTransformation2D) -> bool {
    dlt::is_invertible(model.linear.determinant(), model.linear.norm(), 2)
}

fn invertible_3d(model: &AffineTransformation3D) -> bool {
    dlt::is_invertible(model.linear.determinant(), model.linear.norm(), 3)
}

/// 2D affinity from three point correspondences. Residual: Euclidean
/// distance between the transformed input point and the output point.
#[derive(Debug, Clone, Copy, Default)]
pub struct AffineTransformation2DEstimator;

impl Estimator for AffineTransformation2DEstimator {
    type Sample = (Point2D, Point2D);
    type Model = AffineTransformation2D;

    const DEFAULT_THRESHOLD: f64 = THRESHOLD;
    const DEFAULT_STOP_THRESHOLD: f64 = STOP_THRESHOLD;

    fn sample_size(&self) -> usize {
        3
    }

    fn estimate_model(&self, sample: &[(Point2D, Point2D)]) -> Vec<AffineTransformation2D> {
        let (inputs, outputs) = unzip(sample);
        dlt::points_2d(&inputs, &outputs, &AFFINE_2D_ZEROS)
            .and_then(|m| AffineTransformation2D::from_matrix(&m))
            .into_iter()
            .collect()
    }

    fn is_valid_model(&self, model: &AffineTransformation2D) -> bool {
        invertible_2d(model)
    }

    fn residual(&self, model: &AffineTransformation2D, (input, output): &(Point2D, Point2D)) -> f64 {
        transfer_norm(point_transfer_2d(&model.transform_point(input), output))
    }

    fn signed_residuals(
        &self,
        model: &AffineTransformation2D,
        (input, output): &(Point2D, Point2D),
        out: &mut Vec<f64>,
    ) {
        push_transfer(point_transfer_2d(&model.transform_point(input), output), out);
    }

    fn to_params(&self, model: &AffineTransformation2D) -> DVector<f64> {
        params_2d(model)
    }

    fn from_params(&self, params: &DVector<f64>) -> Option<AffineTransformation2D> {
        from_params_2d(params)
    }
}

/// 2D affinity from three line correspondences, mapping lines by the
/// inverse transpose. Residual: norm of the difference between the
/// transformed input line and the output line, both at unit norm.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineCorrespondenceAffineTransformation2DEstimator;

impl Estimator for LineCorrespondenceAffineTransformation2DEstimator {
    type Sample = (Line2D, Line2D);
    type Model = AffineTransformation2D;

    const DEFAULT_THRESHOLD: f64 = THRESHOLD;
    const DEFAULT_STOP_THRESHOLD: f64 = STOP_THRESHOLD;

    fn sample_size(&self) -> usize {
        3
    }

    fn estimate_model(&self, sample: &[(Line2D, Line2D)]) -> Vec<AffineTransformation2D> {
        let (inputs, outputs) = unzip(sample);
        dlt::lines_2d(&inputs, &outputs, &AFFINE_2D_ZEROS)
            .and_then(|m| AffineTransformation2D::from_matrix(&m))
            .into_iter()
            .collect()
    }

    fn is_valid_model(&self, model: &AffineTransformation2D) -> bool {
        invertible_2d(model)
    }

    fn residual(&self, model: &AffineTransformation2D, (input, output): &(Line2D, Line2D)) -> f64 {
        transfer_norm(line_transfer(model.transform_line(input), output))
    }

    fn signed_residuals(
        &self,
        model: &AffineTransformation2D,
        (input, output): &(Line2D, Line2D),
        out: &mut Vec<f64>,
    ) {
        push_transfer(line_transfer(model.transform_line(input), output), out);
    }

    fn to_params(&self, model: &AffineTransformation2D) -> DVector<f64> {
        params_2d(model)
    }

    fn from_params(&self, params: &DVector<f64>) -> Option<AffineTransformation2D> {
        from_params_2d(params)
    }
}

/// 3D affinity from four point correspondences.
#[derive(Debug, Clone, Copy, Default)]
pub struct AffineTransformation3DEstimator;

impl Estimator for AffineTransformation3DEstimator {
    type Sample = (Point3D, Point3D);
    type Model = AffineTransformation3D;

    const DEFAULT_THRESHOLD: f64 = THRESHOLD;
    const DEFAULT_STOP_THRESHOLD: f64 = STOP_THRESHOLD;

    fn sample_size(&self) -> usize {
        4
    }

    fn estimate_model(&self, sample: &[(Point3D, Point3D)]) -> Vec<AffineTransformation3D> {
        let (inputs, outputs) = unzip(sample);
        dlt::points_3d(&inputs, &outputs, &AFFINE_3D_ZEROS)
            .and_then(|m| AffineTransformation3D::from_matrix(&m))
            .into_iter()
            .collect()
    }

    fn is_valid_model(&self, model: &AffineTransformation3D) -> bool {
        invertible_3d(model)
    }

    fn residual(&self, model: &AffineTransformation3D, (input, output): &(Point3D, Point3D)) -> f64 {
        transfer_norm(point_transfer_3d(&model.transform_point(input), output))
    }

    fn signed_residuals(
        &self,
        model: &AffineTransformation3D,
        (input, output): &(Point3D, Point3D),
        out: &mut Vec<f64>,
    ) {
        push_transfer(point_transfer_3d(&model.transform_point(input), output), out);
    }

    fn to_params(&self, model: &AffineTransformation3D) -> DVector<f64> {
        params_3d(model)
    }

    fn from_params(&self, params: &DVector<f64>) -> Option<AffineTransformation3D> {
        from_params_3d(params)
    }
}

/// 3D affinity from four plane correspondences.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaneCorrespondenceAffineTransformation3DEstimator;

impl Estimator for PlaneCorrespondenceAffineTransformation3DEstimator {
    type Sample = (Plane, Plane);
    type Model = AffineTransformation3D;

    const DEFAULT_THRESHOLD: f64 = THRESHOLD;
    const DEFAULT_STOP_THRESHOLD: f64 = STOP_THRESHOLD;

    fn sample_size(&self) -> usize {
        4
    }

    fn estimate_model(&self, sample: &[(Plane, Plane)]) -> Vec<AffineTransformation3D> {
        let (inputs, outputs) = unzip(sample);
        dlt::planes_3d(&inputs, &outputs, &AFFINE_3D_ZEROS)
            .and_then(|m| AffineTransformation3D::from_matrix(&m))
            .into_iter()
            .collect()
    }

    fn is_valid_model(&self, model: &AffineTransformation3D) -> bool {
        invertible_3d(model)
    }

    fn residual(&self, model: &AffineTransformation3D, (input, output): &(Plane, Plane)) -> f64 {
        transfer_norm(plane_transfer(model.transform_plane(input), output))
    }

    fn signed_residuals(
        &self,
        model: &AffineTransformation3D,
        (input, output): &(Plane, Plane),
        out: &mut Vec<f64>,
    ) {
        push_transfer(plane_transfer(model.transform_plane(input), output), out);
    }

    fn to_params(&self, model: &AffineTransformation3D) -> DVector<f64> {
        params_3d(model)
    }

    fn from_params(&self, params: &DVector<f64>) -> Option<AffineTransformation3D> {
        from_params_3d(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn affinity_2d() -> AffineTransformation2D {
        AffineTransformation2D::new(Matrix2::new(1.5, -0.3, 0.4, 0.8), Vector2::new(2.0, -1.0))
    }

    fn affinity_3d() -> AffineTransformation3D {
        AffineTransformation3D::new(
            Matrix3::new(1.1, 0.2, -0.1, 0.0, 0.9, 0.3, 0.2, -0.4, 1.2),
            Vector3::new(1.0, 2.0, -3.0),
        )
    }

    #[test]
    fn affine_2d_from_three_points() {
        let t = affinity_2d();
        let sample: Vec<(Point2D, Point2D)> = [(0.0, 0.0), (4.0, 1.0), (-1.0, 3.0)]
            .iter()
            .map(|&(x, y)| {
                let p = Point2D::new(x, y);
                (p, t.transform_point(&p))
            })
            .collect();
        let models = AffineTransformation2DEstimator.estimate_model(&sample);
        assert_eq!(models.len(), 1);
        assert_relative_eq!(models[0].linear, t.linear, epsilon = 1e-9);
        assert_relative_eq!(models[0].translation, t.translation, epsilon = 1e-9);

        let probe = Point2D::new(7.0, -2.0);
        let pair = (probe, t.transform_point(&probe));
        assert_relative_eq!(AffineTransformation2DEstimator.residual(&models[0], &pair), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn collinear_points_are_degenerate() {
        let t = affinity_2d();
        let sample: Vec<(Point2D, Point2D)> = (0..3)
            .map(|i| {
                let p = Point2D::new(i as f64, 2.0 * i as f64);
                (p, t.transform_point(&p))
            })
            .collect();
        assert!(AffineTransformation2DEstimator.estimate_model(&sample).is_empty());
    }

    #[test]
    fn affine_2d_from_three_lines() {
        let t = affinity_2d();
        let sample: Vec<(Line2D, Line2D)> = [
            Line2D::new(1.0, 0.0, -1.0),
            Line2D::new(0.0, 1.0, -2.0),
            Line2D::new(1.0, 1.0, 4.0),
        ]
        .iter()
        .map(|l| (*l, t.transform_line(l).unwrap()))
        .collect();
        let models = LineCorrespondenceAffineTransformation2DEstimator.estimate_model(&sample);
        assert_eq!(models.len(), 1);
        assert_relative_eq!(models[0].linear, t.linear, epsilon = 1e-9);
        assert_relative_eq!(models[0].translation, t.translation, epsilon = 1e-9);
    }

    #[test]
    fn affine_3d_from_points_and_planes() {
        let t = affinity_3d();
        let points = [
            Point3D::new(0.0, 0.0, 0.0),
            Point3D::new(1.0, 0.0, 0.5),
            Point3D::new(0.0, 2.0, 0.0),
            Point3D::new(0.3, 0.1, 1.5),
        ];
        let sample: Vec<_> = points.iter().map(|p| (*p, t.transform_point(p))).collect();
        let models = AffineTransformation3DEstimator.estimate_model(&sample);
        assert_eq!(models.len(), 1);
        assert_relative_eq!(models[0].linear, t.linear, epsilon = 1e-9);
        assert_relative_eq!(models[0].translation, t.translation, epsilon = 1e-9);

        let planes = [
            Plane::new(1.0, 0.0, 0.0, -1.0),
            Plane::new(0.0, 1.0, 0.0, 2.0),
            Plane::new(0.0, 0.0, 1.0, -0.5),
            Plane::new(1.0, 1.0, 1.0, 3.0),
        ];
        let sample: Vec<_> = planes
            .iter()
            .map(|p| (*p, t.transform_plane(p).unwrap()))
            .collect();
        let models = PlaneCorrespondenceAffineTransformation3DEstimator.estimate_model(&sample);
        assert_eq!(models.len(), 1);
        assert_relative_eq!(models[0].linear, t.linear, epsilon = 1e-8);
        assert_relative_eq!(models[0].translation, t.translation, epsilon = 1e-8);
    }

    #[test]
    fn params_layout_is_linear_then_translation() {
        let t = affinity_3d();
        let params = AffineTransformation3DEstimator.to_params(&t);
        assert_eq!(params.len(), 12);
        assert_relative_eq!(params[1], t.linear[(0, 1)]);
        assert_relative_eq!(params[9], t.translation.x);
        let back = AffineTransformation3DEstimator.from_params(&params).unwrap();
        assert_eq!(back, t);
    }
}
