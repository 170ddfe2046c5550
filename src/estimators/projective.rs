//! Projective transformation (homography) estimators.

use nalgebra::{DVector, Matrix3, Matrix4};

use super::dlt;
use super::{
    line_transfer, normalize_unit, plane_transfer, point_transfer_2d, point_transfer_3d,
    push_transfer, transfer_norm, unzip,
};
use crate::core::Estimator;
use crate::models::{Line2D, Plane, Point2D, Point3D, ProjectiveTransformation2D, ProjectiveTransformation3D};

const THRESHOLD: f64 = 1e-3;
const STOP_THRESHOLD: f64 = 1e-3;

// Parameters are the matrix entries in row-major order at unit norm.

fn params_2d(model: &ProjectiveTransformation2D) -> DVector<f64> {
    let m = model.normalized().matrix.transpose();
    DVector::from_column_slice(m.as_slice())
}

fn from_params_2d(params: &DVector<f64>) -> Option<ProjectiveTransformation2D> {
    (params.len() == 9 && params.norm() > 0.0)
        .then(|| ProjectiveTransformation2D::new(Matrix3::from_row_slice(params.as_slice())))
}

fn params_3d(model: &ProjectiveTransformation3D) -> DVector<f64> {
    let m = model.normalized().matrix.transpose();
    DVector::from_column_slice(m.as_slice())
}

fn from_params_3d(params: &DVector<f64>) -> Option<ProjectiveTransformation3D> {
    (params.len() == 16 && params.norm() > 0.0)
        .then(|| ProjectiveTransformation3D::new(Matrix4::from_row_slice(params.as_slice())))
}

fn model_2d(m: Matrix3<f64>) -> Vec<ProjectiveTransformation2D> {
    vec![ProjectiveTransformation2D::new(m).normalized()]
}

fn model_3d(m: Matrix4<f64>) -> Vec<ProjectiveTransformation3D> {
    vec![ProjectiveTransformation3D::new(m).normalized()]
}

/// Homography from four point correspondences. Residual: transfer distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectiveTransformation2DEstimator;

impl Estimator for ProjectiveTransformation2DEstimator {
    type Sample = (Point2D, Point2D);
    type Model = ProjectiveTransformation2D;

    const DEFAULT_THRESHOLD: f64 = THRESHOLD;
    const DEFAULT_STOP_THRESHOLD: f64 = STOP_THRESHOLD;

    fn sample_size(&self) -> usize {
        4
    }

    fn estimate_model(&self, sample: &[(Point2D, Point2D)]) -> Vec<ProjectiveTransformation2D> {
        let (inputs, outputs) = unzip(sample);
        dlt::points_2d(&inputs, &outputs, &[]).map_or_else(Vec::new, model_2d)
    }

    fn is_valid_model(&self, model: &ProjectiveTransformation2D) -> bool {
        dlt::is_invertible(model.matrix.determinant(), model.matrix.norm(), 3)
    }

    fn residual(&self, model: &ProjectiveTransformation2D, (input, output): &(Point2D, Point2D)) -> f64 {
        transfer_norm(point_transfer_2d(&model.transform_point(input), output))
    }

    fn signed_residuals(
        &self,
        model: &ProjectiveTransformation2D,
        (input, output): &(Point2D, Point2D),
        out: &mut Vec<f64>,
    ) {
        push_transfer(point_transfer_2d(&model.transform_point(input), output), out);
    }

    fn to_params(&self, model: &ProjectiveTransformation2D) -> DVector<f64> {
        params_2d(model)
    }

    fn from_params(&self, params: &DVector<f64>) -> Option<ProjectiveTransformation2D> {
        from_params_2d(params)
    }

    fn normalize_params(&self, params: &mut DVector<f64>) {
        normalize_unit(params);
    }
}

/// Homography from four line correspondences.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineCorrespondenceProjectiveTransformation2DEstimator;

impl Estimator for LineCorrespondenceProjectiveTransformation2DEstimator {
    type Sample = (Line2D, Line2D);
    type Model = ProjectiveTransformation2D;

    const DEFAULT_THRESHOLD: f64 = THRESHOLD;
    const DEFAULT_STOP_THRESHOLD: f64 = STOP_THRESHOLD;

    fn sample_size(&self) -> usize {
        4
    }

    fn estimate_model(&self, sample: &[(Line2D, Line2D)]) -> Vec<ProjectiveTransformation2D> {
        let (inputs, outputs) = unzip(sample);
        dlt::lines_2d(&inputs, &outputs, &[]).map_or_else(Vec::new, model_2d)
    }

    fn is_valid_model(&self, model: &ProjectiveTransformation2D) -> bool {
        dlt::is_invertible(model.matrix.determinant(), model.matrix.norm(), 3)
    }

    fn residual(&self, model: &ProjectiveTransformation2D, (input, output): &(Line2D, Line2D)) -> f64 {
        transfer_norm(line_transfer(model.transform_line(input), output))
    }

    fn signed_residuals(
        &self,
        model: &ProjectiveTransformation2D,
        (input, output): &(Line2D, Line2D),
        out: &mut Vec<f64>,
    ) {
        push_transfer(line_transfer(model.transform_line(input), output), out);
    }

    fn to_params(&self, model: &ProjectiveTransformation2D) -> DVector<f64> {
        params_2d(model)
    }

    fn from_params(&self, params: &DVector<f64>) -> Option<ProjectiveTransformation2D> {
        from_params_2d(params)
    }

    fn normalize_params(&self, params: &mut DVector<f64>) {
        normalize_unit(params);
    }
}

/// 3D projectivity from five point correspondences.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectiveTransformation3DEstimator;

impl Estimator for ProjectiveTransformation3DEstimator {
    type Sample = (Point3D, Point3D);
    type Model = ProjectiveTransformation3D;

    const DEFAULT_THRESHOLD: f64 = THRESHOLD;
    const DEFAULT_STOP_THRESHOLD: f64 = STOP_THRESHOLD;

    fn sample_size(&self) -> usize {
        5
    }

    fn estimate_model(&self, sample: &[(Point3D, Point3D)]) -> Vec<ProjectiveTransformation3D> {
        let (inputs, outputs) = unzip(sample);
        dlt::points_3d(&inputs, &outputs, &[]).map_or_else(Vec::new, model_3d)
    }

    fn is_valid_model(&self, model: &ProjectiveTransformation3D) -> bool {
        dlt::is_invertible(model.matrix.determinant(), model.matrix.norm(), 4)
    }

    fn residual(&self, model: &ProjectiveTransformation3D, (input, output): &(Point3D, Point3D)) -> f64 {
        transfer_norm(point_transfer_3d(&model.transform_point(input), output))
    }

    fn signed_residuals(
        &self,
        model: &ProjectiveTransformation3D,
        (input, output): &(Point3D, Point3D),
        out: &mut Vec<f64>,
    ) {
        push_transfer(point_transfer_3d(&model.transform_point(input), output), out);
    }

    fn to_params(&self, model: &ProjectiveTransformation3D) -> DVector<f64> {
        params_3d(model)
    }

    fn from_params(&self, params: &DVector<f64>) -> Option<ProjectiveTransformation3D> {
        from_params_3d(params)
    }

    fn normalize_params(&self, params: &mut DVector<f64>) {
        normalize_unit(params);
    }
}

/// 3D projectivity from five plane correspondences.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaneCorrespondenceProjectiveTransformation3DEstimator;

impl Estimator for PlaneCorrespondenceProjectiveTransformation3DEstimator {
    type Sample = (Plane, Plane);
    type Model = ProjectiveTransformation3D;

    const DEFAULT_THRESHOLD: f64 = THRESHOLD;
    const DEFAULT_STOP_THRESHOLD: f64 = STOP_THRESHOLD;

    fn sample_size(&self) -> usize {
        5
    }

    fn estimate_model(&self, sample: &[(Plane, Plane)]) -> Vec<ProjectiveTransformation3D> {
        let (inputs, outputs) = unzip(sample);
        dlt::planes_3d(&inputs, &outputs, &[]).map_or_else(Vec::new, model_3d)
    }

    fn is_valid_model(&self, model: &ProjectiveTransformation3D) -> bool {
        dlt::is_invertible(model.matrix.determinant(), model.matrix.norm(), 4)
    }

    fn residual(&self, model: &ProjectiveTransformation3D, (input, output): &(Plane, Plane)) -> f64 {
        transfer_norm(plane_transfer(model.transform_plane(input), output))
    }

    fn signed_residuals(
        &self,
        model: &ProjectiveTransformation3D,
        (input, output): &(Plane, Plane),
        out: &mut Vec<f64>,
    ) {
        push_transfer(plane_transfer(model.transform_plane(input), output), out);
    }

    fn to_params(&self, model: &ProjectiveTransformation3D) -> DVector<f64> {
        params_3d(model)
    }

    fn from_params(&self, params: &DVector<f64>) -> Option<ProjectiveTransformation3D> {
        from_params_3d(params)
    }

    fn normalize_params(&self, params: &mut DVector<f64>) {
        normalize_unit(params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn homography() -> Matrix3<f64> {
        Matrix3::new(0.9, 0.2, 5.0, -0.1, 1.1, -2.0, 0.002, -0.001, 1.0)
    }

    fn same_up_to_scale3(a: &Matrix3<f64>, b: &Matrix3<f64>) {
        assert_relative_eq!(a / a[(2, 2)], b / b[(2, 2)], epsilon = 1e-8);
    }

    #[test]
    fn homography_from_four_points() {
        let h = ProjectiveTransformation2D::new(homography());
        let sample: Vec<_> = [(0.0, 0.0), (10.0, 1.0), (9.0, 12.0), (-2.0, 8.0)]
            .iter()
            .map(|&(x, y)| {
                let p = Point2D::new(x, y);
                (p, h.transform_point(&p))
            })
            .collect();
        let models = ProjectiveTransformation2DEstimator.estimate_model(&sample);
        assert_eq!(models.len(), 1);
        assert!(ProjectiveTransformation2DEstimator.is_valid_model(&models[0]));
        assert_relative_eq!(models[0].matrix.norm(), 1.0, epsilon = 1e-12);
        same_up_to_scale3(&models[0].matrix, &h.matrix);

        let probe = Point2D::new(3.0, 4.0);
        let pair = (probe, h.transform_point(&probe));
        assert_relative_eq!(
            ProjectiveTransformation2DEstimator.residual(&models[0], &pair),
            0.0,
            epsilon = 1e-8
        );
    }

    #[test]
    fn homography_from_four_lines() {
        let h = ProjectiveTransformation2D::new(homography());
        let sample: Vec<_> = [
            Line2D::new(1.0, 0.0, -1.0),
            Line2D::new(0.0, 1.0, -2.0),
            Line2D::new(1.0, 1.0, -7.0),
            Line2D::new(1.0, -3.0, 2.0),
        ]
        .iter()
        .map(|l| (*l, h.transform_line(l).unwrap()))
        .collect();
        let models = LineCorrespondenceProjectiveTransformation2DEstimator.estimate_model(&sample);
        assert_eq!(models.len(), 1);
        same_up_to_scale3(&models[0].matrix, &h.matrix);
    }

    #[test]
    fn projectivity_3d_from_five_points() {
        let mut m = Matrix4::identity();
        m[(0, 1)] = 0.3;
        m[(1, 3)] = 2.0;
        m[(3, 0)] = 0.01;
        let t = ProjectiveTransformation3D::new(m);
        let sample: Vec<_> = [
            Point3D::new(0.0, 0.0, 0.0),
            Point3D::new(1.0, 0.0, 0.0),
            Point3D::new(0.0, 1.0, 0.0),
            Point3D::new(0.0, 0.0, 1.0),
            Point3D::new(1.0, 2.0, 3.0),
        ]
        .iter()
        .map(|p| (*p, t.transform_point(p)))
        .collect();
        let models = ProjectiveTransformation3DEstimator.estimate_model(&sample);
        assert_eq!(models.len(), 1);
        let found = models[0].matrix / models[0].matrix[(3, 3)];
        assert_relative_eq!(found, m, epsilon = 1e-8);
    }

    #[test]
    fn params_are_row_major_and_unit_norm() {
        let h = ProjectiveTransformation2D::new(homography());
        let params = ProjectiveTransformation2DEstimator.to_params(&h);
        assert_eq!(params.len(), 9);
        assert_relative_eq!(params.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(params[2] / params[8], 5.0, epsilon = 1e-12);
        let back = ProjectiveTransformation2DEstimator.from_params(&params).unwrap();
        same_up_to_scale3(&back.matrix, &h.matrix);
    }
}
