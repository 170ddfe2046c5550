//! Direct linear transform shared by the affine and projective estimators.
//!
//! Every correspondence `y ~ M x` contributes `N - 1` proportionality
//! equations pivoting on the largest component of `y`. Affine estimators
//! append one extra row per entry of `M` that must vanish.

use nalgebra::{DMatrix, Matrix3, Matrix4, SMatrix, SVector, Vector2, Vector3, Vector4};

use crate::models::{Line2D, Plane, Point2D, Point3D};
use crate::utils::{normalizing_transform_2d, normalizing_transform_3d, null_vector};

/// Entries `(row, column)` of a 2D homography fixed to zero by an affinity.
pub(crate) const AFFINE_2D_ZEROS: [(usize, usize); 2] = [(2, 0), (2, 1)];
/// Entries `(row, column)` of a 3D homography fixed to zero by an affinity.
pub(crate) const AFFINE_3D_ZEROS: [(usize, usize); 3] = [(3, 0), (3, 1), (3, 2)];

/// Solve `y_i ~ M x_i` for `M` (up to scale), with `M[zeros] = 0`.
pub(crate) fn solve<const N: usize>(
    pairs: &[(SVector<f64, N>, SVector<f64, N>)],
    zeros: &[(usize, usize)],
) -> Option<SMatrix<f64, N, N>> {
    let rows = pairs.len() * (N - 1) + zeros.len();
    let mut a = DMatrix::<f64>::zeros(rows, N * N);

    let mut row = 0;
    for (x, y) in pairs {
        let k = y.iamax();
        for j in (0..N).filter(|&j| j != k) {
            for c in 0..N {
                a[(row, j * N + c)] = y[k] * x[c];
                a[(row, k * N + c)] = -y[j] * x[c];
            }
            row += 1;
        }
    }
    for &(r, c) in zeros {
        a[(row, r * N + c)] = 1.0;
        row += 1;
    }

    let v = null_vector(&a)?;
    Some(SMatrix::<f64, N, N>::from_row_slice(v.as_slice()))
}

fn transpose_zeros(zeros: &[(usize, usize)]) -> Vec<(usize, usize)> {
    zeros.iter().map(|&(r, c)| (c, r)).collect()
}

/// Homography mapping `inputs` onto `outputs`, Hartley-normalised on both sides.
pub(crate) fn points_2d(
    inputs: &[Point2D],
    outputs: &[Point2D],
    zeros: &[(usize, usize)],
) -> Option<Matrix3<f64>> {
    let xin: Vec<Vector2<f64>> = inputs.iter().map(Point2D::inhomogeneous).collect::<Option<_>>()?;
    let xout: Vec<Vector2<f64>> = outputs.iter().map(Point2D::inhomogeneous).collect::<Option<_>>()?;
    let t_in = normalizing_transform_2d(&xin)?;
    let t_out = normalizing_transform_2d(&xout)?;

    let pairs: Vec<(Vector3<f64>, Vector3<f64>)> = xin
        .iter()
        .zip(&xout)
        .map(|(x, y)| (t_in * x.push(1.0), t_out * y.push(1.0)))
        .collect();
    let m = solve(&pairs, zeros)?;
    Some(t_out.try_inverse()? * m * t_in)
}

/// Homography `H` such that `H⁻ᵀ` maps input lines onto output lines.
///
/// Lines satisfy `l_in ~ Hᵀ l_out`, so the system is solved for `Hᵀ`.
pub(crate) fn lines_2d(
    inputs: &[Line2D],
    outputs: &[Line2D],
    zeros: &[(usize, usize)],
) -> Option<Matrix3<f64>> {
    let pairs: Vec<(Vector3<f64>, Vector3<f64>)> = inputs
        .iter()
        .zip(outputs)
        .map(|(l_in, l_out)| (l_out.normalized().coords, l_in.normalized().coords))
        .collect();
    solve(&pairs, &transpose_zeros(zeros)).map(|m| m.transpose())
}

/// 3D counterpart of [`points_2d`].
pub(crate) fn points_3d(
    inputs: &[Point3D],
    outputs: &[Point3D],
    zeros: &[(usize, usize)],
) -> Option<Matrix4<f64>> {
    let xin: Vec<Vector3<f64>> = inputs.iter().map(Point3D::inhomogeneous).collect::<Option<_>>()?;
    let xout: Vec<Vector3<f64>> = outputs.iter().map(Point3D::inhomogeneous).collect::<Option<_>>()?;
    let t_in = normalizing_transform_3d(&xin)?;
    let t_out = normalizing_transform_3d(&xout)?;

    let pairs: Vec<(Vector4<f64>, Vector4<f64>)> = xin
        .iter()
        .zip(&xout)
        .map(|(x, y)| (t_in * x.push(1.0), t_out * y.push(1.0)))
        .collect();
    let m = solve(&pairs, zeros)?;
    Some(t_out.try_inverse()? * m * t_in)
}

/// 3D counterpart of [`lines_2d`] for plane correspondences.
pub(crate) fn planes_3d(
    inputs: &[Plane],
    outputs: &[Plane],
    zeros: &[(usize, usize)],
) -> Option<Matrix4<f64>> {
    let pairs: Vec<(Vector4<f64>, Vector4<f64>)> = inputs
        .iter()
        .zip(outputs)
        .map(|(p_in, p_out)| (p_out.normalized().coords, p_in.normalized().coords))
        .collect();
    solve(&pairs, &transpose_zeros(zeros)).map(|m| m.transpose())
}

/// `true` when a `dim`-square matrix with Frobenius norm `norm` and
/// determinant `det` is far enough from singular to be inverted.
pub(crate) fn is_invertible(det: f64, norm: f64, dim: i32) -> bool {
    norm > 0.0 && det.is_finite() && det.abs() > 1e-12 * norm.powi(dim)
}
