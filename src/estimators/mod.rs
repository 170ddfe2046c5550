//! Model families.
//!
//! Each estimator implements [`Estimator`](crate::core::Estimator) for one
//! geometric model:
//! - points from lines or planes
//! - lines from points, planes from points
//! - conics, dual conics, quadrics and dual quadrics
//! - affine and projective transformations from point, line or plane
//!   correspondences
//! - metric (similarity) transformations from 3D point correspondences

pub mod affine;
pub mod conic;
pub(crate) mod dlt;
pub mod line;
pub mod metric;
pub mod point;
pub mod projective;
pub mod quadric;

pub use affine::{
    AffineTransformation2DEstimator, AffineTransformation3DEstimator,
    LineCorrespondenceAffineTransformation2DEstimator,
    PlaneCorrespondenceAffineTransformation3DEstimator,
};
pub use conic::{ConicEstimator, DualConicEstimator};
pub use line::{Line2DEstimator, PlaneEstimator};
pub use metric::MetricTransformation3DEstimator;
pub use point::{Point2DEstimator, Point3DEstimator};
pub use projective::{
    LineCorrespondenceProjectiveTransformation2DEstimator,
    PlaneCorrespondenceProjectiveTransformation3DEstimator, ProjectiveTransformation2DEstimator,
    ProjectiveTransformation3DEstimator,
};
pub use quadric::{DualQuadricEstimator, QuadricEstimator};

use nalgebra::{DVector, SVector};

use crate::models::{unit_difference, Line2D, Plane, Point2D, Point3D};

pub(crate) fn unzip<I: Copy, O: Copy>(sample: &[(I, O)]) -> (Vec<I>, Vec<O>) {
    sample.iter().copied().unzip()
}

/// Euclidean difference between a transformed point and its match.
pub(crate) fn point_transfer_2d(mapped: &Point2D, expected: &Point2D) -> Option<SVector<f64, 2>> {
    Some(mapped.inhomogeneous()? - expected.inhomogeneous()?)
}

pub(crate) fn point_transfer_3d(mapped: &Point3D, expected: &Point3D) -> Option<SVector<f64, 3>> {
    Some(mapped.inhomogeneous()? - expected.inhomogeneous()?)
}

/// Difference between a transformed line and its match, both unit-normalised.
pub(crate) fn line_transfer(mapped: Option<Line2D>, expected: &Line2D) -> Option<SVector<f64, 3>> {
    mapped.map(|l| unit_difference(&l.coords, &expected.coords))
}

pub(crate) fn plane_transfer(mapped: Option<Plane>, expected: &Plane) -> Option<SVector<f64, 4>> {
    mapped.map(|p| unit_difference(&p.coords, &expected.coords))
}

pub(crate) fn transfer_norm<const N: usize>(diff: Option<SVector<f64, N>>) -> f64 {
    diff.map_or(f64::INFINITY, |d| d.norm())
}

pub(crate) fn push_transfer<const N: usize>(diff: Option<SVector<f64, N>>, out: &mut Vec<f64>) {
    match diff {
        Some(d) => out.extend(d.iter()),
        None => out.extend(std::iter::repeat(f64::INFINITY).take(N)),
    }
}

pub(crate) fn normalize_unit(params: &mut DVector<f64>) {
    let norm = params.norm();
    if norm > 0.0 {
        *params /= norm;
    }
}
