//! Geometric models and samples.
//!
//! These are lightweight value types over `nalgebra`: homogeneous points,
//! lines and planes, conics and quadrics (and their duals), and the affine,
//! projective and metric transformations fitted by the estimators.

use nalgebra::{
    Matrix2, Matrix3, Matrix4, Rotation3, SVector, UnitQuaternion, Vector2, Vector3, Vector4,
};

/// Homogeneous coordinates whose last component is smaller than this
/// (relative to the vector norm) are treated as lying at infinity.
pub const INFINITY_TOLERANCE: f64 = 1e-12;

fn unit<const N: usize>(v: &SVector<f64, N>) -> SVector<f64, N> {
    let n = v.norm();
    if n > 0.0 {
        v / n
    } else {
        *v
    }
}

/// Difference between two homogeneous vectors after unit normalisation,
/// choosing the sign that makes them closest.
pub(crate) fn unit_difference<const N: usize>(
    a: &SVector<f64, N>,
    b: &SVector<f64, N>,
) -> SVector<f64, N> {
    let a = unit(a);
    let b = unit(b);
    if a.dot(&b) >= 0.0 {
        a - b
    } else {
        a + b
    }
}

/// Point in the projective plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2D {
    pub coords: Vector3<f64>,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            coords: Vector3::new(x, y, 1.0),
        }
    }

    pub fn from_homogeneous(coords: Vector3<f64>) -> Self {
        Self { coords }
    }

    pub fn is_at_infinity(&self) -> bool {
        self.coords.z.abs() <= INFINITY_TOLERANCE * self.coords.norm()
    }

    /// Euclidean coordinates, `None` for points at infinity.
    pub fn inhomogeneous(&self) -> Option<Vector2<f64>> {
        (!self.is_at_infinity()).then(|| self.coords.xy() / self.coords.z)
    }

    /// Same point with unit-norm homogeneous coordinates.
    pub fn normalized(&self) -> Self {
        Self::from_homogeneous(unit(&self.coords))
    }

    /// Euclidean distance, infinite when either point lies at infinity.
    pub fn distance_to(&self, other: &Point2D) -> f64 {
        match (self.inhomogeneous(), other.inhomogeneous()) {
            (Some(a), Some(b)) => (a - b).norm(),
            _ => f64::INFINITY,
        }
    }
}

/// Line `a x + b y + c w = 0` in the projective plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line2D {
    pub coords: Vector3<f64>,
}

impl Line2D {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self {
            coords: Vector3::new(a, b, c),
        }
    }

    pub fn from_homogeneous(coords: Vector3<f64>) -> Self {
        Self { coords }
    }

    /// Line through two points, `None` when they coincide.
    pub fn through(p: &Point2D, q: &Point2D) -> Option<Self> {
        let coords = p.normalized().coords.cross(&q.normalized().coords);
        (coords.norm() > INFINITY_TOLERANCE).then_some(Self { coords })
    }

    pub fn is_at_infinity(&self) -> bool {
        self.coords.xy().norm() <= INFINITY_TOLERANCE * self.coords.norm()
    }

    /// Same line with unit-norm homogeneous coordinates.
    pub fn normalized(&self) -> Self {
        Self::from_homogeneous(unit(&self.coords))
    }

    /// Signed Euclidean distance from `point` to the line.
    pub fn signed_distance(&self, point: &Point2D) -> f64 {
        let normal = self.coords.xy().norm();
        match point.inhomogeneous() {
            Some(p) if normal > 0.0 => {
                (self.coords.x * p.x + self.coords.y * p.y + self.coords.z) / normal
            }
            _ => f64::INFINITY,
        }
    }

    pub fn distance(&self, point: &Point2D) -> f64 {
        self.signed_distance(point).abs()
    }

    /// Intersection point of two lines, `None` when they coincide.
    pub fn intersection(&self, other: &Line2D) -> Option<Point2D> {
        let coords = self.normalized().coords.cross(&other.normalized().coords);
        (coords.norm() > INFINITY_TOLERANCE).then_some(Point2D { coords })
    }
}

/// Point in projective 3-space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point3D {
    pub coords: Vector4<f64>,
}

impl Point3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            coords: Vector4::new(x, y, z, 1.0),
        }
    }

    pub fn from_homogeneous(coords: Vector4<f64>) -> Self {
        Self { coords }
    }

    pub fn is_at_infinity(&self) -> bool {
        self.coords.w.abs() <= INFINITY_TOLERANCE * self.coords.norm()
    }

    pub fn inhomogeneous(&self) -> Option<Vector3<f64>> {
        (!self.is_at_infinity()).then(|| self.coords.xyz() / self.coords.w)
    }

    pub fn normalized(&self) -> Self {
        Self::from_homogeneous(unit(&self.coords))
    }

    pub fn distance_to(&self, other: &Point3D) -> f64 {
        match (self.inhomogeneous(), other.inhomogeneous()) {
            (Some(a), Some(b)) => (a - b).norm(),
            _ => f64::INFINITY,
        }
    }
}

/// Plane `a x + b y + c z + d w = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub coords: Vector4<f64>,
}

impl Plane {
    pub fn new(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self {
            coords: Vector4::new(a, b, c, d),
        }
    }

    pub fn from_homogeneous(coords: Vector4<f64>) -> Self {
        Self { coords }
    }

    /// Plane through three points, `None` when they are collinear.
    pub fn through(p: &Point3D, q: &Point3D, r: &Point3D) -> Option<Self> {
        let (p, q, r) = (p.inhomogeneous()?, q.inhomogeneous()?, r.inhomogeneous()?);
        let normal = (q - p).cross(&(r - p));
        let scale = (q - p).norm() * (r - p).norm();
        if scale <= 0.0 || normal.norm() <= INFINITY_TOLERANCE * scale {
            return None;
        }
        let normal = normal.normalize();
        Some(Self::new(normal.x, normal.y, normal.z, -normal.dot(&p)))
    }

    pub fn normalized(&self) -> Self {
        Self::from_homogeneous(unit(&self.coords))
    }

    pub fn normal(&self) -> Vector3<f64> {
        self.coords.xyz()
    }

    pub fn signed_distance(&self, point: &Point3D) -> f64 {
        let normal = self.normal().norm();
        match point.inhomogeneous() {
            Some(p) if normal > 0.0 => (self.normal().dot(&p) + self.coords.w) / normal,
            _ => f64::INFINITY,
        }
    }

    pub fn distance(&self, point: &Point3D) -> f64 {
        self.signed_distance(point).abs()
    }
}

fn sampson_ratio(value: f64, gradient: f64) -> f64 {
    if gradient > 0.0 {
        value / gradient
    } else if value == 0.0 {
        0.0
    } else {
        f64::INFINITY
    }
}

fn symmetric3(p: &[f64; 6]) -> Matrix3<f64> {
    let [a, b, c, d, e, f] = *p;
    Matrix3::new(
        a,
        0.5 * b,
        0.5 * d,
        0.5 * b,
        c,
        0.5 * e,
        0.5 * d,
        0.5 * e,
        f,
    )
}

fn symmetric3_params(m: &Matrix3<f64>) -> [f64; 6] {
    [
        m[(0, 0)],
        m[(0, 1)] + m[(1, 0)],
        m[(1, 1)],
        m[(0, 2)] + m[(2, 0)],
        m[(1, 2)] + m[(2, 1)],
        m[(2, 2)],
    ]
}

fn symmetric4(p: &[f64; 10]) -> Matrix4<f64> {
    let [a, b, c, d, e, f, g, h, i, j] = *p;
    Matrix4::new(
        a,
        0.5 * d,
        0.5 * e,
        0.5 * g,
        0.5 * d,
        b,
        0.5 * f,
        0.5 * h,
        0.5 * e,
        0.5 * f,
        c,
        0.5 * i,
        0.5 * g,
        0.5 * h,
        0.5 * i,
        j,
    )
}

fn symmetric4_params(m: &Matrix4<f64>) -> [f64; 10] {
    [
        m[(0, 0)],
        m[(1, 1)],
        m[(2, 2)],
        m[(0, 1)] + m[(1, 0)],
        m[(0, 2)] + m[(2, 0)],
        m[(1, 2)] + m[(2, 1)],
        m[(0, 3)] + m[(3, 0)],
        m[(1, 3)] + m[(3, 1)],
        m[(2, 3)] + m[(3, 2)],
        m[(3, 3)],
    ]
}

/// Conic `a x² + b xy + c y² + d x + e y + f = 0`, stored as a symmetric matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conic {
    pub matrix: Matrix3<f64>,
}

impl Conic {
    /// Build from `[a, b, c, d, e, f]`.
    pub fn from_params(params: [f64; 6]) -> Self {
        Self {
            matrix: symmetric3(&params),
        }
    }

    pub fn params(&self) -> [f64; 6] {
        symmetric3_params(&self.matrix)
    }

    /// Same conic with unit Frobenius norm.
    pub fn normalized(&self) -> Self {
        let n = self.matrix.norm();
        Self {
            matrix: if n > 0.0 { self.matrix / n } else { self.matrix },
        }
    }

    /// `pᵀ C p` for unit-norm `p`.
    pub fn algebraic_residual(&self, point: &Point2D) -> f64 {
        let p = point.normalized().coords;
        (p.transpose() * self.normalized().matrix * p)[0]
    }

    /// Sampson error of `point`: algebraic residual over its gradient norm,
    /// signed by the side of the curve the point lies on.
    pub fn signed_sampson_distance(&self, point: &Point2D) -> f64 {
        let Some(xy) = point.inhomogeneous() else {
            return f64::INFINITY;
        };
        let p = xy.push(1.0);
        let cp = self.normalized().matrix * p;
        sampson_ratio(p.dot(&cp), 2.0 * cp.xy().norm())
    }

    /// First-order approximation of the Euclidean distance from `point` to the curve.
    pub fn sampson_distance(&self, point: &Point2D) -> f64 {
        self.signed_sampson_distance(point).abs()
    }

    pub fn is_locus(&self, point: &Point2D, threshold: f64) -> bool {
        self.sampson_distance(point) <= threshold
    }
}

/// Dual conic: set of lines tangent to a conic, `lᵀ C* l = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DualConic {
    pub matrix: Matrix3<f64>,
}

impl DualConic {
    pub fn from_params(params: [f64; 6]) -> Self {
        Self {
            matrix: symmetric3(&params),
        }
    }

    pub fn params(&self) -> [f64; 6] {
        symmetric3_params(&self.matrix)
    }

    pub fn normalized(&self) -> Self {
        let n = self.matrix.norm();
        Self {
            matrix: if n > 0.0 { self.matrix / n } else { self.matrix },
        }
    }

    /// `lᵀ C* l` for unit-norm `l` and unit-norm `C*`.
    pub fn algebraic_residual(&self, line: &Line2D) -> f64 {
        let l = line.normalized().coords;
        (l.transpose() * self.normalized().matrix * l)[0]
    }

    /// Point conic whose tangent lines form this dual conic, `None` when degenerate.
    pub fn conic(&self) -> Option<Conic> {
        self.matrix
            .try_inverse()
            .map(|matrix| Conic { matrix })
    }
}

/// Quadric surface stored as a symmetric 4x4 matrix with parameters
/// `[xx, yy, zz, xy, xz, yz, xw, yw, zw, ww]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadric {
    pub matrix: Matrix4<f64>,
}

impl Quadric {
    pub fn from_params(params: [f64; 10]) -> Self {
        Self {
            matrix: symmetric4(&params),
        }
    }

    pub fn params(&self) -> [f64; 10] {
        symmetric4_params(&self.matrix)
    }

    pub fn normalized(&self) -> Self {
        let n = self.matrix.norm();
        Self {
            matrix: if n > 0.0 { self.matrix / n } else { self.matrix },
        }
    }

    pub fn algebraic_residual(&self, point: &Point3D) -> f64 {
        let p = point.normalized().coords;
        (p.transpose() * self.normalized().matrix * p)[0]
    }

    pub fn signed_sampson_distance(&self, point: &Point3D) -> f64 {
        let Some(xyz) = point.inhomogeneous() else {
            return f64::INFINITY;
        };
        let p = xyz.push(1.0);
        let qp = self.normalized().matrix * p;
        sampson_ratio(p.dot(&qp), 2.0 * qp.xyz().norm())
    }

    /// First-order approximation of the Euclidean distance from `point` to the surface.
    pub fn sampson_distance(&self, point: &Point3D) -> f64 {
        self.signed_sampson_distance(point).abs()
    }
}

/// Dual quadric: set of planes tangent to a quadric, `πᵀ Q* π = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DualQuadric {
    pub matrix: Matrix4<f64>,
}

impl DualQuadric {
    pub fn from_params(params: [f64; 10]) -> Self {
        Self {
            matrix: symmetric4(&params),
        }
    }

    pub fn params(&self) -> [f64; 10] {
        symmetric4_params(&self.matrix)
    }

    pub fn normalized(&self) -> Self {
        let n = self.matrix.norm();
        Self {
            matrix: if n > 0.0 { self.matrix / n } else { self.matrix },
        }
    }

    pub fn algebraic_residual(&self, plane: &Plane) -> f64 {
        let p = plane.normalized().coords;
        (p.transpose() * self.normalized().matrix * p)[0]
    }
}

/// 2D affine transformation `x' = A x + t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransformation2D {
    pub linear: Matrix2<f64>,
    pub translation: Vector2<f64>,
}

impl Default for AffineTransformation2D {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransformation2D {
    pub fn new(linear: Matrix2<f64>, translation: Vector2<f64>) -> Self {
        Self {
            linear,
            translation,
        }
    }

    pub fn identity() -> Self {
        Self::new(Matrix2::identity(), Vector2::zeros())
    }

    /// Build from a homogeneous matrix; `None` unless its last row is `[0, 0, s]`, `s ≠ 0`.
    pub fn from_matrix(m: &Matrix3<f64>) -> Option<Self> {
        let s = m[(2, 2)];
        if s.abs() <= INFINITY_TOLERANCE * m.norm()
            || m[(2, 0)].abs() > INFINITY_TOLERANCE * m.norm() * 1e3
            || m[(2, 1)].abs() > INFINITY_TOLERANCE * m.norm() * 1e3
        {
            return None;
        }
        let m = m / s;
        Some(Self::new(
            m.fixed_view::<2, 2>(0, 0).into_owned(),
            m.fixed_view::<2, 1>(0, 2).into_owned(),
        ))
    }

    pub fn matrix(&self) -> Matrix3<f64> {
        let mut m = Matrix3::identity();
        m.fixed_view_mut::<2, 2>(0, 0).copy_from(&self.linear);
        m.fixed_view_mut::<2, 1>(0, 2).copy_from(&self.translation);
        m
    }

    pub fn transform_point(&self, point: &Point2D) -> Point2D {
        Point2D::from_homogeneous(self.matrix() * point.coords)
    }

    /// Lines map by the inverse transpose; `None` when `A` is singular.
    pub fn transform_line(&self, line: &Line2D) -> Option<Line2D> {
        let inv = self.matrix().try_inverse()?;
        Some(Line2D::from_homogeneous(inv.transpose() * line.coords))
    }
}

/// 3D affine transformation `x' = A x + t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransformation3D {
    pub linear: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

impl Default for AffineTransformation3D {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransformation3D {
    pub fn new(linear: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            linear,
            translation,
        }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity(), Vector3::zeros())
    }

    /// Build from a homogeneous matrix; `None` unless its last row is `[0, 0, 0, s]`, `s ≠ 0`.
    pub fn from_matrix(m: &Matrix4<f64>) -> Option<Self> {
        let s = m[(3, 3)];
        let norm = m.norm();
        if s.abs() <= INFINITY_TOLERANCE * norm
            || (0..3).any(|c| m[(3, c)].abs() > INFINITY_TOLERANCE * norm * 1e3)
        {
            return None;
        }
        let m = m / s;
        Some(Self::new(
            m.fixed_view::<3, 3>(0, 0).into_owned(),
            m.fixed_view::<3, 1>(0, 3).into_owned(),
        ))
    }

    pub fn matrix(&self) -> Matrix4<f64> {
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&self.linear);
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.translation);
        m
    }

    pub fn transform_point(&self, point: &Point3D) -> Point3D {
        Point3D::from_homogeneous(self.matrix() * point.coords)
    }

    pub fn transform_plane(&self, plane: &Plane) -> Option<Plane> {
        let inv = self.matrix().try_inverse()?;
        Some(Plane::from_homogeneous(inv.transpose() * plane.coords))
    }
}

/// 2D projective transformation (homography), defined up to scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectiveTransformation2D {
    pub matrix: Matrix3<f64>,
}

impl Default for ProjectiveTransformation2D {
    fn default() -> Self {
        Self::new(Matrix3::identity())
    }
}

impl ProjectiveTransformation2D {
    pub fn new(matrix: Matrix3<f64>) -> Self {
        Self { matrix }
    }

    /// Same transformation with unit Frobenius norm.
    pub fn normalized(&self) -> Self {
        let n = self.matrix.norm();
        Self::new(if n > 0.0 { self.matrix / n } else { self.matrix })
    }

    pub fn transform_point(&self, point: &Point2D) -> Point2D {
        Point2D::from_homogeneous(self.matrix * point.coords)
    }

    pub fn transform_line(&self, line: &Line2D) -> Option<Line2D> {
        let inv = self.matrix.try_inverse()?;
        Some(Line2D::from_homogeneous(inv.transpose() * line.coords))
    }
}

/// 3D projective transformation, defined up to scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectiveTransformation3D {
    pub matrix: Matrix4<f64>,
}

impl Default for ProjectiveTransformation3D {
    fn default() -> Self {
        Self::new(Matrix4::identity())
    }
}

impl ProjectiveTransformation3D {
    pub fn new(matrix: Matrix4<f64>) -> Self {
        Self { matrix }
    }

    pub fn normalized(&self) -> Self {
        let n = self.matrix.norm();
        Self::new(if n > 0.0 { self.matrix / n } else { self.matrix })
    }

    pub fn transform_point(&self, point: &Point3D) -> Point3D {
        Point3D::from_homogeneous(self.matrix * point.coords)
    }

    pub fn transform_plane(&self, plane: &Plane) -> Option<Plane> {
        let inv = self.matrix.try_inverse()?;
        Some(Plane::from_homogeneous(inv.transpose() * plane.coords))
    }
}

/// Similarity in 3D: `x' = s R x + t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricTransformation3D {
    pub rotation: UnitQuaternion<f64>,
    pub translation: Vector3<f64>,
    pub scale: f64,
}

impl Default for MetricTransformation3D {
    fn default() -> Self {
        Self::new(UnitQuaternion::identity(), Vector3::zeros(), 1.0)
    }
}

impl MetricTransformation3D {
    pub fn new(rotation: UnitQuaternion<f64>, translation: Vector3<f64>, scale: f64) -> Self {
        Self {
            rotation,
            translation,
            scale,
        }
    }

    pub fn from_rotation_matrix(r: Matrix3<f64>, translation: Vector3<f64>, scale: f64) -> Self {
        let rotation = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r));
        Self::new(rotation, translation, scale)
    }

    pub fn matrix(&self) -> Matrix4<f64> {
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&(self.rotation.to_rotation_matrix().into_inner() * self.scale));
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.translation);
        m
    }

    pub fn transform_point(&self, point: &Point3D) -> Point3D {
        Point3D::from_homogeneous(self.matrix() * point.coords)
    }
}
