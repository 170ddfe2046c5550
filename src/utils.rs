//! Random generators and small numeric helpers shared by the estimators.

use std::marker::PhantomData;

use nalgebra::{DMatrix, DVector, Matrix3, Matrix4, Vector2, Vector3};
use rand::distributions::uniform::SampleUniform;
use rand::distributions::Uniform;
use rand::prelude::*;

/// Uniform random-number generator drawing sets of distinct values.
///
/// Seeded from entropy by default; a fixed seed gives reproducible draws.
pub struct UniformRandomGenerator<T>
where
    T: Copy + SampleUniform + PartialOrd,
{
    rng: StdRng,
    _marker: PhantomData<T>,
}

impl<T> Default for UniformRandomGenerator<T>
where
    T: Copy + SampleUniform + PartialOrd,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> UniformRandomGenerator<T>
where
    T: Copy + SampleUniform + PartialOrd,
{
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            _marker: PhantomData,
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            _marker: PhantomData,
        }
    }

    /// Seeded when `seed` is set, entropy-seeded otherwise.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::new, Self::from_seed)
    }

    /// Fill `out` with distinct values drawn from `[min, max]`.
    ///
    /// The range must hold at least `out.len()` values.
    pub fn gen_unique(&mut self, out: &mut [T], min: T, max: T)
    where
        T: PartialEq,
    {
        let dist = Uniform::new_inclusive(min, max);
        for i in 0..out.len() {
            loop {
                let candidate = self.rng.sample(&dist);
                if out[..i].iter().all(|&v| v != candidate) {
                    out[i] = candidate;
                    break;
                }
            }
        }
    }
}

/// Gaussian random-number generator using the Box-Muller transform.
pub struct GaussianRandomGenerator {
    rng: StdRng,
    mean: f64,
    standard_deviation: f64,
    spare: Option<f64>,
}

impl GaussianRandomGenerator {
    pub fn new(mean: f64, standard_deviation: f64) -> Self {
        Self::with_rng(StdRng::from_entropy(), mean, standard_deviation)
    }

    pub fn from_seed(seed: u64, mean: f64, standard_deviation: f64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), mean, standard_deviation)
    }

    fn with_rng(rng: StdRng, mean: f64, standard_deviation: f64) -> Self {
        Self {
            rng,
            mean,
            standard_deviation,
            spare: None,
        }
    }

    pub fn next(&mut self) -> f64 {
        if let Some(z) = self.spare.take() {
            return self.mean + self.standard_deviation * z;
        }
        // u1 in (0, 1] keeps the logarithm finite.
        let u1 = 1.0 - self.rng.gen::<f64>();
        let u2 = self.rng.gen::<f64>();
        let radius = (-2.0 * u1.ln()).sqrt();
        let angle = 2.0 * std::f64::consts::PI * u2;
        self.spare = Some(radius * angle.sin());
        self.mean + self.standard_deviation * radius * angle.cos()
    }
}

/// Median of `values`, reordering them in place. `None` for an empty slice.
pub fn median_in_place(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let len = values.len();
    let (lower, upper, _) = values.select_nth_unstable_by(len / 2, f64::total_cmp);
    let upper = *upper;
    if len % 2 == 1 {
        Some(upper)
    } else {
        let lower_max = lower.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(0.5 * (lower_max + upper))
    }
}

/// Relative singular value below which a design matrix counts as rank deficient.
pub const RANK_TOLERANCE: f64 = 1e-12;

/// Unit vector spanning the one-dimensional null space of `a`.
///
/// Wide matrices are padded with zero rows so that the SVD yields a full set
/// of right singular vectors. Returns `None` when the null space has more
/// than one dimension (degenerate configuration) or the SVD fails.
pub fn null_vector(a: &DMatrix<f64>) -> Option<DVector<f64>> {
    let cols = a.ncols();
    if cols == 0 {
        return None;
    }
    let padded;
    let square = if a.nrows() < cols {
        padded = a.clone().resize_vertically(cols, 0.0);
        &padded
    } else {
        a
    };

    let svd = square.clone().svd(false, true);
    let v_t = svd.v_t?;
    let singular = &svd.singular_values;

    let mut order: Vec<usize> = (0..singular.len()).collect();
    order.sort_by(|&i, &j| singular[i].total_cmp(&singular[j]));
    let largest = singular[order[order.len() - 1]];
    if !largest.is_finite() || largest <= 0.0 {
        return None;
    }
    if order.len() > 1 && singular[order[1]] <= RANK_TOLERANCE * largest {
        return None;
    }

    let solution = v_t.row(order[0]).transpose();
    let norm = solution.norm();
    (norm > 0.0 && solution.iter().all(|v| v.is_finite())).then(|| solution / norm)
}

/// Similarity transform moving 2D points to their centroid and scaling their
/// mean distance to √2. `None` when all points coincide or lie at infinity.
pub fn normalizing_transform_2d(points: &[Vector2<f64>]) -> Option<Matrix3<f64>> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let centroid = points.iter().fold(Vector2::zeros(), |acc, p| acc + p) / n;
    let mean_distance = points.iter().map(|p| (p - centroid).norm()).sum::<f64>() / n;
    if !mean_distance.is_finite() || mean_distance < f64::EPSILON {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean_distance;
    Some(Matrix3::new(
        s,
        0.0,
        -s * centroid.x,
        0.0,
        s,
        -s * centroid.y,
        0.0,
        0.0,
        1.0,
    ))
}

/// 3D counterpart of [`normalizing_transform_2d`], scaling to a mean distance of √3.
pub fn normalizing_transform_3d(points: &[Vector3<f64>]) -> Option<Matrix4<f64>> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let centroid = points.iter().fold(Vector3::zeros(), |acc, p| acc + p) / n;
    let mean_distance = points.iter().map(|p| (p - centroid).norm()).sum::<f64>() / n;
    if !mean_distance.is_finite() || mean_distance < f64::EPSILON {
        return None;
    }
    let s = 3.0_f64.sqrt() / mean_distance;
    let mut t = Matrix4::identity() * s;
    t[(0, 3)] = -s * centroid.x;
    t[(1, 3)] = -s * centroid.y;
    t[(2, 3)] = -s * centroid.z;
    t[(3, 3)] = 1.0;
    Some(t)
}
