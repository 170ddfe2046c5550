//! Synthetic data shared by the integration suites.
#![allow(dead_code)]

use nalgebra::{Vector2, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use robust_geometry::models::{Line2D, Plane, Point2D, Point3D};
use robust_geometry::utils::GaussianRandomGenerator;

pub const PERCENTAGE_OUTLIER: f64 = 20.0;
pub const ABSOLUTE_ERROR: f64 = 5e-6;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Seeded source of synthetic geometry.
pub struct Synthetic {
    rng: StdRng,
    gaussian: GaussianRandomGenerator,
}

impl Synthetic {
    /// `std_error` is the deviation of the noise added to outliers.
    pub fn new(seed: u64, std_error: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            gaussian: GaussianRandomGenerator::from_seed(seed.wrapping_add(1), 0.0, std_error),
        }
    }

    pub fn uniform(&mut self, min: f64, max: f64) -> f64 {
        self.rng.gen_range(min..=max)
    }

    /// Outlier noise, kept away from zero so it never passes as an inlier.
    pub fn error(&mut self) -> f64 {
        let e = self.gaussian.next();
        if e.abs() < 1e-3 {
            1e-3_f64.copysign(e)
        } else {
            e
        }
    }

    pub fn point2(&mut self, range: f64) -> Point2D {
        Point2D::new(self.uniform(-range, range), self.uniform(-range, range))
    }

    pub fn point3(&mut self, range: f64) -> Point3D {
        Point3D::new(
            self.uniform(-range, range),
            self.uniform(-range, range),
            self.uniform(-range, range),
        )
    }

    /// Random line through `point`.
    pub fn line_through(&mut self, point: &Point2D) -> Line2D {
        loop {
            let other = self.point2(10.0);
            if let Some(line) = Line2D::through(point, &other) {
                if !line.is_at_infinity() {
                    return line.normalized();
                }
            }
        }
    }

    pub fn random_line(&mut self) -> Line2D {
        let p = self.point2(10.0);
        self.line_through(&p)
    }

    /// Random plane through `point`.
    pub fn plane_through(&mut self, point: &Point3D) -> Plane {
        loop {
            let q = self.point3(10.0);
            let r = self.point3(10.0);
            if let Some(plane) = Plane::through(point, &q, &r) {
                if plane.normal().norm() > 1e-6 {
                    return plane.normalized();
                }
            }
        }
    }

    pub fn random_plane(&mut self) -> Plane {
        let p = self.point3(10.0);
        self.plane_through(&p)
    }

    /// `true` at roughly `percentage` percent of `n` positions.
    pub fn outlier_mask(&mut self, n: usize, percentage: f64) -> Vec<bool> {
        (0..n)
            .map(|_| self.uniform(0.0, 100.0) < percentage)
            .collect()
    }

    /// Quality scores ranking every inlier above every outlier.
    pub fn quality_scores(&mut self, outliers: &[bool]) -> Vec<f64> {
        outliers
            .iter()
            .map(|&outlier| {
                if outlier {
                    self.uniform(0.0, 0.5)
                } else {
                    self.uniform(0.5, 1.0)
                }
            })
            .collect()
    }

    pub fn perturb_point2(&mut self, p: &Point2D) -> Point2D {
        let xy = p.inhomogeneous().unwrap_or_else(Vector2::zeros);
        Point2D::new(xy.x + self.error(), xy.y + self.error())
    }

    pub fn perturb_point3(&mut self, p: &Point3D) -> Point3D {
        let xyz = p.inhomogeneous().unwrap_or_else(Vector3::zeros);
        Point3D::new(xyz.x + self.error(), xyz.y + self.error(), xyz.z + self.error())
    }

    pub fn perturb_line(&mut self, l: &Line2D) -> Line2D {
        let c = l.normalized().coords;
        Line2D::new(c.x + self.error(), c.y + self.error(), c.z + self.error())
    }

    pub fn perturb_plane(&mut self, p: &Plane) -> Plane {
        let c = p.normalized().coords;
        Plane::new(
            c.x + self.error(),
            c.y + self.error(),
            c.z + self.error(),
            c.w + self.error(),
        )
    }
}
