//! Example: Robust line fitting
//!
//! Fits a line to points contaminated with outliers, first with the
//! one-call API and then with a configured LMedS estimator reporting its
//! progress through a listener.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use robust_geometry::api::{estimate_line, Line2DRobustEstimator};
use robust_geometry::estimators::Line2DEstimator;
use robust_geometry::models::Point2D;
use robust_geometry::utils::GaussianRandomGenerator;
use robust_geometry::{RobustEstimator, RobustEstimatorListener, RobustEstimatorMethod, RobustEstimatorSettings};

struct Progress;

impl<'a> RobustEstimatorListener<'a, Line2DEstimator, &'a [Point2D]> for Progress {
    fn on_estimate_start(&mut self, _robust: &mut RobustEstimator<'a, Line2DEstimator, &'a [Point2D]>) {
        println!("  estimation started");
    }

    fn on_estimate_progress_change(
        &mut self,
        _robust: &mut RobustEstimator<'a, Line2DEstimator, &'a [Point2D]>,
        progress: f32,
    ) {
        println!("  progress: {:.0}%", 100.0 * progress);
    }

    fn on_estimate_end(&mut self, _robust: &mut RobustEstimator<'a, Line2DEstimator, &'a [Point2D]>) {
        println!("  estimation finished");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("=== Robust Line Fitting Example ===\n");

    let n_inliers = 60;
    let n_outliers = 25;
    let true_slope = 2.0;
    let true_intercept = 1.0;

    println!("True line: y = {:.2}x + {:.2}", true_slope, true_intercept);
    println!("Generating {} inliers and {} outliers\n", n_inliers, n_outliers);

    let mut rng = StdRng::seed_from_u64(7);
    let mut noise = GaussianRandomGenerator::from_seed(8, 0.0, 0.01);

    let mut points = Vec::with_capacity(n_inliers + n_outliers);
    for i in 0..n_inliers {
        let x = (i as f64) * 0.2 - 6.0;
        points.push(Point2D::new(x, true_slope * x + true_intercept + noise.next()));
    }
    for _ in 0..n_outliers {
        let x = rng.gen_range(-10.0..=10.0);
        let y = rng.gen_range(-20.0..=20.0);
        points.push(Point2D::new(x, y));
    }

    // RANSAC through the one-call API
    let mut settings = RobustEstimatorSettings::with_thresholds(0.05, 0.05);
    settings.seed = Some(1);
    let result = estimate_line(&points, Some(settings))?;
    let line = result.model.normalized().coords;

    println!("RANSAC Results:");
    println!("  Found {} inliers out of {} points", result.inliers.len(), points.len());
    println!(
        "  Estimated line: {:.4}x + {:.4}y + {:.4} = 0",
        line.x, line.y, line.z
    );
    if line.y.abs() > 1e-10 {
        println!(
            "  In slope-intercept form: y = {:.4}x + {:.4}",
            -line.x / line.y,
            -line.z / line.y
        );
    }

    // LMedS needs no inlier threshold
    println!("\nLMedS Results:");
    let mut robust = Line2DRobustEstimator::with_samples(RobustEstimatorMethod::Lmeds, &points)?
        .with_listener(Progress);
    robust.set_progress_delta(0.25)?;
    robust.set_keep_covariance(true)?;
    robust.set_seed(Some(2))?;
    let model = robust.estimate()?;
    let line = model.normalized().coords;

    if let Some(data) = robust.inliers_data() {
        println!("  Found {} inliers out of {} points", data.num_inliers, points.len());
        if let Some(threshold) = data.estimated_threshold {
            println!("  Estimated inlier threshold: {:.4}", threshold);
        }
    }
    println!(
        "  Estimated line: {:.4}x + {:.4}y + {:.4} = 0",
        line.x, line.y, line.z
    );
    if let Some(covariance) = robust.covariance() {
        println!("  Parameter covariance:{:.3}", covariance);
    }

    Ok(())
}
