//! # robust-geometry - Robust estimation of geometric models
//!
//! `robust_geometry` fits points, lines, planes, conics, quadrics and
//! affine, projective and metric transformations to noisy data contaminated
//! by outliers, using RANSAC, LMedS, MSAC, PROSAC or PROMedS.
//!
//! ## Quick Start
//!
//! The easiest way in is through the high-level API functions:
//!
//! ```rust
//! use robust_geometry::estimate_line;
//! use robust_geometry::models::Point2D;
//!
//! let mut points: Vec<Point2D> = (0..30).map(|i| Point2D::new(i as f64, 2.0 * i as f64)).collect();
//! points.push(Point2D::new(5.0, -40.0));
//!
//! let result = estimate_line(&points, None).unwrap();
//! println!("Found {} inliers", result.inliers.len());
//! ```
//!
//! For full control, build a [`RobustEstimator`] for a model family (the
//! [`api`] module names one alias per family), configure it and call
//! [`estimate`](RobustEstimator::estimate):
//!
//! ```rust
//! use robust_geometry::api::Point2DRobustEstimator;
//! use robust_geometry::models::{Line2D, Point2D};
//! use robust_geometry::RobustEstimatorMethod;
//!
//! let center = Point2D::new(1.0, -1.0);
//! let lines: Vec<Line2D> = (1..40)
//!     .map(|i| Line2D::through(&center, &Point2D::new(i as f64, (i * i) as f64)).unwrap())
//!     .collect();
//!
//! let mut estimator = Point2DRobustEstimator::with_samples(RobustEstimatorMethod::Lmeds, &lines).unwrap();
//! estimator.set_stop_threshold(1e-9).unwrap();
//! let point = estimator.estimate().unwrap();
//! assert!(point.distance_to(&center) < 1e-6);
//! ```
//!
//! ## Extending the Library
//!
//! The consensus engine is generic over a few traits:
//!
//! - **[`Estimator`](core::Estimator)**: a model family (minimal solver,
//!   residual, parameterisation for refinement)
//! - **[`Sampler`](core::Sampler)**: how minimal samples are drawn
//! - **[`Scoring`](core::Scoring)**: how candidate models are ranked
//! - **[`TerminationCriterion`](core::TerminationCriterion)**: when to stop
//!
//! ### Example: Custom Estimator
//!
//! ```rust
//! use nalgebra::DVector;
//! use robust_geometry::core::{ConsensusEngine, Estimator};
//! use robust_geometry::samplers::UniformRandomSampler;
//! use robust_geometry::scoring::InlierCountScoring;
//! use robust_geometry::settings::RobustEstimatorSettings;
//! use robust_geometry::termination::AdaptiveTermination;
//!
//! /// Fits the common value of a set of scalars.
//! #[derive(Clone, Default)]
//! struct ConstantEstimator;
//!
//! impl Estimator for ConstantEstimator {
//!     type Sample = f64;
//!     type Model = f64;
//!
//!     const DEFAULT_THRESHOLD: f64 = 1e-6;
//!     const DEFAULT_STOP_THRESHOLD: f64 = 1e-6;
//!
//!     fn sample_size(&self) -> usize {
//!         1
//!     }
//!
//!     fn estimate_model(&self, sample: &[f64]) -> Vec<f64> {
//!         vec![sample[0]]
//!     }
//!
//!     fn residual(&self, model: &f64, sample: &f64) -> f64 {
//!         (model - sample).abs()
//!     }
//!
//!     fn to_params(&self, model: &f64) -> DVector<f64> {
//!         DVector::from_element(1, *model)
//!     }
//!
//!     fn from_params(&self, params: &DVector<f64>) -> Option<f64> {
//!         params.get(0).copied()
//!     }
//! }
//!
//! let data = [4.0, 4.0, 4.0, 9.0, 4.0, -1.0];
//! let settings = RobustEstimatorSettings::with_thresholds(1e-6, 1e-6);
//! let mut engine = ConsensusEngine::new(
//!     UniformRandomSampler::from_seed(1),
//!     InlierCountScoring::new(settings.threshold),
//!     AdaptiveTermination::new(settings.confidence),
//!     &settings,
//! );
//! let consensus = engine.run(&ConstantEstimator, &&data[..], |_| {}).unwrap();
//! assert_eq!(consensus.model, 4.0);
//! assert_eq!(consensus.num_inliers, 4);
//! ```

pub mod api;
pub mod choices;
pub mod core;
pub mod error;
pub mod estimator;
pub mod estimators;
pub mod listener;
pub mod models;
pub mod optimisers;
pub mod samplers;
pub mod scoring;
pub mod settings;
pub mod termination;
pub mod types;
pub mod utils;

// Re-export high-level API
pub use api::{estimate_affine_transformation_2d, estimate_line, estimate_plane, EstimationResult};

// Re-export core traits for easy access
pub use core::{Estimator, Sampler, Scoring, TerminationCriterion};

pub use error::{EstimatorError, Result};
pub use estimator::{InliersData, RobustEstimator};
pub use listener::RobustEstimatorListener;
pub use settings::{CoordinatesType, RobustEstimatorMethod, RobustEstimatorSettings};
pub use types::{Correspondences, SampleData};
