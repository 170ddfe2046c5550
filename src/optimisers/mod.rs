//! Post-consensus refinement.
//!
//! After the consensus loop has found a champion and its inliers, the model
//! can be polished by non-linear least squares over every inlier. The
//! refiner works on the parameter vector exposed by
//! [`Estimator::to_params`](crate::core::Estimator::to_params) and minimises
//! the squared sum of
//! [`Estimator::signed_residuals`](crate::core::Estimator::signed_residuals)
//! with the `levenberg_marquardt` solver.
//!
//! ## Example: refining a line
//!
//! ```rust
//! use robust_geometry::estimators::Line2DEstimator;
//! use robust_geometry::models::{Line2D, Point2D};
//! use robust_geometry::optimisers::Refiner;
//! use robust_geometry::settings::CoordinatesType;
//!
//! let points: Vec<Point2D> = (0..10)
//!     .map(|i| Point2D::new(i as f64, 2.0 * i as f64 + if i % 2 == 0 { 0.01 } else { -0.01 }))
//!     .collect();
//! let rough = Line2D::new(2.0, -1.0, 0.1);
//!
//! let refinement = Refiner::new(50)
//!     .refine(&Line2DEstimator, &rough, &points, true, CoordinatesType::Homogeneous)
//!     .expect("refinement converges");
//! assert!(refinement.final_cost <= refinement.initial_cost);
//! assert_eq!(refinement.covariance.map(|c| c.nrows()), Some(3));
//! ```

mod refinement;

pub use refinement::{Refinement, RefinementError, RefinementProblem, Refiner};
