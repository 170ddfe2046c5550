//! Observer notified while a [`RobustEstimator`] runs.

use crate::core::Estimator;
use crate::estimator::RobustEstimator;

/// Callbacks fired synchronously by [`RobustEstimator::estimate`].
///
/// Order: `on_estimate_start`, then any number of `on_estimate_next_iteration`
/// and `on_estimate_progress_change`, then `on_estimate_end`. The estimator is
/// locked for the whole run: accessors work, while every mutator and
/// `estimate` itself fail with [`EstimatorError::Locked`](crate::error::EstimatorError::Locked).
pub trait RobustEstimatorListener<'a, E: Estimator, D> {
    fn on_estimate_start(&mut self, _estimator: &mut RobustEstimator<'a, E, D>) {}

    fn on_estimate_end(&mut self, _estimator: &mut RobustEstimator<'a, E, D>) {}

    /// `iteration` is 1-based.
    fn on_estimate_next_iteration(&mut self, _estimator: &mut RobustEstimator<'a, E, D>, _iteration: usize) {}

    /// `progress` is in \[0, 1\].
    fn on_estimate_progress_change(&mut self, _estimator: &mut RobustEstimator<'a, E, D>, _progress: f32) {}
}

/// Listener as stored by an estimator.
pub type BoxedListener<'a, E, D> = Box<dyn RobustEstimatorListener<'a, E, D> + 'a>;
