//! Core traits and the consensus engine.
//!
//! A robust estimator is the composition of:
//! - an [`Estimator`]: one geometric model family (minimal solver, residual
//!   and parameterisation used by the refiner);
//! - a [`Sampler`] drawing minimal samples;
//! - a [`Scoring`] rule ranking candidate models from their residuals;
//! - a [`TerminationCriterion`] adapting the iteration bound.
//!
//! [`ConsensusEngine`] wires the last three around an estimator and runs the
//! shared hypothesise-and-verify loop.

use log::{debug, trace};
use nalgebra::DVector;

use crate::error::{EstimatorError, Result};
use crate::scoring::Score;
use crate::settings::{CoordinatesType, RobustEstimatorSettings};
use crate::types::SampleData;

/// A geometric model family: what is fitted, from which samples, and how a
/// sample disagrees with a model.
pub trait Estimator {
    /// Sample type (a single entity or an input/output pair).
    type Sample: Copy;
    /// Model type produced by the minimal solver.
    type Model: Clone;

    /// Default inlier threshold, in residual units.
    const DEFAULT_THRESHOLD: f64;
    /// Default stop threshold of median-based methods, in residual units.
    const DEFAULT_STOP_THRESHOLD: f64;

    /// Size of a minimal sample.
    fn sample_size(&self) -> usize;

    /// Cheap rejection of samples that cannot produce a model.
    fn is_valid_sample(&self, _sample: &[Self::Sample]) -> bool {
        true
    }

    /// Candidate models from a minimal sample. Empty when the sample is
    /// degenerate.
    fn estimate_model(&self, sample: &[Self::Sample]) -> Vec<Self::Model>;

    /// Reject candidates before scoring.
    fn is_valid_model(&self, _model: &Self::Model) -> bool {
        true
    }

    /// Non-negative discrepancy between `model` and `sample`.
    fn residual(&self, model: &Self::Model, sample: &Self::Sample) -> f64;

    /// Signed residual components minimised by the refiner. Their squared sum
    /// must equal the squared residual.
    fn signed_residuals(&self, model: &Self::Model, sample: &Self::Sample, out: &mut Vec<f64>) {
        out.push(self.residual(model, sample));
    }

    /// Parameter vector of `model`.
    fn to_params(&self, model: &Self::Model) -> DVector<f64>;

    /// Model from a parameter vector, `None` when it does not describe one.
    fn from_params(&self, params: &DVector<f64>) -> Option<Self::Model>;

    /// Bring parameters back onto their manifold after an update step
    /// (e.g. unit norm for homogeneous quantities).
    fn normalize_params(&self, _params: &mut DVector<f64>) {}

    /// Parameters in the representation the covariance is reported in.
    fn represent(&self, params: &DVector<f64>, _coordinates: CoordinatesType) -> DVector<f64> {
        params.clone()
    }
}

/// Draws minimal samples, as indices into the sample set.
pub trait Sampler {
    /// Fill `out_indices` with `out_indices.len()` distinct indices below
    /// `point_count`. Returns `false` when no sample can be drawn.
    fn sample(&mut self, point_count: usize, out_indices: &mut [usize]) -> bool;

    /// Notified once per consensus iteration.
    fn update(&mut self, _iteration: usize) {}
}

/// Ranks candidate models from the residuals of the whole sample set.
pub trait Scoring {
    /// Score of a candidate; higher is better.
    fn score(&self, residuals: &[f64], sample_size: usize) -> Score;

    /// Residual bound separating inliers from outliers for `score`.
    fn inlier_threshold(&self, score: &Score, point_count: usize, sample_size: usize) -> f64;
}

/// Decides when the consensus loop can stop.
pub trait TerminationCriterion {
    /// Called whenever the champion changes. May lower `max_iterations`.
    ///
    /// Returns `true` if the loop should stop immediately.
    fn check(
        &mut self,
        best_score: &Score,
        inliers: &[bool],
        sample_size: usize,
        max_iterations: &mut usize,
    ) -> bool;
}

/// Adaptive RANSAC bound `N = log(1 - confidence) / log(1 - w^m)`.
///
/// `None` when the bound is not finite (no inliers, or confidence of 1).
pub fn required_iterations(confidence: f64, inlier_ratio: f64, sample_size: usize) -> Option<usize> {
    if inlier_ratio >= 1.0 {
        return Some(1);
    }
    if inlier_ratio <= 0.0 || confidence >= 1.0 {
        return None;
    }
    if confidence <= 0.0 {
        return Some(1);
    }
    let p_good_sample = inlier_ratio.powi(sample_size as i32);
    let log_one_minus_p = (1.0 - p_good_sample).ln();
    if p_good_sample <= 0.0 || !log_one_minus_p.is_finite() || log_one_minus_p >= 0.0 {
        return None;
    }
    let required = ((1.0 - confidence).ln() / log_one_minus_p).ceil();
    if !required.is_finite() || required > usize::MAX as f64 {
        return None;
    }
    Some((required as usize).max(1))
}

/// Event reported by the engine while iterating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsensusEvent {
    /// An iteration finished; carries its 1-based number.
    NextIteration(usize),
    /// Progress in \[0, 1\] moved by at least the configured delta.
    ProgressChange(f32),
}

/// Champion of a consensus run.
#[derive(Debug, Clone)]
pub struct Consensus<M> {
    pub model: M,
    pub score: Score,
    /// Inlier mask over the full sample set.
    pub inliers: Vec<bool>,
    /// Residual of every sample under `model`.
    pub residuals: Vec<f64>,
    pub num_inliers: usize,
    /// Residual bound used to build `inliers`.
    pub threshold: f64,
    /// Number of iterations run.
    pub iterations: usize,
}

/// Generic hypothesise-and-verify loop.
pub struct ConsensusEngine<Sa, Sc, T>
where
    Sa: Sampler,
    Sc: Scoring,
    T: TerminationCriterion,
{
    pub sampler: Sa,
    pub scoring: Sc,
    pub termination: T,
    pub max_iterations: usize,
    pub progress_delta: f32,
}

impl<Sa, Sc, T> ConsensusEngine<Sa, Sc, T>
where
    Sa: Sampler,
    Sc: Scoring,
    T: TerminationCriterion,
{
    pub fn new(sampler: Sa, scoring: Sc, termination: T, settings: &RobustEstimatorSettings) -> Self {
        Self {
            sampler,
            scoring,
            termination,
            max_iterations: settings.max_iterations,
            progress_delta: settings.progress_delta,
        }
    }

    /// Run the loop over `data`, reporting iterations and progress to `on_event`.
    ///
    /// Fails with [`EstimatorError::RobustEstimation`] when no minimal sample
    /// produced a valid model with at least one inlier within the iteration
    /// budget.
    pub fn run<E, D, F>(&mut self, estimator: &E, data: &D, mut on_event: F) -> Result<Consensus<E::Model>>
    where
        E: Estimator,
        D: SampleData<Item = E::Sample>,
        F: FnMut(ConsensusEvent),
    {
        let point_count = data.len();
        let sample_size = estimator.sample_size();
        if point_count < sample_size || sample_size == 0 {
            return Err(EstimatorError::NotReady);
        }

        let mut indices = vec![0usize; sample_size];
        let mut sample = Vec::with_capacity(sample_size);
        let mut residuals = vec![0.0; point_count];
        let mut best: Option<Consensus<E::Model>> = None;

        let mut max_iterations = self.max_iterations.max(1);
        let mut iteration = 0usize;
        let mut last_progress = 0.0f32;

        while iteration < max_iterations {
            iteration += 1;
            let mut stop = false;

            if !self.sampler.sample(point_count, &mut indices) {
                trace!("iteration {iteration}: sampler could not draw a minimal sample");
            } else {
                data.gather(&indices, &mut sample);
                let models = if estimator.is_valid_sample(&sample) {
                    estimator.estimate_model(&sample)
                } else {
                    Vec::new()
                };
                if models.is_empty() {
                    trace!("iteration {iteration}: degenerate minimal sample {indices:?}");
                }

                for model in models {
                    if !estimator.is_valid_model(&model) {
                        continue;
                    }
                    for (i, r) in residuals.iter_mut().enumerate() {
                        let value = estimator.residual(&model, &data.get(i));
                        *r = if value.is_nan() { f64::INFINITY } else { value };
                    }
                    let score = self.scoring.score(&residuals, sample_size);
                    let improved = best.as_ref().map_or(true, |b| score > b.score);
                    if !improved {
                        continue;
                    }

                    let threshold = self.scoring.inlier_threshold(&score, point_count, sample_size);
                    let inliers: Vec<bool> = residuals.iter().map(|&r| r < threshold).collect();
                    let num_inliers = inliers.iter().filter(|&&b| b).count();
                    if num_inliers == 0 {
                        trace!("iteration {iteration}: model explains no sample, not a champion");
                        continue;
                    }

                    stop = self
                        .termination
                        .check(&score, &inliers, sample_size, &mut max_iterations);
                    debug!(
                        "iteration {iteration}: new champion (score {:.6e}, {num_inliers}/{point_count} inliers), bound {max_iterations}",
                        score.value
                    );

                    best = Some(Consensus {
                        model,
                        score,
                        inliers,
                        residuals: residuals.clone(),
                        num_inliers,
                        threshold,
                        iterations: iteration,
                    });
                    if stop {
                        break;
                    }
                }
            }

            self.sampler.update(iteration);
            on_event(ConsensusEvent::NextIteration(iteration));

            let progress = (iteration as f32 / max_iterations.max(1) as f32).min(1.0);
            if progress - last_progress >= self.progress_delta && progress > last_progress {
                last_progress = progress;
                on_event(ConsensusEvent::ProgressChange(progress));
            }

            if stop {
                debug!("stopping after {iteration} iterations: termination criterion met");
                break;
            }
        }

        match best {
            Some(mut consensus) => {
                consensus.iterations = iteration;
                Ok(consensus)
            }
            None => Err(EstimatorError::RobustEstimation(format!(
                "no valid model found after {iteration} iterations"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samplers::UniformRandomSampler;
    use crate::scoring::InlierCountScoring;
    use crate::termination::AdaptiveTermination;

    /// 1D "model family": the model is a scalar and every sample votes for it.
    #[derive(Clone, Default)]
    struct ScalarEstimator;

    impl Estimator for ScalarEstimator {
        type Sample = f64;
        type Model = f64;

        const DEFAULT_THRESHOLD: f64 = 1e-3;
        const DEFAULT_STOP_THRESHOLD: f64 = 1e-3;

        fn sample_size(&self) -> usize {
            1
        }

        fn estimate_model(&self, sample: &[f64]) -> Vec<f64> {
            if sample[0].is_finite() {
                vec![sample[0]]
            } else {
                Vec::new()
            }
        }

        fn residual(&self, model: &f64, sample: &f64) -> f64 {
            (model - sample).abs()
        }

        fn to_params(&self, model: &f64) -> DVector<f64> {
            DVector::from_element(1, *model)
        }

        fn from_params(&self, params: &DVector<f64>) -> Option<f64> {
            params.get(0).copied()
        }
    }

    fn engine(max_iterations: usize) -> ConsensusEngine<UniformRandomSampler, InlierCountScoring, AdaptiveTermination> {
        engine_with_threshold(max_iterations, 0.01)
    }

    fn engine_with_threshold(
        max_iterations: usize,
        threshold: f64,
    ) -> ConsensusEngine<UniformRandomSampler, InlierCountScoring, AdaptiveTermination> {
        let settings = RobustEstimatorSettings {
            max_iterations,
            ..RobustEstimatorSettings::default()
        };
        ConsensusEngine::new(
            UniformRandomSampler::from_seed(11),
            InlierCountScoring::new(threshold),
            AdaptiveTermination::new(0.99),
            &settings,
        )
    }

    #[test]
    fn finds_majority_value() {
        let data = [5.0, 5.0, 5.0, 5.0, 5.0, 5.0, -3.0, 12.0];
        let samples: &[f64] = &data;
        let mut events = Vec::new();
        let consensus = engine(100)
            .run(&ScalarEstimator, &samples, |e| events.push(e))
            .unwrap();

        assert_eq!(consensus.model, 5.0);
        assert_eq!(consensus.num_inliers, 6);
        assert_eq!(
            consensus.inliers,
            vec![true, true, true, true, true, true, false, false]
        );
        assert_eq!(
            events.iter().filter(|e| matches!(e, ConsensusEvent::NextIteration(_))).count(),
            consensus.iterations
        );
        assert!(consensus.iterations < 100);
    }

    #[test]
    fn fails_when_every_sample_is_degenerate() {
        let data = [f64::NAN, f64::INFINITY, f64::NAN];
        let samples: &[f64] = &data;
        let err = engine(20).run(&ScalarEstimator, &samples, |_| {}).unwrap_err();
        assert!(matches!(err, EstimatorError::RobustEstimation(_)));
    }

    #[test]
    fn models_without_inliers_never_become_champions() {
        // Every residual is exactly zero for the sampled value, so a zero
        // threshold leaves each candidate without a single inlier.
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        let samples: &[f64] = &data;
        let mut iterations = 0;
        let err = engine_with_threshold(30, 0.0)
            .run(&ScalarEstimator, &samples, |e| {
                if let ConsensusEvent::NextIteration(i) = e {
                    iterations = i
                }
            })
            .unwrap_err();
        assert!(matches!(err, EstimatorError::RobustEstimation(_)));
        // Without a champion the bound is never lowered.
        assert_eq!(iterations, 30);
    }

    #[test]
    fn progress_is_monotonic_and_bounded() {
        let data: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let samples: &[f64] = &data;
        let mut progress = Vec::new();
        engine(40)
            .run(&ScalarEstimator, &samples, |e| {
                if let ConsensusEvent::ProgressChange(p) = e {
                    progress.push(p)
                }
            })
            .unwrap();
        assert!(!progress.is_empty());
        assert!(progress.windows(2).all(|w| w[0] < w[1]));
        assert!(progress.iter().all(|&p| p > 0.0 && p <= 1.0));
    }

    #[test]
    fn adaptive_bound_matches_closed_form() {
        // log(0.01) / log(1 - 0.5^2) = 16.008...
        assert_eq!(required_iterations(0.99, 0.5, 2), Some(17));
        assert_eq!(required_iterations(0.99, 1.0, 4), Some(1));
        assert_eq!(required_iterations(0.99, 0.0, 4), None);
        assert_eq!(required_iterations(1.0, 0.5, 4), None);
    }
}
