//! The robust estimator facade.
//!
//! [`RobustEstimator`] owns the configuration of one estimation problem,
//! borrows its samples and quality scores, and runs consensus followed by
//! optional refinement. One generic type covers every model family and
//! every [`RobustEstimatorMethod`]; see [`crate::api`] for per-family
//! aliases.

use log::debug;
use nalgebra::DMatrix;

use crate::choices::engine_for;
use crate::core::{Consensus, ConsensusEvent, Estimator};
use crate::error::{EstimatorError, Result};
use crate::listener::{BoxedListener, RobustEstimatorListener};
use crate::optimisers::Refiner;
use crate::settings::{
    CoordinatesType, RobustEstimatorMethod, RobustEstimatorSettings, MAX_CONFIDENCE,
    MAX_PROGRESS_DELTA, MIN_CONFIDENCE, MIN_INLIER_FACTOR, MIN_ITERATIONS, MIN_PROGRESS_DELTA,
    MIN_THRESHOLD,
};
use crate::types::{Correspondences, SampleData};

/// Consensus outcome of the last successful [`RobustEstimator::estimate`].
#[derive(Debug, Clone, PartialEq)]
pub struct InliersData {
    /// Inlier membership of every sample.
    pub inliers: Vec<bool>,
    /// Residual of every sample under the consensus model, when kept.
    pub residuals: Option<Vec<f64>>,
    pub num_inliers: usize,
    /// Inlier threshold derived from the median residual (LMedS, PROMedS).
    pub estimated_threshold: Option<f64>,
}

/// Robust estimator of a model family `E` over the samples in `D`.
///
/// `D` is `&'a [T]` for single-list families and
/// [`Correspondences<'a, I, O>`] for transformation families. Samples are
/// borrowed, never copied.
pub struct RobustEstimator<'a, E: Estimator, D> {
    estimator: E,
    method: RobustEstimatorMethod,
    data: Option<D>,
    quality_scores: Option<&'a [f64]>,
    settings: RobustEstimatorSettings,
    listener: Option<BoxedListener<'a, E, D>>,
    /// The listener is moved out of `listener` while a run notifies it.
    listener_running: bool,
    locked: bool,
    inliers_data: Option<InliersData>,
    covariance: Option<DMatrix<f64>>,
}

impl<'a, E, D> RobustEstimator<'a, E, D>
where
    E: Estimator + Clone,
    D: SampleData<Item = E::Sample> + Copy,
{
    /// Estimator without samples, using the family's default thresholds.
    pub fn new(method: RobustEstimatorMethod) -> Self
    where
        E: Default,
    {
        Self::with_estimator(E::default(), method)
    }

    pub fn with_estimator(estimator: E, method: RobustEstimatorMethod) -> Self {
        Self {
            estimator,
            method,
            data: None,
            quality_scores: None,
            settings: RobustEstimatorSettings::with_thresholds(E::DEFAULT_THRESHOLD, E::DEFAULT_STOP_THRESHOLD),
            listener: None,
            listener_running: false,
            locked: false,
            inliers_data: None,
            covariance: None,
        }
    }

    /// Estimator over `data`; fails when `data` holds fewer samples than a
    /// minimal sample.
    pub fn with_data(method: RobustEstimatorMethod, data: D) -> Result<Self>
    where
        E: Default,
    {
        let mut robust = Self::new(method);
        robust.set_data(data)?;
        Ok(robust)
    }

    pub fn with_listener(mut self, listener: impl RobustEstimatorListener<'a, E, D> + 'a) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn with_quality_scores(mut self, quality_scores: &'a [f64]) -> Result<Self> {
        self.set_quality_scores(quality_scores)?;
        Ok(self)
    }

    pub fn with_settings(mut self, settings: RobustEstimatorSettings) -> Result<Self> {
        self.set_settings(settings)?;
        Ok(self)
    }

    fn ensure_unlocked(&self) -> Result<()> {
        if self.locked {
            Err(EstimatorError::Locked)
        } else {
            Ok(())
        }
    }

    /// Replace the samples.
    pub fn set_data(&mut self, data: D) -> Result<()> {
        self.ensure_unlocked()?;
        let min = self.estimator.sample_size();
        if data.len() < min {
            return Err(EstimatorError::invalid(format!(
                "at least {min} samples are required, got {}",
                data.len()
            )));
        }
        self.data = Some(data);
        Ok(())
    }

    /// Quality scores for PROSAC and PROMedS, higher meaning more reliable.
    ///
    /// Ignored (left unset) by methods that do not use them, so scores given
    /// before switching to PROSAC or PROMedS with [`set_method`](Self::set_method)
    /// have to be set again.
    pub fn set_quality_scores(&mut self, quality_scores: &'a [f64]) -> Result<()> {
        self.ensure_unlocked()?;
        if !self.method.requires_quality_scores() {
            return Ok(());
        }
        let min = self.estimator.sample_size();
        if quality_scores.len() < min {
            return Err(EstimatorError::invalid(format!(
                "at least {min} quality scores are required, got {}",
                quality_scores.len()
            )));
        }
        if let Some(data) = &self.data {
            if data.len() != quality_scores.len() {
                return Err(EstimatorError::invalid(format!(
                    "{} quality scores given for {} samples",
                    quality_scores.len(),
                    data.len()
                )));
            }
        }
        self.quality_scores = Some(quality_scores);
        Ok(())
    }

    pub fn set_listener(&mut self, listener: impl RobustEstimatorListener<'a, E, D> + 'a) -> Result<()> {
        self.ensure_unlocked()?;
        self.listener = Some(Box::new(listener));
        Ok(())
    }

    pub fn clear_listener(&mut self) -> Result<()> {
        self.ensure_unlocked()?;
        self.listener = None;
        Ok(())
    }

    /// Switching to PROSAC or PROMedS leaves the estimator not ready until
    /// quality scores are set, even if some were passed under another method.
    pub fn set_method(&mut self, method: RobustEstimatorMethod) -> Result<()> {
        self.ensure_unlocked()?;
        self.method = method;
        Ok(())
    }

    pub fn set_threshold(&mut self, threshold: f64) -> Result<()> {
        self.ensure_unlocked()?;
        validate_threshold("threshold", threshold)?;
        self.settings.threshold = threshold;
        Ok(())
    }

    pub fn set_stop_threshold(&mut self, stop_threshold: f64) -> Result<()> {
        self.ensure_unlocked()?;
        validate_threshold("stop threshold", stop_threshold)?;
        self.settings.stop_threshold = stop_threshold;
        Ok(())
    }

    pub fn set_confidence(&mut self, confidence: f64) -> Result<()> {
        self.ensure_unlocked()?;
        validate_confidence(confidence)?;
        self.settings.confidence = confidence;
        Ok(())
    }

    pub fn set_max_iterations(&mut self, max_iterations: usize) -> Result<()> {
        self.ensure_unlocked()?;
        validate_max_iterations(max_iterations)?;
        self.settings.max_iterations = max_iterations;
        Ok(())
    }

    pub fn set_progress_delta(&mut self, progress_delta: f32) -> Result<()> {
        self.ensure_unlocked()?;
        validate_progress_delta(progress_delta)?;
        self.settings.progress_delta = progress_delta;
        Ok(())
    }

    pub fn set_refine_result(&mut self, refine: bool) -> Result<()> {
        self.ensure_unlocked()?;
        self.settings.refine_result = refine;
        Ok(())
    }

    pub fn set_keep_covariance(&mut self, keep: bool) -> Result<()> {
        self.ensure_unlocked()?;
        self.settings.keep_covariance = keep;
        Ok(())
    }

    pub fn set_compute_and_keep_inliers(&mut self, keep: bool) -> Result<()> {
        self.ensure_unlocked()?;
        self.settings.compute_and_keep_inliers = keep;
        Ok(())
    }

    pub fn set_compute_and_keep_residuals(&mut self, keep: bool) -> Result<()> {
        self.ensure_unlocked()?;
        self.settings.compute_and_keep_residuals = keep;
        Ok(())
    }

    pub fn set_inlier_factor(&mut self, inlier_factor: f64) -> Result<()> {
        self.ensure_unlocked()?;
        validate_inlier_factor(inlier_factor)?;
        self.settings.inlier_factor = inlier_factor;
        Ok(())
    }

    pub fn set_covariance_coordinates(&mut self, coordinates: CoordinatesType) -> Result<()> {
        self.ensure_unlocked()?;
        self.settings.covariance_coordinates = coordinates;
        Ok(())
    }

    pub fn set_refine_max_iterations(&mut self, max_iterations: usize) -> Result<()> {
        self.ensure_unlocked()?;
        self.settings.refine_max_iterations = max_iterations;
        Ok(())
    }

    /// Fix the random source; `None` draws a fresh seed on every run.
    pub fn set_seed(&mut self, seed: Option<u64>) -> Result<()> {
        self.ensure_unlocked()?;
        self.settings.seed = seed;
        Ok(())
    }

    /// Replace every setting at once, validating each value.
    pub fn set_settings(&mut self, settings: RobustEstimatorSettings) -> Result<()> {
        self.ensure_unlocked()?;
        validate_threshold("threshold", settings.threshold)?;
        validate_threshold("stop threshold", settings.stop_threshold)?;
        validate_confidence(settings.confidence)?;
        validate_max_iterations(settings.max_iterations)?;
        validate_progress_delta(settings.progress_delta)?;
        validate_inlier_factor(settings.inlier_factor)?;
        self.settings = settings;
        Ok(())
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    pub fn method(&self) -> RobustEstimatorMethod {
        self.method
    }

    pub fn data(&self) -> Option<D> {
        self.data
    }

    pub fn quality_scores(&self) -> Option<&'a [f64]> {
        self.quality_scores
    }

    pub fn settings(&self) -> &RobustEstimatorSettings {
        &self.settings
    }

    pub fn threshold(&self) -> f64 {
        self.settings.threshold
    }

    pub fn stop_threshold(&self) -> f64 {
        self.settings.stop_threshold
    }

    pub fn confidence(&self) -> f64 {
        self.settings.confidence
    }

    pub fn max_iterations(&self) -> usize {
        self.settings.max_iterations
    }

    pub fn progress_delta(&self) -> f32 {
        self.settings.progress_delta
    }

    pub fn is_result_refined(&self) -> bool {
        self.settings.refine_result
    }

    pub fn is_covariance_kept(&self) -> bool {
        self.settings.keep_covariance
    }

    pub fn is_compute_and_keep_inliers_enabled(&self) -> bool {
        self.settings.compute_and_keep_inliers
    }

    pub fn is_compute_and_keep_residuals_enabled(&self) -> bool {
        self.settings.compute_and_keep_residuals
    }

    pub fn inlier_factor(&self) -> f64 {
        self.settings.inlier_factor
    }

    pub fn covariance_coordinates(&self) -> CoordinatesType {
        self.settings.covariance_coordinates
    }

    pub fn refine_max_iterations(&self) -> usize {
        self.settings.refine_max_iterations
    }

    pub fn seed(&self) -> Option<u64> {
        self.settings.seed
    }

    /// Number of samples in a minimal sample.
    pub fn min_required_samples(&self) -> usize {
        self.estimator.sample_size()
    }

    /// Also `true` from inside the listener's own callbacks.
    pub fn has_listener(&self) -> bool {
        self.listener.is_some() || self.listener_running
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// `true` when enough samples are set and, for PROSAC and PROMedS, one
    /// quality score per sample.
    pub fn is_ready(&self) -> bool {
        let Some(data) = &self.data else {
            return false;
        };
        if data.len() < self.estimator.sample_size() {
            return false;
        }
        !self.method.requires_quality_scores()
            || self.quality_scores.is_some_and(|q| q.len() == data.len())
    }

    pub fn inliers_data(&self) -> Option<&InliersData> {
        self.inliers_data.as_ref()
    }

    /// Covariance of the refined model, when refinement and covariance
    /// keeping were both enabled for the last run and refinement succeeded.
    pub fn covariance(&self) -> Option<&DMatrix<f64>> {
        self.covariance.as_ref()
    }

    /// Run consensus and optional refinement, returning the best model.
    pub fn estimate(&mut self) -> Result<E::Model> {
        self.ensure_unlocked()?;
        if !self.is_ready() {
            return Err(EstimatorError::NotReady);
        }
        let data = self.data.ok_or(EstimatorError::NotReady)?;

        self.locked = true;
        self.inliers_data = None;
        self.covariance = None;

        // Detached for the run so callbacks can receive the estimator itself.
        let mut listener = self.listener.take();
        self.listener_running = listener.is_some();
        if let Some(l) = listener.as_mut() {
            l.on_estimate_start(self);
        }
        let result = self.run(data, &mut listener);
        if let Some(l) = listener.as_mut() {
            l.on_estimate_end(self);
        }
        self.listener = listener;
        self.listener_running = false;
        self.locked = false;
        result
    }

    /// Like [`estimate`](Self::estimate), writing the model into `result`.
    /// `result` is left untouched on failure.
    pub fn estimate_into(&mut self, result: &mut E::Model) -> Result<()> {
        *result = self.estimate()?;
        Ok(())
    }

    fn run(&mut self, data: D, listener: &mut Option<BoxedListener<'a, E, D>>) -> Result<E::Model> {
        let estimator = self.estimator.clone();
        let mut engine = engine_for(self.method, &self.settings, self.quality_scores);

        let consensus = engine.run(&estimator, &data, |event| {
            let Some(l) = listener.as_mut() else {
                return;
            };
            match event {
                ConsensusEvent::NextIteration(iteration) => l.on_estimate_next_iteration(&mut *self, iteration),
                ConsensusEvent::ProgressChange(progress) => l.on_estimate_progress_change(&mut *self, progress),
            }
        })?;
        debug!(
            "{:?}: consensus after {} iterations with {}/{} inliers",
            self.method,
            consensus.iterations,
            consensus.num_inliers,
            data.len()
        );

        let model = if self.settings.refine_result {
            self.refine(&estimator, &data, &consensus)
        } else {
            consensus.model.clone()
        };
        self.keep_inliers(consensus);
        Ok(model)
    }

    fn refine(&mut self, estimator: &E, data: &D, consensus: &Consensus<E::Model>) -> E::Model {
        if consensus.num_inliers < estimator.sample_size() {
            debug!(
                "skipping refinement: {} inliers, {} required",
                consensus.num_inliers,
                estimator.sample_size()
            );
            return consensus.model.clone();
        }
        let inliers: Vec<E::Sample> = consensus
            .inliers
            .iter()
            .enumerate()
            .filter(|(_, &inlier)| inlier)
            .map(|(i, _)| data.get(i))
            .collect();

        let refiner = Refiner::new(self.settings.refine_max_iterations);
        match refiner.refine(
            estimator,
            &consensus.model,
            &inliers,
            self.settings.keep_covariance,
            self.settings.covariance_coordinates,
        ) {
            Some(refinement) => {
                self.covariance = refinement.covariance;
                refinement.model
            }
            None => consensus.model.clone(),
        }
    }

    fn keep_inliers(&mut self, consensus: Consensus<E::Model>) {
        let keep_residuals = self.settings.compute_and_keep_residuals;
        if !(self.settings.compute_and_keep_inliers || keep_residuals || self.settings.refine_result) {
            return;
        }
        self.inliers_data = Some(InliersData {
            inliers: consensus.inliers,
            residuals: keep_residuals.then_some(consensus.residuals),
            num_inliers: consensus.num_inliers,
            estimated_threshold: self.method.uses_stop_threshold().then_some(consensus.threshold),
        });
    }
}

impl<'a, E, T> RobustEstimator<'a, E, &'a [T]>
where
    E: Estimator<Sample = T> + Clone,
    T: Copy,
{
    /// Estimator over a single list of samples.
    pub fn with_samples(method: RobustEstimatorMethod, samples: &'a [T]) -> Result<Self>
    where
        E: Default,
    {
        Self::with_data(method, samples)
    }

    pub fn set_samples(&mut self, samples: &'a [T]) -> Result<()> {
        self.set_data(samples)
    }

    pub fn samples(&self) -> Option<&'a [T]> {
        self.data
    }
}

impl<'a, E, I, O> RobustEstimator<'a, E, Correspondences<'a, I, O>>
where
    E: Estimator<Sample = (I, O)> + Clone,
    I: Copy,
    O: Copy,
{
    /// Estimator over `inputs[i] -> outputs[i]` correspondences.
    pub fn with_correspondences(
        method: RobustEstimatorMethod,
        inputs: &'a [I],
        outputs: &'a [O],
    ) -> Result<Self>
    where
        E: Default,
    {
        Self::with_data(method, correspondences(inputs, outputs)?)
    }

    pub fn set_correspondences(&mut self, inputs: &'a [I], outputs: &'a [O]) -> Result<()> {
        self.ensure_unlocked()?;
        self.set_data(correspondences(inputs, outputs)?)
    }

    pub fn inputs(&self) -> Option<&'a [I]> {
        self.data.map(|d| d.inputs())
    }

    pub fn outputs(&self) -> Option<&'a [O]> {
        self.data.map(|d| d.outputs())
    }
}

fn correspondences<'a, I, O>(inputs: &'a [I], outputs: &'a [O]) -> Result<Correspondences<'a, I, O>> {
    Correspondences::new(inputs, outputs).ok_or_else(|| {
        EstimatorError::invalid(format!(
            "{} inputs and {} outputs do not pair up",
            inputs.len(),
            outputs.len()
        ))
    })
}

fn validate_threshold(name: &str, value: f64) -> Result<()> {
    if value > MIN_THRESHOLD {
        Ok(())
    } else {
        Err(EstimatorError::invalid(format!("{name} must be greater than {MIN_THRESHOLD}, got {value}")))
    }
}

fn validate_confidence(confidence: f64) -> Result<()> {
    if (MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&confidence) {
        Ok(())
    } else {
        Err(EstimatorError::invalid(format!("confidence must be in [0, 1], got {confidence}")))
    }
}

fn validate_max_iterations(max_iterations: usize) -> Result<()> {
    if max_iterations >= MIN_ITERATIONS {
        Ok(())
    } else {
        Err(EstimatorError::invalid("max iterations must be at least 1"))
    }
}

fn validate_progress_delta(progress_delta: f32) -> Result<()> {
    if (MIN_PROGRESS_DELTA..=MAX_PROGRESS_DELTA).contains(&progress_delta) {
        Ok(())
    } else {
        Err(EstimatorError::invalid(format!("progress delta must be in [0, 1], got {progress_delta}")))
    }
}

fn validate_inlier_factor(inlier_factor: f64) -> Result<()> {
    if inlier_factor >= MIN_INLIER_FACTOR {
        Ok(())
    } else {
        Err(EstimatorError::invalid(format!("inlier factor must be at least 1, got {inlier_factor}")))
    }
}
