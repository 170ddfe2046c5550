//! Runtime wrappers selecting built-in components from a
//! [`RobustEstimatorMethod`] while the engine stays fully generic.

use crate::core::{ConsensusEngine, Sampler, Scoring, TerminationCriterion};
use crate::samplers::{sort_by_quality, ProsacSampler, UniformRandomSampler};
use crate::scoring::{InlierCountScoring, MedianScoring, Score, TruncatedScoring};
use crate::settings::{RobustEstimatorMethod, RobustEstimatorSettings};
use crate::termination::{AdaptiveTermination, MedianTermination, ProsacTermination};

/// Runtime sampler selection.
pub enum SamplerChoice {
    Uniform(UniformRandomSampler),
    Prosac(ProsacSampler),
}

impl Sampler for SamplerChoice {
    fn sample(&mut self, point_count: usize, out_indices: &mut [usize]) -> bool {
        match self {
            SamplerChoice::Uniform(s) => s.sample(point_count, out_indices),
            SamplerChoice::Prosac(s) => s.sample(point_count, out_indices),
        }
    }

    fn update(&mut self, iteration: usize) {
        match self {
            SamplerChoice::Uniform(s) => s.update(iteration),
            SamplerChoice::Prosac(s) => s.update(iteration),
        }
    }
}

/// Runtime scoring selection.
pub enum ScoringChoice {
    InlierCount(InlierCountScoring),
    Truncated(TruncatedScoring),
    Median(MedianScoring),
}

impl Scoring for ScoringChoice {
    fn score(&self, residuals: &[f64], sample_size: usize) -> Score {
        match self {
            ScoringChoice::InlierCount(s) => s.score(residuals, sample_size),
            ScoringChoice::Truncated(s) => s.score(residuals, sample_size),
            ScoringChoice::Median(s) => s.score(residuals, sample_size),
        }
    }

    fn inlier_threshold(&self, score: &Score, point_count: usize, sample_size: usize) -> f64 {
        match self {
            ScoringChoice::InlierCount(s) => s.inlier_threshold(score, point_count, sample_size),
            ScoringChoice::Truncated(s) => s.inlier_threshold(score, point_count, sample_size),
            ScoringChoice::Median(s) => s.inlier_threshold(score, point_count, sample_size),
        }
    }
}

/// Runtime termination selection.
pub enum TerminationChoice {
    Adaptive(AdaptiveTermination),
    Median(MedianTermination),
    Prosac(ProsacTermination),
}

impl TerminationCriterion for TerminationChoice {
    fn check(
        &mut self,
        best_score: &Score,
        inliers: &[bool],
        sample_size: usize,
        max_iterations: &mut usize,
    ) -> bool {
        match self {
            TerminationChoice::Adaptive(t) => {
                t.check(best_score, inliers, sample_size, max_iterations)
            }
            TerminationChoice::Median(t) => {
                t.check(best_score, inliers, sample_size, max_iterations)
            }
            TerminationChoice::Prosac(t) => {
                t.check(best_score, inliers, sample_size, max_iterations)
            }
        }
    }
}

/// Engine assembled from runtime choices.
pub type DynamicEngine = ConsensusEngine<SamplerChoice, ScoringChoice, TerminationChoice>;

/// Sampler used by `method`. PROSAC-family methods need `quality_scores`.
pub fn sampler_for(
    method: RobustEstimatorMethod,
    settings: &RobustEstimatorSettings,
    quality_scores: Option<&[f64]>,
) -> SamplerChoice {
    match (method.requires_quality_scores(), quality_scores) {
        (true, Some(scores)) => SamplerChoice::Prosac(ProsacSampler::from_optional_seed(
            settings.seed,
            scores,
            settings.max_iterations,
        )),
        _ => SamplerChoice::Uniform(UniformRandomSampler::from_optional_seed(settings.seed)),
    }
}

/// Scoring rule used by `method`.
pub fn scoring_for(method: RobustEstimatorMethod, settings: &RobustEstimatorSettings) -> ScoringChoice {
    match method {
        RobustEstimatorMethod::Ransac | RobustEstimatorMethod::Prosac => {
            ScoringChoice::InlierCount(InlierCountScoring::new(settings.threshold))
        }
        RobustEstimatorMethod::Msac => {
            ScoringChoice::Truncated(TruncatedScoring::new(settings.threshold))
        }
        RobustEstimatorMethod::Lmeds | RobustEstimatorMethod::Promeds => ScoringChoice::Median(
            MedianScoring::new(settings.stop_threshold, settings.inlier_factor),
        ),
    }
}

/// Termination criterion used by `method`.
pub fn termination_for(
    method: RobustEstimatorMethod,
    settings: &RobustEstimatorSettings,
    quality_scores: Option<&[f64]>,
) -> TerminationChoice {
    match (method, quality_scores) {
        (RobustEstimatorMethod::Lmeds | RobustEstimatorMethod::Promeds, _) => TerminationChoice::Median(
            MedianTermination::new(settings.stop_threshold, settings.confidence),
        ),
        (RobustEstimatorMethod::Prosac, Some(scores)) => TerminationChoice::Prosac(
            ProsacTermination::new(settings.confidence, sort_by_quality(scores)),
        ),
        _ => TerminationChoice::Adaptive(AdaptiveTermination::new(settings.confidence)),
    }
}

/// Engine implementing `method` with `settings`.
pub fn engine_for(
    method: RobustEstimatorMethod,
    settings: &RobustEstimatorSettings,
    quality_scores: Option<&[f64]>,
) -> DynamicEngine {
    ConsensusEngine::new(
        sampler_for(method, settings, quality_scores),
        scoring_for(method, settings),
        termination_for(method, settings, quality_scores),
        settings,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn methods_map_to_their_components() {
        let settings = RobustEstimatorSettings::default();
        let scores = [0.3, 0.2, 0.1];

        let engine = engine_for(RobustEstimatorMethod::Msac, &settings, None);
        assert!(matches!(engine.sampler, SamplerChoice::Uniform(_)));
        assert!(matches!(engine.scoring, ScoringChoice::Truncated(_)));
        assert!(matches!(engine.termination, TerminationChoice::Adaptive(_)));

        let engine = engine_for(RobustEstimatorMethod::Prosac, &settings, Some(&scores));
        assert!(matches!(engine.sampler, SamplerChoice::Prosac(_)));
        assert!(matches!(engine.scoring, ScoringChoice::InlierCount(_)));
        assert!(matches!(engine.termination, TerminationChoice::Prosac(_)));

        let engine = engine_for(RobustEstimatorMethod::Promeds, &settings, Some(&scores));
        assert!(matches!(engine.sampler, SamplerChoice::Prosac(_)));
        assert!(matches!(engine.scoring, ScoringChoice::Median(_)));
        assert!(matches!(engine.termination, TerminationChoice::Median(_)));

        let engine = engine_for(RobustEstimatorMethod::Lmeds, &settings, None);
        assert!(matches!(engine.sampler, SamplerChoice::Uniform(_)));
        assert!(matches!(engine.scoring, ScoringChoice::Median(_)));
    }
}
