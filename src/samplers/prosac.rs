//! PROSAC sampler: progressively grows the subset of high-quality samples.

use crate::core::Sampler;
use crate::utils::UniformRandomGenerator;

/// Indices of `quality_scores` ordered by descending score. Ties keep their
/// original order; NaN scores go last.
pub fn sort_by_quality(quality_scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..quality_scores.len()).collect();
    order.sort_by(|&a, &b| {
        let (qa, qb) = (quality_scores[a], quality_scores[b]);
        match (qa.is_nan(), qb.is_nan()) {
            (true, true) => std::cmp::Ordering::Equal,
            (true, false) => std::cmp::Ordering::Greater,
            (false, true) => std::cmp::Ordering::Less,
            (false, false) => qb.total_cmp(&qa),
        }
    });
    order
}

/// PROSAC sampler (Chum & Matas, 2005).
///
/// Iteration `t` samples from the `n` best samples, `n` being the smallest
/// prefix whose growth function `T'_n` reaches `t`. The sample always holds
/// the `n`-th best sample plus `m - 1` drawn from the `n - 1` better ones, so
/// every newly admitted sample is tried at least once. Past
/// `ransac_convergence_iterations` the sampler falls back to uniform draws.
pub struct ProsacSampler {
    rng: UniformRandomGenerator<usize>,
    order: Vec<usize>,
    growth_function: Vec<usize>,
    sample_size: usize,
    ransac_convergence_iterations: usize,
    kth_sample_number: usize,
    subset_size: usize,
}

impl ProsacSampler {
    /// Sampler over samples ranked by `quality_scores` (higher is better).
    pub fn new(quality_scores: &[f64], ransac_convergence_iterations: usize) -> Self {
        Self::with_rng(
            UniformRandomGenerator::new(),
            quality_scores,
            ransac_convergence_iterations,
        )
    }

    /// Construct from a fixed RNG seed (useful for tests).
    pub fn from_seed(seed: u64, quality_scores: &[f64], ransac_convergence_iterations: usize) -> Self {
        Self::with_rng(
            UniformRandomGenerator::from_seed(seed),
            quality_scores,
            ransac_convergence_iterations,
        )
    }

    pub fn from_optional_seed(
        seed: Option<u64>,
        quality_scores: &[f64],
        ransac_convergence_iterations: usize,
    ) -> Self {
        Self::with_rng(
            UniformRandomGenerator::from_optional_seed(seed),
            quality_scores,
            ransac_convergence_iterations,
        )
    }

    fn with_rng(
        rng: UniformRandomGenerator<usize>,
        quality_scores: &[f64],
        ransac_convergence_iterations: usize,
    ) -> Self {
        Self {
            rng,
            order: sort_by_quality(quality_scores),
            growth_function: Vec::new(),
            sample_size: 0,
            ransac_convergence_iterations: ransac_convergence_iterations.max(1),
            kth_sample_number: 0,
            subset_size: 0,
        }
    }

    /// Sample indices in descending quality order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Current size of the sampled prefix.
    pub fn subset_size(&self) -> usize {
        self.subset_size
    }

    fn initialize(&mut self, sample_size: usize) {
        let point_count = self.order.len();
        self.sample_size = sample_size;
        self.kth_sample_number = 0;
        self.subset_size = sample_size;
        self.growth_function = vec![0; point_count];

        // T_m: expected number of samples drawn from the first m points.
        let mut t_n = self.ransac_convergence_iterations as f64;
        for i in 0..sample_size {
            t_n *= (sample_size - i) as f64 / (point_count - i) as f64;
        }

        let mut t_n_prime: usize = 1;
        for i in 0..point_count {
            if i < sample_size {
                self.growth_function[i] = t_n_prime;
                continue;
            }
            let t_n_plus1 = (i + 1) as f64 * t_n / (i + 1 - sample_size) as f64;
            self.growth_function[i] = t_n_prime + ((t_n_plus1 - t_n).ceil().max(1.0) as usize);
            t_n = t_n_plus1;
            t_n_prime = self.growth_function[i];
        }
    }
}

impl Sampler for ProsacSampler {
    fn sample(&mut self, point_count: usize, out_indices: &mut [usize]) -> bool {
        let sample_size = out_indices.len();
        if sample_size == 0 || sample_size > point_count || point_count != self.order.len() {
            return false;
        }
        if self.sample_size != sample_size || self.growth_function.len() != point_count {
            self.initialize(sample_size);
        }

        self.kth_sample_number += 1;
        let t = self.kth_sample_number;

        if t > self.ransac_convergence_iterations {
            self.subset_size = point_count;
            self.rng.gen_unique(out_indices, 0, point_count - 1);
        } else {
            while self.subset_size < point_count && t > self.growth_function[self.subset_size - 1] {
                self.subset_size += 1;
            }
            let n = self.subset_size;
            if self.growth_function[n - 1] < t {
                self.rng.gen_unique(out_indices, 0, n - 1);
            } else {
                let (drawn, newest) = out_indices.split_at_mut(sample_size - 1);
                if !drawn.is_empty() && n >= 2 {
                    self.rng.gen_unique(drawn, 0, n - 2);
                }
                newest[0] = n - 1;
            }
        }

        for index in out_indices.iter_mut() {
            *index = self.order[*index];
        }
        true
    }
}
