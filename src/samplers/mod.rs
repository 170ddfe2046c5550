//! Sampling strategies drawing minimal samples for the consensus loop.
//!
//! Both samplers share the [`Sampler`](crate::core::Sampler) trait and the
//! seedable [`UniformRandomGenerator`](crate::utils::UniformRandomGenerator).

pub mod prosac;
pub mod uniform;

pub use prosac::{sort_by_quality, ProsacSampler};
pub use uniform::UniformRandomSampler;
