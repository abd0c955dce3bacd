use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng, rng};

use lms_core::model::QuestionId;

/// Draws the question subset for a new attempt.
///
/// Sampling is a partial Fisher–Yates shuffle over the eligible ids: uniform,
/// without replacement, and the drawn order becomes the presentation order.
#[derive(Debug, Clone, Copy, Default)]
pub enum QuestionSampler {
    /// Fresh thread-local randomness on every draw.
    #[default]
    Thread,
    /// Reproducible draws from a fixed seed.
    Seeded(u64),
}

impl QuestionSampler {
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::Seeded(seed)
    }

    /// Returns at most `count` ids picked from `pool`.
    #[must_use]
    pub fn sample(&self, pool: Vec<QuestionId>, count: usize) -> Vec<QuestionId> {
        match self {
            QuestionSampler::Thread => sample_with(&mut rng(), pool, count),
            QuestionSampler::Seeded(seed) => {
                sample_with(&mut StdRng::seed_from_u64(*seed), pool, count)
            }
        }
    }
}

fn sample_with<R: Rng + ?Sized>(
    rng: &mut R,
    mut pool: Vec<QuestionId>,
    count: usize,
) -> Vec<QuestionId> {
    let amount = count.min(pool.len());
    let (picked, _) = pool.partial_shuffle(rng, amount);
    picked.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn pool(n: u64) -> Vec<QuestionId> {
        (1..=n).map(QuestionId::new).collect()
    }

    #[test]
    fn sample_is_without_replacement() {
        let picked = QuestionSampler::seeded(7).sample(pool(20), 10);
        assert_eq!(picked.len(), 10);
        let unique: HashSet<_> = picked.iter().collect();
        assert_eq!(unique.len(), 10);
        assert!(picked.iter().all(|id| (1..=20).contains(&id.value())));
    }

    #[test]
    fn oversized_request_returns_whole_pool() {
        let mut picked = QuestionSampler::seeded(1).sample(pool(3), 10);
        picked.sort();
        assert_eq!(picked, pool(3));
    }

    #[test]
    fn zero_or_empty_yields_nothing() {
        assert!(QuestionSampler::Thread.sample(pool(5), 0).is_empty());
        assert!(QuestionSampler::Thread.sample(Vec::new(), 3).is_empty());
    }

    #[test]
    fn same_seed_same_order() {
        let a = QuestionSampler::seeded(42).sample(pool(50), 5);
        let b = QuestionSampler::seeded(42).sample(pool(50), 5);
        assert_eq!(a, b);
    }

    #[test]
    fn every_question_can_be_drawn() {
        let mut seen = HashSet::new();
        for seed in 0..200 {
            seen.extend(QuestionSampler::seeded(seed).sample(pool(6), 1));
        }
        assert_eq!(seen.len(), 6);
    }
}
