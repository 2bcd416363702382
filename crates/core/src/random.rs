//! Seedable randomness shared by the generators.

use rand::{
    distributions::WeightedError,
    rngs::StdRng,
    seq::SliceRandom,
    Rng, RngCore, SeedableRng,
};

/// Source of uniform choices, shuffles and samples.
///
/// Every bomb owns its own source, forked from the router's master source, so a
/// configured seed reproduces the whole sequence of generated bombs.
#[derive(Debug, Clone)]
pub struct RandomSource {
    rng: StdRng,
}

impl RandomSource {
    /// Source seeded from operating system entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic source for a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seeded when `seed` is present, entropy otherwise.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        seed.map(Self::seeded).unwrap_or_else(Self::from_entropy)
    }

    /// Derive an independent source from this one.
    pub fn fork(&mut self) -> Self {
        Self::seeded(self.rng.next_u64())
    }

    /// Uniform index in `0..len`. `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Uniform decimal digit.
    pub fn digit(&mut self) -> u8 {
        self.rng.gen_range(0..10)
    }

    /// Bernoulli trial with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Uniformly pick one element.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.rng)
    }

    /// Shuffle in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }

    /// Uniform sample of `amount` distinct positions, in random order.
    ///
    /// Asking for more than `items.len()` returns every element.
    pub fn sample<T: Clone>(&mut self, items: &[T], amount: usize) -> Vec<T> {
        items
            .choose_multiple(&mut self.rng, amount)
            .cloned()
            .collect()
    }

    /// Weighted sample of `amount` distinct positions.
    pub fn sample_weighted<T, F>(
        &mut self,
        items: &[T],
        amount: usize,
        weight: F,
    ) -> Result<Vec<T>, WeightedError>
    where
        T: Clone,
        F: Fn(&T) -> f64,
    {
        Ok(items
            .choose_multiple_weighted(&mut self.rng, amount, weight)?
            .cloned()
            .collect())
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::from_entropy()
    }
}
