//! Display-order shuffling
//!
//! Decides which of the two images goes on the left. A single Fisher–Yates
//! pass over the slice; for two elements that is one fair coin flip.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Unbiased permutation source
#[derive(Debug)]
pub struct Shuffler {
    rng: StdRng,
}

impl Default for Shuffler {
    fn default() -> Self {
        Self::new()
    }
}

impl Shuffler {
    /// Shuffler seeded from OS entropy
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic shuffler (tests, replays)
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Shuffle a slice in place
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.rng.gen_range(0..=i);
            items.swap(i, j);
        }
    }

    /// Return the pair in one of its two orderings, each with p = 0.5
    pub fn permute<T>(&mut self, mut pair: [T; 2]) -> [T; 2] {
        self.shuffle(&mut pair);
        pair
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::round::Label;

    #[test]
    fn test_permute_is_always_a_permutation() {
        let mut shuffler = Shuffler::seeded(7);
        for _ in 0..1_000 {
            let out = shuffler.permute([Label::Real, Label::Synthetic]);
            assert_ne!(out[0], out[1]);
            assert!(out.contains(&Label::Real));
            assert!(out.contains(&Label::Synthetic));
        }
    }

    #[test]
    fn test_permute_is_roughly_uniform() {
        let mut shuffler = Shuffler::seeded(42);
        let trials = 20_000;
        let swapped = (0..trials)
            .filter(|_| shuffler.permute([Label::Real, Label::Synthetic])[0] == Label::Synthetic)
            .count();
        let freq = swapped as f64 / f64::from(trials);
        assert!((0.47..=0.53).contains(&freq), "frequency {freq}");
    }

    #[test]
    fn test_seeded_shufflers_agree() {
        let mut a = Shuffler::seeded(99);
        let mut b = Shuffler::seeded(99);
        for _ in 0..32 {
            assert_eq!(a.permute([1, 2]), b.permute([1, 2]));
        }
    }

    #[test]
    fn test_shuffle_longer_slice_keeps_elements() {
        let mut shuffler = Shuffler::seeded(3);
        let mut items = [1, 2, 3, 4, 5, 6];
        shuffler.shuffle(&mut items);
        let mut sorted = items;
        sorted.sort_unstable();
        assert_eq!(sorted, [1, 2, 3, 4, 5, 6]);
    }
}
