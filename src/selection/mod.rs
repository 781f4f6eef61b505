//! Random record selection
//!
//! Indices are drawn as `floor(u * count)` with `u` uniform on `[0, 1)`.
//! Not cryptographically strong; any uniform pseudo-random source will do.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform samples on `[0, 1)`
pub trait RandomSource: Send + Sync {
    fn next_unit(&self) -> f64;
}

/// Thread-local RNG, used in production
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_unit(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Deterministic RNG for reproducible selections
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&self) -> f64 {
        self.rng.lock().gen::<f64>()
    }
}

/// Always returns the same sample
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(pub f64);

impl RandomSource for FixedRandom {
    fn next_unit(&self) -> f64 {
        self.0
    }
}

/// Pick an index in `[0, count)`, or `None` when there is nothing to pick.
pub fn pick_index(count: usize, source: &dyn RandomSource) -> Option<usize> {
    if count == 0 {
        return None;
    }

    let sample = source.next_unit();
    let index = (sample * count as f64).floor();

    // Out-of-range samples from a misbehaving source must still land in bounds.
    if index.is_nan() || index < 0.0 {
        return Some(0);
    }
    Some((index as usize).min(count - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_has_no_index() {
        assert_eq!(pick_index(0, &FixedRandom(0.5)), None);
    }

    #[test]
    fn test_fixed_samples_map_to_floor() {
        assert_eq!(pick_index(3, &FixedRandom(0.0)), Some(0));
        assert_eq!(pick_index(3, &FixedRandom(0.34)), Some(1));
        assert_eq!(pick_index(3, &FixedRandom(0.9999)), Some(2));
        assert_eq!(pick_index(1, &FixedRandom(0.75)), Some(0));
    }

    #[test]
    fn test_out_of_range_samples_are_clamped() {
        assert_eq!(pick_index(4, &FixedRandom(1.0)), Some(3));
        assert_eq!(pick_index(4, &FixedRandom(-0.5)), Some(0));
        assert_eq!(pick_index(4, &FixedRandom(f64::NAN)), Some(0));
    }

    #[test]
    fn test_seeded_source_is_reproducible() {
        let a = SeededRandom::new(42);
        let b = SeededRandom::new(42);
        let left: Vec<_> = (0..20).map(|_| pick_index(10, &a)).collect();
        let right: Vec<_> = (0..20).map(|_| pick_index(10, &b)).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn test_selection_is_uniform() {
        const COUNT: usize = 5;
        const TRIALS: usize = 50_000;

        let source = SeededRandom::new(7);
        let mut hits = [0usize; COUNT];
        for _ in 0..TRIALS {
            let index = pick_index(COUNT, &source).unwrap();
            hits[index] += 1;
        }

        let expected = TRIALS as f64 / COUNT as f64;
        for (index, &count) in hits.iter().enumerate() {
            let deviation = (count as f64 - expected).abs() / expected;
            assert!(
                deviation < 0.05,
                "index {index} selected {count} times, expected about {expected}"
            );
        }
    }

    #[test]
    fn test_thread_random_stays_in_range() {
        for count in 1..50 {
            let index = pick_index(count, &ThreadRandom).unwrap();
            assert!(index < count);
        }
    }
}
