//! SeededRandom - Deterministic randomness keyed by a seed string
//!
//! One generator is created per race and threaded explicitly through
//! everything that draws random numbers. Nothing here touches a global source.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const SEED_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Seeded pseudo-random source
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: ChaCha8Rng,
}

impl SeededRandom {
    /// Create a generator from a seed string.
    ///
    /// Equal strings give equal sequences on every platform.
    pub fn new(seed: &str) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(hash_seed(seed)),
        }
    }

    /// Create a non-deterministic generator
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Float in [0, 1)
    pub fn next_float(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Integer in [min, max), computed as `floor(next_float() * (max - min) + min)`.
    ///
    /// Bounds may be fractional; when `max <= min` the result is `floor(min)`.
    pub fn next_int(&mut self, min: f64, max: f64) -> i64 {
        let span = (max - min).max(0.0);
        (self.next_float() * span + min).floor() as i64
    }

    /// Float in [min, max)
    pub fn next_float_between(&mut self, min: f64, max: f64) -> f64 {
        self.next_float() * (max - min) + min
    }

    /// Fair coin
    pub fn next_bool(&mut self) -> bool {
        self.next_float() >= 0.5
    }
}

/// Generate a fresh base-36 seed string, suitable for replaying a race later.
pub fn random_seed() -> String {
    let mut rng = rand::thread_rng();
    (0..11)
        .map(|_| SEED_ALPHABET[rng.gen_range(0..SEED_ALPHABET.len())] as char)
        .collect()
}

// FNV-1a, stable across platforms and compiler versions.
fn hash_seed(seed: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    seed.bytes()
        .fold(OFFSET, |hash, byte| (hash ^ byte as u64).wrapping_mul(PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = SeededRandom::new("abc");
        let mut b = SeededRandom::new("abc");

        for _ in 0..100 {
            assert_eq!(a.next_float().to_bits(), b.next_float().to_bits());
            assert_eq!(a.next_int(6.0, 20.0), b.next_int(6.0, 20.0));
            assert_eq!(a.next_bool(), b.next_bool());
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = SeededRandom::new("abc");
        let mut b = SeededRandom::new("abd");

        let seq_a: Vec<u64> = (0..8).map(|_| a.next_float().to_bits()).collect();
        let seq_b: Vec<u64> = (0..8).map(|_| b.next_float().to_bits()).collect();
        assert_ne!(seq_a, seq_b);
    }

    #[test]
    fn test_next_int_range() {
        let mut rng = SeededRandom::new("range");
        for _ in 0..1000 {
            let v = rng.next_int(6.0, 20.0);
            assert!((6..20).contains(&v));
        }
    }

    #[test]
    fn test_next_int_degenerate_range() {
        let mut rng = SeededRandom::new("flat");
        assert_eq!(rng.next_int(6.0, 6.0), 6);
        assert_eq!(rng.next_int(6.0, 5.0), 6);
    }

    #[test]
    fn test_next_float_unit_interval() {
        let mut rng = SeededRandom::new("unit");
        for _ in 0..1000 {
            let v = rng.next_float();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_entropy_source_in_range() {
        let mut rng = SeededRandom::from_entropy();
        let v = rng.next_float_between(-25.0, 200.0);
        assert!((-25.0..200.0).contains(&v));
    }

    #[test]
    fn test_random_seed_is_base36() {
        let seed = random_seed();
        assert_eq!(seed.len(), 11);
        assert!(seed.bytes().all(|b| SEED_ALPHABET.contains(&b)));
    }
}
