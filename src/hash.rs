//! The default hashing state.
//!
//! Tables are seeded per instance so that key distributions cannot be
//! engineered against a known hash function. The seed comes from the
//! operating system's entropy source rather than any user-space PRNG.

use core::hash::BuildHasher;

use rand::rngs::OsRng;
use rand::TryRngCore;
use siphasher::sip::SipHasher13;

/// A [`BuildHasher`] producing SipHash-1-3 hashers keyed with two random
/// words drawn once per instance.
///
/// Every map gets its own `RandomState` by default, so two maps with the
/// same keys still lay their entries out differently. Hashes are
/// deterministic for one instance, which the table relies on when it
/// rehashes entries during growth.
#[derive(Clone)]
pub struct RandomState {
    k0: u64,
    k1: u64,
}

impl RandomState {
    /// Creates a state with fresh random keys.
    ///
    /// # Panics
    ///
    /// Panics if the operating system's entropy source is unavailable.
    pub fn new() -> Self {
        let mut rng = OsRng;
        RandomState {
            k0: rng
                .try_next_u64()
                .expect("no OS entropy source for hash seeding"),
            k1: rng
                .try_next_u64()
                .expect("no OS entropy source for hash seeding"),
        }
    }
}

impl Default for RandomState {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildHasher for RandomState {
    type Hasher = SipHasher13;

    #[inline(always)]
    fn build_hasher(&self) -> Self::Hasher {
        SipHasher13::new_with_keys(self.k0, self.k1)
    }
}

impl core::fmt::Debug for RandomState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // The keys stay out of Debug output on purpose.
        f.debug_struct("RandomState").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_deterministic_per_state() {
        let state = RandomState::new();
        for key in [0u64, 1, u64::MAX, 0xdead_beef] {
            assert_eq!(state.hash_one(key), state.hash_one(key));
        }
        let copy = state.clone();
        assert_eq!(state.hash_one(42u64), copy.hash_one(42u64));
    }

    #[test]
    fn states_are_independently_seeded() {
        let a = RandomState::new();
        let b = RandomState::new();
        // Equal on all of these only if both draws collided, which the
        // entropy source makes vanishingly unlikely.
        let collisions = (0u64..8)
            .filter(|key| a.hash_one(key) == b.hash_one(key))
            .count();
        assert!(collisions < 8);
    }
}
