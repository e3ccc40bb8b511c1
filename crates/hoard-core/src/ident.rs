//! # Identifier Allocator
//!
//! Short, human-transcribable identifiers for Locations and Items.
//!
//! Ids are printed on labels stuck to boxes and shelves, so they use a
//! confusable-free alphabet (see [`ID_ALPHABET`]) and a normalization step
//! that maps common misreadings back to the canonical form.
//!
//! Locations and Items share one id namespace. The allocator does not know
//! about storage; the caller passes a collision predicate that checks both
//! collections.

use crate::primitives::{ID_ALPHABET, ID_LENGTH, MAX_ID_ATTEMPTS};
use crate::{EntityId, HoardError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generates collision-checked identifiers.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    rng: StdRng,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    /// Allocator seeded from OS entropy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Allocator with a fixed seed, for reproducible tests.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw one candidate without checking for collisions.
    pub fn candidate(&mut self) -> EntityId {
        let id: String = (0..ID_LENGTH)
            .map(|_| {
                let idx = self.rng.gen_range(0..ID_ALPHABET.len());
                ID_ALPHABET[idx] as char
            })
            .collect();
        EntityId::new(id)
    }

    /// Allocate an identifier that `is_taken` reports as free.
    ///
    /// Tries at most [`MAX_ID_ATTEMPTS`] candidates. Errors from the
    /// predicate are propagated unchanged.
    ///
    /// # Errors
    ///
    /// Returns `HoardError::IdentifierExhausted` when every candidate
    /// collided.
    pub fn allocate<F>(&mut self, mut is_taken: F) -> Result<EntityId, HoardError>
    where
        F: FnMut(&EntityId) -> Result<bool, HoardError>,
    {
        for attempt in 1..=MAX_ID_ATTEMPTS {
            let candidate = self.candidate();
            if !is_taken(&candidate)? {
                return Ok(candidate);
            }
            tracing::debug!(attempt, id = %candidate, "identifier collision, retrying");
        }

        tracing::error!(
            attempts = MAX_ID_ATTEMPTS,
            "identifier allocation exhausted"
        );
        Err(HoardError::IdentifierExhausted {
            attempts: MAX_ID_ATTEMPTS,
        })
    }
}

/// Map a typed or transcribed label onto canonical id form.
///
/// Uppercases, drops whitespace and `-` separators, and maps the letters the
/// alphabet leaves out onto their lookalikes: `O` to `0`, `I` and `L` to `1`,
/// `U` to `V`. Other characters are kept so non-canonical (imported) ids still
/// match themselves after uppercasing.
///
/// Strict Crockford decoding rejects `U`. Labels here are read back from
/// handwriting, where an open `V` is often taken for a `U`, so `U` is folded
/// onto `V` instead; no allocated id contains a `U`, so the fold never makes
/// two allocated ids collide.
#[must_use]
pub fn normalize_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| match c.to_ascii_uppercase() {
            'O' => '0',
            'I' | 'L' => '1',
            'U' => 'V',
            other => other,
        })
        .collect()
}

/// Whether `id` is in allocator form: right length, alphabet characters only.
#[must_use]
pub fn is_canonical(id: &str) -> bool {
    id.len() == ID_LENGTH && id.bytes().all(|b| ID_ALPHABET.contains(&b))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn candidates_are_canonical() {
        let mut alloc = IdAllocator::seeded(7);
        for _ in 0..1000 {
            let id = alloc.candidate();
            assert!(is_canonical(id.as_str()), "bad id {}", id);
        }
    }

    #[test]
    fn seeded_allocators_agree() {
        let mut a = IdAllocator::seeded(42);
        let mut b = IdAllocator::seeded(42);
        for _ in 0..10 {
            assert_eq!(a.candidate(), b.candidate());
        }
    }

    #[test]
    fn allocate_retries_past_collisions() {
        let mut alloc = IdAllocator::seeded(1);
        let mut calls = 0;
        let id = alloc
            .allocate(|_| {
                calls += 1;
                Ok(calls < 4)
            })
            .expect("allocate");
        assert_eq!(calls, 4);
        assert!(is_canonical(id.as_str()));
    }

    #[test]
    fn allocate_reports_exhaustion() {
        let mut alloc = IdAllocator::seeded(1);
        let result = alloc.allocate(|_| Ok(true));
        assert!(matches!(
            result,
            Err(HoardError::IdentifierExhausted { attempts }) if attempts == MAX_ID_ATTEMPTS
        ));
    }

    #[test]
    fn allocate_propagates_predicate_errors() {
        let mut alloc = IdAllocator::seeded(1);
        let result = alloc.allocate(|_| Err(HoardError::Storage("down".to_string())));
        assert!(matches!(result, Err(HoardError::Storage(_))));
    }

    #[test]
    fn allocate_respects_taken_set() {
        let mut alloc = IdAllocator::seeded(99);
        let mut taken = BTreeSet::new();
        for _ in 0..5000 {
            let id = alloc
                .allocate(|c| Ok(taken.contains(c)))
                .expect("allocate");
            assert!(taken.insert(id));
        }
    }

    #[test]
    fn normalize_maps_misreadings() {
        assert_eq!(normalize_label("abc-0o1"), "ABC001");
        assert_eq!(normalize_label(" k7 l2 i9 "), "K71219");
        assert_eq!(normalize_label("uvw"), "VVW");
    }

    #[test]
    fn normalize_is_identity_on_canonical_ids() {
        let mut alloc = IdAllocator::seeded(3);
        for _ in 0..100 {
            let id = alloc.candidate();
            assert_eq!(normalize_label(id.as_str()), id.as_str());
        }
    }
}
