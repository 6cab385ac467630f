//! Identifier generation for tasks, sub-tasks and demo identities.
//!
//! # Invariants
//! - Generated ids are exactly `ID_LENGTH` ASCII characters.
//! - Even positions hold a digit, odd positions a lowercase letter.
//! - No collision checking is performed; uniqueness is probabilistic.

use rand::Rng;

/// Length of every generated identifier.
pub const ID_LENGTH: usize = 20;

/// Source of opaque identifiers.
///
/// Injected into the sync engine so tests can substitute deterministic ids.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Non-cryptographic random generator backed by the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::rng();
        (0..ID_LENGTH)
            .map(|position| {
                if position % 2 == 0 {
                    char::from(b'0' + rng.random_range(0..10u8))
                } else {
                    char::from(b'a' + rng.random_range(0..26u8))
                }
            })
            .collect()
    }
}
