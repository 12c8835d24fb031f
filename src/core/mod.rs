//! Core deterministic primitives.
//!
//! Seeded randomness for the dice and the computer player, and state
//! fingerprints used to verify replicated snapshots.

pub mod rng;
pub mod hash;

// Re-export core types
pub use rng::{DeterministicRng, derive_session_seed};
pub use hash::{Fingerprint, StateHash, StateHasher, compute_state_hash, to_hex};
