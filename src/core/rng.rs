//! Seeded Randomness
//!
//! Xorshift128+ seeded through SplitMix64. The same seed yields the same
//! stream on every platform, so a seeded game replays the same cowrie throws
//! and the same computer choices.

use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};

/// Deterministic PRNG (Xorshift128+).
///
/// ```
/// use attha::core::rng::DeterministicRng;
///
/// let mut a = DeterministicRng::new(12345);
/// let mut b = DeterministicRng::new(12345);
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterministicRng {
    s0: u64,
    s1: u64,
}

impl DeterministicRng {
    /// Generator for a 64-bit seed. Any seed is fine, including 0.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        let s0 = splitmix64(&mut sm);
        let s1 = splitmix64(&mut sm);
        // All-zero state would emit zeros forever
        if s0 == 0 && s1 == 0 {
            return Self { s0: 1, s1: 1 };
        }
        Self { s0, s1 }
    }

    /// Next raw 64-bit value.
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.s0;
        let y = self.s1;
        self.s0 = y;
        x ^= x << 23;
        self.s1 = x ^ y ^ (x >> 17) ^ (y >> 26);
        self.s1.wrapping_add(y)
    }

    /// Uniform-ish value in `0..bound`; 0 when `bound` is 0.
    ///
    /// Modulo bias is negligible for the small bounds used here.
    pub fn below(&mut self, bound: u32) -> u32 {
        match bound {
            0 => 0,
            b => (self.next_u64() % u64::from(b)) as u32,
        }
    }

    /// One fair binary trial: a single cowrie shell landing face up.
    pub fn flip(&mut self) -> bool {
        // Top bit; the low bits of xorshift+ are the weakest
        self.next_u64() >> 63 == 1
    }
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Dice seed for one seat of a peer session.
///
/// Each peer throws its own shells; mixing the shared session id with the
/// seat index keeps host and guest on different streams even when both
/// start from the same `base_seed`.
pub fn derive_session_seed(session_id: &[u8; 16], seat: u8, base_seed: u64) -> u64 {
    let digest = Sha256::new()
        .chain_update(b"ATTHA_DICE_SEED_V1")
        .chain_update(session_id)
        .chain_update([seat])
        .chain_update(base_seed.to_le_bytes())
        .finalize();

    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed)
}
