//! State Fingerprints
//!
//! SHA-256 over a fixed field order. Peers attach the fingerprint to every
//! replicated state so a damaged or truncated snapshot is rejected before it
//! is adopted, and tests compare fingerprints to check convergence.

use sha2::{Sha256, Digest};

/// 32-byte SHA-256 digest.
pub type StateHash = [u8; 32];

const STATE_DOMAIN: &[u8] = b"ATTHA_STATE_V1";

/// A value that writes itself into a [`StateHasher`].
///
/// Implementations must write every field, always in the same order.
pub trait Fingerprint {
    /// Feed this value into the hasher.
    fn fingerprint(&self, hasher: &mut StateHasher);
}

/// Streaming hasher, domain-separated and prefixed with a schema version.
pub struct StateHasher {
    digest: Sha256,
}

impl StateHasher {
    /// Start a hash for the given layout version.
    pub fn new(schema_version: u32) -> Self {
        let mut digest = Sha256::new();
        digest.update(STATE_DOMAIN);
        digest.update(schema_version.to_le_bytes());
        Self { digest }
    }

    /// Write one field.
    pub fn field<T: Fingerprint + ?Sized>(&mut self, value: &T) -> &mut Self {
        value.fingerprint(self);
        self
    }

    fn raw(&mut self, bytes: &[u8]) {
        self.digest.update(bytes);
    }

    /// Digest of everything written.
    pub fn finish(self) -> StateHash {
        self.digest.finalize().into()
    }
}

macro_rules! le_fingerprint {
    ($($ty:ty),*) => {
        $(
            impl Fingerprint for $ty {
                fn fingerprint(&self, hasher: &mut StateHasher) {
                    hasher.raw(&self.to_le_bytes());
                }
            }
        )*
    };
}

le_fingerprint!(u8, i8, u16, u32);

impl Fingerprint for bool {
    fn fingerprint(&self, hasher: &mut StateHasher) {
        hasher.raw(&[*self as u8]);
    }
}

/// Widths differ between targets; always written as 32 bits.
impl Fingerprint for usize {
    fn fingerprint(&self, hasher: &mut StateHasher) {
        (*self as u32).fingerprint(hasher);
    }
}

impl<T: Fingerprint> Fingerprint for Option<T> {
    fn fingerprint(&self, hasher: &mut StateHasher) {
        match self {
            Some(value) => {
                hasher.field(&true).field(value);
            }
            None => {
                hasher.field(&false);
            }
        }
    }
}

/// Length-prefixed.
impl<T: Fingerprint> Fingerprint for [T] {
    fn fingerprint(&self, hasher: &mut StateHasher) {
        hasher.field(&self.len());
        for item in self {
            item.fingerprint(hasher);
        }
    }
}

impl<T: Fingerprint> Fingerprint for Vec<T> {
    fn fingerprint(&self, hasher: &mut StateHasher) {
        self.as_slice().fingerprint(hasher);
    }
}

/// Fingerprint a whole value under a schema version.
pub fn compute_state_hash<T: Fingerprint + ?Sized>(schema_version: u32, value: &T) -> StateHash {
    let mut hasher = StateHasher::new(schema_version);
    hasher.field(value);
    hasher.finish()
}

/// Lowercase hex, as carried in peer messages and logs.
pub fn to_hex(hash: &StateHash) -> String {
    hex::encode(hash)
}

// =============================================================================
// TESTS
// =============================================================================
