//! Cowrie Dice and the Roll Pool
//!
//! A throw is four fair shells; the number landing face up maps to a move
//! value. Bonus values (4 and 8) allow another throw, but three of them left
//! unused at once forfeit the whole pool.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::rng::DeterministicRng;
use crate::game::state::TurnContext;

/// Shells per throw.
pub const SHELLS: usize = 4;

/// Move value indexed by the number of shells face up.
pub const ROLL_TABLE: [u16; SHELLS + 1] = [4, 1, 2, 3, 8];

/// Unused bonus values that forfeit the pool.
pub const BONUS_FORFEIT_COUNT: u8 = 3;

/// Rolls that may bring the first coin out of home.
pub const OPENING_ROLLS: [u16; 3] = [1, 4, 8];

/// Bonus values grant another throw.
#[inline]
pub fn is_bonus(value: u16) -> bool {
    value == 4 || value == 8
}

/// Move value for a throw with `heads` shells face up.
#[inline]
pub fn value_for_heads(heads: usize) -> u16 {
    ROLL_TABLE[heads.min(SHELLS)]
}

// =============================================================================
// ROLL POOL
// =============================================================================

/// Unused roll values of the acting color, in insertion order.
///
/// Any slot may be consumed; selection is by slot, not FIFO.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RollPool(Vec<u16>);

impl RollPool {
    /// Empty pool.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Values in slot order.
    #[inline]
    pub fn values(&self) -> &[u16] {
        &self.0
    }

    /// Number of unused values.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// No unused values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value in a slot.
    #[inline]
    pub fn get(&self, slot: usize) -> Option<u16> {
        self.0.get(slot).copied()
    }

    /// Append a value.
    pub fn push(&mut self, value: u16) {
        self.0.push(value);
    }

    /// First slot holding `value`.
    pub fn position_of(&self, value: u16) -> Option<usize> {
        self.0.iter().position(|v| *v == value)
    }

    /// Remove and return the value in a slot.
    pub fn take(&mut self, slot: usize) -> Option<u16> {
        (slot < self.0.len()).then(|| self.0.remove(slot))
    }

    /// Remove the first slot holding `value`.
    pub fn take_value(&mut self, value: u16) -> Option<u16> {
        let slot = self.position_of(value)?;
        self.take(slot)
    }

    /// Bonus values currently unused.
    pub fn bonus_count(&self) -> u8 {
        self.0.iter().filter(|v| is_bonus(**v)).count() as u8
    }

    /// Discard everything, returning what was there.
    pub fn drain(&mut self) -> Vec<u16> {
        std::mem::take(&mut self.0)
    }

    /// Distinct values, first occurrence order.
    pub fn distinct(&self) -> Vec<u16> {
        let mut seen = Vec::with_capacity(self.0.len());
        for v in &self.0 {
            if !seen.contains(v) {
                seen.push(*v);
            }
        }
        seen
    }
}

// =============================================================================
// DICE
// =============================================================================

/// Seeded cowrie shells.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dice {
    rng: DeterministicRng,
}

impl Dice {
    /// Dice seeded for reproducible games.
    pub fn new(seed: u64) -> Self {
        Self { rng: DeterministicRng::new(seed) }
    }

    /// Throw four shells and read the move value.
    pub fn throw(&mut self) -> u16 {
        let heads = (0..SHELLS).filter(|_| self.rng.flip()).count();
        value_for_heads(heads)
    }
}

// =============================================================================
// POOL OPERATIONS
// =============================================================================

/// Result of adding a throw to the pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RollOutcome {
    /// Value joined the pool
    Added {
        /// Thrown value
        value: u16,
    },
    /// Third unused bonus: pool discarded, another throw granted
    Forfeited {
        /// Thrown value
        value: u16,
        /// Values that were lost
        discarded: Vec<u16>,
    },
}

/// Rejected merge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    /// Slot not in the pool
    #[error("no roll in slot {0}")]
    MissingSlot(usize),

    /// Both slots are the same
    #[error("cannot merge a roll with itself")]
    SameSlot,

    /// Sum does not fit a roll value
    #[error("merged roll would overflow")]
    Overflow,
}

/// Add a thrown value, applying the triple-bonus forfeiture.
pub fn add_roll(pool: &mut RollPool, turn: &mut TurnContext, value: u16) -> RollOutcome {
    pool.push(value);
    turn.unused_bonus = pool.bonus_count();

    if turn.unused_bonus >= BONUS_FORFEIT_COUNT {
        let mut discarded = pool.drain();
        discarded.pop();
        turn.unused_bonus = 0;
        turn.can_roll = true;
        turn.selected_roll = None;
        return RollOutcome::Forfeited { value, discarded };
    }

    RollOutcome::Added { value }
}

/// Merge two distinct slots into one value appended at the end.
pub fn merge_rolls(pool: &mut RollPool, turn: &mut TurnContext, a: usize, b: usize) -> Result<u16, DiceError> {
    if a == b {
        return Err(DiceError::SameSlot);
    }
    let first = pool.get(a).ok_or(DiceError::MissingSlot(a))?;
    let second = pool.get(b).ok_or(DiceError::MissingSlot(b))?;
    let merged = first.checked_add(second).ok_or(DiceError::Overflow)?;

    // Remove the higher slot first so the lower index stays valid
    let (hi, lo) = if a > b { (a, b) } else { (b, a) };
    pool.take(hi);
    pool.take(lo);
    pool.push(merged);

    turn.unused_bonus = pool.bonus_count();
    turn.selected_roll = (pool.len() == 1).then_some(0);
    Ok(merged)
}

/// Consume a value from the pool and refresh the bonus count and selection.
pub fn consume_roll(pool: &mut RollPool, turn: &mut TurnContext, value: u16) -> Option<u16> {
    let taken = pool.take_value(value)?;
    turn.unused_bonus = pool.bonus_count();
    turn.selected_roll = (pool.len() == 1).then_some(0);
    Some(taken)
}

// =============================================================================
// TESTS
// =============================================================================
