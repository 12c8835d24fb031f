//! Game Events
//!
//! Everything that happened during a command, in order, for logging and
//! UI notification. Events are never replicated; peers only exchange state.

use serde::{Serialize, Deserialize};

use crate::game::board::Color;

/// Game event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameEventData {
    /// Shells thrown
    Rolled {
        /// Thrown value
        value: u16,
    },

    /// Third unused bonus wiped the pool
    BonusForfeited {
        /// Values that were lost
        discarded: Vec<u16>,
    },

    /// Two pool slots combined
    RollsMerged {
        /// Value in the first slot
        first: u16,
        /// Value in the second slot
        second: u16,
        /// Their sum
        merged: u16,
    },

    /// Coins advanced
    CoinsMoved {
        /// Coins moved together
        coins: Vec<u8>,
        /// Starting path index
        from: i8,
        /// Landing path index
        to: i8,
        /// Roll consumed
        roll: u16,
        /// Wrapped around the inner ring
        recirculated: bool,
    },

    /// Opponent coins sent home
    Captured {
        /// Color sent home
        victim: Color,
        /// Victim's coin ids
        coins: Vec<u8>,
    },

    /// Coins arrived at the center
    ReachedHeaven {
        /// Coins that arrived
        coins: Vec<u8>,
    },

    /// Roll discarded because nothing could use it
    RollWasted {
        /// Discarded value
        roll: u16,
        /// Why nothing could use it
        reason: String,
    },

    /// Coins declared a stack
    StackFormed {
        /// Coins now stacked
        coins: Vec<u8>,
    },

    /// Stack landed on a foreign home and came apart
    StackBroken {
        /// Coins no longer stacked
        coins: Vec<u8>,
    },

    /// Turn handed to the next color
    TurnPassed {
        /// Color now acting
        next: Color,
    },

    /// State restored from undo history
    Undone {
        /// Undo states still saved
        remaining: usize,
    },

    /// Game finished
    GameWon,
}

/// An event with sequence number and acting color.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Monotonic within one `Game`
    pub seq: u32,

    /// Color acting when the event happened
    pub color: Color,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(seq: u32, color: Color, data: GameEventData) -> Self {
        Self { seq, color, data }
    }

    /// Whether this event ends the game.
    pub fn is_terminal(&self) -> bool {
        matches!(self.data, GameEventData::GameWon)
    }
}

/// Ordered event buffer with its own sequence counter.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    next_seq: u32,
    pending: Vec<GameEvent>,
}

impl EventLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event.
    pub fn push(&mut self, color: Color, data: GameEventData) {
        let event = GameEvent::new(self.next_seq, color, data);
        self.next_seq = self.next_seq.wrapping_add(1);
        self.pending.push(event);
    }

    /// Take pending events (consumes them).
    pub fn take(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Events not yet taken.
    pub fn pending(&self) -> &[GameEvent] {
        &self.pending
    }
}
