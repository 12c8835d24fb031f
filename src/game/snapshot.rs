//! Snapshots and Undo
//!
//! A snapshot is the versioned record handed to persistence collaborators:
//! the full [`GameState`] plus the seating and the last message. Decoding
//! validates the state and rejects the whole record on any problem.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::game::board::Color;
use crate::game::state::{GameState, StateError};

/// Current snapshot format.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Undo entries kept by default.
pub const DEFAULT_UNDO_DEPTH: usize = 2;

// =============================================================================
// SEATS
// =============================================================================

/// Who controls a color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerKind {
    /// Commands come from a person
    Human,
    /// Commands come from the evaluator
    Computer,
}

/// A color and its controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    /// Seated color
    pub color: Color,
    /// Controller
    pub kind: PlayerKind,
}

impl Seat {
    /// Human seat.
    pub fn human(color: Color) -> Self {
        Self { color, kind: PlayerKind::Human }
    }

    /// Computer seat.
    pub fn computer(color: Color) -> Self {
        Self { color, kind: PlayerKind::Computer }
    }

    /// Driven by the evaluator.
    pub fn is_computer(&self) -> bool {
        self.kind == PlayerKind::Computer
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Snapshot decode failures.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Not valid JSON for this layout
    #[error("malformed snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Not valid binary for this layout
    #[error("malformed snapshot binary: {0}")]
    Binary(#[from] bincode::Error),

    /// Written by an unknown format version
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),

    /// Seats disagree with the turn order
    #[error("seats do not match the active colors")]
    SeatMismatch,

    /// State breaks a board invariant
    #[error("invalid snapshot state: {0}")]
    Invalid(#[from] StateError),
}

/// Versioned, self-contained game record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Format version
    pub version: u32,
    /// When the snapshot was taken
    pub saved_at: DateTime<Utc>,
    /// Full game state
    pub state: GameState,
    /// Controller of each active color, in turn order
    pub seats: Vec<Seat>,
    /// Unused bonus values at save time
    pub consecutive_bonus: u8,
    /// Last message shown to players
    pub message: String,
}

impl Snapshot {
    /// Capture a state now.
    pub fn capture(state: &GameState, seats: &[Seat], message: &str) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            state: state.clone(),
            seats: seats.to_vec(),
            consecutive_bonus: state.turn.unused_bonus,
            message: message.to_string(),
        }
    }

    /// Check version, seating and board invariants.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(self.version));
        }
        self.state.validate()?;
        let seated: Vec<Color> = self.seats.iter().map(|s| s.color).collect();
        if seated != self.state.turn.colors {
            return Err(SnapshotError::SeatMismatch);
        }
        Ok(())
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize and validate JSON.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Serialize to compact binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize and validate binary.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = bincode::deserialize(bytes)?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

// =============================================================================
// UNDO HISTORY
// =============================================================================

/// Bounded stack of earlier states, newest last.
#[derive(Clone, Debug)]
pub struct UndoHistory {
    entries: VecDeque<GameState>,
    depth: usize,
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_DEPTH)
    }
}

impl UndoHistory {
    /// History keeping at most `depth` states.
    pub fn new(depth: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(depth),
            depth,
        }
    }

    /// Save a state, evicting the oldest when full.
    pub fn push(&mut self, state: GameState) {
        if self.depth == 0 {
            return;
        }
        if self.entries.len() == self.depth {
            self.entries.pop_front();
        }
        self.entries.push_back(state);
    }

    /// Most recent saved state.
    pub fn pop(&mut self) -> Option<GameState> {
        self.entries.pop_back()
    }

    /// Saved states.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Nothing to undo.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// =============================================================================
// TESTS
// =============================================================================
