//! Game Logic Module
//!
//! The rules engine. Deterministic given a seed; no I/O.
//!
//! ## Module Structure
//!
//! - `board`: Colors, cells, per-color paths and safe cells
//! - `state`: Coins, player sets, turn context, invariants and hashing
//! - `dice`: Cowrie throws, the roll pool, bonus forfeiture, merging
//! - `rules`: Move legality and application, the `can_use_roll` predicate
//! - `turn`: Turn state machine and the command interface
//! - `computer`: Move scoring for computer seats
//! - `snapshot`: Versioned snapshots and the undo history
//! - `events`: Events emitted by commands

pub mod board;
pub mod state;
pub mod dice;
pub mod rules;
pub mod turn;
pub mod computer;
pub mod snapshot;
pub mod events;

// Re-export key types
pub use board::{Cell, Color, HEAVEN, HOME};
pub use state::{Coin, GameState, PlayerSet, TurnContext, TurnPhase, StateError};
pub use dice::{Dice, DiceError, RollPool};
pub use rules::{MoveError, MoveReport, MoveResult, can_use_roll};
pub use turn::{Game, GameConfig, TurnError, RollReport, CommandReply};
pub use computer::ComputerAction;
pub use snapshot::{Seat, PlayerKind, Snapshot, SnapshotError, UndoHistory};
pub use events::{GameEvent, GameEventData};
