//! # Attha
//!
//! Rules engine for Attha, a four-color race-and-capture game played on a
//! 5×5 grid with cowrie-shell dice.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         ATTHA                                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── rng.rs      - Seeded Xorshift128+ PRNG                  │
//! │  └── hash.rs     - State fingerprints                        │
//! │                                                              │
//! │  game/           - Rules engine (deterministic)              │
//! │  ├── board.rs    - Colors, cells, paths, safe cells          │
//! │  ├── state.rs    - Coins, turn context, invariants           │
//! │  ├── dice.rs     - Throws, roll pool, bonus forfeiture       │
//! │  ├── rules.rs    - Move legality and application             │
//! │  ├── turn.rs     - Turn state machine and commands           │
//! │  ├── computer.rs - Move scoring for computer seats            │
//! │  ├── snapshot.rs - Versioned snapshots and undo              │
//! │  └── events.rs   - Command events                            │
//! │                                                              │
//! │  network/        - Peer replication (non-deterministic)      │
//! │  ├── protocol.rs - Message types                             │
//! │  ├── session.rs  - Host/guest session state                  │
//! │  └── peer.rs     - WebSocket transport                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! The `core/` and `game/` modules perform no I/O and read no clock except
//! for the snapshot timestamp. Given the same seed and the same commands a
//! game produces the same states, so a computer-only game replays exactly.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use core::rng::DeterministicRng;
pub use game::board::{Cell, Color};
pub use game::state::GameState;
pub use game::turn::{Game, GameConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
