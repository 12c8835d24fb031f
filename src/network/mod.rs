//! Network Layer
//!
//! Two-peer replication over WebSocket. The acting peer sends its full state
//! after every command; the other peer verifies and adopts it.
//! This layer is **non-deterministic** - all game logic runs through `game/`.

pub mod protocol;
pub mod session;
pub mod peer;

pub use protocol::{PeerMessage, GameStartInfo, StateUpdate, TurnMeta};
pub use session::{PeerSession, PeerRole, ConnectionStatus, SessionError};
pub use peer::{PeerConfig, PeerError, PeerLink, run_computer_peer};
