//! Protocol Messages
//!
//! Wire format between two peers over one reliable, ordered channel.
//! Messages are JSON, internally tagged by `type`. Every state travels with
//! a hex SHA-256 fingerprint so a receiver can reject a damaged snapshot
//! before adopting it.

use serde::{Serialize, Deserialize};
use uuid::Uuid;

use crate::core::hash::to_hex;
use crate::game::state::GameState;

// =============================================================================
// PEER MESSAGES
// =============================================================================

/// Messages exchanged between the two peers of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerMessage {
    /// Sent once by the host after the guest connects.
    GameStart(GameStartInfo),

    /// Sent after every local mutation (roll, move, merge, stack, pass).
    StateUpdate(StateUpdate),

    /// Best-effort notice that the sender is leaving.
    Disconnect,
}

/// Initial state handed from host to guest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStartInfo {
    /// Session identifier chosen by the host
    pub session_id: Uuid,
    /// State the guest adopts verbatim
    pub state: GameState,
}

/// Full state after a local mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    /// Replacement state
    pub state: GameState,
    /// Presentation data that rides along with the state
    pub turn_meta: TurnMeta,
}

/// Presentation data accompanying a state update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnMeta {
    /// Last message shown to the sender
    pub message: String,
    /// Most recent throw
    pub dice_result: Option<u16>,
    /// Unused bonus count at send time
    pub consecutive_bonus: u8,
    /// Hex SHA-256 of `state`
    pub state_hash: String,
}

impl StateUpdate {
    /// Build an update, fingerprinting the state.
    pub fn new(state: GameState, message: impl Into<String>, dice_result: Option<u16>) -> Self {
        let turn_meta = TurnMeta {
            message: message.into(),
            dice_result,
            consecutive_bonus: state.turn.unused_bonus,
            state_hash: to_hex(&state.compute_hash()),
        };
        Self { state, turn_meta }
    }

    /// Fingerprint matches the carried state.
    pub fn verify_hash(&self) -> bool {
        to_hex(&self.state.compute_hash()) == self.turn_meta.state_hash
    }
}

impl PeerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PeerMessage::GameStart(_) => "game_start",
            PeerMessage::StateUpdate(_) => "state_update",
            PeerMessage::Disconnect => "disconnect",
        }
    }
}
