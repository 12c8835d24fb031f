//! Peer Session
//!
//! One side of a two-player online game. The host seats the first color and
//! sends the initial state; the guest seats the second color and adopts it.
//! After every local command the session hands back a full [`StateUpdate`]
//! for the transport to deliver. Incoming states replace the local one
//! wholesale once their fingerprint and invariants check out.
//!
//! Only the color whose turn it is may act, so the two peers never race:
//! last-write-wins is sufficient.

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::rng::derive_session_seed;
use crate::game::board::Color;
use crate::game::computer::ComputerAction;
use crate::game::rules::MoveResult;
use crate::game::state::GameState;
use crate::game::turn::{Game, GameConfig, RollReport, TurnError};
use crate::network::protocol::{GameStartInfo, PeerMessage, StateUpdate};

/// Colors seated in an online game.
pub const ONLINE_PLAYERS: usize = 2;

// =============================================================================
// ROLES & STATUS
// =============================================================================

/// Which end of the connection this peer is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerRole {
    /// Opened the session; owns the first color
    Host,
    /// Joined the session; owns the second color
    Guest,
}

impl PeerRole {
    /// Seat index in turn order.
    pub fn seat(self) -> usize {
        match self {
            PeerRole::Host => 0,
            PeerRole::Guest => 1,
        }
    }
}

/// Connection lifecycle as reported to the UI.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No channel; `cause` says why
    Disconnected {
        /// Reason shown to the player
        cause: String,
    },
    /// Dialing the host
    Connecting,
    /// Host listening for a guest
    Waiting,
    /// Channel open
    Connected,
}

/// Session failures.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The other color is acting
    #[error("not your turn ({expected} to act)")]
    NotYourTurn {
        /// Color that may act
        expected: Color,
    },

    /// No open channel
    #[error("not connected")]
    NotConnected,

    /// No state received or created yet
    #[error("game has not started")]
    GameNotStarted,

    /// Message does not fit this role or phase
    #[error("unexpected {0} message")]
    UnexpectedMessage(&'static str),

    /// Remote state failed verification; the local state is unchanged
    #[error("malformed state from peer: {0}")]
    MalformedSnapshot(String),

    /// Local command rejected by the rules
    #[error(transparent)]
    Turn(#[from] TurnError),
}

// =============================================================================
// SESSION
// =============================================================================

/// Game state and connection bookkeeping for one peer.
#[derive(Debug)]
pub struct PeerSession {
    role: PeerRole,
    base_seed: u64,
    status: ConnectionStatus,
    session_id: Option<Uuid>,
    game: Option<Game>,
}

impl PeerSession {
    /// New session for `role`. Dice are seeded from `base_seed` and the
    /// session id once it is known.
    pub fn new(role: PeerRole, base_seed: u64) -> Self {
        let status = match role {
            PeerRole::Host => ConnectionStatus::Waiting,
            PeerRole::Guest => ConnectionStatus::Connecting,
        };
        Self {
            role,
            base_seed,
            status,
            session_id: None,
            game: None,
        }
    }

    /// This peer's role.
    pub fn role(&self) -> PeerRole {
        self.role
    }

    /// Connection status.
    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    /// Session id, once started.
    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    /// Running game, once started.
    pub fn game(&self) -> Option<&Game> {
        self.game.as_ref()
    }

    /// Color this peer controls, once started.
    pub fn local_color(&self) -> Option<Color> {
        self.game
            .as_ref()
            .and_then(|g| g.state().turn.colors.get(self.role.seat()).copied())
    }

    /// Channel is open.
    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    /// This peer may issue a command now.
    pub fn is_local_turn(&self) -> bool {
        match (&self.game, self.local_color()) {
            (Some(game), Some(color)) => {
                self.is_connected() && !game.state().is_over() && game.current_color() == color
            }
            _ => false,
        }
    }

    /// Hex fingerprint of the current state.
    pub fn state_hash(&self) -> Option<String> {
        self.game
            .as_ref()
            .map(|g| crate::core::hash::to_hex(&g.state().compute_hash()))
    }

    fn build_game(&self, session_id: Uuid) -> Result<Game, TurnError> {
        let seed = derive_session_seed(session_id.as_bytes(), self.role.seat() as u8, self.base_seed);
        let mut game = Game::new(&GameConfig {
            player_count: ONLINE_PLAYERS,
            seed,
            ..Default::default()
        })?;
        game.set_record_history(false);
        Ok(game)
    }

    // =========================================================================
    // Transport events
    // =========================================================================

    /// The channel opened. The host answers with the initial state.
    pub fn on_connected(&mut self) -> Result<Option<PeerMessage>, SessionError> {
        self.status = ConnectionStatus::Connected;
        if self.role == PeerRole::Guest {
            return Ok(None);
        }

        let session_id = Uuid::new_v4();
        let game = self.build_game(session_id)?;
        let state = game.state().clone();
        self.session_id = Some(session_id);
        self.game = Some(game);
        info!(%session_id, "Session started");
        Ok(Some(PeerMessage::GameStart(GameStartInfo { session_id, state })))
    }

    /// The channel closed without a `disconnect` message.
    pub fn on_channel_closed(&mut self, cause: impl Into<String>) {
        if matches!(self.status, ConnectionStatus::Disconnected { .. }) {
            return;
        }
        let cause = cause.into();
        warn!(%cause, "Channel closed");
        self.status = ConnectionStatus::Disconnected { cause };
    }

    /// Leave the session. The returned message should be sent best-effort.
    pub fn leave(&mut self) -> PeerMessage {
        self.status = ConnectionStatus::Disconnected {
            cause: "you left the game".to_string(),
        };
        PeerMessage::Disconnect
    }

    /// Apply a message from the other peer.
    ///
    /// A rejected state leaves the local state untouched.
    pub fn handle_message(&mut self, msg: PeerMessage) -> Result<(), SessionError> {
        debug!(kind = msg.kind(), "Peer message");
        match msg {
            PeerMessage::GameStart(start) => self.adopt_start(start),
            PeerMessage::StateUpdate(update) => self.adopt_update(update),
            PeerMessage::Disconnect => {
                self.status = ConnectionStatus::Disconnected {
                    cause: "opponent left the game".to_string(),
                };
                Ok(())
            }
        }
    }

    fn adopt_start(&mut self, start: GameStartInfo) -> Result<(), SessionError> {
        if self.role == PeerRole::Host {
            return Err(SessionError::UnexpectedMessage("game_start"));
        }
        if start.state.turn.colors.len() != ONLINE_PLAYERS {
            return Err(SessionError::MalformedSnapshot(format!(
                "online games seat {ONLINE_PLAYERS} colors, got {}",
                start.state.turn.colors.len()
            )));
        }
        let mut game = self.build_game(start.session_id)?;
        game.replace_state(start.state, None, None)
            .map_err(|e| SessionError::MalformedSnapshot(e.to_string()))?;
        self.session_id = Some(start.session_id);
        self.game = Some(game);
        self.status = ConnectionStatus::Connected;
        info!(session_id = %start.session_id, "Joined session");
        Ok(())
    }

    fn adopt_update(&mut self, update: StateUpdate) -> Result<(), SessionError> {
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }
        let game = self.game.as_mut().ok_or(SessionError::GameNotStarted)?;
        if !update.verify_hash() {
            return Err(SessionError::MalformedSnapshot("state hash mismatch".to_string()));
        }
        if update.state.turn.colors != game.state().turn.colors {
            return Err(SessionError::MalformedSnapshot("turn order changed".to_string()));
        }
        let StateUpdate { state, turn_meta } = update;
        game.replace_state(state, Some(turn_meta.message), turn_meta.dice_result)
            .map_err(|e| SessionError::MalformedSnapshot(e.to_string()))?;
        Ok(())
    }

    // =========================================================================
    // Local commands
    // =========================================================================

    /// Run a command for the local color and package the resulting state.
    fn local<T>(
        &mut self,
        command: impl FnOnce(&mut Game) -> Result<T, TurnError>,
    ) -> Result<(T, PeerMessage), SessionError> {
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }
        let local = self.local_color().ok_or(SessionError::GameNotStarted)?;
        let game = self.game.as_mut().ok_or(SessionError::GameNotStarted)?;
        let expected = game.current_color();
        if expected != local {
            return Err(SessionError::NotYourTurn { expected });
        }

        let value = command(game)?;
        let update = StateUpdate::new(game.state().clone(), game.message(), game.last_roll());
        Ok((value, PeerMessage::StateUpdate(update)))
    }

    /// Throw the shells.
    pub fn roll(&mut self) -> Result<(RollReport, PeerMessage), SessionError> {
        self.local(|g| g.roll())
    }

    /// Toggle the selected roll.
    pub fn select_roll(&mut self, slot: usize) -> Result<(Option<usize>, PeerMessage), SessionError> {
        self.local(|g| g.select_roll(slot))
    }

    /// Merge two pool entries.
    pub fn merge_rolls(&mut self, a: usize, b: usize) -> Result<(u16, PeerMessage), SessionError> {
        self.local(|g| g.merge_rolls(a, b))
    }

    /// Move `coins` by `roll`.
    pub fn move_with_roll(&mut self, roll: u16, coins: &[u8]) -> Result<(MoveResult, PeerMessage), SessionError> {
        self.local(|g| g.move_with_roll(roll, coins))
    }

    /// Stack co-located coins.
    pub fn form_stack(&mut self, coins: &[u8]) -> Result<((), PeerMessage), SessionError> {
        self.local(|g| g.form_stack(coins))
    }

    /// Hand the turn to the opponent.
    pub fn end_turn(&mut self) -> Result<(Color, PeerMessage), SessionError> {
        self.local(|g| g.end_turn())
    }

    /// Let the evaluator act for the local color. `None` when it has
    /// nothing to do; no update needs sending then.
    pub fn computer_step(&mut self) -> Result<Option<(ComputerAction, PeerMessage)>, SessionError> {
        let (action, msg) = self.local(|g| g.computer_step())?;
        Ok(action.map(|a| (a, msg)))
    }

    /// Current state, once started.
    pub fn state(&self) -> Option<&GameState> {
        self.game.as_ref().map(|g| g.state())
    }
}

// =============================================================================
// TESTS
// =============================================================================
