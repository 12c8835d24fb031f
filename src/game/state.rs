//! Game State Definitions
//!
//! Every piece of data that is replicated between peers and restored by undo.
//! Players are kept in turn order in a `Vec` so iteration (and hashing) is
//! deterministic.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::hash::{Fingerprint, StateHash, StateHasher, compute_state_hash};
use crate::game::board::{self, Cell, Color, HEAVEN, HOME};
use crate::game::dice::RollPool;

/// Bumped whenever the hashed layout changes.
pub const STATE_SCHEMA_VERSION: u32 = 1;

/// Coins per color.
pub const COINS_PER_COLOR: usize = 4;

// =============================================================================
// COIN
// =============================================================================

/// A single coin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    /// Identity within its color (0..=3)
    pub id: u8,
    /// -1 for home, otherwise a path index up to heaven (23)
    pub position: i8,
    /// Moves as part of a same-color group
    pub stacked: bool,
    /// Cells advanced while inside the inner ring
    pub inner_moves: u8,
}

impl Coin {
    /// A fresh coin at home.
    pub fn new(id: u8) -> Self {
        Self {
            id,
            position: HOME,
            stacked: false,
            inner_moves: 0,
        }
    }

    /// Waiting at home.
    #[inline]
    pub fn is_home(&self) -> bool {
        self.position == HOME
    }

    /// Finished.
    #[inline]
    pub fn in_heaven(&self) -> bool {
        self.position == HEAVEN
    }

    /// Somewhere on the outer circle or inner ring.
    #[inline]
    pub fn is_on_board(&self) -> bool {
        board::is_on_board(self.position)
    }
}

// =============================================================================
// PLAYER SET
// =============================================================================

/// The four coins of one color plus its capture flag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSet {
    /// Owning color
    pub color: Color,
    /// Coins indexed by id
    pub coins: [Coin; COINS_PER_COLOR],
    /// Set the first time this color captures; never cleared
    pub has_captured: bool,
}

impl PlayerSet {
    /// All coins at home, no capture yet.
    pub fn new(color: Color) -> Self {
        Self {
            color,
            coins: [Coin::new(0), Coin::new(1), Coin::new(2), Coin::new(3)],
            has_captured: false,
        }
    }

    /// Coin by id, mutably.
    pub fn coin_mut(&mut self, id: u8) -> Option<&mut Coin> {
        self.coins.get_mut(id as usize)
    }

    /// Coins sitting at a path index.
    pub fn coins_at(&self, position: i8) -> impl Iterator<Item = &Coin> + '_ {
        self.coins.iter().filter(move |c| c.position == position)
    }

    /// Ids of stacked coins at a path index.
    pub fn stacked_ids_at(&self, position: i8) -> Vec<u8> {
        self.coins_at(position).filter(|c| c.stacked).map(|c| c.id).collect()
    }

    /// Any coin on the outer circle or inner ring.
    pub fn any_on_board(&self) -> bool {
        self.coins.iter().any(Coin::is_on_board)
    }

    /// All four coins reached heaven.
    pub fn all_in_heaven(&self) -> bool {
        self.coins.iter().all(Coin::in_heaven)
    }

    /// Number of coins in heaven.
    pub fn heaven_count(&self) -> usize {
        self.coins.iter().filter(|c| c.in_heaven()).count()
    }
}

// =============================================================================
// TURN CONTEXT
// =============================================================================

/// Turn controller phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// Next action must be a roll
    #[default]
    AwaitingRoll,
    /// Pool holds usable rolls waiting for a move
    HasRollsPendingSelection,
    /// Nothing left to do; the turn passes on `end_turn`
    TurnOver,
    /// Terminal
    GameOver,
}


/// Whose turn it is and what they may do next.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnContext {
    /// Active colors in turn order
    pub colors: Vec<Color>,
    /// Index of the acting color in `colors`
    pub current: usize,
    /// Another throw is permitted before a move is required
    pub can_roll: bool,
    /// Bonus values (4 or 8) currently sitting unused in the pool
    pub unused_bonus: u8,
    /// Pool slot the acting player has selected
    pub selected_roll: Option<usize>,
    /// Controller phase
    pub phase: TurnPhase,
}

impl TurnContext {
    /// First color to act, allowed to roll.
    pub fn new(colors: Vec<Color>) -> Self {
        Self {
            colors,
            current: 0,
            can_roll: true,
            unused_bonus: 0,
            selected_roll: None,
            phase: TurnPhase::AwaitingRoll,
        }
    }

    /// The acting color.
    #[inline]
    pub fn current_color(&self) -> Color {
        self.colors[self.current]
    }

    /// Color that acts after the current one.
    pub fn next_color(&self) -> Color {
        self.colors[(self.current + 1) % self.colors.len()]
    }
}

// =============================================================================
// VALIDATION ERRORS
// =============================================================================

/// A state that breaks one of the board invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// Only 2 or 4 colors can play
    #[error("unsupported player count {0}")]
    PlayerCount(usize),

    /// Turn order is not the canonical order for its size
    #[error("turn order {0:?} is not a valid seating")]
    TurnOrder(Vec<Color>),

    /// Player sets do not line up with turn order
    #[error("player sets do not match turn order")]
    PlayerMismatch,

    /// Turn pointer outside the active colors
    #[error("current index {0} out of range")]
    CurrentIndex(usize),

    /// Coin stored under the wrong slot
    #[error("{color} coin in slot {slot} has id {id}")]
    CoinId {
        /// Owner
        color: Color,
        /// Slot in the array
        slot: usize,
        /// Stored id
        id: u8,
    },

    /// Position outside -1..=23
    #[error("{color} coin {id} at invalid position {position}")]
    Position {
        /// Owner
        color: Color,
        /// Coin id
        id: u8,
        /// Offending position
        position: i8,
    },

    /// Stacked flag on a coin with no stacked partner
    #[error("{color} coin {id} is stacked alone")]
    LoneStack {
        /// Owner
        color: Color,
        /// Coin id
        id: u8,
    },

    /// Zero roll value in the pool
    #[error("roll pool holds a zero value")]
    ZeroRoll,

    /// Bonus counter disagrees with the pool
    #[error("unused bonus count {count} but pool holds {actual}")]
    BonusCount {
        /// Stored count
        count: u8,
        /// Bonus values in the pool
        actual: u8,
    },

    /// Selected slot not in the pool
    #[error("selected roll {0} is not in the pool")]
    SelectedRoll(usize),

    /// Winner without all coins in heaven, or phase mismatch
    #[error("winner {0:?} inconsistent with board or phase")]
    Winner(Option<Color>),
}

// =============================================================================
// GAME STATE
// =============================================================================

/// Complete replicated state of a game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// One set per active color, in turn order
    pub players: Vec<PlayerSet>,
    /// Unused rolls of the acting color
    pub pool: RollPool,
    /// Turn pointer and phase
    pub turn: TurnContext,
    /// Set once, when a color has all coins in heaven
    pub winner: Option<Color>,
}

impl GameState {
    /// Fresh game for 2 or 4 players.
    pub fn new(player_count: usize) -> Result<Self, StateError> {
        let colors = Color::turn_order(player_count).ok_or(StateError::PlayerCount(player_count))?;
        Ok(Self {
            players: colors.iter().map(|c| PlayerSet::new(*c)).collect(),
            pool: RollPool::new(),
            turn: TurnContext::new(colors),
            winner: None,
        })
    }

    /// The acting color.
    #[inline]
    pub fn current_color(&self) -> Color {
        self.turn.current_color()
    }

    /// Game has a winner.
    #[inline]
    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    /// Player set of a color, if it is playing.
    pub fn player(&self, color: Color) -> Option<&PlayerSet> {
        self.players.iter().find(|p| p.color == color)
    }

    /// Player set of a color, mutably.
    pub fn player_mut(&mut self, color: Color) -> Option<&mut PlayerSet> {
        self.players.iter_mut().find(|p| p.color == color)
    }

    /// Every on-board coin whose physical cell is `cell`, as (color, coin id).
    ///
    /// Home and heaven are excluded.
    pub fn coins_at_cell(&self, cell: Cell) -> Vec<(Color, u8)> {
        self.players
            .iter()
            .flat_map(|p| {
                p.coins
                    .iter()
                    .filter(move |c| c.is_on_board() && board::cell_at(p.color, c.position) == Some(cell))
                    .map(move |c| (p.color, c.id))
            })
            .collect()
    }

    /// Check every statically checkable invariant.
    pub fn validate(&self) -> Result<(), StateError> {
        let colors = &self.turn.colors;
        if Color::turn_order(colors.len()).as_ref() != Some(colors) {
            return match colors.len() {
                2 | 4 => Err(StateError::TurnOrder(colors.clone())),
                n => Err(StateError::PlayerCount(n)),
            };
        }
        if self.turn.current >= colors.len() {
            return Err(StateError::CurrentIndex(self.turn.current));
        }
        if self.players.len() != colors.len()
            || self.players.iter().zip(colors).any(|(p, c)| p.color != *c)
        {
            return Err(StateError::PlayerMismatch);
        }

        for player in &self.players {
            for (slot, coin) in player.coins.iter().enumerate() {
                if coin.id as usize != slot {
                    return Err(StateError::CoinId { color: player.color, slot, id: coin.id });
                }
                if !(HOME..=HEAVEN).contains(&coin.position) {
                    return Err(StateError::Position {
                        color: player.color,
                        id: coin.id,
                        position: coin.position,
                    });
                }
                if coin.stacked && player.stacked_ids_at(coin.position).len() < 2 {
                    return Err(StateError::LoneStack { color: player.color, id: coin.id });
                }
            }
        }

        if self.pool.values().contains(&0) {
            return Err(StateError::ZeroRoll);
        }
        let actual = self.pool.bonus_count();
        if self.turn.unused_bonus != actual {
            return Err(StateError::BonusCount { count: self.turn.unused_bonus, actual });
        }
        if let Some(slot) = self.turn.selected_roll {
            if slot >= self.pool.len() {
                return Err(StateError::SelectedRoll(slot));
            }
        }

        let over = self.turn.phase == TurnPhase::GameOver;
        match self.winner {
            Some(color) => {
                let finished = self.player(color).is_some_and(PlayerSet::all_in_heaven);
                if !finished || !over {
                    return Err(StateError::Winner(self.winner));
                }
            }
            None if over => return Err(StateError::Winner(None)),
            None => {}
        }

        Ok(())
    }

    /// Fingerprint of the full state.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(STATE_SCHEMA_VERSION, self)
    }
}

// =============================================================================
// FINGERPRINTS
// =============================================================================

impl Fingerprint for Color {
    fn fingerprint(&self, hasher: &mut StateHasher) {
        hasher.field(&(*self as u8));
    }
}

impl Fingerprint for Coin {
    fn fingerprint(&self, hasher: &mut StateHasher) {
        hasher
            .field(&self.id)
            .field(&self.position)
            .field(&self.stacked)
            .field(&self.inner_moves);
    }
}

impl Fingerprint for PlayerSet {
    fn fingerprint(&self, hasher: &mut StateHasher) {
        hasher.field(&self.color).field(&self.has_captured).field(&self.coins[..]);
    }
}

impl Fingerprint for TurnPhase {
    fn fingerprint(&self, hasher: &mut StateHasher) {
        let code: u8 = match self {
            TurnPhase::AwaitingRoll => 0,
            TurnPhase::HasRollsPendingSelection => 1,
            TurnPhase::TurnOver => 2,
            TurnPhase::GameOver => 3,
        };
        hasher.field(&code);
    }
}

impl Fingerprint for TurnContext {
    fn fingerprint(&self, hasher: &mut StateHasher) {
        hasher
            .field(&self.colors)
            .field(&self.current)
            .field(&self.can_roll)
            .field(&self.unused_bonus)
            .field(&self.selected_roll)
            .field(&self.phase);
    }
}

impl Fingerprint for RollPool {
    fn fingerprint(&self, hasher: &mut StateHasher) {
        hasher.field(self.values());
    }
}

impl Fingerprint for GameState {
    fn fingerprint(&self, hasher: &mut StateHasher) {
        hasher
            .field(&self.turn)
            .field(&self.pool)
            .field(&self.players)
            .field(&self.winner);
    }
}

// =============================================================================
// TESTS
// =============================================================================
