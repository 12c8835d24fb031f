//! Turn Controller
//!
//! The state machine driving roll → select → move → (reroll | pass):
//!
//! ```text
//!  AwaitingRoll ──roll──▶ HasRollsPendingSelection ──move──▶ ...
//!       ▲   │                                                 │
//!       │   └─no usable roll, not a bonus─▶ TurnOver ◀────────┘
//!       └────────────── end_turn ─────────────┘
//! ```
//!
//! Any move that produces a winner goes straight to `GameOver`.
//! [`Game`] owns the state, the dice, the seats and the undo history and
//! exposes the command interface used by a UI or by the network session.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::core::rng::DeterministicRng;
use crate::game::board::Color;
use crate::game::computer::{self, ComputerAction};
use crate::game::dice::{self, Dice, DiceError, RollOutcome};
use crate::game::events::{EventLog, GameEvent, GameEventData};
use crate::game::rules::{self, MoveError, MoveResult};
use crate::game::snapshot::{Seat, Snapshot, SnapshotError, UndoHistory, DEFAULT_UNDO_DEPTH};
use crate::game::state::{GameState, StateError, TurnPhase};

/// Salt separating the computer's jitter stream from the dice stream.
const EVALUATOR_SALT: u64 = 0x5EED_A77A_C0DE_0001;

// =============================================================================
// CONFIG
// =============================================================================

/// Configuration for a local game.
#[derive(Clone, Debug)]
pub struct GameConfig {
    /// 2 or 4
    pub player_count: usize,
    /// Colors driven by the evaluator
    pub computer: Vec<Color>,
    /// Dice and jitter seed
    pub seed: u64,
    /// States kept for undo
    pub undo_depth: usize,
    /// Pause before a passed turn is handed on
    pub pass_delay: Duration,
    /// Pause before each computer action
    pub computer_delay: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            player_count: 2,
            computer: Vec::new(),
            seed: 0,
            undo_depth: DEFAULT_UNDO_DEPTH,
            pass_delay: Duration::from_millis(1500),
            computer_delay: Duration::from_millis(400),
        }
    }
}

// =============================================================================
// ERRORS & REPLIES
// =============================================================================

/// Rejected command. The game is unchanged whenever one is returned.
#[derive(Debug, Error)]
pub enum TurnError {
    /// Move engine rejection
    #[error(transparent)]
    Move(#[from] MoveError),

    /// Pool operation rejection
    #[error(transparent)]
    Dice(#[from] DiceError),

    /// Winner already decided
    #[error("the game is over")]
    GameOver,

    /// A move is required before another throw
    #[error("use your rolls before throwing again")]
    CannotRoll,

    /// Turn is being handed on
    #[error("turn is passing")]
    TurnPassing,

    /// Nothing in the pool
    #[error("roll the dice first")]
    NoRolls,

    /// Move requested without a selected roll
    #[error("select a roll first")]
    NoRollSelected,

    /// Undo history is empty
    #[error("nothing to undo")]
    NothingToUndo,

    /// `end_turn` outside `TurnOver`
    #[error("the turn is not over")]
    NotTurnOver,

    /// Bad local configuration
    #[error("invalid game config: {0}")]
    InvalidConfig(String),

    /// Replacement state breaks an invariant
    #[error("invalid state: {0}")]
    State(#[from] StateError),

    /// Snapshot could not be adopted
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Answer to `roll()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RollReport {
    /// Thrown value
    pub value: u16,
    /// Message shown to players
    pub message: String,
}

/// Answer to a UI move request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandReply {
    /// The command changed the game
    pub accepted: bool,
    /// Message shown to players
    pub message: String,
}

// =============================================================================
// GAME
// =============================================================================

/// One running game.
#[derive(Clone, Debug)]
pub struct Game {
    state: GameState,
    dice: Dice,
    evaluator_rng: DeterministicRng,
    seats: Vec<Seat>,
    history: UndoHistory,
    record_history: bool,
    message: String,
    last_roll: Option<u16>,
    events: EventLog,
}

impl Game {
    /// Start a fresh game.
    pub fn new(config: &GameConfig) -> Result<Self, TurnError> {
        let state = GameState::new(config.player_count)
            .map_err(|e| TurnError::InvalidConfig(e.to_string()))?;
        if let Some(stray) = config.computer.iter().find(|c| state.player(**c).is_none()) {
            return Err(TurnError::InvalidConfig(format!("{stray} is not seated")));
        }
        let seats = state
            .turn
            .colors
            .iter()
            .map(|c| if config.computer.contains(c) { Seat::computer(*c) } else { Seat::human(*c) })
            .collect();

        let mut game = Self::with_parts(state, seats, config.seed, config.undo_depth);
        game.message = format!("{}'s turn! Roll the dice.", game.current_color());
        info!(players = config.player_count, seed = config.seed, "New game");
        Ok(game)
    }

    /// Resume from a validated snapshot.
    pub fn from_snapshot(snapshot: Snapshot, seed: u64) -> Result<Self, TurnError> {
        snapshot.validate()?;
        let mut game = Self::with_parts(snapshot.state, snapshot.seats, seed, DEFAULT_UNDO_DEPTH);
        game.message = snapshot.message;
        Ok(game)
    }

    fn with_parts(state: GameState, seats: Vec<Seat>, seed: u64, undo_depth: usize) -> Self {
        Self {
            state,
            dice: Dice::new(seed),
            evaluator_rng: DeterministicRng::new(seed ^ EVALUATOR_SALT),
            seats,
            history: UndoHistory::new(undo_depth),
            record_history: true,
            message: String::new(),
            last_roll: None,
            events: EventLog::new(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Seats in turn order.
    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    /// Last message shown to players.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Most recent throw.
    pub fn last_roll(&self) -> Option<u16> {
        self.last_roll
    }

    /// Controller phase.
    pub fn phase(&self) -> TurnPhase {
        self.state.turn.phase
    }

    /// Acting color.
    pub fn current_color(&self) -> Color {
        self.state.current_color()
    }

    /// Winner, once decided.
    pub fn winner(&self) -> Option<Color> {
        self.state.winner
    }

    /// Acting color is evaluator-driven.
    pub fn is_computer_turn(&self) -> bool {
        let color = self.current_color();
        self.seats.iter().any(|s| s.color == color && s.is_computer())
    }

    /// Saved undo states.
    pub fn undo_available(&self) -> usize {
        self.history.len()
    }

    /// Turn undo recording on or off. Online sessions keep it off.
    pub fn set_record_history(&mut self, enabled: bool) {
        self.record_history = enabled;
        if !enabled {
            self.history.clear();
        }
    }

    /// Take events recorded since the last call.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        self.events.take()
    }

    fn ensure_live(&self) -> Result<(), TurnError> {
        if self.state.is_over() {
            return Err(TurnError::GameOver);
        }
        if self.state.turn.phase == TurnPhase::TurnOver {
            return Err(TurnError::TurnPassing);
        }
        Ok(())
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Throw the shells for the acting color.
    pub fn roll(&mut self) -> Result<RollReport, TurnError> {
        self.ensure_live()?;
        if !self.state.turn.can_roll {
            return Err(TurnError::CannotRoll);
        }

        let color = self.current_color();
        let value = self.dice.throw();
        self.last_roll = Some(value);
        self.state.turn.selected_roll = None;
        self.events.push(color, GameEventData::Rolled { value });

        let turn = &mut self.state.turn;
        match dice::add_roll(&mut self.state.pool, turn, value) {
            RollOutcome::Forfeited { discarded, .. } => {
                turn.phase = TurnPhase::AwaitingRoll;
                self.events.push(color, GameEventData::BonusForfeited { discarded });
                self.message = "Triple unused bonus! All moves lost. Roll again!".to_string();
            }
            RollOutcome::Added { .. } => {
                let bonus = dice::is_bonus(value);
                if !rules::can_use_any(&self.state, color) {
                    let turn = &mut self.state.turn;
                    turn.can_roll = bonus;
                    if bonus {
                        turn.phase = TurnPhase::AwaitingRoll;
                        self.message = format!("Rolled {value}! No valid moves. Roll again.");
                    } else {
                        turn.phase = TurnPhase::TurnOver;
                        self.message = format!("Rolled {value}! No valid moves. Turn passes.");
                    }
                } else {
                    let single = self.state.pool.len() == 1;
                    let turn = &mut self.state.turn;
                    turn.can_roll = bonus;
                    turn.phase = TurnPhase::HasRollsPendingSelection;
                    if single {
                        turn.selected_roll = Some(0);
                    }
                    self.message = if single {
                        format!("Rolled {value}! Click a coin to move.")
                    } else {
                        format!("Rolled {value}! Select a roll, then a coin.")
                    };
                }
            }
        }

        debug!(%color, value, pool = ?self.state.pool.values(), phase = ?self.state.turn.phase, "Rolled");
        Ok(RollReport { value, message: self.message.clone() })
    }

    /// Select a pool slot, or clear the selection if it is already selected.
    pub fn select_roll(&mut self, slot: usize) -> Result<Option<usize>, TurnError> {
        self.ensure_live()?;
        if slot >= self.state.pool.len() {
            return Err(DiceError::MissingSlot(slot).into());
        }
        let turn = &mut self.state.turn;
        turn.selected_roll = if turn.selected_roll == Some(slot) { None } else { Some(slot) };
        Ok(turn.selected_roll)
    }

    /// Merge two pool slots into one value.
    pub fn merge_rolls(&mut self, a: usize, b: usize) -> Result<u16, TurnError> {
        self.ensure_live()?;
        let first = self.state.pool.get(a);
        let second = self.state.pool.get(b);
        let merged = dice::merge_rolls(&mut self.state.pool, &mut self.state.turn, a, b)?;
        let color = self.current_color();
        if let (Some(first), Some(second)) = (first, second) {
            self.events.push(color, GameEventData::RollsMerged { first, second, merged });
            self.message = format!("Merged {first} + {second} = {merged}!");
        }
        self.settle_after_merge(color);
        debug!(%color, merged, pool = ?self.state.pool.values(), phase = ?self.state.turn.phase, "Rolls merged");
        Ok(merged)
    }

    /// A merge can leave a pool nothing can use; those rolls are wasted.
    fn settle_after_merge(&mut self, color: Color) {
        if rules::can_use_any(&self.state, color) {
            self.state.turn.phase = TurnPhase::HasRollsPendingSelection;
            return;
        }

        for roll in self.state.pool.drain() {
            self.events.push(color, GameEventData::RollWasted {
                roll,
                reason: "no coin can use the merged roll".to_string(),
            });
        }
        let turn = &mut self.state.turn;
        turn.unused_bonus = 0;
        turn.selected_roll = None;
        if turn.can_roll {
            turn.phase = TurnPhase::AwaitingRoll;
            self.message.push_str(" No valid moves - roll wasted. Roll again.");
        } else {
            turn.phase = TurnPhase::TurnOver;
            self.message.push_str(" No valid moves - roll wasted. Turn passes.");
        }
    }

    /// Move `coins` with the selected roll.
    pub fn attempt_move(&mut self, coins: &[u8]) -> CommandReply {
        let result = self
            .selected_value()
            .and_then(|roll| self.move_with_roll(roll, coins));
        match result {
            Ok(_) => CommandReply { accepted: true, message: self.message.clone() },
            Err(err) => {
                self.message = err.to_string();
                CommandReply { accepted: false, message: self.message.clone() }
            }
        }
    }

    fn selected_value(&self) -> Result<u16, TurnError> {
        if self.state.pool.is_empty() {
            return Err(TurnError::NoRolls);
        }
        self.state
            .turn
            .selected_roll
            .and_then(|slot| self.state.pool.get(slot))
            .ok_or(TurnError::NoRollSelected)
    }

    /// Move `coins` of the acting color with a roll value from the pool.
    pub fn move_with_roll(&mut self, roll: u16, coins: &[u8]) -> Result<MoveResult, TurnError> {
        self.ensure_live()?;
        if self.state.pool.is_empty() {
            return Err(TurnError::NoRolls);
        }

        let color = self.current_color();
        let before = (self.record_history && !self.is_computer_turn()).then(|| self.state.clone());

        let result = rules::attempt_move(&mut self.state, color, coins, roll)?;
        if let Some(saved) = before {
            self.history.push(saved);
        }

        match &result {
            MoveResult::Moved(report) => {
                self.events.push(color, GameEventData::CoinsMoved {
                    coins: report.coins.clone(),
                    from: report.landing.from,
                    to: report.landing.to,
                    roll,
                    recirculated: report.landing.recirculated,
                });
                if report.stack_broken {
                    self.events.push(color, GameEventData::StackBroken { coins: report.coins.clone() });
                }
                // Captures only ever hit a single color
                if let Some((victim, _)) = report.captured.first() {
                    let coins = report.captured.iter().map(|(_, id)| *id).collect();
                    self.events.push(color, GameEventData::Captured { victim: *victim, coins });
                }
                if report.reached_heaven {
                    self.events.push(color, GameEventData::ReachedHeaven { coins: report.coins.clone() });
                }
                self.message = report.message();
            }
            MoveResult::Wasted { roll, reason } => {
                self.events.push(color, GameEventData::RollWasted { roll: *roll, reason: reason.to_string() });
                self.message = format!("{reason}! No valid moves - roll wasted.");
            }
        }

        self.settle_after_move(color);
        debug!(%color, ?coins, roll, phase = ?self.state.turn.phase, "Move applied");
        Ok(result)
    }

    fn settle_after_move(&mut self, color: Color) {
        if let Some(winner) = self.state.winner {
            let turn = &mut self.state.turn;
            turn.phase = TurnPhase::GameOver;
            turn.can_roll = false;
            turn.selected_roll = None;
            self.events.push(winner, GameEventData::GameWon);
            info!(%winner, "Game won");
            return;
        }

        let usable = !self.state.pool.is_empty() && rules::can_use_any(&self.state, color);
        let turn = &mut self.state.turn;
        turn.phase = if usable {
            TurnPhase::HasRollsPendingSelection
        } else if turn.can_roll {
            TurnPhase::AwaitingRoll
        } else {
            TurnPhase::TurnOver
        };

        match turn.phase {
            TurnPhase::HasRollsPendingSelection => {
                let left = self.state.pool.len();
                self.message.push_str(&format!(" {left} roll(s) left."));
                if turn.can_roll {
                    self.message.push_str(" Can roll again.");
                }
            }
            TurnPhase::TurnOver => self.message.push_str(" Turn passes."),
            _ => {}
        }
    }

    /// Declare co-located coins of the acting color a stack.
    pub fn form_stack(&mut self, coins: &[u8]) -> Result<(), TurnError> {
        if self.state.is_over() {
            return Err(TurnError::GameOver);
        }
        let color = self.current_color();
        rules::form_stack(&mut self.state, color, coins)?;
        self.events.push(color, GameEventData::StackFormed { coins: coins.to_vec() });
        self.message = format!("Formed a stack of {} coins!", coins.len());
        Ok(())
    }

    /// Restore the state saved before the latest human move.
    ///
    /// A decided game stays decided.
    pub fn undo(&mut self) -> Result<usize, TurnError> {
        if self.state.is_over() {
            return Err(TurnError::GameOver);
        }
        let previous = self.history.pop().ok_or(TurnError::NothingToUndo)?;
        self.state = previous;
        let remaining = self.history.len();
        self.events.push(self.current_color(), GameEventData::Undone { remaining });
        self.message = format!("Undone! ({remaining} undo left)");
        Ok(remaining)
    }

    /// Hand a finished turn to the next color.
    pub fn end_turn(&mut self) -> Result<Color, TurnError> {
        if self.state.is_over() {
            return Err(TurnError::GameOver);
        }
        if self.state.turn.phase != TurnPhase::TurnOver {
            return Err(TurnError::NotTurnOver);
        }

        let next = self.state.turn.next_color();
        let turn = &mut self.state.turn;
        turn.current = (turn.current + 1) % turn.colors.len();
        turn.can_roll = true;
        turn.unused_bonus = 0;
        turn.selected_roll = None;
        turn.phase = TurnPhase::AwaitingRoll;
        self.state.pool.drain();
        self.last_roll = None;

        self.events.push(next, GameEventData::TurnPassed { next });
        self.message = format!("{next}'s turn! Roll the dice.");
        debug!(%next, "Turn passed");
        Ok(next)
    }

    /// Let the evaluator take one action for the acting color.
    pub fn computer_step(&mut self) -> Result<Option<ComputerAction>, TurnError> {
        let Some(action) = computer::choose_action(&self.state, &mut self.evaluator_rng) else {
            return Ok(None);
        };
        match &action {
            ComputerAction::Roll => {
                self.roll()?;
            }
            ComputerAction::Move { roll, coins } => {
                self.move_with_roll(*roll, coins)?;
            }
            ComputerAction::EndTurn => {
                self.end_turn()?;
            }
        }
        Ok(Some(action))
    }

    // =========================================================================
    // Whole-state replacement
    // =========================================================================

    /// Overwrite the state wholesale after validating it.
    pub fn replace_state(&mut self, state: GameState, message: Option<String>, last_roll: Option<u16>) -> Result<(), TurnError> {
        state.validate()?;
        self.state = state;
        self.history.clear();
        if let Some(message) = message {
            self.message = message;
        }
        self.last_roll = last_roll;
        Ok(())
    }

    /// Capture a snapshot now.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.state, &self.seats, &self.message)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::HEAVEN;

    fn two_player(seed: u64) -> Game {
        Game::new(&GameConfig { seed, ..Default::default() }).unwrap()
    }

    /// Put the game into a known mid-turn state.
    fn with_pool(game: &mut Game, values: &[u16], can_roll: bool) {
        let mut state = game.state().clone();
        state.pool = Default::default();
        for v in values {
            state.pool.push(*v);
        }
        state.turn.unused_bonus = state.pool.bonus_count();
        state.turn.can_roll = can_roll;
        state.turn.selected_roll = None;
        state.turn.phase = TurnPhase::HasRollsPendingSelection;
        game.replace_state(state, None, None).unwrap();
    }

    fn edit(game: &mut Game, f: impl FnOnce(&mut GameState)) {
        let mut state = game.state().clone();
        f(&mut state);
        game.replace_state(state, None, None).unwrap();
    }

    #[test]
    fn test_new_game_config() {
        let game = Game::new(&GameConfig {
            player_count: 4,
            computer: vec![Color::Green, Color::Red],
            ..Default::default()
        })
        .unwrap();
        assert_eq!(game.seats().len(), 4);
        assert!(game.seats()[1].is_computer() && game.seats()[3].is_computer());
        assert!(!game.is_computer_turn());
        assert_eq!(game.phase(), TurnPhase::AwaitingRoll);

        let bad = Game::new(&GameConfig { player_count: 3, ..Default::default() });
        assert!(matches!(bad, Err(TurnError::InvalidConfig(_))));
        let stray = Game::new(&GameConfig { computer: vec![Color::Red], ..Default::default() });
        assert!(matches!(stray, Err(TurnError::InvalidConfig(_))));
    }

    #[test]
    fn test_roll_transitions() {
        // Whatever the throw, the phase must agree with usability
        for seed in 0..200 {
            let mut game = two_player(seed);
            let report = game.roll().unwrap();
            let bonus = dice::is_bonus(report.value);
            let usable = [1, 4, 8].contains(&report.value);
            if usable {
                assert_eq!(game.phase(), TurnPhase::HasRollsPendingSelection);
                assert_eq!(game.state().turn.selected_roll, Some(0));
            } else {
                assert_eq!(game.phase(), TurnPhase::TurnOver);
            }
            assert_eq!(game.state().turn.can_roll, bonus);
        }
    }

    #[test]
    fn test_cannot_roll_twice_without_bonus() {
        let mut game = two_player(1);
        with_pool(&mut game, &[2], false);
        assert!(matches!(game.roll(), Err(TurnError::CannotRoll)));
    }

    #[test]
    fn test_bonus_without_moves_rerolls() {
        let mut game = two_player(1);
        // Coin stuck on 14 without a capture, nothing else movable
        edit(&mut game, |s| {
            let yellow = s.player_mut(Color::Yellow).unwrap();
            yellow.coins[0].position = 14;
            for c in &mut yellow.coins[1..] {
                c.position = HEAVEN;
            }
        });
        // Every throw would cross into the locked inner circle
        let report = game.roll().unwrap();
        if dice::is_bonus(report.value) {
            assert_eq!(game.phase(), TurnPhase::AwaitingRoll);
            assert!(game.state().turn.can_roll);
            assert_eq!(game.state().pool.values(), &[report.value]);
        } else {
            assert_eq!(game.phase(), TurnPhase::TurnOver);
        }
    }

    #[test]
    fn test_move_then_pass() {
        let mut game = two_player(1);
        with_pool(&mut game, &[4], false);
        game.select_roll(0).unwrap();

        let reply = game.attempt_move(&[0]);
        assert!(reply.accepted, "{}", reply.message);
        assert_eq!(game.phase(), TurnPhase::TurnOver);
        assert!(game.message().ends_with("Turn passes."));

        assert!(matches!(game.roll(), Err(TurnError::TurnPassing)));
        assert_eq!(game.end_turn().unwrap(), Color::Blue);
        assert_eq!(game.phase(), TurnPhase::AwaitingRoll);
        assert!(game.state().turn.can_roll);
        assert!(game.state().pool.is_empty());
    }

    #[test]
    fn test_empty_pool_with_pending_bonus_awaits_roll() {
        let mut game = two_player(1);
        with_pool(&mut game, &[8], true);
        game.select_roll(0).unwrap();
        assert!(game.attempt_move(&[0]).accepted);
        assert_eq!(game.phase(), TurnPhase::AwaitingRoll);
    }

    #[test]
    fn test_capture_grants_roll() {
        let mut game = two_player(1);
        edit(&mut game, |s| {
            s.player_mut(Color::Yellow).unwrap().coins[0].position = 6;
            s.player_mut(Color::Blue).unwrap().coins[0].position = 0;
        });
        with_pool(&mut game, &[2], false);

        let result = game.move_with_roll(2, &[0]).unwrap();
        assert!(matches!(result, MoveResult::Moved(ref r) if r.captured.len() == 1));
        assert_eq!(game.phase(), TurnPhase::AwaitingRoll);
        assert!(game.state().turn.can_roll);
        let events = game.take_events();
        assert!(events.iter().any(|e| matches!(e.data, GameEventData::Captured { victim: Color::Blue, .. })));
    }

    #[test]
    fn test_unusable_leftover_passes() {
        let mut game = two_player(1);
        with_pool(&mut game, &[4, 3], false);
        // After the 4 brings a coin out, 3 is usable
        game.move_with_roll(4, &[0]).unwrap();
        assert_eq!(game.phase(), TurnPhase::HasRollsPendingSelection);

        let mut game = two_player(1);
        edit(&mut game, |s| {
            let yellow = s.player_mut(Color::Yellow).unwrap();
            yellow.coins[0].position = 12;
            for c in &mut yellow.coins[1..] {
                c.position = HEAVEN;
            }
        });
        with_pool(&mut game, &[2, 3], false);
        // 12+2 = 14 ok, then 14+3 is locked
        game.move_with_roll(2, &[0]).unwrap();
        assert_eq!(game.phase(), TurnPhase::TurnOver);
    }

    #[test]
    fn test_attempt_move_needs_selection() {
        let mut game = two_player(1);
        let reply = game.attempt_move(&[0]);
        assert!(!reply.accepted);
        assert_eq!(reply.message, "roll the dice first");

        with_pool(&mut game, &[4, 1], false);
        let reply = game.attempt_move(&[0]);
        assert!(!reply.accepted);
        assert_eq!(reply.message, "select a roll first");

        assert_eq!(game.select_roll(1).unwrap(), Some(1));
        assert_eq!(game.select_roll(1).unwrap(), None);
        assert!(game.select_roll(5).is_err());
    }

    #[test]
    fn test_rejected_move_leaves_state() {
        let mut game = two_player(1);
        edit(&mut game, |s| {
            s.player_mut(Color::Yellow).unwrap().coins[0].position = 3;
            s.player_mut(Color::Yellow).unwrap().coins[1].position = 5;
        });
        with_pool(&mut game, &[3], false);
        let before = game.state().clone();
        let err = game.move_with_roll(3, &[0, 1]).unwrap_err();
        assert!(matches!(err, TurnError::Move(MoveError::NotCoLocated)));
        assert_eq!(game.state(), &before);
    }

    #[test]
    fn test_undo_is_bounded() {
        let mut game = two_player(1);
        edit(&mut game, |s| s.player_mut(Color::Yellow).unwrap().coins[0].position = 0);
        with_pool(&mut game, &[1, 1, 1], false);

        let start = game.state().clone();
        for _ in 0..3 {
            game.move_with_roll(1, &[0]).unwrap();
        }
        assert_eq!(game.undo_available(), 2);
        assert_eq!(game.undo().unwrap(), 1);
        assert_eq!(game.state().player(Color::Yellow).unwrap().coins[0].position, 2);
        assert_eq!(game.undo().unwrap(), 0);
        assert_eq!(game.state().player(Color::Yellow).unwrap().coins[0].position, 1);
        assert!(matches!(game.undo(), Err(TurnError::NothingToUndo)));
        assert_ne!(game.state(), &start);
    }

    #[test]
    fn test_no_history_for_computer_or_online() {
        let mut game = Game::new(&GameConfig { computer: vec![Color::Yellow], ..Default::default() }).unwrap();
        with_pool(&mut game, &[4], false);
        game.move_with_roll(4, &[0]).unwrap();
        assert_eq!(game.undo_available(), 0);

        let mut game = two_player(2);
        game.set_record_history(false);
        with_pool(&mut game, &[4], false);
        game.move_with_roll(4, &[0]).unwrap();
        assert_eq!(game.undo_available(), 0);
    }

    #[test]
    fn test_merge_and_form_stack() {
        let mut game = two_player(1);
        edit(&mut game, |s| {
            s.player_mut(Color::Yellow).unwrap().coins[0].position = 2;
            s.player_mut(Color::Yellow).unwrap().coins[1].position = 2;
        });
        with_pool(&mut game, &[1, 3], false);

        assert_eq!(game.merge_rolls(0, 1).unwrap(), 4);
        assert_eq!(game.state().pool.values(), &[4]);
        assert_eq!(game.state().turn.unused_bonus, 1);

        game.form_stack(&[0, 1]).unwrap();
        assert!(matches!(
            game.move_with_roll(4, &[0]),
            Err(TurnError::Move(MoveError::SplitStack))
        ));
        let result = game.move_with_roll(4, &[0, 1]).unwrap();
        assert!(matches!(result, MoveResult::Moved(ref r) if r.landing.to == 4));
    }

    #[test]
    fn test_unusable_merge_is_wasted() {
        let mut game = Game::new(&GameConfig { computer: vec![Color::Yellow], ..Default::default() }).unwrap();
        edit(&mut game, |s| {
            let yellow = s.player_mut(Color::Yellow).unwrap();
            yellow.coins[0].position = 12;
            for c in &mut yellow.coins[1..] {
                c.position = HEAVEN;
            }
        });
        with_pool(&mut game, &[2, 3], false);
        game.take_events();

        // 12 + 5 would enter the inner circle without a capture
        assert_eq!(game.merge_rolls(0, 1).unwrap(), 5);
        assert!(game.state().pool.is_empty());
        assert_eq!(game.state().turn.unused_bonus, 0);
        assert_eq!(game.phase(), TurnPhase::TurnOver);
        assert!(game.message().ends_with("Turn passes."));
        assert!(game.state().validate().is_ok());
        let events = game.take_events();
        assert!(events.iter().any(|e| matches!(e.data, GameEventData::RollWasted { roll: 5, .. })));

        assert_eq!(game.computer_step().unwrap(), Some(ComputerAction::EndTurn));
        assert_eq!(game.current_color(), Color::Blue);
    }

    #[test]
    fn test_unusable_merge_with_bonus_rerolls() {
        let mut game = two_player(1);
        edit(&mut game, |s| {
            let yellow = s.player_mut(Color::Yellow).unwrap();
            yellow.coins[0].position = 12;
            for c in &mut yellow.coins[1..] {
                c.position = HEAVEN;
            }
        });
        with_pool(&mut game, &[2, 3], true);

        game.merge_rolls(0, 1).unwrap();
        assert!(game.state().pool.is_empty());
        assert_eq!(game.phase(), TurnPhase::AwaitingRoll);
        assert!(game.roll().is_ok());
    }

    #[test]
    fn test_win_ends_game() {
        let mut game = two_player(1);
        edit(&mut game, |s| {
            let yellow = s.player_mut(Color::Yellow).unwrap();
            yellow.has_captured = true;
            for c in &mut yellow.coins[..3] {
                c.position = HEAVEN;
            }
            yellow.coins[3].position = 22;
        });
        with_pool(&mut game, &[1, 2], true);

        game.move_with_roll(1, &[3]).unwrap();
        assert_eq!(game.phase(), TurnPhase::GameOver);
        assert_eq!(game.winner(), Some(Color::Yellow));
        assert!(game.state().pool.is_empty());
        assert!(game.state().validate().is_ok());

        assert!(matches!(game.roll(), Err(TurnError::GameOver)));
        assert!(matches!(game.end_turn(), Err(TurnError::GameOver)));
        assert!(game.computer_step().unwrap().is_none());

        // The winning move was recorded but cannot be taken back
        assert_eq!(game.undo_available(), 1);
        assert!(matches!(game.undo(), Err(TurnError::GameOver)));
        assert_eq!(game.winner(), Some(Color::Yellow));
        assert_eq!(game.phase(), TurnPhase::GameOver);
    }

    #[test]
    fn test_computer_self_play_finishes() {
        let mut game = Game::new(&GameConfig {
            player_count: 4,
            computer: Color::ALL.to_vec(),
            seed: 42,
            ..Default::default()
        })
        .unwrap();

        let mut steps = 0;
        while game.winner().is_none() && steps < 50_000 {
            game.computer_step().unwrap().expect("computer always has an action");
            game.state().validate().unwrap();
            steps += 1;
        }
        assert!(game.winner().is_some(), "no winner after {steps} steps");
    }

    #[test]
    fn test_snapshot_resume() {
        let mut game = two_player(9);
        with_pool(&mut game, &[4], false);
        let snapshot = game.snapshot();
        let resumed = Game::from_snapshot(snapshot, 9).unwrap();
        assert_eq!(resumed.state(), game.state());
        assert_eq!(resumed.seats(), game.seats());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(24))]

            /// Computer play from any seed keeps every invariant and
            /// snapshots restore the exact state.
            #[test]
            fn prop_self_play_stays_valid(seed in any::<u64>(), four in any::<bool>(), steps in 1usize..400) {
                let player_count = if four { 4 } else { 2 };
                let mut game = Game::new(&GameConfig {
                    player_count,
                    computer: Color::turn_order(player_count).unwrap(),
                    seed,
                    ..Default::default()
                })
                .unwrap();

                for _ in 0..steps {
                    if game.winner().is_some() {
                        break;
                    }
                    prop_assert!(game.computer_step().unwrap().is_some());
                    prop_assert!(game.state().validate().is_ok());
                }

                let json = game.snapshot().to_json().unwrap();
                let back = Snapshot::from_json(&json).unwrap();
                prop_assert_eq!(&back.state, game.state());
                prop_assert_eq!(back.state.compute_hash(), game.state().compute_hash());
            }
        }
    }
}
