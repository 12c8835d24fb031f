//! Move Engine
//!
//! Validates and applies the move of one coin or one co-located group.
//!
//! ## Legality
//!
//! A landing is planned purely from geometry (home exit, inner-circle gate,
//! overshoot, recirculation) and then checked against the recirculation
//! priority:
//!
//! 1. an inner coin landing exactly on heaven
//! 2. any non-recirculating move of a coin outside the inner ring
//! 3. recirculation, only when neither of the above exists for the roll
//!
//! [`can_use_roll`] is the single predicate every caller (roll-time pass
//! detection, wasted-roll handling, turn continuation, computer player)
//! uses to ask whether a roll value has any legal use.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::game::board::{self, Cell, Color, HEAVEN, HOME, INNER_RING_LEN, INNER_START};
use crate::game::dice::{self, OPENING_ROLLS};
use crate::game::state::{GameState, PlayerSet, COINS_PER_COLOR};

// =============================================================================
// ERRORS
// =============================================================================

/// Why a move was rejected. State is untouched whenever one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    /// Winner already decided
    #[error("the game is over")]
    GameOver,

    /// Color acting out of turn
    #[error("it is {expected}'s turn")]
    NotYourTurn {
        /// Color whose turn it is
        expected: Color,
    },

    /// Color is not seated in this game
    #[error("{0} is not playing")]
    ColorNotPlaying(Color),

    /// Empty selection
    #[error("select at least one coin")]
    NoCoins,

    /// Coin id outside 0..=3
    #[error("there is no coin {0}")]
    UnknownCoin(u8),

    /// Same coin selected twice
    #[error("coin {0} selected twice")]
    DuplicateCoin(u8),

    /// Selected coins on different squares
    #[error("selected coins must be on the same square")]
    NotCoLocated,

    /// Part of a stack selected without the rest
    #[error("stacked coins must move together")]
    SplitStack,

    /// Selection is already finished
    #[error("these coins are already in heaven")]
    AlreadyInHeaven,

    /// Fewer than two coins for a stack
    #[error("a stack needs at least two coins")]
    StackTooSmall,

    /// Roll value not in the pool
    #[error("no unused roll of {0}")]
    RollNotInPool(u16),

    /// Group size does not divide the roll
    #[error("can't move {coins} coins with roll {roll} (doesn't divide evenly)")]
    IndivisibleRoll {
        /// Roll value
        roll: u16,
        /// Group size
        coins: usize,
    },

    /// First coin out needs 1, 4 or 8
    #[error("need a roll of 1, 4 or 8 for the first coin")]
    NeedsOpeningRoll,

    /// Inner ring entry before any capture
    #[error("cannot enter the inner circle without a capture")]
    InnerCircleLocked,

    /// Move past heaven from outside the inner ring
    #[error("need exactly {needed} to reach heaven")]
    Overshoot {
        /// Exact distance to heaven
        needed: i16,
    },

    /// Another coin has priority over recirculating
    #[error("must use this roll outside the inner circle first")]
    RecirculationBlocked,
}

impl MoveError {
    /// Rejections that come from the board rules rather than a bad request.
    ///
    /// When one of these hits a roll nothing can use, the roll is wasted.
    pub fn is_rule_violation(&self) -> bool {
        matches!(
            self,
            MoveError::IndivisibleRoll { .. }
                | MoveError::NeedsOpeningRoll
                | MoveError::InnerCircleLocked
                | MoveError::Overshoot { .. }
                | MoveError::RecirculationBlocked
        )
    }
}

// =============================================================================
// LANDING
// =============================================================================

/// Where a unit would end up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Landing {
    /// Starting path index
    pub from: i8,
    /// Landing path index
    pub to: i8,
    /// Cells advanced per coin
    pub advance: u16,
    /// Wrapped around the inner ring
    pub recirculated: bool,
}

/// Geometry of a move for a group of `group` coins at `from`.
///
/// Ignores the recirculation priority; see [`check_landing`].
pub fn plan_landing(player: &PlayerSet, from: i8, group: usize, roll: u16) -> Result<Landing, MoveError> {
    if from == HEAVEN {
        return Err(MoveError::AlreadyInHeaven);
    }
    if group == 0 {
        return Err(MoveError::NoCoins);
    }
    if group > 1 && roll as usize % group != 0 {
        return Err(MoveError::IndivisibleRoll { roll, coins: group });
    }
    let advance = roll / group as u16;

    let from_wide = from as i32;
    let heaven = HEAVEN as i32;
    let mut recirculated = false;

    let target = if from == HOME {
        if !player.any_on_board() && !OPENING_ROLLS.contains(&roll) {
            return Err(MoveError::NeedsOpeningRoll);
        }
        advance as i32 - 1
    } else {
        from_wide + advance as i32
    };

    let to = if target > heaven {
        if !board::is_inner(from) {
            return Err(MoveError::Overshoot { needed: (heaven - from_wide) as i16 });
        }
        recirculated = true;
        let offset = (from_wide - INNER_START as i32 + advance as i32) % INNER_RING_LEN as i32;
        INNER_START as i32 + offset
    } else {
        target
    };

    if !board::is_inner(from) && to >= INNER_START as i32 && !player.has_captured {
        return Err(MoveError::InnerCircleLocked);
    }

    Ok(Landing {
        from,
        to: to as i8,
        advance,
        recirculated,
    })
}

/// Full legality of a landing, recirculation priority included.
pub fn check_landing(state: &GameState, color: Color, from: i8, group: usize, roll: u16) -> Result<Landing, MoveError> {
    let player = state.player(color).ok_or(MoveError::ColorNotPlaying(color))?;
    let landing = plan_landing(player, from, group, roll)?;
    if landing.recirculated && has_priority_use(player, roll) {
        return Err(MoveError::RecirculationBlocked);
    }
    Ok(landing)
}

// =============================================================================
// PREDICATES
// =============================================================================

/// Units that can move: each natural stack as a whole, each unstacked coin alone.
///
/// Coins in heaven are not movable.
pub fn movable_units(player: &PlayerSet) -> Vec<(i8, Vec<u8>)> {
    let mut units = Vec::new();
    let mut seen: Vec<i8> = Vec::with_capacity(COINS_PER_COLOR);

    for coin in &player.coins {
        if coin.in_heaven() || seen.contains(&coin.position) {
            continue;
        }
        seen.push(coin.position);

        let stacked = player.stacked_ids_at(coin.position);
        if stacked.len() > 1 {
            units.push((coin.position, stacked));
        }
        for loner in player.coins_at(coin.position) {
            if !loner.stacked || !units.iter().any(|(_, ids)| ids.contains(&loner.id)) {
                units.push((coin.position, vec![loner.id]));
            }
        }
    }
    units
}

/// A use of `roll` that outranks recirculation exists.
pub fn has_priority_use(player: &PlayerSet, roll: u16) -> bool {
    movable_units(player).iter().any(|(from, ids)| {
        match plan_landing(player, *from, ids.len(), roll) {
            Ok(landing) if board::is_inner(*from) => landing.to == HEAVEN,
            Ok(landing) => !landing.recirculated,
            Err(_) => false,
        }
    })
}

/// Some unit of `color` has a legal move with `roll`.
pub fn can_use_roll(state: &GameState, color: Color, roll: u16) -> bool {
    let Some(player) = state.player(color) else {
        return false;
    };
    movable_units(player)
        .iter()
        .any(|(from, ids)| check_landing(state, color, *from, ids.len(), roll).is_ok())
}

/// Some value in the pool has a legal use for `color`.
pub fn can_use_any(state: &GameState, color: Color) -> bool {
    state.pool.distinct().into_iter().any(|roll| can_use_roll(state, color, roll))
}

/// Opponent coins that `coins` of `color` would send home by landing on `cell`.
///
/// Evaluated before the move. Safe cells never capture, and neither does a
/// mixed cell: one already holding more than one color, the mover's own
/// coins included. Otherwise the whole single-color occupancy is captured
/// when it matches the group size.
pub fn capture_victims(state: &GameState, color: Color, coins: &[u8], cell: Cell) -> Vec<(Color, u8)> {
    if board::is_safe_cell(cell) {
        return Vec::new();
    }
    let occupants: Vec<(Color, u8)> = state
        .coins_at_cell(cell)
        .into_iter()
        .filter(|(c, id)| !(*c == color && coins.contains(id)))
        .collect();

    let Some(&(victim, _)) = occupants.first() else {
        return Vec::new();
    };
    let single_color = occupants.iter().all(|(c, _)| *c == victim);
    if victim == color || !single_color || occupants.len() != coins.len() {
        return Vec::new();
    }
    occupants
}

/// A legal (roll, unit) pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegalMove {
    /// Roll value used
    pub roll: u16,
    /// Coins moved together
    pub coins: Vec<u8>,
    /// Resulting landing
    pub landing: Landing,
}

/// Every legal (roll value, unit) pair for `color` over the current pool.
pub fn legal_moves(state: &GameState, color: Color) -> Vec<LegalMove> {
    let Some(player) = state.player(color) else {
        return Vec::new();
    };
    let units = movable_units(player);
    let mut moves = Vec::new();
    for roll in state.pool.distinct() {
        for (from, ids) in &units {
            if let Ok(landing) = check_landing(state, color, *from, ids.len(), roll) {
                moves.push(LegalMove { roll, coins: ids.clone(), landing });
            }
        }
    }
    moves
}

/// Validate a coin selection and return the shared position.
pub fn validate_selection(player: &PlayerSet, coins: &[u8]) -> Result<i8, MoveError> {
    let first = *coins.first().ok_or(MoveError::NoCoins)?;
    for (i, id) in coins.iter().enumerate() {
        if *id as usize >= COINS_PER_COLOR {
            return Err(MoveError::UnknownCoin(*id));
        }
        if coins[..i].contains(id) {
            return Err(MoveError::DuplicateCoin(*id));
        }
    }

    let position = player.coins[first as usize].position;
    if coins.iter().any(|id| player.coins[*id as usize].position != position) {
        return Err(MoveError::NotCoLocated);
    }
    if position == HEAVEN {
        return Err(MoveError::AlreadyInHeaven);
    }

    let stacked = player.stacked_ids_at(position);
    let touches_stack = coins.iter().any(|id| stacked.contains(id));
    if touches_stack && stacked.iter().any(|id| !coins.contains(id)) {
        return Err(MoveError::SplitStack);
    }
    Ok(position)
}

// =============================================================================
// APPLY
// =============================================================================

/// What a successful move did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveReport {
    /// Mover
    pub color: Color,
    /// Coins moved
    pub coins: Vec<u8>,
    /// Roll consumed
    pub roll: u16,
    /// Geometry
    pub landing: Landing,
    /// Opponent coins sent home
    pub captured: Vec<(Color, u8)>,
    /// Group landed on a foreign home and came apart
    pub stack_broken: bool,
    /// Landed on heaven
    pub reached_heaven: bool,
    /// All four coins are now in heaven
    pub won: bool,
}

impl MoveReport {
    /// Message shown to players.
    pub fn message(&self) -> String {
        let n = self.coins.len();
        let group = if n > 1 {
            format!(" ({} coins, {} blocks each)", n, self.landing.advance)
        } else {
            String::new()
        };
        if self.won {
            format!("{} WINS!", self.color.name().to_uppercase())
        } else if self.reached_heaven {
            if n > 1 {
                format!("{n} coins reached heaven!")
            } else {
                "Coin reached heaven!".to_string()
            }
        } else if !self.captured.is_empty() {
            format!("Captured opponent{group}! Roll again.")
        } else {
            format!("Moved {} blocks{group}!", self.landing.advance)
        }
    }
}

/// Outcome of [`attempt_move`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoveResult {
    /// Coins moved
    Moved(MoveReport),
    /// Roll had no legal use and was discarded
    Wasted {
        /// Discarded value
        roll: u16,
        /// Rule that blocked the requested move
        reason: MoveError,
    },
}

/// Validate and apply a move of `coins` with a roll value from the pool.
///
/// On `Err` the state is untouched. A rule rejection against a roll that
/// nothing can use consumes the roll and returns [`MoveResult::Wasted`].
pub fn attempt_move(state: &mut GameState, color: Color, coins: &[u8], roll: u16) -> Result<MoveResult, MoveError> {
    if state.is_over() {
        return Err(MoveError::GameOver);
    }
    let player = state.player(color).ok_or(MoveError::ColorNotPlaying(color))?;
    let expected = state.current_color();
    if color != expected {
        return Err(MoveError::NotYourTurn { expected });
    }
    if state.pool.position_of(roll).is_none() {
        return Err(MoveError::RollNotInPool(roll));
    }

    let from = validate_selection(player, coins)?;
    let landing = match check_landing(state, color, from, coins.len(), roll) {
        Ok(landing) => landing,
        Err(reason) if reason.is_rule_violation() && !can_use_roll(state, color, roll) => {
            dice::consume_roll(&mut state.pool, &mut state.turn, roll);
            return Ok(MoveResult::Wasted { roll, reason });
        }
        Err(reason) => return Err(reason),
    };

    Ok(MoveResult::Moved(apply_move(state, color, coins, roll, landing)))
}

fn apply_move(state: &mut GameState, color: Color, coins: &[u8], roll: u16, landing: Landing) -> MoveReport {
    let group = coins.len();
    let cell = board::cell_at(color, landing.to);
    let foreign_home = cell
        .and_then(board::home_owner)
        .is_some_and(|owner| owner != color);
    let victims = match cell {
        Some(cell) if landing.to != HEAVEN => capture_victims(state, color, coins, cell),
        _ => Vec::new(),
    };

    let mut won = false;
    if let Some(player) = state.player_mut(color) {
        for id in coins {
            let coin = &mut player.coins[*id as usize];
            coin.position = landing.to;
            if board::is_inner(landing.from) {
                coin.inner_moves = coin.inner_moves.saturating_add(landing.advance.min(u8::MAX as u16) as u8);
            } else if landing.to >= INNER_START {
                coin.inner_moves = 0;
            }
            coin.stacked = !foreign_home && group > 1;
        }
        won = landing.to == HEAVEN && player.all_in_heaven();
    }

    dice::consume_roll(&mut state.pool, &mut state.turn, roll);

    let mut report = MoveReport {
        color,
        coins: coins.to_vec(),
        roll,
        landing,
        captured: Vec::new(),
        stack_broken: foreign_home && group > 1,
        reached_heaven: landing.to == HEAVEN,
        won,
    };

    if report.reached_heaven {
        if won {
            state.winner = Some(color);
            state.pool.drain();
            state.turn.unused_bonus = 0;
            state.turn.selected_roll = None;
        }
        return report;
    }

    if !victims.is_empty() {
        for (opp_color, id) in &victims {
            if let Some(coin) = state.player_mut(*opp_color).and_then(|p| p.coin_mut(*id)) {
                coin.position = HOME;
                coin.stacked = false;
                coin.inner_moves = 0;
            }
        }
        if let Some(player) = state.player_mut(color) {
            player.has_captured = true;
        }
        state.turn.can_roll = true;
        report.captured = victims;
    }

    report
}

/// Declare co-located coins a stack without moving them.
pub fn form_stack(state: &mut GameState, color: Color, coins: &[u8]) -> Result<(), MoveError> {
    if state.is_over() {
        return Err(MoveError::GameOver);
    }
    let player = state.player(color).ok_or(MoveError::ColorNotPlaying(color))?;
    if coins.len() < 2 {
        return Err(MoveError::StackTooSmall);
    }
    validate_selection(player, coins)?;

    if let Some(player) = state.player_mut(color) {
        for id in coins {
            player.coins[*id as usize].stacked = true;
        }
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::TurnPhase;

    fn game(players: usize) -> GameState {
        GameState::new(players).unwrap()
    }

    fn place(state: &mut GameState, color: Color, id: u8, position: i8) {
        state.player_mut(color).unwrap().coins[id as usize].position = position;
    }

    fn stack(state: &mut GameState, color: Color, ids: &[u8], position: i8) {
        for id in ids {
            place(state, color, *id, position);
            state.player_mut(color).unwrap().coins[*id as usize].stacked = true;
        }
    }

    fn pool(state: &mut GameState, values: &[u16]) {
        state.pool = Default::default();
        for v in values {
            state.pool.push(*v);
        }
        state.turn.unused_bonus = state.pool.bonus_count();
        state.turn.can_roll = false;
        state.turn.phase = TurnPhase::HasRollsPendingSelection;
    }

    fn captured(state: &mut GameState, color: Color) {
        state.player_mut(color).unwrap().has_captured = true;
    }

    fn moved(result: Result<MoveResult, MoveError>) -> MoveReport {
        match result {
            Ok(MoveResult::Moved(report)) => report,
            other => panic!("expected a move, got {other:?}"),
        }
    }

    #[test]
    fn test_first_exit_needs_opening_roll() {
        let mut state = game(2);
        for roll in [1, 4, 8] {
            assert!(can_use_roll(&state, Color::Yellow, roll), "roll {roll}");
        }
        for roll in [2, 3] {
            assert!(!can_use_roll(&state, Color::Yellow, roll), "roll {roll}");
        }

        pool(&mut state, &[4]);
        let report = moved(attempt_move(&mut state, Color::Yellow, &[0], 4));
        assert_eq!(report.landing.to, 3);

        // Once a coin is out any roll releases another
        pool(&mut state, &[2]);
        let report = moved(attempt_move(&mut state, Color::Yellow, &[1], 2));
        assert_eq!(report.landing.to, 1);
    }

    #[test]
    fn test_unusable_opening_roll_is_wasted() {
        let mut state = game(2);
        pool(&mut state, &[2, 8]);
        state.turn.unused_bonus = 1;

        let result = attempt_move(&mut state, Color::Yellow, &[0], 2).unwrap();
        assert_eq!(result, MoveResult::Wasted { roll: 2, reason: MoveError::NeedsOpeningRoll });
        assert_eq!(state.pool.values(), &[8]);
        assert!(state.player(Color::Yellow).unwrap().coins.iter().all(|c| c.is_home()));
    }

    #[test]
    fn test_single_coin_captures_single_coin() {
        let mut state = game(2);
        // Yellow 8 and blue 0 are both (0,1)
        place(&mut state, Color::Yellow, 0, 6);
        place(&mut state, Color::Blue, 2, 0);
        pool(&mut state, &[2]);

        let report = moved(attempt_move(&mut state, Color::Yellow, &[0], 2));
        assert_eq!(report.captured, vec![(Color::Blue, 2)]);
        assert!(state.player(Color::Blue).unwrap().coins[2].is_home());
        assert!(state.player(Color::Yellow).unwrap().has_captured);
        assert!(state.turn.can_roll);
        assert!(state.validate().is_ok());
    }

    #[test]
    fn test_stack_does_not_capture_lone_coin() {
        let mut state = game(2);
        stack(&mut state, Color::Yellow, &[0, 1], 6);
        place(&mut state, Color::Blue, 0, 0);
        pool(&mut state, &[4]);

        let report = moved(attempt_move(&mut state, Color::Yellow, &[0, 1], 4));
        assert_eq!(report.landing.to, 8);
        assert!(report.captured.is_empty());
        assert_eq!(state.player(Color::Blue).unwrap().coins[0].position, 0);
        assert!(!state.player(Color::Yellow).unwrap().has_captured);
        assert!(state.player(Color::Yellow).unwrap().coins[0].stacked);
    }

    #[test]
    fn test_stack_captures_equal_stack() {
        let mut state = game(2);
        stack(&mut state, Color::Yellow, &[0, 1], 6);
        stack(&mut state, Color::Blue, &[0, 3], 0);
        pool(&mut state, &[4]);

        let report = moved(attempt_move(&mut state, Color::Yellow, &[0, 1], 4));
        assert_eq!(report.captured.len(), 2);
        let blue = state.player(Color::Blue).unwrap();
        assert!(blue.coins[0].is_home() && !blue.coins[0].stacked);
        assert!(blue.coins[3].is_home() && !blue.coins[3].stacked);
    }

    #[test]
    fn test_mixed_cell_is_immune() {
        let mut state = game(4);
        // (0,1): yellow 8, green 4, blue 0
        place(&mut state, Color::Yellow, 0, 6);
        place(&mut state, Color::Green, 0, 4);
        place(&mut state, Color::Blue, 0, 0);
        pool(&mut state, &[2]);

        let report = moved(attempt_move(&mut state, Color::Yellow, &[0], 2));
        assert!(report.captured.is_empty());
        assert_eq!(state.player(Color::Green).unwrap().coins[0].position, 4);
        assert_eq!(state.player(Color::Blue).unwrap().coins[0].position, 0);
    }

    #[test]
    fn test_own_coin_makes_cell_mixed() {
        let mut state = game(2);
        // (0,1) already holds a yellow stack and a blue coin
        stack(&mut state, Color::Yellow, &[1, 2], 8);
        place(&mut state, Color::Blue, 0, 0);
        place(&mut state, Color::Yellow, 0, 6);
        pool(&mut state, &[2]);

        let cell = board::cell_at(Color::Yellow, 8).unwrap();
        assert!(capture_victims(&state, Color::Yellow, &[0], cell).is_empty());

        let report = moved(attempt_move(&mut state, Color::Yellow, &[0], 2));
        assert_eq!(report.landing.to, 8);
        assert!(report.captured.is_empty());
        assert_eq!(state.player(Color::Blue).unwrap().coins[0].position, 0);
        assert!(!state.player(Color::Yellow).unwrap().has_captured);
        assert!(!state.turn.can_roll);
    }

    #[test]
    fn test_safe_cell_never_captures() {
        // Yellow 7 and green 3 are both blue's home (0,2)
        let mut state4 = game(4);
        place(&mut state4, Color::Yellow, 0, 5);
        place(&mut state4, Color::Green, 1, 3);
        pool(&mut state4, &[2]);
        let report = moved(attempt_move(&mut state4, Color::Yellow, &[0], 2));
        assert_eq!(report.landing.to, 7);
        assert!(report.captured.is_empty());

        let mut state = game(2);
        place(&mut state, Color::Yellow, 0, 22);
        place(&mut state, Color::Blue, 0, 22);
        captured(&mut state, Color::Yellow);
        pool(&mut state, &[1]);
        let report = moved(attempt_move(&mut state, Color::Yellow, &[0], 1));
        assert!(report.reached_heaven && report.captured.is_empty());
    }

    #[test]
    fn test_inner_circle_gate() {
        let mut state = game(2);
        place(&mut state, Color::Yellow, 0, 13);
        place(&mut state, Color::Yellow, 1, 2);
        pool(&mut state, &[3, 1]);

        assert_eq!(
            attempt_move(&mut state, Color::Yellow, &[0], 3),
            Err(MoveError::InnerCircleLocked)
        );
        // 13 -> 14 stays on the outer circle
        moved(attempt_move(&mut state, Color::Yellow, &[0], 1));

        captured(&mut state, Color::Yellow);
        pool(&mut state, &[3]);
        let report = moved(attempt_move(&mut state, Color::Yellow, &[0], 3));
        assert_eq!(report.landing.to, 17);
        assert_eq!(state.player(Color::Yellow).unwrap().coins[0].inner_moves, 0);
    }

    #[test]
    fn test_locked_roll_with_no_alternative_is_wasted() {
        let mut state = game(2);
        place(&mut state, Color::Yellow, 0, 14);
        for id in 1..4 {
            place(&mut state, Color::Yellow, id, HEAVEN);
        }
        pool(&mut state, &[2]);

        let result = attempt_move(&mut state, Color::Yellow, &[0], 2).unwrap();
        assert_eq!(result, MoveResult::Wasted { roll: 2, reason: MoveError::InnerCircleLocked });
        assert!(state.pool.is_empty());
        assert_eq!(state.player(Color::Yellow).unwrap().coins[0].position, 14);
    }

    #[test]
    fn test_overshoot_from_outer_circle() {
        let mut state = game(2);
        captured(&mut state, Color::Yellow);
        place(&mut state, Color::Yellow, 0, 14);
        assert_eq!(
            plan_landing(state.player(Color::Yellow).unwrap(), 14, 1, 12),
            Err(MoveError::Overshoot { needed: 9 })
        );
    }

    #[test]
    fn test_recirculation_priority() {
        let mut state = game(2);
        captured(&mut state, Color::Yellow);
        place(&mut state, Color::Yellow, 0, 20);
        place(&mut state, Color::Yellow, 1, 2);
        place(&mut state, Color::Yellow, 2, HEAVEN);
        place(&mut state, Color::Yellow, 3, HEAVEN);
        pool(&mut state, &[5]);

        assert_eq!(
            attempt_move(&mut state, Color::Yellow, &[0], 5),
            Err(MoveError::RecirculationBlocked)
        );
        assert!(can_use_roll(&state, Color::Yellow, 5));

        // With the outer coin gone recirculation opens up
        place(&mut state, Color::Yellow, 1, HEAVEN);
        let report = moved(attempt_move(&mut state, Color::Yellow, &[0], 5));
        assert!(report.landing.recirculated);
        assert_eq!(report.landing.to, 17);
        assert_eq!(state.player(Color::Yellow).unwrap().coins[0].inner_moves, 5);
    }

    #[test]
    fn test_exact_heaven_outranks_recirculation() {
        let mut state = game(2);
        captured(&mut state, Color::Yellow);
        place(&mut state, Color::Yellow, 0, 20);
        place(&mut state, Color::Yellow, 1, 18);
        place(&mut state, Color::Yellow, 2, HEAVEN);
        place(&mut state, Color::Yellow, 3, HEAVEN);
        pool(&mut state, &[5]);

        assert_eq!(
            attempt_move(&mut state, Color::Yellow, &[0], 5),
            Err(MoveError::RecirculationBlocked)
        );
        let report = moved(attempt_move(&mut state, Color::Yellow, &[1], 5));
        assert!(report.reached_heaven);
    }

    #[test]
    fn test_foreign_home_breaks_stack() {
        let mut state = game(4);
        stack(&mut state, Color::Yellow, &[0, 1], 1);
        pool(&mut state, &[4]);

        let report = moved(attempt_move(&mut state, Color::Yellow, &[0, 1], 4));
        // Yellow 3 is green's home
        assert_eq!(report.landing.to, 3);
        assert!(report.stack_broken);
        let yellow = state.player(Color::Yellow).unwrap();
        assert!(!yellow.coins[0].stacked && !yellow.coins[1].stacked);
        assert!(state.validate().is_ok());
    }

    #[test]
    fn test_selection_rules() {
        let mut state = game(2);
        stack(&mut state, Color::Yellow, &[0, 1], 4);
        place(&mut state, Color::Yellow, 2, 6);
        pool(&mut state, &[3, 2]);

        assert_eq!(attempt_move(&mut state, Color::Yellow, &[], 2), Err(MoveError::NoCoins));
        assert_eq!(attempt_move(&mut state, Color::Yellow, &[7], 2), Err(MoveError::UnknownCoin(7)));
        assert_eq!(attempt_move(&mut state, Color::Yellow, &[2, 2], 2), Err(MoveError::DuplicateCoin(2)));
        assert_eq!(attempt_move(&mut state, Color::Yellow, &[0, 2], 2), Err(MoveError::NotCoLocated));
        assert_eq!(attempt_move(&mut state, Color::Yellow, &[0], 2), Err(MoveError::SplitStack));
        assert_eq!(attempt_move(&mut state, Color::Yellow, &[2], 4), Err(MoveError::RollNotInPool(4)));
        assert_eq!(
            attempt_move(&mut state, Color::Blue, &[0], 2),
            Err(MoveError::NotYourTurn { expected: Color::Yellow })
        );
        assert_eq!(
            attempt_move(&mut state, Color::Green, &[0], 2),
            Err(MoveError::ColorNotPlaying(Color::Green))
        );
        // Roll 3 can still move coin 2, so the stack rejection is not a waste
        assert_eq!(
            attempt_move(&mut state, Color::Yellow, &[0, 1], 3),
            Err(MoveError::IndivisibleRoll { roll: 3, coins: 2 })
        );
        assert_eq!(state.pool.values(), &[3, 2]);
    }

    #[test]
    fn test_win_clears_pool() {
        let mut state = game(2);
        captured(&mut state, Color::Yellow);
        for id in 0..3 {
            place(&mut state, Color::Yellow, id, HEAVEN);
        }
        place(&mut state, Color::Yellow, 3, 21);
        pool(&mut state, &[2, 3]);

        let report = moved(attempt_move(&mut state, Color::Yellow, &[3], 2));
        assert!(report.won);
        assert_eq!(state.winner, Some(Color::Yellow));
        assert!(state.pool.is_empty());
        assert_eq!(report.message(), "YELLOW WINS!");

        assert_eq!(attempt_move(&mut state, Color::Yellow, &[0], 3), Err(MoveError::GameOver));
    }

    #[test]
    fn test_heaven_coins_cannot_move() {
        let mut state = game(2);
        place(&mut state, Color::Yellow, 0, HEAVEN);
        place(&mut state, Color::Yellow, 1, 3);
        pool(&mut state, &[1]);
        assert_eq!(attempt_move(&mut state, Color::Yellow, &[0], 1), Err(MoveError::AlreadyInHeaven));
    }

    #[test]
    fn test_movable_units() {
        let mut state = game(2);
        stack(&mut state, Color::Yellow, &[0, 1], 5);
        place(&mut state, Color::Yellow, 2, 5);
        place(&mut state, Color::Yellow, 3, HEAVEN);

        let units = movable_units(state.player(Color::Yellow).unwrap());
        assert_eq!(units, vec![(5, vec![0, 1]), (5, vec![2])]);
    }

    #[test]
    fn test_form_stack() {
        let mut state = game(2);
        place(&mut state, Color::Yellow, 0, 4);
        place(&mut state, Color::Yellow, 1, 4);
        place(&mut state, Color::Yellow, 2, 6);

        assert_eq!(form_stack(&mut state, Color::Yellow, &[0]), Err(MoveError::StackTooSmall));
        assert_eq!(form_stack(&mut state, Color::Yellow, &[0, 2]), Err(MoveError::NotCoLocated));
        form_stack(&mut state, Color::Yellow, &[0, 1]).unwrap();
        assert_eq!(state.player(Color::Yellow).unwrap().stacked_ids_at(4), vec![0, 1]);
        assert!(state.validate().is_ok());
    }

    #[test]
    fn test_legal_moves_enumerates_units() {
        let mut state = game(2);
        place(&mut state, Color::Yellow, 0, 2);
        pool(&mut state, &[2, 3]);

        let moves = legal_moves(&state, Color::Yellow);
        // Coin 0 with both rolls, three home coins with both rolls
        assert_eq!(moves.len(), 8);
        assert!(moves.iter().any(|m| m.roll == 3 && m.coins == vec![0] && m.landing.to == 5));
        assert!(can_use_any(&state, Color::Yellow));
    }
}
