//! Computer Player
//!
//! Scores every legal (roll, unit) pair and picks the best. Pure with respect
//! to the game state: only the jitter generator is advanced.

use serde::{Serialize, Deserialize};

use crate::core::rng::DeterministicRng;
use crate::game::board::{self, Color, HEAVEN, HOME, INNER_START};
use crate::game::rules::{self, LegalMove};
use crate::game::state::{GameState, TurnPhase};

/// Landing exactly on heaven.
pub const SCORE_HEAVEN: i32 = 1000;
/// Per path index of the landing.
pub const SCORE_PER_INDEX: i32 = 5;
/// Entering the inner ring.
pub const SCORE_INNER_ENTRY: i32 = 100;
/// Bringing a coin out of home.
pub const SCORE_LEAVE_HOME: i32 = 50;
/// Per opponent coin captured.
pub const SCORE_CAPTURE: i32 = 200;
/// Per opponent coin that could hit the landing cell.
pub const PENALTY_THREAT: i32 = 30;
/// Per index still to go, for coins already on the board.
pub const SCORE_TRAILING: i32 = 2;
/// Jitter is drawn from `0..JITTER`.
pub const JITTER: u32 = 10;
/// Farthest an opponent is assumed to reach in one roll.
pub const STRIKE_RANGE: i8 = 8;

/// What the computer wants to do next.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ComputerAction {
    /// Use a roll on a unit
    Move {
        /// Roll value
        roll: u16,
        /// Coins moved together
        coins: Vec<u8>,
    },
    /// Throw the shells
    Roll,
    /// Hand the turn on
    EndTurn,
}

/// A legal move and its score.
#[derive(Clone, Debug)]
pub struct ScoredMove {
    /// The move
    pub candidate: LegalMove,
    /// Deterministic part of the score
    pub base: i32,
    /// Total including jitter
    pub score: i32,
}

/// Opponent coins on the outer circle that could reach `cell` in 1..=8 steps.
fn threats(state: &GameState, color: Color, cell: board::Cell) -> i32 {
    let mut count = 0;
    for player in state.players.iter().filter(|p| p.color != color) {
        for coin in &player.coins {
            if !board::is_outer(coin.position) {
                continue;
            }
            let reaches = (1..=STRIKE_RANGE)
                .map(|d| coin.position + d)
                .take_while(|pos| *pos < HEAVEN)
                .any(|pos| board::cell_at(player.color, pos) == Some(cell));
            if reaches {
                count += 1;
            }
        }
    }
    count
}

/// Opponent coins this move would send home.
fn capture_count(state: &GameState, color: Color, candidate: &LegalMove) -> i32 {
    let to = candidate.landing.to;
    if to == HEAVEN {
        return 0;
    }
    board::cell_at(color, to).map_or(0, |cell| {
        rules::capture_victims(state, color, &candidate.coins, cell).len() as i32
    })
}

/// Deterministic score of a candidate.
pub fn score_move(state: &GameState, color: Color, candidate: &LegalMove) -> i32 {
    let from = candidate.landing.from;
    let to = candidate.landing.to;
    let mut score = 0;

    if to == HEAVEN {
        score += SCORE_HEAVEN;
    }
    score += to as i32 * SCORE_PER_INDEX;
    if from < INNER_START && to >= INNER_START {
        score += SCORE_INNER_ENTRY;
    }
    if from == HOME {
        score += SCORE_LEAVE_HOME;
    }

    score += capture_count(state, color, candidate) * SCORE_CAPTURE;

    if to != HEAVEN {
        if let Some(cell) = board::cell_at(color, to).filter(|c| !board::is_safe_cell(*c)) {
            score -= threats(state, color, cell) * PENALTY_THREAT;
        }
    }

    if from >= 0 {
        score += (HEAVEN - from) as i32 * SCORE_TRAILING;
    }

    score
}

/// Highest scoring legal move for `color`, ties broken by jitter.
pub fn choose_move(state: &GameState, color: Color, rng: &mut DeterministicRng) -> Option<ScoredMove> {
    let mut best: Option<ScoredMove> = None;
    for candidate in rules::legal_moves(state, color) {
        let base = score_move(state, color, &candidate);
        let score = base + rng.below(JITTER) as i32;
        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(ScoredMove { candidate, base, score });
        }
    }
    best
}

/// Next action for the acting color, or `None` if there is nothing to do.
pub fn choose_action(state: &GameState, rng: &mut DeterministicRng) -> Option<ComputerAction> {
    if state.is_over() {
        return None;
    }
    match state.turn.phase {
        TurnPhase::GameOver => return None,
        TurnPhase::TurnOver => return Some(ComputerAction::EndTurn),
        TurnPhase::AwaitingRoll | TurnPhase::HasRollsPendingSelection => {}
    }

    let color = state.current_color();
    if !state.pool.is_empty() {
        if let Some(best) = choose_move(state, color, rng) {
            return Some(ComputerAction::Move {
                roll: best.candidate.roll,
                coins: best.candidate.coins,
            });
        }
    }
    state.turn.can_roll.then_some(ComputerAction::Roll)
}

// =============================================================================
// TESTS
// =============================================================================
