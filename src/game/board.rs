//! Board Geometry
//!
//! The 5×5 Attha board and the fixed path each color walks across it.
//! Paths are static tables; nothing here is ever mutated.

use std::fmt;

use serde::{Serialize, Deserialize};

/// Position of a coin still waiting at home.
pub const HOME: i8 = -1;

/// First path index of the inner ring.
pub const INNER_START: i8 = 15;

/// Last path index of the outer circle.
pub const OUTER_END: i8 = INNER_START - 1;

/// Terminal path index, shared physical cell for all colors.
pub const HEAVEN: i8 = 23;

/// Number of cells in the inner ring (indices 15..=22).
pub const INNER_RING_LEN: i8 = HEAVEN - INNER_START;

/// Cells on a path including heaven.
pub const PATH_LEN: usize = HEAVEN as usize + 1;

// =============================================================================
// COLOR
// =============================================================================

/// One of the four player colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Color {
    /// Home at (4,2)
    Yellow = 0,
    /// Home at (2,4)
    Green = 1,
    /// Home at (0,2)
    Blue = 2,
    /// Home at (2,0)
    Red = 3,
}

impl Color {
    /// All colors in canonical turn order.
    pub const ALL: [Color; 4] = [Color::Yellow, Color::Green, Color::Blue, Color::Red];

    /// Colors seated in a two-player game.
    pub const TWO_PLAYER: [Color; 2] = [Color::Yellow, Color::Blue];

    /// Index into per-color tables.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Turn order for a game with `player_count` players (2 or 4).
    pub fn turn_order(player_count: usize) -> Option<Vec<Color>> {
        match player_count {
            2 => Some(Self::TWO_PLAYER.to_vec()),
            4 => Some(Self::ALL.to_vec()),
            _ => None,
        }
    }

    /// Lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Color::Yellow => "yellow",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::Red => "red",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// CELL
// =============================================================================

/// A (row, column) coordinate on the 5×5 grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Row 0..=4, top to bottom
    pub row: u8,
    /// Column 0..=4, left to right
    pub col: u8,
}

impl Cell {
    /// Create a cell.
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.row, self.col)
    }
}

const fn c(row: u8, col: u8) -> Cell {
    Cell::new(row, col)
}

/// The center cell every path ends on.
pub const HEAVEN_CELL: Cell = c(2, 2);

/// Home cells indexed by `Color::index()`. They double as the launch squares.
pub const HOME_CELLS: [Cell; 4] = [c(4, 2), c(2, 4), c(0, 2), c(2, 0)];

/// Paths indexed by `Color::index()`: 15 outer cells, 8 inner cells, heaven.
static PATHS: [[Cell; PATH_LEN]; 4] = [
    // Yellow
    [
        c(4, 3), c(4, 4), c(3, 4), c(2, 4), c(1, 4), c(0, 4), c(0, 3), c(0, 2),
        c(0, 1), c(0, 0), c(1, 0), c(2, 0), c(3, 0), c(4, 0), c(4, 1),
        c(3, 1), c(2, 1), c(1, 1), c(1, 2), c(1, 3), c(2, 3), c(3, 3), c(3, 2),
        HEAVEN_CELL,
    ],
    // Green
    [
        c(1, 4), c(0, 4), c(0, 3), c(0, 2), c(0, 1), c(0, 0), c(1, 0), c(2, 0),
        c(3, 0), c(4, 0), c(4, 1), c(4, 2), c(4, 3), c(4, 4), c(3, 4),
        c(3, 3), c(3, 2), c(3, 1), c(2, 1), c(1, 1), c(1, 2), c(1, 3), c(2, 3),
        HEAVEN_CELL,
    ],
    // Blue
    [
        c(0, 1), c(0, 0), c(1, 0), c(2, 0), c(3, 0), c(4, 0), c(4, 1), c(4, 2),
        c(4, 3), c(4, 4), c(3, 4), c(2, 4), c(1, 4), c(0, 4), c(0, 3),
        c(1, 3), c(2, 3), c(3, 3), c(3, 2), c(3, 1), c(2, 1), c(1, 1), c(1, 2),
        HEAVEN_CELL,
    ],
    // Red
    [
        c(3, 0), c(4, 0), c(4, 1), c(4, 2), c(4, 3), c(4, 4), c(3, 4), c(2, 4),
        c(1, 4), c(0, 4), c(0, 3), c(0, 2), c(0, 1), c(0, 0), c(1, 0),
        c(1, 1), c(1, 2), c(1, 3), c(2, 3), c(3, 3), c(3, 2), c(3, 1), c(2, 1),
        HEAVEN_CELL,
    ],
];

// =============================================================================
// QUERIES
// =============================================================================

/// Full path for a color, heaven included.
#[inline]
pub fn path(color: Color) -> &'static [Cell; PATH_LEN] {
    &PATHS[color.index()]
}

/// Cell at a path index, or `None` for home and out-of-range indices.
#[inline]
pub fn cell_at(color: Color, index: i8) -> Option<Cell> {
    if !(0..=HEAVEN).contains(&index) {
        return None;
    }
    Some(PATHS[color.index()][index as usize])
}

/// The home (and launch) cell of a color.
#[inline]
pub fn home_cell(color: Color) -> Cell {
    HOME_CELLS[color.index()]
}

/// Which color's home this cell is, if any.
pub fn home_owner(cell: Cell) -> Option<Color> {
    Color::ALL.into_iter().find(|color| home_cell(*color) == cell)
}

/// Safe cells: every home/launch cell (for every color) and heaven.
pub fn is_safe_cell(cell: Cell) -> bool {
    cell == HEAVEN_CELL || home_owner(cell).is_some()
}

/// Whether a path index is safe for a color. Home and heaven always are.
pub fn is_safe_index(color: Color, index: i8) -> bool {
    if index == HOME || index == HEAVEN {
        return true;
    }
    cell_at(color, index).is_some_and(is_safe_cell)
}

/// Outer circle index (0..=14).
#[inline]
pub fn is_outer(index: i8) -> bool {
    (0..INNER_START).contains(&index)
}

/// Inner ring index (15..=22).
#[inline]
pub fn is_inner(index: i8) -> bool {
    (INNER_START..HEAVEN).contains(&index)
}

/// On the board proper: neither home nor heaven.
#[inline]
pub fn is_on_board(index: i8) -> bool {
    (0..HEAVEN).contains(&index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn on_border(cell: Cell) -> bool {
        cell.row == 0 || cell.row == 4 || cell.col == 0 || cell.col == 4
    }

    #[test]
    fn test_paths_have_expected_shape() {
        for color in Color::ALL {
            let p = path(color);
            assert_eq!(p[HEAVEN as usize], HEAVEN_CELL);

            let outer: BTreeSet<_> = p[..INNER_START as usize].iter().copied().collect();
            assert_eq!(outer.len(), 15, "{color} outer cells must be distinct");
            assert!(outer.iter().all(|c| on_border(*c)));
            assert!(!outer.contains(&home_cell(color)), "{color} never walks over its own home");

            let inner: BTreeSet<_> = p[INNER_START as usize..HEAVEN as usize].iter().copied().collect();
            assert_eq!(inner.len(), INNER_RING_LEN as usize);
            assert!(inner.iter().all(|c| !on_border(*c) && *c != HEAVEN_CELL));
        }
    }

    #[test]
    fn test_inner_ring_is_shared() {
        let ring = |color: Color| -> BTreeSet<Cell> {
            path(color)[INNER_START as usize..HEAVEN as usize].iter().copied().collect()
        };
        for color in Color::ALL {
            assert_eq!(ring(color), ring(Color::Yellow));
        }
    }

    #[test]
    fn test_outer_circle_crosses_opponent_homes() {
        for color in Color::ALL {
            let crossed: Vec<_> = path(color)[..INNER_START as usize]
                .iter()
                .filter_map(|cell| home_owner(*cell))
                .collect();
            assert_eq!(crossed.len(), 3);
            assert!(!crossed.contains(&color));
        }
        // Yellow passes green's home at index 3
        assert_eq!(cell_at(Color::Yellow, 3), Some(home_cell(Color::Green)));
    }

    #[test]
    fn test_safe_cells() {
        for color in Color::ALL {
            assert!(is_safe_cell(home_cell(color)));
        }
        assert!(is_safe_cell(HEAVEN_CELL));
        assert!(!is_safe_cell(Cell::new(0, 0)));
        assert!(!is_safe_cell(Cell::new(1, 1)));

        assert!(is_safe_index(Color::Red, HOME));
        assert!(is_safe_index(Color::Red, HEAVEN));
        // Yellow index 7 is blue's home
        assert!(is_safe_index(Color::Yellow, 7));
        assert!(!is_safe_index(Color::Yellow, 8));
    }

    #[test]
    fn test_cell_at_bounds() {
        assert_eq!(cell_at(Color::Blue, HOME), None);
        assert_eq!(cell_at(Color::Blue, 24), None);
        assert_eq!(cell_at(Color::Blue, 0), Some(Cell::new(0, 1)));
        assert_eq!(cell_at(Color::Blue, HEAVEN), Some(HEAVEN_CELL));
    }

    #[test]
    fn test_turn_order() {
        assert_eq!(Color::turn_order(2), Some(vec![Color::Yellow, Color::Blue]));
        assert_eq!(Color::turn_order(4).map(|c| c.len()), Some(4));
        assert_eq!(Color::turn_order(3), None);
    }

    #[test]
    fn test_index_classes() {
        assert!(is_outer(0) && is_outer(OUTER_END));
        assert!(!is_outer(HOME) && !is_outer(INNER_START));
        assert!(is_inner(INNER_START) && is_inner(22));
        assert!(!is_inner(HEAVEN));
        assert!(is_on_board(22) && !is_on_board(HEAVEN) && !is_on_board(HOME));
    }
}
