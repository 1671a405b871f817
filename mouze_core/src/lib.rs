use serde::{Deserialize, Serialize};

pub mod agent;
pub mod board;
pub mod config;
pub mod level_file;
pub mod map;
pub mod planner;
pub mod simulation;

/// Represents a 2D coordinate as `(row, col)`.
///
/// Coordinates are signed so that a step off the edge of the board is still
/// a position; the board simply reports it as out of bounds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Returns the neighbouring position one step in `direction`.
    #[inline]
    pub fn step(self, direction: Direction) -> Position {
        let (dr, dc) = direction.offset();
        Position {
            row: self.row + dr,
            col: self.col + dc,
        }
    }

    /// Returns manhattan distance between two positions
    #[inline]
    pub fn manhattan_distance(self, other: Position) -> u32 {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

/// The four moves available to the mouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// All directions, in the order the planners enumerate them.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Unit displacement as `(row, col)`.
    #[inline]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (-1, 0),
            Direction::South => (1, 0),
            Direction::East => (0, 1),
            Direction::West => (0, -1),
        }
    }

    /// Direction that moves `from` onto the adjacent position `to`.
    pub fn between(from: Position, to: Position) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|direction| from.step(*direction) == to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_order_by_row_then_column() {
        let mut positions = vec![
            Position::new(1, 0),
            Position::new(0, 3),
            Position::new(0, 1),
        ];
        positions.sort();
        assert_eq!(
            positions,
            vec![
                Position::new(0, 1),
                Position::new(0, 3),
                Position::new(1, 0)
            ]
        );
    }

    #[test]
    fn steps_follow_row_col_convention() {
        let origin = Position::new(2, 2);
        assert_eq!(origin.step(Direction::North), Position::new(1, 2));
        assert_eq!(origin.step(Direction::South), Position::new(3, 2));
        assert_eq!(origin.step(Direction::East), Position::new(2, 3));
        assert_eq!(origin.step(Direction::West), Position::new(2, 1));
        assert_eq!(Position::new(0, 0).step(Direction::North).row, -1);
    }

    #[test]
    fn direction_between_adjacent_cells() {
        let a = Position::new(3, 3);
        assert_eq!(
            Direction::between(a, Position::new(3, 4)),
            Some(Direction::East)
        );
        assert_eq!(Direction::between(a, Position::new(5, 3)), None);
        assert_eq!(a.manhattan_distance(Position::new(0, 5)), 5);
    }
}
