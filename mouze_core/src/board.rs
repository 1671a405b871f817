use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Position, map::Grid};

/// Largest accepted number of rows or columns in a level.
pub const MAX_DIMENSION: usize = 100;

/// Represents the kind of a single board cell.
///
/// `Wall`, `Decor`, `Medium` and `High` are static terrain; the other kinds
/// are markers placed on top of open floor while a level is played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cell {
    Wall,
    #[default]
    Open,
    /// Decorative floor (`.`), walkable like open floor but never holds food.
    Decor,
    Medium,
    High,
    Spawn,
    Food,
    Mouse {
        dead: bool,
    },
    /// Marks a cell on the mouse's remaining route.
    Visiting,
}

impl Cell {
    /// Parses a level-file symbol.
    pub fn from_symbol(symbol: char) -> Option<Cell> {
        match symbol {
            '#' => Some(Cell::Wall),
            ' ' => Some(Cell::Open),
            '.' => Some(Cell::Decor),
            '@' => Some(Cell::Medium),
            '%' => Some(Cell::High),
            '&' => Some(Cell::Spawn),
            _ => None,
        }
    }

    /// Symbol used for this cell in level files and plain-text dumps.
    pub fn symbol(self) -> char {
        match self {
            Cell::Wall => '#',
            Cell::Open => ' ',
            Cell::Decor => '.',
            Cell::Medium => '@',
            Cell::High => '%',
            Cell::Spawn => '&',
            Cell::Food => '*',
            Cell::Mouse { dead: false } => 'M',
            Cell::Mouse { dead: true } => 'X',
            Cell::Visiting => 'C',
        }
    }

    #[inline]
    pub fn is_traversable(self) -> bool {
        self != Cell::Wall
    }

    /// Cells food may be placed on.
    #[inline]
    pub fn is_empty(self) -> bool {
        matches!(self, Cell::Open | Cell::Visiting)
    }

    #[inline]
    pub fn is_food(self) -> bool {
        self == Cell::Food
    }

    /// Medium or high difficulty terrain.
    #[inline]
    pub fn is_elevated(self) -> bool {
        matches!(self, Cell::Medium | Cell::High)
    }

    /// Cost of entering this cell.
    #[inline]
    pub fn terrain_cost(self) -> u32 {
        match self {
            Cell::Medium => 5,
            Cell::High => 10,
            _ => 1,
        }
    }
}

/// One level's playing field.
///
/// The board keeps the pristine terrain next to the live cells so that
/// markers (spawn, mouse, route) can be wiped without losing terrain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    terrain: Grid<Cell>,
    cells: Grid<Cell>,
    spawn: Position,
    food: Option<Position>,
}

impl Board {
    /// Builds a board from a grid holding exactly one `Spawn` cell.
    ///
    /// Returns `None` when the spawn cell is missing.
    pub fn new(cells: Grid<Cell>) -> Option<Self> {
        let spawn = cells
            .enumerate()
            .find_map(|(position, cell)| (*cell == Cell::Spawn).then_some(position))?;
        let terrain = Grid::from_generator(cells.rows(), cells.cols(), |position| {
            match cells[position] {
                cell @ (Cell::Wall | Cell::Decor | Cell::Medium | Cell::High) => cell,
                _ => Cell::Open,
            }
        });
        let food = cells
            .enumerate()
            .find_map(|(position, cell)| cell.is_food().then_some(position));
        Some(Board {
            terrain,
            cells,
            spawn,
            food,
        })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.cells.rows()
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cells.cols()
    }

    #[inline]
    pub fn spawn(&self) -> Position {
        self.spawn
    }

    /// Position of the food currently on the board, if any.
    #[inline]
    pub fn food(&self) -> Option<Position> {
        self.food
    }

    /// Live cells, including markers.
    pub fn cells(&self) -> &Grid<Cell> {
        &self.cells
    }

    /// Returns the cell at `position`, or `None` outside the board.
    #[inline]
    pub fn cell(&self, position: Position) -> Option<Cell> {
        self.cells.get(position).copied()
    }

    /// A position the mouse may step on: inside the board and not a wall.
    #[inline]
    pub fn is_valid(&self, position: Position) -> bool {
        self.cell(position).is_some_and(Cell::is_traversable)
    }

    /// Cost of entering `position`, or `None` outside the board.
    pub fn terrain_cost(&self, position: Position) -> Option<u32> {
        self.cell(position).map(Cell::terrain_cost)
    }

    /// First food cell in row-major order.
    pub fn find_food(&self) -> Option<Position> {
        self.cells
            .enumerate()
            .find_map(|(position, cell)| cell.is_food().then_some(position))
    }

    /// Moves the food to a random empty cell.
    ///
    /// Any food already on the board is removed first. When no empty cell
    /// remains nothing is placed and `None` is returned.
    pub fn place_food_randomly<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Position> {
        if let Some(previous) = self.food {
            self.clear_food_at(previous);
        }

        let empty: Vec<Position> = self
            .cells
            .enumerate()
            .filter_map(|(position, cell)| cell.is_empty().then_some(position))
            .collect();
        if empty.is_empty() {
            return None;
        }

        let position = empty[rng.random_range(0..empty.len())];
        self.cells[position] = Cell::Food;
        self.food = Some(position);
        Some(position)
    }

    /// Resets a food cell back to its terrain.
    pub fn clear_food_at(&mut self, position: Position) {
        if self.cell(position).is_some_and(Cell::is_food) {
            self.cells[position] = self.terrain[position];
        }
        if self.food == Some(position) {
            self.food = None;
        }
    }

    /// Restores every cell except food from the terrain layer.
    ///
    /// The spawn marker is only drawn again when `first_entry` is set.
    pub fn reset_dynamic_markers(&mut self, first_entry: bool) {
        let terrain = &self.terrain;
        for (position, cell) in self.cells.enumerate_mut() {
            if !cell.is_food() {
                *cell = terrain[position];
            }
        }
        if first_entry {
            self.cells[self.spawn] = Cell::Spawn;
        }
    }

    /// Draws the mouse at `position`, leaving every other cell untouched.
    pub fn stamp_agent(&mut self, position: Position, dead: bool) {
        if let Some(cell) = self.cells.get_mut(position) {
            *cell = Cell::Mouse { dead };
        }
    }

    /// Marks the empty cells along a route as `Visiting`.
    pub fn stamp_visiting<I>(&mut self, route: I)
    where
        I: IntoIterator<Item = Position>,
    {
        for position in route {
            if let Some(cell) = self.cells.get_mut(position) {
                if *cell == Cell::Open {
                    *cell = Cell::Visiting;
                }
            }
        }
    }

    /// Number of food cells on the board.
    pub fn food_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_food()).count()
    }

    /// Renders the live cells with their level-file symbols, one line per row.
    pub fn to_text(&self) -> String {
        let mut text = String::with_capacity(self.rows() * (self.cols() + 1));
        for row in 0..self.rows() {
            text.extend(self.cells.row(row).map(|cell| cell.symbol()));
            text.push('\n');
        }
        text
    }
}

/// A validated level: its board plus the bookkeeping the controller needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    /// 1-based position of the level in its source file.
    pub number: usize,
    pub board: Board,
    /// Medium and high difficulty cells.
    pub elevated: Vec<Position>,
}

impl Level {
    pub fn new(number: usize, board: Board) -> Self {
        let elevated = board
            .cells()
            .enumerate()
            .filter_map(|(position, cell)| cell.is_elevated().then_some(position))
            .collect();
        Level {
            number,
            board,
            elevated,
        }
    }

    #[inline]
    pub fn spawn(&self) -> Position {
        self.board.spawn()
    }

    /// Restores the board between rounds. See [`Board::reset_dynamic_markers`].
    pub fn reset(&mut self, first_entry: bool) {
        self.board.reset_dynamic_markers(first_entry);
    }
}
