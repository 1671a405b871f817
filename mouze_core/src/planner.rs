use std::{
    cmp::{Ordering, Reverse},
    collections::{BinaryHeap, HashMap, HashSet},
    fmt,
    str::FromStr,
};

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Direction, Position,
    board::{Board, Cell},
};

/// A route from (but excluding) a start cell, one entry per step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    positions: Vec<Position>,
    directions: Vec<Direction>,
}

impl Path {
    /// A path made of a single step.
    pub fn single(position: Position, direction: Direction) -> Self {
        Path {
            positions: vec![position],
            directions: vec![direction],
        }
    }

    fn from_steps(steps: Vec<(Position, Direction)>) -> Self {
        let (positions, directions) = steps.into_iter().unzip();
        Path {
            positions,
            directions,
        }
    }

    /// Builds a path from consecutive adjacent positions, `start` excluded.
    fn from_positions(start: Position, positions: Vec<Position>) -> Self {
        let mut previous = start;
        let mut directions = Vec::with_capacity(positions.len());
        for &position in &positions {
            // Positions come from neighbour expansion, so they are always adjacent.
            if let Some(direction) = Direction::between(previous, position) {
                directions.push(direction);
            }
            previous = position;
        }
        Path {
            positions,
            directions,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn directions(&self) -> &[Direction] {
        &self.directions
    }

    /// Iterates over `(position, direction)` pairs in walking order.
    pub fn steps(&self) -> impl Iterator<Item = (Position, Direction)> + '_ {
        self.positions
            .iter()
            .copied()
            .zip(self.directions.iter().copied())
    }

    /// Sum of the terrain cost of every entered cell, `None` if the path
    /// leaves the board.
    pub fn cost(&self, board: &Board) -> Option<u32> {
        self.positions
            .iter()
            .map(|position| board.terrain_cost(*position))
            .sum()
    }
}

/// Result of one planning call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub path: Path,
    pub success: bool,
    /// Distinct cells expanded by the search.
    pub expanded: usize,
}

impl Plan {
    fn found(path: Path, expanded: usize) -> Self {
        Plan {
            path,
            success: true,
            expanded,
        }
    }

    fn failed(expanded: usize) -> Self {
        Plan {
            path: Path::default(),
            success: false,
            expanded,
        }
    }
}

/// Movement strategy of the mouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Strategy {
    Random,
    #[default]
    Backtracking,
    AStar,
}

impl Strategy {
    /// Name as written in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            Strategy::Random => "random",
            Strategy::Backtracking => "backtracking",
            Strategy::AStar => "A*",
        }
    }

    /// Parses a strategy name, falling back to `Random` for unknown names.
    pub fn from_name_lossy(name: &str) -> Strategy {
        name.parse().unwrap_or_else(|_| {
            tracing::warn!("Unknown player type '{}', using random movement", name);
            Strategy::Random
        })
    }

    /// Creates a planner for this strategy.
    pub fn planner(self, seed: u64) -> Box<dyn Planner> {
        match self {
            Strategy::Random => Box::new(RandomWalk::new(seed)),
            Strategy::Backtracking => Box::new(Backtracking::new(seed)),
            Strategy::AStar => Box::new(AStar),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown player type '{0}' (expected random, backtracking or A*)")]
pub struct UnknownStrategy(pub String);

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(Strategy::Random),
            "backtracking" => Ok(Strategy::Backtracking),
            "a*" | "astar" | "a-star" => Ok(Strategy::AStar),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}

/// Trait defining a path planning strategy.
/// Planners only read the board; `&mut self` lets them own a random source.
pub trait Planner {
    fn strategy(&self) -> Strategy;

    /// Plans a route from `start` toward the food on `board`.
    fn plan(&mut self, board: &Board, start: Position) -> Plan;
}

/// Picks a random step, preferring cells that are not walls.
#[derive(Debug)]
pub struct RandomWalk {
    rng: StdRng,
}

impl RandomWalk {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Chooses one step from `start`.
    ///
    /// When every neighbour is blocked any direction may be returned, even one
    /// leading into a wall or off the board.
    pub fn step(&mut self, board: &Board, start: Position) -> (Position, Direction) {
        let mut candidates: Vec<Direction> = Direction::ALL
            .into_iter()
            .filter(|direction| board.is_valid(start.step(*direction)))
            .collect();
        if candidates.is_empty() {
            candidates = Direction::ALL.to_vec();
        }
        candidates.shuffle(&mut self.rng);
        let direction = candidates[0];
        (start.step(direction), direction)
    }
}

impl Planner for RandomWalk {
    fn strategy(&self) -> Strategy {
        Strategy::Random
    }

    fn plan(&mut self, board: &Board, start: Position) -> Plan {
        let (position, direction) = self.step(board, start);
        Plan::found(Path::single(position, direction), 0)
    }
}

/// Depth-first search for the food, with a random step when it is unreachable.
///
/// Unlike a plain fixed-order DFS, the unvisited neighbours of a cell are
/// pushed so that the one closest to the food is explored first; ties keep
/// the N, S, E, W order. On open ground this crosses straight to the food
/// instead of sweeping the room. Each cell is still visited at most once and
/// the first route found is returned, which need not be the shortest.
#[derive(Debug)]
pub struct Backtracking {
    fallback: RandomWalk,
}

impl Backtracking {
    pub fn new(seed: u64) -> Self {
        Self {
            fallback: RandomWalk::new(seed),
        }
    }

    /// Runs the search. Returns the route to the first food reached and the
    /// number of visited cells.
    fn search(board: &Board, start: Position) -> (Option<Path>, usize) {
        let target = board.find_food();
        let mut stack: Vec<(Position, Option<(Position, Direction)>)> = vec![(start, None)];
        let mut came_from: HashMap<Position, (Position, Direction)> = HashMap::new();
        let mut visited: HashSet<Position> = HashSet::new();

        while let Some((current, link)) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if let Some(link) = link {
                came_from.insert(current, link);
            }

            if board.cell(current).is_some_and(Cell::is_food) {
                let path = Self::reconstruct(start, current, &came_from);
                return (Some(path), visited.len());
            }

            let mut neighbors: Vec<(Position, Direction)> = Direction::ALL
                .into_iter()
                .map(|direction| (current.step(direction), direction))
                .filter(|(next, _)| board.is_valid(*next) && !visited.contains(next))
                .collect();
            // The last pushed entry is explored first: keep the closest to the food on top.
            if let Some(target) = target {
                neighbors.sort_by_key(|(next, _)| Reverse(next.manhattan_distance(target)));
            }
            stack.extend(
                neighbors
                    .into_iter()
                    .map(|(next, direction)| (next, Some((current, direction)))),
            );
        }

        (None, visited.len())
    }

    fn reconstruct(
        start: Position,
        goal: Position,
        came_from: &HashMap<Position, (Position, Direction)>,
    ) -> Path {
        let mut steps = Vec::new();
        let mut current = goal;
        while current != start {
            let Some(&(previous, direction)) = came_from.get(&current) else {
                break;
            };
            steps.push((current, direction));
            current = previous;
        }
        steps.reverse();
        Path::from_steps(steps)
    }
}

impl Planner for Backtracking {
    fn strategy(&self) -> Strategy {
        Strategy::Backtracking
    }

    fn plan(&mut self, board: &Board, start: Position) -> Plan {
        match Self::search(board, start) {
            (Some(path), expanded) => Plan::found(path, expanded),
            (None, expanded) => {
                let (position, direction) = self.fallback.step(board, start);
                debug!(
                    ?start,
                    expanded, "No route to food, taking a random step {:?}", direction
                );
                Plan::found(Path::single(position, direction), expanded)
            }
        }
    }
}

/// Weighted shortest path to the food using terrain costs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AStar;

// For priority queue
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct Frontier {
    priority: u32,
    cost: u32,
    position: Position,
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior; on equal priority prefer the
        // entry that has already travelled further.
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| self.cost.cmp(&other.cost))
            .then_with(|| other.position.cmp(&self.position))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl AStar {
    fn search(board: &Board, start: Position, goal: Position) -> (Option<Vec<Position>>, usize) {
        let mut frontier = BinaryHeap::new();
        let mut came_from: HashMap<Position, Position> = HashMap::new();
        let mut cost_so_far: HashMap<Position, u32> = HashMap::new();
        let mut expanded = 0;

        frontier.push(Frontier {
            priority: start.manhattan_distance(goal),
            cost: 0,
            position: start,
        });
        cost_so_far.insert(start, 0);

        while let Some(Frontier {
            cost,
            position: current,
            ..
        }) = frontier.pop()
        {
            if cost_so_far.get(&current).is_some_and(|&best| cost > best) {
                continue;
            }
            expanded += 1;

            if current == goal {
                return (Some(Self::reconstruct(start, goal, &came_from)), expanded);
            }

            for direction in Direction::ALL {
                let next = current.step(direction);
                if !board.is_valid(next) {
                    continue;
                }
                let Some(step_cost) = board.terrain_cost(next) else {
                    continue;
                };
                let new_cost = cost + step_cost;
                if cost_so_far.get(&next).is_none_or(|&known| new_cost < known) {
                    cost_so_far.insert(next, new_cost);
                    came_from.insert(next, current);
                    frontier.push(Frontier {
                        priority: new_cost + next.manhattan_distance(goal),
                        cost: new_cost,
                        position: next,
                    });
                }
            }
        }

        (None, expanded)
    }

    fn reconstruct(
        start: Position,
        goal: Position,
        came_from: &HashMap<Position, Position>,
    ) -> Vec<Position> {
        let mut path = Vec::new();
        let mut current = goal;
        while current != start {
            path.push(current);
            match came_from.get(&current) {
                Some(previous) => current = *previous,
                None => break,
            }
        }
        path.reverse();
        path
    }
}

impl Planner for AStar {
    fn strategy(&self) -> Strategy {
        Strategy::AStar
    }

    fn plan(&mut self, board: &Board, start: Position) -> Plan {
        let Some(goal) = board.find_food() else {
            return Plan::failed(0);
        };
        match Self::search(board, start, goal) {
            (Some(positions), expanded) => {
                Plan::found(Path::from_positions(start, positions), expanded)
            }
            (None, expanded) => {
                debug!(?start, ?goal, expanded, "Food is unreachable");
                Plan::failed(expanded)
            }
        }
    }
}
