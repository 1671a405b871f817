use std::{collections::VecDeque, fmt};

use crate::{
    Direction, Position,
    board::Board,
    planner::{Planner, Strategy},
};

/// The mouse: its play state plus the route it is currently following.
///
/// The agent never changes its own score; the controller awards points.
pub struct Agent {
    head: Position,
    size: usize,
    score: usize,
    lives: usize,
    planner: Box<dyn Planner>,
    current_plan: VecDeque<(Position, Direction)>,
}

impl Agent {
    pub fn new(spawn: Position, lives: usize, strategy: Strategy, seed: u64) -> Self {
        Self {
            head: spawn,
            size: 0,
            score: 0,
            lives,
            planner: strategy.planner(seed),
            current_plan: VecDeque::new(),
        }
    }

    /// Creates the agent for the next level, keeping score and lives.
    pub fn carry_over(previous: &Agent, spawn: Position, seed: u64) -> Self {
        let mut agent = Agent::new(spawn, previous.lives, previous.strategy(), seed);
        agent.score = previous.score;
        agent
    }

    /// Next step toward the food.
    ///
    /// Follows the cached route and only asks the planner for a new one when
    /// it is used up. Returns `None` when the planner found no route.
    pub fn next_move(&mut self, board: &Board) -> Option<(Position, Direction)> {
        if self.current_plan.is_empty() {
            let plan = self.planner.plan(board, self.head);
            if !plan.success {
                return None;
            }
            self.current_plan.extend(plan.path.steps());
        }
        self.current_plan.pop_front()
    }

    /// Positions still ahead on the cached route.
    pub fn remaining_route(&self) -> impl Iterator<Item = Position> + '_ {
        self.current_plan.iter().map(|(position, _)| *position)
    }

    /// Forgets the cached route; the next move plans from scratch.
    pub fn invalidate_plan(&mut self) {
        self.current_plan.clear();
    }

    pub fn move_to(&mut self, position: Position) {
        self.head = position;
    }

    pub fn grow(&mut self) {
        self.size += 1;
    }

    pub fn award(&mut self, points: usize) {
        self.score += points;
    }

    pub fn lose_life(&mut self) {
        self.lives = self.lives.saturating_sub(1);
    }

    pub fn head(&self) -> Position {
        self.head
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn lives(&self) -> usize {
        self.lives
    }

    pub fn strategy(&self) -> Strategy {
        self.planner.strategy()
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("head", &self.head)
            .field("size", &self.size)
            .field("score", &self.score)
            .field("lives", &self.lives)
            .field("strategy", &self.strategy())
            .field("planned_steps", &self.current_plan.len())
            .finish()
    }
}
