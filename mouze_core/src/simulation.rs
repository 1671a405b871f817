use std::time::Duration;

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    agent::Agent,
    board::{Board, Cell, Level},
    config::SimulationConfig,
    level_file::LevelFileError,
    planner::Strategy,
};

/// Points for a step onto open ground.
pub const STEP_POINTS: usize = 5;
/// Points for eating food.
pub const FOOD_POINTS: usize = 100;
/// Points for clearing a level.
pub const LEVEL_POINTS: usize = 250;

/// States of the game loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameState {
    Start,
    Welcome,
    LoadLevel,
    Thinking,
    Running,
    Eating,
    Crashed,
    LevelUp,
    Won,
    Lost,
    End,
}

/// What the mouse ran into on its last move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveOutcome {
    Open,
    Food,
    Wall,
    /// No route was found; the mouse waits for the next tick.
    Stay,
}

/// Points where the loop waits for the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    Welcome,
    LifeLost { lives_left: usize },
    LevelCleared { level: usize },
}

/// Everything a renderer needs to draw one tick.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub board: &'a Board,
    pub state: GameState,
    /// 1-based index of the level being played.
    pub level: usize,
    pub level_count: usize,
    pub lives: usize,
    pub size: usize,
    pub food_quota: usize,
    pub score: usize,
    pub strategy: Strategy,
}

/// Output side of the simulation.
pub trait Renderer {
    type Error;

    /// Draws the current tick.
    fn draw(&mut self, frame: &Frame<'_>) -> Result<(), Self::Error>;

    /// Waits between two animation frames.
    fn pace(&mut self, delay: Duration) -> Result<(), Self::Error> {
        std::thread::sleep(delay);
        Ok(())
    }

    /// Blocks until the player acknowledges `prompt`.
    fn acknowledge(&mut self, prompt: Prompt, frame: &Frame<'_>) -> Result<(), Self::Error>;
}

/// Final result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub won: bool,
    pub score: usize,
    pub lives: usize,
    pub levels_cleared: usize,
}

/// The game controller: owns the levels and the mouse and steps the state machine.
#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    levels: Vec<Level>,
    current: usize,
    state: GameState,
    agent: Agent,
    rng: StdRng,
    /// Next `LoadLevel` puts the mouse back on the spawn point.
    first_entry: bool,
    last_move: MoveOutcome,
    has_next_level: bool,
    levels_cleared: usize,
}

impl Simulation {
    /// Creates a simulation in the `Start` state.
    pub fn new(config: SimulationConfig, levels: Vec<Level>) -> Result<Self, LevelFileError> {
        let Some(first) = levels.first() else {
            return Err(LevelFileError::NoValidLevels);
        };
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let agent = Agent::new(first.spawn(), config.lives, config.player, rng.random());
        Ok(Self {
            config,
            levels,
            current: 0,
            state: GameState::Start,
            agent,
            rng,
            first_entry: true,
            last_move: MoveOutcome::Stay,
            has_next_level: false,
            levels_cleared: 0,
        })
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn is_over(&self) -> bool {
        self.state == GameState::End
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// The level being played.
    pub fn level(&self) -> &Level {
        &self.levels[self.current]
    }

    pub fn last_move(&self) -> MoveOutcome {
        self.last_move
    }

    pub fn frame(&self) -> Frame<'_> {
        let level = self.level();
        Frame {
            board: &level.board,
            state: self.state,
            level: self.current + 1,
            level_count: self.levels.len(),
            lives: self.agent.lives(),
            size: self.agent.size(),
            food_quota: self.config.food,
            score: self.agent.score(),
            strategy: self.agent.strategy(),
        }
    }

    pub fn outcome(&self) -> Outcome {
        Outcome {
            won: self.state == GameState::Won
                || (self.state == GameState::End && self.levels_cleared == self.levels.len()),
            score: self.agent.score(),
            lives: self.agent.lives(),
            levels_cleared: self.levels_cleared,
        }
    }

    /// Runs ticks until the terminal state is reached.
    pub fn run<R: Renderer>(&mut self, renderer: &mut R) -> Result<Outcome, R::Error> {
        while !self.is_over() {
            self.tick(renderer)?;
        }
        Ok(self.outcome())
    }

    /// One loop iteration: handle the current state, move to the next one,
    /// then draw. Returns the new state.
    pub fn tick<R: Renderer>(&mut self, renderer: &mut R) -> Result<GameState, R::Error> {
        let handled = self.state;
        self.process_events(renderer)?;
        self.update();
        self.render(renderer, handled)?;
        Ok(self.state)
    }

    fn process_events<R: Renderer>(&mut self, renderer: &mut R) -> Result<(), R::Error> {
        match self.state {
            GameState::Start => {
                info!(
                    fps = self.config.fps,
                    lives = self.config.lives,
                    food = self.config.food,
                    player = %self.config.player,
                    levels = self.levels.len(),
                    "Starting simulation"
                );
            }
            GameState::Welcome => renderer.acknowledge(Prompt::Welcome, &self.frame())?,
            GameState::LoadLevel => self.load_level(),
            GameState::Thinking => self.think(),
            GameState::Running => {
                let board = &mut self.levels[self.current].board;
                board.reset_dynamic_markers(false);
                if self.config.show_path {
                    board.stamp_visiting(self.agent.remaining_route());
                }
                board.stamp_agent(self.agent.head(), self.last_move == MoveOutcome::Wall);
            }
            GameState::Eating => self.agent.grow(),
            GameState::Crashed => {
                let lives_left = self.agent.lives().saturating_sub(1);
                renderer.acknowledge(Prompt::LifeLost { lives_left }, &self.frame())?;
                self.agent.lose_life();
                self.agent.invalidate_plan();
                let board = &mut self.levels[self.current].board;
                if let Some(food) = board.food() {
                    board.clear_food_at(food);
                }
                self.first_entry = true;
            }
            GameState::LevelUp => {
                self.agent.award(LEVEL_POINTS);
                self.levels_cleared += 1;
                info!(
                    level = self.level().number,
                    score = self.agent.score(),
                    "Level completed"
                );
                self.has_next_level = self.current + 1 < self.levels.len();
                if self.has_next_level {
                    let cleared = self.current + 1;
                    renderer.acknowledge(Prompt::LevelCleared { level: cleared }, &self.frame())?;
                    self.current += 1;
                    let spawn = self.levels[self.current].spawn();
                    self.agent = Agent::carry_over(&self.agent, spawn, self.rng.random());
                    self.first_entry = true;
                }
            }
            GameState::Won => info!(score = self.agent.score(), "All levels cleared"),
            GameState::Lost => info!(score = self.agent.score(), "No lives left"),
            GameState::End => {}
        }
        Ok(())
    }

    fn load_level(&mut self) {
        let level = &mut self.levels[self.current];
        if self.first_entry {
            level.reset(true);
            self.agent.move_to(level.spawn());
            self.agent.invalidate_plan();
            self.first_entry = false;
            debug!(level = level.number, spawn = ?level.spawn(), "Mouse placed on spawn");
        }
        level.board.stamp_agent(self.agent.head(), false);
        if level.board.food().is_none() {
            match level.board.place_food_randomly(&mut self.rng) {
                Some(food) => debug!(?food, "Food placed"),
                None => debug!("No empty cell left for food"),
            }
        }
    }

    /// Asks the mouse for a step and resolves where it lands.
    fn think(&mut self) {
        let board = &self.levels[self.current].board;
        let Some((next, direction)) = self.agent.next_move(board) else {
            self.last_move = MoveOutcome::Stay;
            return;
        };

        self.last_move = classify(board.cell(next));
        match self.last_move {
            MoveOutcome::Open => {
                self.agent.move_to(next);
                self.agent.award(STEP_POINTS);
            }
            MoveOutcome::Food => {
                self.agent.move_to(next);
                self.levels[self.current].board.clear_food_at(next);
                self.agent.invalidate_plan();
                self.agent.award(FOOD_POINTS);
            }
            MoveOutcome::Wall => {
                self.agent.invalidate_plan();
                debug!(head = ?self.agent.head(), ?direction, "Mouse hit a wall");
            }
            MoveOutcome::Stay => {}
        }
    }

    fn update(&mut self) {
        let next = match self.state {
            GameState::Start => GameState::Welcome,
            GameState::Welcome => GameState::LoadLevel,
            GameState::LoadLevel => GameState::Thinking,
            GameState::Thinking => GameState::Running,
            GameState::Running => match self.last_move {
                MoveOutcome::Food => GameState::Eating,
                MoveOutcome::Wall => GameState::Crashed,
                MoveOutcome::Open | MoveOutcome::Stay => GameState::Thinking,
            },
            GameState::Eating => {
                if self.agent.size() >= self.config.food {
                    GameState::LevelUp
                } else {
                    GameState::LoadLevel
                }
            }
            GameState::Crashed => {
                if self.agent.lives() > 0 {
                    GameState::LoadLevel
                } else {
                    GameState::Lost
                }
            }
            GameState::LevelUp => {
                if self.has_next_level {
                    GameState::LoadLevel
                } else {
                    GameState::Won
                }
            }
            GameState::Won | GameState::Lost | GameState::End => GameState::End,
        };
        if next != self.state {
            debug!(from = ?self.state, to = ?next, "State transition");
        }
        self.state = next;
    }

    fn render<R: Renderer>(&self, renderer: &mut R, handled: GameState) -> Result<(), R::Error> {
        renderer.draw(&self.frame())?;
        let delay = self.config.frame_delay();
        if matches!(handled, GameState::LoadLevel | GameState::Running) && !delay.is_zero() {
            renderer.pace(delay)?;
        }
        Ok(())
    }
}

fn classify(cell: Option<Cell>) -> MoveOutcome {
    match cell {
        Some(Cell::Food) => MoveOutcome::Food,
        Some(Cell::Wall) | None => MoveOutcome::Wall,
        Some(_) => MoveOutcome::Open,
    }
}
