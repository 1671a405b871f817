use std::{convert::Infallible, time::Duration};

use mouze_core::{
    config::SimulationConfig,
    level_file::parse_levels,
    planner::Strategy,
    simulation::{Frame, GameState, Prompt, Renderer, Simulation},
};

const TWO_LEVELS: &str = "\
5 7
#######
#&  @ #
# # % #
#     #
#######

4 6
######
#  %&#
#@   #
######
";

/// Renderer that records what it is shown and checks the board on every tick.
#[derive(Default)]
struct Recorder {
    states: Vec<GameState>,
    prompts: Vec<Prompt>,
    scores: Vec<usize>,
    max_food_on_board: usize,
}

impl Renderer for Recorder {
    type Error = Infallible;

    fn draw(&mut self, frame: &Frame<'_>) -> Result<(), Infallible> {
        self.states.push(frame.state);
        self.scores.push(frame.score);
        self.max_food_on_board = self.max_food_on_board.max(frame.board.food_count());
        Ok(())
    }

    fn pace(&mut self, _delay: Duration) -> Result<(), Infallible> {
        Ok(())
    }

    fn acknowledge(&mut self, prompt: Prompt, _frame: &Frame<'_>) -> Result<(), Infallible> {
        self.prompts.push(prompt);
        Ok(())
    }
}

fn config(player: Strategy, food: usize, seed: u64) -> SimulationConfig {
    SimulationConfig {
        fps: 0,
        lives: 3,
        food,
        player,
        show_path: false,
        seed: Some(seed),
    }
}

fn simulation(text: &str, config: SimulationConfig) -> Simulation {
    let parsed = parse_levels(text);
    assert!(parsed.rejected.is_empty(), "{:?}", parsed.rejected);
    Simulation::new(config, parsed.levels).unwrap()
}

#[test]
fn level_up_happens_on_the_quota_th_food() {
    let mut sim = simulation(TWO_LEVELS, config(Strategy::Backtracking, 3, 4));
    let mut recorder = Recorder::default();

    let mut eaten = 0;
    loop {
        let before = sim.state();
        if before == GameState::Eating {
            eaten += 1;
        }
        let after = sim.tick(&mut recorder).unwrap();
        if after == GameState::LevelUp {
            assert_eq!(before, GameState::Eating);
            assert_eq!(eaten, 3);
            assert_eq!(sim.agent().size(), 3);
            break;
        }
        assert!(eaten < 3, "quota reached without a level up");
    }
}

#[test]
fn both_levels_are_cleared_with_score_and_lives_carried_over() {
    for strategy in [Strategy::Backtracking, Strategy::AStar] {
        let mut sim = simulation(TWO_LEVELS, config(strategy, 2, 11));
        let mut recorder = Recorder::default();
        let outcome = sim.run(&mut recorder).unwrap();

        assert!(outcome.won, "{} did not win", strategy);
        assert_eq!(outcome.levels_cleared, 2);
        assert_eq!(outcome.lives, 3);
        // two levels with two food each
        assert!(outcome.score >= 2 * 250 + 4 * 100);
        assert_eq!(
            recorder.prompts,
            vec![Prompt::Welcome, Prompt::LevelCleared { level: 1 }]
        );
        assert!(recorder.scores.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(recorder.states.last(), Some(&GameState::End));
        assert!(recorder.states.contains(&GameState::Won));
    }
}

#[test]
fn at_most_one_food_is_ever_on_the_board() {
    for (strategy, seed) in [
        (Strategy::Backtracking, 1),
        (Strategy::AStar, 2),
        (Strategy::Random, 3),
    ] {
        let mut sim = simulation(TWO_LEVELS, config(strategy, 4, seed));
        let mut recorder = Recorder::default();
        for _ in 0..2_000 {
            if sim.is_over() {
                break;
            }
            sim.tick(&mut recorder).unwrap();
        }
        assert!(recorder.max_food_on_board <= 1);
    }
}

#[test]
fn a_star_strategy_moves_the_mouse() {
    let mut sim = simulation(TWO_LEVELS, config(Strategy::AStar, 1, 5));
    let mut recorder = Recorder::default();
    let start = sim.level().spawn();
    while sim.state() != GameState::Eating {
        sim.tick(&mut recorder).unwrap();
    }
    assert_ne!(sim.agent().head(), start);
    assert_eq!(sim.level().board.food(), None);
}

#[test]
fn running_out_of_lives_ends_the_run() {
    let mut config = config(Strategy::Random, 5, 0);
    config.lives = 3;
    let mut sim = simulation("3 3\n###\n#&#\n###\n", config);
    let mut recorder = Recorder::default();
    let outcome = sim.run(&mut recorder).unwrap();

    assert!(!outcome.won);
    assert_eq!(
        recorder.prompts,
        vec![
            Prompt::Welcome,
            Prompt::LifeLost { lives_left: 2 },
            Prompt::LifeLost { lives_left: 1 },
            Prompt::LifeLost { lives_left: 0 },
        ]
    );
    let crashes = recorder
        .states
        .iter()
        .filter(|s| **s == GameState::Crashed)
        .count();
    assert_eq!(crashes, 3);
}

#[test]
fn bundled_levels_load_and_can_be_played() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../levels/levels.dat");
    let levels = mouze_core::level_file::load_levels(&path).unwrap();
    assert_eq!(levels.len(), 3);

    let mut sim = Simulation::new(config(Strategy::AStar, 2, 21), levels).unwrap();
    let outcome = sim.run(&mut Recorder::default()).unwrap();
    assert!(outcome.won);
    assert_eq!(outcome.levels_cleared, 3);
}
