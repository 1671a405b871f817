mod ui;

use std::{fs::File, path::PathBuf, process::ExitCode, sync::Mutex};

use anyhow::{Context, Result, bail};
use clap::Parser;
use mouze_core::{
    config::SimulationConfig,
    level_file::load_levels,
    planner::Strategy,
    simulation::Simulation,
};
use tracing::{Level, info};

use crate::ui::{TerminalRenderer, UserQuit, restore_terminal, setup_terminal};

#[derive(Parser, Debug)]
#[command(name = "mouze", version, about = "A mouse looking for food in a maze", long_about = None)]
struct Args {
    /// Level file to play
    #[arg(value_name = "LEVEL_FILE")]
    levels: PathBuf,

    /// Settings file; command-line flags take precedence over it
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Pause between frames, in milliseconds
    #[arg(long)]
    fps: Option<u64>,

    /// Lives at the start of the run
    #[arg(long)]
    lives: Option<usize>,

    /// Food to eat before a level is cleared
    #[arg(long)]
    food: Option<usize>,

    /// Movement strategy: random, backtracking or A*
    #[arg(long, value_name = "TYPE")]
    playertype: Option<String>,

    /// Draw the route the mouse is following
    #[arg(long)]
    show_path: bool,

    /// Seed for food placement and random moves
    #[arg(long)]
    seed: Option<u64>,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

impl Args {
    /// Settings from the defaults, then the `.ini` file, then the flags.
    fn simulation_config(&self) -> Result<SimulationConfig> {
        let mut config = SimulationConfig::default();
        match &self.config {
            Some(path) => config.apply_ini_file(path)?,
            None => info!("No settings file given, using defaults"),
        }
        if let Some(fps) = self.fps {
            config.fps = fps;
        }
        if let Some(lives) = self.lives {
            config.lives = lives;
        }
        if let Some(food) = self.food {
            config.food = food;
        }
        if let Some(name) = &self.playertype {
            config.player = Strategy::from_name_lossy(name);
        }
        if self.show_path {
            config.show_path = true;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        Ok(config)
    }
}

fn init_logging(args: &Args) -> Result<()> {
    // Info lines would scribble over the TUI on stderr; a log file can take them.
    let level = match (args.verbose, args.log_file.is_some()) {
        (true, _) => Level::DEBUG,
        (false, true) => Level::INFO,
        (false, false) => Level::WARN,
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);
    match &args.log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            subscriber
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => subscriber.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // --help and --version come through here as well
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    init_logging(&args)?;

    if !args.levels.exists() {
        bail!("Level file does not exist: {}", args.levels.display());
    }
    let config = args.simulation_config()?;
    let levels = load_levels(&args.levels)?;
    info!(
        "Starting with {} level(s), {} lives, {} food per level, {} player",
        levels.len(),
        config.lives,
        config.food,
        config.player
    );
    let mut simulation = Simulation::new(config, levels)?;

    let mut renderer = TerminalRenderer::new(setup_terminal()?);
    let result = simulation.run(&mut renderer).and_then(|outcome| {
        renderer.show_outcome(&simulation.frame(), &outcome)?;
        Ok(outcome)
    });
    // The terminal is restored before anything is printed, whatever happened.
    restore_terminal(renderer.terminal_mut())?;

    match result {
        Ok(outcome) => {
            let verdict = if outcome.won { "won" } else { "lost" };
            println!(
                "The mouse {} with a score of {} after clearing {} level(s).",
                verdict, outcome.score, outcome.levels_cleared
            );
            info!("Run finished: {:?}", outcome);
            Ok(())
        }
        Err(err) if err.is::<UserQuit>() => {
            println!("Simulation interrupted.");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("mouze").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_override_defaults() {
        let args = parse(&[
            "levels.dat",
            "--fps",
            "0",
            "--lives",
            "2",
            "--playertype",
            "a*",
            "--show-path",
            "--seed",
            "3",
        ]);
        let config = args.simulation_config().unwrap();
        assert_eq!(config.fps, 0);
        assert_eq!(config.lives, 2);
        assert_eq!(config.food, SimulationConfig::default().food);
        assert_eq!(config.player, Strategy::AStar);
        assert!(config.show_path);
        assert_eq!(config.seed, Some(3));
    }

    #[test]
    fn flags_override_the_settings_file() {
        let dir = std::env::temp_dir().join(format!("mouze-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let ini = dir.join("mouze.ini");
        std::fs::write(&ini, "[Game]\nlives = 7\nfood = 2\nplayertype = random\n").unwrap();

        let args = parse(&["levels.dat", ini.to_str().unwrap(), "--food", "4"]);
        let config = args.simulation_config().unwrap();
        assert_eq!(config.lives, 7);
        assert_eq!(config.food, 4);
        assert_eq!(config.player, Strategy::Random);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn level_file_is_required() {
        let err = Args::try_parse_from(["mouze"]).unwrap_err();
        assert!(err.use_stderr());
    }

    #[test]
    fn help_is_not_an_error() {
        let err = Args::try_parse_from(["mouze", "--help"]).unwrap_err();
        assert!(!err.use_stderr());
    }
}
