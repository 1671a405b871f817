use std::{path::Path, time::Duration};

use ini::Ini;
use tracing::{info, warn};

use crate::planner::Strategy;

const GAME_SECTION: &str = "Game";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config file: {0}")]
    Parse(#[from] ini::ParseError),
    #[error("invalid value '{value}' for '{key}': expected a non-negative integer")]
    InvalidNumber { key: String, value: String },
}

/// Settings of one simulation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Pause between two drawn frames, in milliseconds.
    pub fps: u64,
    pub lives: usize,
    /// Food the mouse must eat to clear a level.
    pub food: usize,
    pub player: Strategy,
    /// Draw the route the mouse is following.
    pub show_path: bool,
    /// Seed for food placement and random moves; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fps: 300,
            lives: 5,
            food: 10,
            player: Strategy::Backtracking,
            show_path: false,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.fps)
    }

    /// Applies the settings of an `.ini` document.
    ///
    /// Keys are read from the `[Game]` section and from entries before any
    /// section; other sections and unknown keys are ignored with a warning.
    pub fn apply_ini(&mut self, text: &str) -> Result<(), ConfigError> {
        let ini = Ini::load_from_str(text)?;
        for (section, properties) in ini.iter() {
            if let Some(name) = section
                && !name.eq_ignore_ascii_case(GAME_SECTION)
            {
                warn!("Ignoring config section [{}]", name);
                continue;
            }
            for (key, value) in properties.iter() {
                self.apply_setting(key, value)?;
            }
        }
        Ok(())
    }

    fn apply_setting(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key.to_ascii_lowercase().as_str() {
            "fps" => self.fps = parse_number(key, value)?,
            "lives" => self.lives = parse_number(key, value)?,
            "food" => self.food = parse_number(key, value)?,
            "playertype" => self.player = Strategy::from_name_lossy(value),
            "showpath" | "show_path" => {
                self.show_path = matches!(
                    value.to_ascii_lowercase().as_str(),
                    "1" | "true" | "yes" | "on"
                )
            }
            "seed" => self.seed = Some(parse_number(key, value)?),
            _ => warn!("Ignoring unknown config key '{}'", key),
        }
        Ok(())
    }

    /// Applies an `.ini` file. A file that cannot be opened leaves the
    /// current settings in place.
    pub fn apply_ini_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                self.apply_ini(&text)?;
                info!("Loaded settings from {}", path.display());
                Ok(())
            }
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "Could not open {}, using default or command-line settings",
                    path.display()
                );
                Ok(())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidNumber {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = SimulationConfig::default();
        assert_eq!(config.fps, 300);
        assert_eq!(config.lives, 5);
        assert_eq!(config.food, 10);
        assert_eq!(config.player, Strategy::Backtracking);
        assert_eq!(config.frame_delay(), Duration::from_millis(300));
    }

    #[test]
    fn reads_game_section() {
        let mut config = SimulationConfig::default();
        config
            .apply_ini(
                "# sample\n[Game]\nfps = 120\nlives=2\n food = 4 \nplayertype = \"A*\"\n; done\n",
            )
            .unwrap();
        assert_eq!(config.fps, 120);
        assert_eq!(config.lives, 2);
        assert_eq!(config.food, 4);
        assert_eq!(config.player, Strategy::AStar);
    }

    #[test]
    fn unknown_player_type_degrades_to_random() {
        let mut config = SimulationConfig::default();
        config.apply_ini("playertype = genius").unwrap();
        assert_eq!(config.player, Strategy::Random);
    }

    #[test]
    fn malformed_number_is_an_error() {
        let mut config = SimulationConfig::default();
        let err = config.apply_ini("lives = many").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { ref key, .. } if key == "lives"));
    }

    #[test]
    fn unknown_keys_and_sections_are_ignored() {
        let mut config = SimulationConfig::default();
        config
            .apply_ini("colour = blue\nseed=9\n[Display]\nlives = 1\n")
            .unwrap();
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.lives, 5);
    }

    #[test]
    fn broken_section_header_is_a_parse_error() {
        let mut config = SimulationConfig::default();
        let err = config.apply_ini("[Game\nlives = 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_keeps_settings() {
        let mut config = SimulationConfig::default();
        config
            .apply_ini_file(Path::new("/definitely/not/here/mouze.ini"))
            .unwrap();
        assert_eq!(config, SimulationConfig::default());
    }
}
