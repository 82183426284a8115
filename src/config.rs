//! Search configuration.
//!
//! Every tuning constant of the search lives in `SearchConfig`. A config can
//! be loaded from JSON (missing fields keep their defaults) or adjusted one
//! option at a time by name, the way an engine option table is driven.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors raised while loading or adjusting a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown option '{0}'")]
    UnknownOption(String),

    #[error("invalid value '{value}' for option '{name}'")]
    InvalidValue { name: String, value: String },

    #[error("option '{name}' must be {expected}")]
    OutOfRange { name: &'static str, expected: &'static str },
}

/// Tuning constants for one engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Children created when seeding a fresh root.
    pub num_init: usize,
    /// Children created by ordinary expansion.
    pub starting_pop: usize,
    /// Probability of mutating instead of crossing over.
    pub mutation_ratio: f64,
    /// Per-action probability of re-rolling during mutation.
    pub mutation_rate: f64,
    /// Probability of trying an attack first when drawing an action.
    pub attack_bias: f64,
    /// Wall-clock budget for a whole turn, in milliseconds.
    pub turn_time_ms: u64,
    /// Iteration cap per decision; `None` runs until the deadline.
    pub max_iterations: Option<u64>,
    /// Progressive widening: `k * n^alpha` children allowed at `n` descendants.
    pub widening_k: f64,
    pub widening_alpha: f64,
    /// Probability of stopping to widen when a node is below its threshold.
    pub widening_stop: f64,
    /// UCB exploration constant.
    pub ucb_c: f64,
    /// Draws per tournament when picking an evolutionary parent.
    pub tournament_size: usize,
    /// Tournament draws come from the top `1 / tournament_slice` of candidates.
    pub tournament_slice: usize,
    /// Build and discard a small tree on the first call of a game.
    pub warm_up: bool,
    /// Seed for the engine's RNG; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            num_init: 20,
            starting_pop: 5,
            mutation_ratio: 0.3,
            mutation_rate: 0.4,
            attack_bias: 0.8,
            turn_time_ms: 9700,
            max_iterations: None,
            widening_k: 2.0,
            widening_alpha: 0.4,
            widening_stop: 0.95,
            ucb_c: 1.414,
            tournament_size: 3,
            tournament_slice: 5,
            warm_up: true,
            seed: None,
        }
    }
}

fn parse<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    })
}

impl SearchConfig {
    /// Parses a JSON config, then validates it.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: SearchConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn turn_time(&self) -> Duration {
        Duration::from_millis(self.turn_time_ms)
    }

    /// Checks that probabilities are probabilities and counts are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let probabilities = [
            ("mutation_ratio", self.mutation_ratio),
            ("mutation_rate", self.mutation_rate),
            ("attack_bias", self.attack_bias),
            ("widening_stop", self.widening_stop),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::OutOfRange {
                    name,
                    expected: "between 0 and 1",
                });
            }
        }
        if self.num_init == 0 {
            return Err(ConfigError::OutOfRange {
                name: "num_init",
                expected: "at least 1",
            });
        }
        if self.starting_pop == 0 {
            return Err(ConfigError::OutOfRange {
                name: "starting_pop",
                expected: "at least 1",
            });
        }
        if self.tournament_size == 0 || self.tournament_slice == 0 {
            return Err(ConfigError::OutOfRange {
                name: "tournament_size",
                expected: "at least 1 with a non-zero slice",
            });
        }
        if self.widening_k < 0.0 || self.ucb_c < 0.0 {
            return Err(ConfigError::OutOfRange {
                name: "widening_k",
                expected: "non-negative along with ucb_c",
            });
        }
        Ok(())
    }

    /// Sets one option by name. Names are case-insensitive and accept both
    /// `snake_case` and `CamelCase`. An empty value clears optional settings.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        let key: String = name.chars().filter(|c| *c != '_').collect::<String>().to_lowercase();
        let mut next = self.clone();
        match key.as_str() {
            "numinit" => next.num_init = parse(name, value)?,
            "startingpop" => next.starting_pop = parse(name, value)?,
            "mutationratio" => next.mutation_ratio = parse(name, value)?,
            "mutationrate" => next.mutation_rate = parse(name, value)?,
            "attackbias" => next.attack_bias = parse(name, value)?,
            "turntime" | "turntimems" => next.turn_time_ms = parse(name, value)?,
            "maxiterations" => {
                next.max_iterations = if value.trim().is_empty() {
                    None
                } else {
                    Some(parse(name, value)?)
                }
            }
            "wideningk" => next.widening_k = parse(name, value)?,
            "wideningalpha" => next.widening_alpha = parse(name, value)?,
            "wideningstop" => next.widening_stop = parse(name, value)?,
            "ucbc" => next.ucb_c = parse(name, value)?,
            "tournamentsize" => next.tournament_size = parse(name, value)?,
            "tournamentslice" => next.tournament_slice = parse(name, value)?,
            "warmup" => next.warm_up = parse(name, value)?,
            "seed" => {
                next.seed = if value.trim().is_empty() {
                    None
                } else {
                    Some(parse(name, value)?)
                }
            }
            _ => return Err(ConfigError::UnknownOption(name.to_string())),
        }
        next.validate()?;
        *self = next;
        Ok(())
    }
}
