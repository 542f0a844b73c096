//! Application-level configuration loading: game timings, matchmaking windows and seed players.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};
use validator::Validate;

use crate::dao::models::{DEFAULT_RATING, PlayerEntity};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "GOMOKU_ARENA_CONFIG_PATH";

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    #[validate(nested)]
    /// Turn clock and disconnect grace period.
    pub game: GameSettings,
    #[validate(nested)]
    /// Scheduler pacing and tolerance window.
    pub matchmaking: MatchmakingSettings,
    #[validate(nested)]
    /// Elo parameters.
    pub rating: RatingSettings,
    /// Seconds a new socket has to identify itself.
    #[validate(range(min = 1))]
    pub identification_timeout_secs: u64,
    /// Players installed into the store at start-up.
    pub seed_players: Vec<SeedPlayer>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
/// Turn clock and reconnection window of live sessions.
pub struct GameSettings {
    #[validate(range(min = 1))]
    /// Seconds a player has for each move.
    pub turn_seconds: u32,
    #[validate(range(min = 1))]
    /// Seconds an absent player has to come back before forfeiting.
    pub disconnect_grace_seconds: u32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
/// Pacing of the matchmaking loop and the widening tolerance window.
pub struct MatchmakingSettings {
    #[validate(range(min = 1))]
    /// Delay between two scheduler passes.
    pub tick_millis: u64,
    #[validate(range(min = 1))]
    /// Seconds between two wait-status broadcasts.
    pub status_interval_secs: u64,
    /// Rating gap accepted right after joining.
    pub base_tolerance: u32,
    /// Widening applied every `tolerance_step_secs`.
    pub tolerance_step: u32,
    #[validate(range(min = 1))]
    /// Seconds of waiting per widening step.
    pub tolerance_step_secs: u64,
    /// Wait after which any opponent is acceptable.
    #[validate(range(min = 1))]
    pub match_anyone_after_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
/// Elo parameters.
pub struct RatingSettings {
    #[validate(range(min = 1.0))]
    /// Maximum rating change of a single game.
    pub k_factor: f64,
    /// Rating given to seed players that declare none.
    pub initial_rating: i32,
}

#[derive(Debug, Clone, Deserialize)]
/// Player record declared in the configuration file.
pub struct SeedPlayer {
    /// Stable participant identifier.
    pub id: String,
    /// Name shown to opponents.
    pub display_name: String,
    /// Starting rating; `initial_rating` when absent.
    pub rating: Option<i32>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<AppConfig>(&contents) {
                Ok(config) => match config.validate() {
                    Ok(()) => {
                        info!(
                            path = %path.display(),
                            seed_players = config.seed_players.len(),
                            "loaded configuration"
                        );
                        config
                    }
                    Err(err) => {
                        warn!(
                            path = %path.display(),
                            error = %err,
                            "configuration out of range; falling back to defaults"
                        );
                        Self::default()
                    }
                },
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Time a new socket has to send its identification frame.
    pub fn identification_timeout(&self) -> Duration {
        Duration::from_secs(self.identification_timeout_secs)
    }

    /// Player records for the configured seed players.
    pub fn seed_player_entities(&self) -> Vec<PlayerEntity> {
        self.seed_players
            .iter()
            .map(|seed| {
                PlayerEntity::new(
                    seed.id.clone(),
                    seed.display_name.clone(),
                    seed.rating.unwrap_or(self.rating.initial_rating),
                )
            })
            .collect()
    }
}

impl MatchmakingSettings {
    /// Delay between two scheduler passes.
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }

    /// Minimum gap between two status broadcasts.
    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            game: GameSettings::default(),
            matchmaking: MatchmakingSettings::default(),
            rating: RatingSettings::default(),
            identification_timeout_secs: 10,
            seed_players: Vec::new(),
        }
    }
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            turn_seconds: 30,
            disconnect_grace_seconds: 30,
        }
    }
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        Self {
            tick_millis: 1_000,
            status_interval_secs: 10,
            base_tolerance: 200,
            tolerance_step: 50,
            tolerance_step_secs: 30,
            match_anyone_after_secs: 180,
        }
    }
}

impl Default for RatingSettings {
    fn default() -> Self {
        Self {
            k_factor: 32.0,
            initial_rating: DEFAULT_RATING,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
