/// In-memory state of one live game.
pub mod game;
/// Session actors and their registry.
pub mod session;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    dao::game_store::ArenaStore,
    services::{notifier::ConnectionHub, rating::RatingCalculator},
    state::session::{SessionContext, SessionStore},
};

/// Application state shared by every handler.
pub type SharedState = Arc<AppState>;

/// Central application state: configuration, persistence and live connections.
pub struct AppState {
    config: Arc<AppConfig>,
    store: Arc<dyn ArenaStore>,
    game_hub: Arc<ConnectionHub>,
    matchmaking_hub: Arc<ConnectionHub>,
    sessions: SessionStore,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig, store: Arc<dyn ArenaStore>) -> SharedState {
        let game_hub = Arc::new(ConnectionHub::new());
        let sessions = SessionStore::new(SessionContext {
            store: Arc::clone(&store),
            notifier: game_hub.clone(),
            rating: RatingCalculator::new(config.rating.k_factor),
            settings: config.game.clone(),
        });

        Arc::new(Self {
            config: Arc::new(config),
            store,
            game_hub,
            matchmaking_hub: Arc::new(ConnectionHub::new()),
            sessions,
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }

    /// Persistence collaborators.
    pub fn store(&self) -> Arc<dyn ArenaStore> {
        Arc::clone(&self.store)
    }

    /// Sockets connected to the game-session channel.
    pub fn game_hub(&self) -> &Arc<ConnectionHub> {
        &self.game_hub
    }

    /// Sockets connected to the matchmaking channel.
    pub fn matchmaking_hub(&self) -> &Arc<ConnectionHub> {
        &self.matchmaking_hub
    }

    /// Registry of resident game sessions.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}
