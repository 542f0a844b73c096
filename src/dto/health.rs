use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Game sessions currently resident in memory.
    pub live_sessions: usize,
    /// Open sockets across the game and matchmaking channels.
    pub connections: usize,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(live_sessions: usize, connections: usize) -> Self {
        Self {
            status: "ok".to_string(),
            live_sessions,
            connections,
        }
    }

    /// Create a health response indicating the store is not answering.
    pub fn degraded() -> Self {
        Self {
            status: "degraded".to_string(),
            live_sessions: 0,
            connections: 0,
        }
    }
}
