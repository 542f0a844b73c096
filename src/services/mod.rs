/// OpenAPI documentation generation.
pub mod documentation;
/// Session coordinator entry points for the game channel.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Queue membership and the pairing scheduler.
pub mod matchmaking;
/// Real-time delivery to connected participants.
pub mod notifier;
/// Elo rating updates.
pub mod rating;
/// WebSocket connection and message handling service.
pub mod websocket_service;
