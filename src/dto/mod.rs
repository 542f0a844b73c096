/// Health check response.
pub mod health;
/// Realtime event vocabulary.
pub mod ws;
