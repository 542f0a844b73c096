//! Library crate for gomoku-arena, exposing modules for binaries and integration tests.

/// Runtime configuration loaded at start-up.
pub mod config;
/// Persistence collaborators and their records.
pub mod dao;
/// Payloads exchanged over HTTP and the realtime channels.
pub mod dto;
/// Session and service error types.
pub mod error;
/// HTTP and WebSocket routes.
pub mod routes;
/// Gomoku rule engine with Renju restrictions for black.
pub mod rules;
/// Matchmaking, session entry points and socket handling.
pub mod services;
/// Shared application state and the live session actors.
pub mod state;
