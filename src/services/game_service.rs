//! Entry points of the game-session channel.
//!
//! Requests are routed to the session actor of the game; the actor applies them
//! one at a time and answers with the outcome.

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::models::GameStatus,
    error::SessionError,
    state::{SharedState, session::SessionHandle},
};

/// Join (or rejoin) the live session of `game_id`, creating it on first join.
pub async fn join_game(
    state: &SharedState,
    participant_id: &str,
    game_id: &str,
) -> Result<(), SessionError> {
    let game_id = parse_game_id(game_id)?;
    let handle = match state.sessions().get(game_id) {
        Some(handle) => handle,
        None => {
            let game = state
                .store()
                .find_game(game_id)
                .await?
                .filter(|game| game.has_participant(participant_id))
                .ok_or(SessionError::GameNotFound)?;
            if game.status != GameStatus::InProgress {
                return Err(SessionError::GameAlreadyEnded);
            }
            state.sessions().get_or_spawn(&game)
        }
    };
    handle.join(participant_id).await
}

/// Place a stone at column `x`, row `y`.
pub async fn place_stone(
    state: &SharedState,
    participant_id: &str,
    game_id: &str,
    x: i32,
    y: i32,
) -> Result<(), SessionError> {
    let handle = resident_session(state, game_id).await?;
    handle.place_stone(participant_id, y, x).await
}

/// Concede the game to the opponent.
pub async fn resign(
    state: &SharedState,
    participant_id: &str,
    game_id: &str,
) -> Result<(), SessionError> {
    let handle = resident_session(state, game_id).await?;
    handle.resign(participant_id).await
}

/// Start the grace period in every unfinished session of `participant_id`.
pub async fn handle_disconnect(state: &SharedState, participant_id: &str) {
    let sessions = state.sessions().sessions_for(participant_id);
    if sessions.is_empty() {
        debug!(participant_id, "disconnect outside of any session");
        return;
    }
    info!(participant_id, sessions = sessions.len(), "participant left the game channel");
    for handle in sessions {
        handle.disconnect(participant_id).await;
    }
}

/// Session that must already be live; moves and resignations never create one.
async fn resident_session(
    state: &SharedState,
    game_id: &str,
) -> Result<SessionHandle, SessionError> {
    let game_id = parse_game_id(game_id)?;
    if let Some(handle) = state.sessions().get(game_id) {
        return Ok(handle);
    }
    match state.store().find_game(game_id).await? {
        Some(game) if game.status != GameStatus::InProgress => Err(SessionError::GameAlreadyEnded),
        _ => Err(SessionError::GameNotFound),
    }
}

fn parse_game_id(raw: &str) -> Result<Uuid, SessionError> {
    Uuid::parse_str(raw).map_err(|_| SessionError::GameNotFound)
}
