use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};

use crate::{
    services::websocket_service::{self, Channel},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/ws/game",
    tag = "realtime",
    responses((status = 101, description = "Switching protocols to WebSocket"))
)]
/// Upgrade the HTTP connection into a game-session WebSocket.
pub async fn game_ws_handler(
    State(state): State<SharedState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| websocket_service::handle_socket(state, socket, Channel::Game))
}

#[utoipa::path(
    get,
    path = "/ws/matchmaking",
    tag = "realtime",
    responses((status = 101, description = "Switching protocols to WebSocket"))
)]
/// Upgrade the HTTP connection into a matchmaking WebSocket.
pub async fn matchmaking_ws_handler(
    State(state): State<SharedState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        websocket_service::handle_socket(state, socket, Channel::Matchmaking)
    })
}

/// Configure the WebSocket endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/ws/game", get(game_ws_handler))
        .route("/ws/matchmaking", get(matchmaking_ws_handler))
}
