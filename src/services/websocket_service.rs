use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt, stream::SplitStream};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{InboundMessage, OutboundEvent, RejectReason},
    error::ServiceError,
    services::{game_service, matchmaking},
    state::SharedState,
};

/// Which real-time channel a socket belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// `/ws/game`: join, move and resign.
    Game,
    /// `/ws/matchmaking`: queue membership.
    Matchmaking,
}

impl Channel {
    fn name(self) -> &'static str {
        match self {
            Channel::Game => "game",
            Channel::Matchmaking => "matchmaking",
        }
    }
}

/// Handle the full lifecycle of one WebSocket connection on `channel`.
pub async fn handle_socket(state: SharedState, socket: WebSocket, channel: Channel) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let Some(participant_id) = identify(&state, &mut receiver, &outbound_tx).await else {
        finalize(writer_task, outbound_tx).await;
        return;
    };

    let span = info_span!("socket", channel = channel.name(), %participant_id);
    serve(&state, channel, &participant_id, receiver, &outbound_tx)
        .instrument(span)
        .await;

    finalize(writer_task, outbound_tx).await;
}

/// Wait for the identification frame and check the participant is known.
async fn identify(
    state: &SharedState,
    receiver: &mut SplitStream<WebSocket>,
    outbound_tx: &mpsc::UnboundedSender<Message>,
) -> Option<String> {
    let timeout = state.config().identification_timeout();
    let initial_message = match tokio::time::timeout(timeout, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) => return None,
        Ok(Some(Ok(_))) => {
            let _ = outbound_tx.send(Message::Close(None));
            return None;
        }
        Ok(Some(Err(err))) => {
            warn!(error = %err, "websocket receive error");
            return None;
        }
        Ok(None) | Err(_) => {
            warn!("websocket identification timed out");
            return None;
        }
    };

    let participant_id = match InboundMessage::from_json_str(&initial_message) {
        Ok(message) => message.identification_id().map(str::to_string),
        Err(err) => {
            warn!(error = %err, "failed to parse identification message");
            None
        }
    };
    let Some(participant_id) = participant_id else {
        warn!("first message was not identification");
        let _ = outbound_tx.send(Message::Close(None));
        return None;
    };

    match authenticate(state, participant_id).await {
        Ok(participant_id) => Some(participant_id),
        Err(err) => {
            warn!(error = %err, "identification rejected");
            let event = OutboundEvent::error(err.code(), err.to_string());
            send_message_to_websocket(outbound_tx, &event, event.name());
            let _ = outbound_tx.send(Message::Close(None));
            None
        }
    }
}

/// Check that `participant_id` names a known player.
async fn authenticate(state: &SharedState, participant_id: String) -> Result<String, ServiceError> {
    match state.store().find_player(participant_id.clone()).await? {
        Some(_) => Ok(participant_id),
        None => Err(ServiceError::Unauthorized(format!(
            "unknown participant `{participant_id}`"
        ))),
    }
}

/// Register the socket, dispatch frames until it closes, then clean up.
async fn serve(
    state: &SharedState,
    channel: Channel,
    participant_id: &str,
    mut receiver: SplitStream<WebSocket>,
    outbound_tx: &mpsc::UnboundedSender<Message>,
) {
    let hub = match channel {
        Channel::Game => state.game_hub(),
        Channel::Matchmaking => state.matchmaking_hub(),
    };
    let connection_id = hub.register(participant_id, outbound_tx.clone());
    info!("participant connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(payload = %text.as_str(), "received message");
                match InboundMessage::from_json_str(&text) {
                    Ok(InboundMessage::Identify { .. }) => {
                        warn!("ignoring duplicate identification message");
                    }
                    Ok(msg) => {
                        let reply = match channel {
                            Channel::Game => dispatch_game(state, participant_id, msg).await,
                            Channel::Matchmaking => {
                                dispatch_matchmaking(state, participant_id, connection_id, msg)
                                    .await
                            }
                        };
                        if let Some(event) = reply {
                            if !send_message_to_websocket(outbound_tx, &event, event.name()) {
                                info!("connection closed while replying, terminating");
                                break;
                            }
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to parse inbound message");
                        let event = OutboundEvent::error(
                            RejectReason::InvalidMessage,
                            format!("unreadable message: {err}"),
                        );
                        send_message_to_websocket(outbound_tx, &event, event.name());
                    }
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!("participant closed the socket");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(error = %err, "websocket error");
                break;
            }
        }
    }

    // A newer socket of the same participant took over; it owns the session now.
    if !hub.unregister(participant_id, connection_id) {
        debug!("connection already replaced");
        return;
    }
    info!("participant disconnected");

    match channel {
        Channel::Game => game_service::handle_disconnect(state, participant_id).await,
        Channel::Matchmaking => {
            if let Err(err) = matchmaking::leave_queue(state, participant_id).await {
                warn!(error = %err, "failed to remove queue entry on disconnect");
            }
        }
    }
}

/// Route a game-channel request, returning the rejection to report, if any.
async fn dispatch_game(
    state: &SharedState,
    participant_id: &str,
    msg: InboundMessage,
) -> Option<OutboundEvent> {
    let (x, y, result) = match msg {
        InboundMessage::JoinGame { game_id } => (
            -1,
            -1,
            game_service::join_game(state, participant_id, &game_id).await,
        ),
        InboundMessage::PlaceStone { game_id, x, y } => (
            x,
            y,
            game_service::place_stone(state, participant_id, &game_id, x, y).await,
        ),
        InboundMessage::Resign { game_id } => (
            -1,
            -1,
            game_service::resign(state, participant_id, &game_id).await,
        ),
        InboundMessage::JoinMatchmaking
        | InboundMessage::LeaveMatchmaking
        | InboundMessage::Identify { .. } => {
            return Some(OutboundEvent::error(
                RejectReason::InvalidMessage,
                "not available on the game channel",
            ));
        }
    };

    let err = result.err()?;
    debug!(error = %err, x, y, "request rejected");
    Some(OutboundEvent::rejected(x, y, err.reason()))
}

/// Route a matchmaking-channel request, returning the error to report, if any.
async fn dispatch_matchmaking(
    state: &SharedState,
    participant_id: &str,
    connection_id: Uuid,
    msg: InboundMessage,
) -> Option<OutboundEvent> {
    let result = match msg {
        InboundMessage::JoinMatchmaking => {
            matchmaking::join_queue(state, participant_id, connection_id)
                .await
                .map(|_| ())
        }
        InboundMessage::LeaveMatchmaking => matchmaking::leave_queue(state, participant_id)
            .await
            .map(|_| ()),
        InboundMessage::JoinGame { .. }
        | InboundMessage::PlaceStone { .. }
        | InboundMessage::Resign { .. }
        | InboundMessage::Identify { .. } => {
            return Some(OutboundEvent::error(
                RejectReason::InvalidMessage,
                "not available on the matchmaking channel",
            ));
        }
    };

    let err = result.err()?;
    warn!(error = %err, "matchmaking request failed");
    Some(OutboundEvent::error(err.code(), err.to_string()))
}

/// Serialize a payload and push it onto the provided WebSocket sender.
///
/// Returns `false` only when the writer channel is closed. A payload that fails
/// to serialize is a bug, logged and dropped.
pub(crate) fn send_message_to_websocket<T>(
    tx: &mpsc::UnboundedSender<Message>,
    value: &T,
    context: &str,
) -> bool
where
    T: ?Sized + serde::Serialize + std::fmt::Debug,
{
    let payload = match serde_json::to_string(value) {
        Ok(p) => p,
        Err(err) => {
            warn!(error = %err, context, "failed to serialize message `{value:?}`");
            return true;
        }
    };

    tx.send(Message::Text(payload.into())).is_ok()
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
