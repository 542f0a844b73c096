use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::{dto::ws::OutboundEvent, services::websocket_service::send_message_to_websocket};

/// Delivery of real-time events to a named participant.
///
/// Implementations must never block: a participant that is not reachable simply
/// misses the event and `false` is returned.
pub trait Notifier: Send + Sync {
    /// Deliver `event` to the participant; `false` when unreachable.
    fn send(&self, participant_id: &str, event: &OutboundEvent) -> bool;

    /// Whether the participant has a live socket.
    fn is_connected(&self, participant_id: &str) -> bool;

    /// Deliver only through the given connection; used when a stored record
    /// remembers which socket asked for the event.
    fn send_on_channel(&self, participant_id: &str, channel: Uuid, event: &OutboundEvent) -> bool {
        let _ = channel;
        self.send(participant_id, event)
    }
}

#[derive(Clone)]
/// Handle used to push messages to a connected participant.
pub struct Connection {
    /// Identifier of this socket registration.
    pub id: Uuid,
    /// Writer queue of the socket.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Registry of live sockets on one channel, one per participant.
#[derive(Default)]
pub struct ConnectionHub {
    connections: DashMap<String, Connection>,
}

impl ConnectionHub {
    /// Hub with no connections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a socket for `participant_id`, replacing any previous one.
    ///
    /// Returns the identifier of the new connection.
    pub fn register(&self, participant_id: &str, tx: mpsc::UnboundedSender<Message>) -> Uuid {
        let id = Uuid::new_v4();
        if let Some(previous) = self
            .connections
            .insert(participant_id.to_string(), Connection { id, tx })
        {
            debug!(participant_id, "replacing previous connection");
            let _ = previous.tx.send(Message::Close(None));
        }
        id
    }

    /// Remove the registration if it still belongs to `connection_id`.
    ///
    /// Returns whether this connection was still the registered one.
    pub fn unregister(&self, participant_id: &str, connection_id: Uuid) -> bool {
        self.connections
            .remove_if(participant_id, |_, conn| conn.id == connection_id)
            .is_some()
    }

    /// Number of registered sockets.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no socket is registered.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    fn sender(&self, participant_id: &str) -> Option<Connection> {
        self.connections
            .get(participant_id)
            .map(|entry| entry.value().clone())
    }
}

impl Notifier for ConnectionHub {
    fn send(&self, participant_id: &str, event: &OutboundEvent) -> bool {
        let Some(connection) = self.sender(participant_id) else {
            debug!(participant_id, event = event.name(), "participant not connected");
            return false;
        };
        send_message_to_websocket(&connection.tx, event, event.name())
    }

    fn is_connected(&self, participant_id: &str) -> bool {
        self.connections
            .get(participant_id)
            .is_some_and(|entry| !entry.tx.is_closed())
    }

    fn send_on_channel(&self, participant_id: &str, channel: Uuid, event: &OutboundEvent) -> bool {
        match self.sender(participant_id) {
            Some(connection) if connection.id == channel => {
                send_message_to_websocket(&connection.tx, event, event.name())
            }
            _ => {
                debug!(participant_id, %channel, event = event.name(), "channel no longer current");
                false
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::ws::{OpponentReconnected, RejectReason};

    fn text(message: Message) -> String {
        match message {
            Message::Text(text) => text.as_str().to_owned(),
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[tokio::test]
    async fn replaced_connection_cannot_unregister_the_new_one() {
        let hub = ConnectionHub::new();
        let (old_tx, mut old_rx) = mpsc::unbounded_channel();
        let (new_tx, mut new_rx) = mpsc::unbounded_channel();

        let old_id = hub.register("alice", old_tx);
        let new_id = hub.register("alice", new_tx);
        assert!(matches!(old_rx.recv().await, Some(Message::Close(None))));

        assert!(!hub.unregister("alice", old_id));
        assert!(hub.send(
            "alice",
            &OutboundEvent::OpponentReconnected(OpponentReconnected {})
        ));
        assert!(text(new_rx.recv().await.unwrap()).contains("OnOpponentReconnected"));

        assert!(hub.unregister("alice", new_id));
        assert!(hub.is_empty());
    }

    #[tokio::test]
    async fn channel_delivery_requires_the_current_connection() {
        let hub = ConnectionHub::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = hub.register("bob", tx);
        let event = OutboundEvent::error(RejectReason::AuthFailed, "nope");

        assert!(!hub.send_on_channel("bob", Uuid::new_v4(), &event));
        assert!(hub.send_on_channel("bob", id, &event));
        assert!(text(rx.recv().await.unwrap()).contains("auth_failed"));
        assert!(!hub.send("carol", &event));
    }
}
