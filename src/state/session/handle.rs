use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::commands::{SessionCommand, SessionSnapshot};
use crate::error::SessionError;

/// Cheap, cloneable handle to a session actor.
///
/// A closed inbox means the session ended and was evicted, so every failure to
/// reach the actor surfaces as [`SessionError::GameAlreadyEnded`].
#[derive(Clone)]
pub struct SessionHandle {
    game_id: Uuid,
    black_id: String,
    white_id: String,
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub(crate) fn new(
        game_id: Uuid,
        black_id: String,
        white_id: String,
        tx: mpsc::Sender<SessionCommand>,
    ) -> Self {
        Self {
            game_id,
            black_id,
            white_id,
            tx,
        }
    }

    /// Game served by this session.
    pub fn game_id(&self) -> Uuid {
        self.game_id
    }

    /// Whether `participant_id` plays in this game.
    pub fn has_participant(&self, participant_id: &str) -> bool {
        self.black_id == participant_id || self.white_id == participant_id
    }

    /// Whether the actor has stopped taking requests.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Join or rejoin the session.
    pub async fn join(&self, participant_id: &str) -> Result<(), SessionError> {
        let participant_id = participant_id.to_string();
        self.request(|reply| SessionCommand::Join {
            participant_id,
            reply,
        })
        .await
    }

    /// Place a stone for `participant_id` at `(row, col)`.
    pub async fn place_stone(
        &self,
        participant_id: &str,
        row: i32,
        col: i32,
    ) -> Result<(), SessionError> {
        let participant_id = participant_id.to_string();
        self.request(|reply| SessionCommand::PlaceStone {
            participant_id,
            row,
            col,
            reply,
        })
        .await
    }

    /// Concede the game.
    pub async fn resign(&self, participant_id: &str) -> Result<(), SessionError> {
        let participant_id = participant_id.to_string();
        self.request(|reply| SessionCommand::Resign {
            participant_id,
            reply,
        })
        .await
    }

    /// Fire-and-forget; an evicted session has nobody left to notify.
    pub async fn disconnect(&self, participant_id: &str) {
        let _ = self
            .tx
            .send(SessionCommand::Disconnect {
                participant_id: participant_id.to_string(),
            })
            .await;
    }

    /// Copy of the current session state.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| SessionError::GameAlreadyEnded)
    }

    async fn request<F>(&self, build: F) -> Result<(), SessionError>
    where
        F: FnOnce(oneshot::Sender<Result<(), SessionError>>) -> SessionCommand,
    {
        let (reply, rx) = oneshot::channel();
        self.send(build(reply)).await?;
        rx.await.map_err(|_| SessionError::GameAlreadyEnded)?
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), SessionError> {
        self.tx
            .send(cmd)
            .await
            .map_err(|_| SessionError::GameAlreadyEnded)
    }
}
