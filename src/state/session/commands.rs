use tokio::sync::oneshot;
use uuid::Uuid;

use crate::{
    dto::ws::EndReason,
    error::SessionError,
    rules::{Board, Stone},
};

pub(crate) type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

/// Messages processed one at a time by a session actor.
pub(crate) enum SessionCommand {
    Join {
        participant_id: String,
        reply: Reply<()>,
    },
    PlaceStone {
        participant_id: String,
        row: i32,
        col: i32,
        reply: Reply<()>,
    },
    Resign {
        participant_id: String,
        reply: Reply<()>,
    },
    Disconnect {
        participant_id: String,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    /// One second of the turn clock armed at `epoch` has elapsed.
    ClockTick {
        epoch: u64,
    },
    /// The grace window armed at `epoch` for `participant_id` ran out.
    GraceExpired {
        epoch: u64,
        participant_id: String,
    },
}

impl SessionCommand {
    /// Answer a command the actor will no longer process.
    pub(crate) fn reject(self, err: impl Fn() -> SessionError) {
        match self {
            SessionCommand::Join { reply, .. }
            | SessionCommand::PlaceStone { reply, .. }
            | SessionCommand::Resign { reply, .. } => {
                let _ = reply.send(Err(err()));
            }
            SessionCommand::Snapshot { .. }
            | SessionCommand::Disconnect { .. }
            | SessionCommand::ClockTick { .. }
            | SessionCommand::GraceExpired { .. } => {}
        }
    }
}

/// Read-only copy of a session's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Game the session plays.
    pub game_id: Uuid,
    /// Current position.
    pub board: Board,
    /// Color to move.
    pub turn: Stone,
    /// Participant to move.
    pub turn_holder: String,
    /// Seconds left on the turn clock.
    pub remaining_seconds: u32,
    /// Participant currently inside the grace period.
    pub disconnected: Option<String>,
    /// Whether the session is terminal.
    pub ended: bool,
    /// Winner, once ended.
    pub winner_id: Option<String>,
    /// Why the session ended.
    pub end_reason: Option<EndReason>,
}
