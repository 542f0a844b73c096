use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::rules::Stone;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, PartialEq, Eq)]
/// Messages accepted from game and matchmaking WebSocket clients.
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InboundMessage {
    /// First frame of every socket.
    #[serde(rename_all = "camelCase")]
    Identify {
        /// Participant the socket acts for.
        participant_id: String,
    },
    #[serde(rename_all = "camelCase")]
    /// Join or rejoin the session of a game.
    JoinGame {
        /// Game to join.
        game_id: String,
    },
    #[serde(rename_all = "camelCase")]
    /// Place a stone at column `x`, row `y`.
    PlaceStone {
        /// Game to play in.
        game_id: String,
        /// Column.
        x: i32,
        /// Row.
        y: i32,
    },
    #[serde(rename_all = "camelCase")]
    /// Concede the game.
    Resign {
        /// Game to concede.
        game_id: String,
    },
    /// Enter the matchmaking queue.
    JoinMatchmaking,
    /// Leave the matchmaking queue.
    LeaveMatchmaking,
}

impl InboundMessage {
    /// Parse one inbound text frame.
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Participant named by an `identify` frame.
    pub fn identification_id(&self) -> Option<&str> {
        match self {
            Self::Identify { participant_id } => Some(participant_id.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Reason code attached to a rejected request.
pub enum RejectReason {
    /// Unknown game, or the caller does not play in it.
    GameNotFound,
    /// The opponent holds the turn.
    NotYourTurn,
    /// Coordinates outside the board.
    OutOfBounds,
    /// The cell already holds a stone.
    Occupied,
    /// Black six or more in a row.
    ForbiddenOverline,
    #[serde(rename = "forbidden_33")]
    /// Black double open three.
    Forbidden33,
    #[serde(rename = "forbidden_44")]
    /// Black double four.
    Forbidden44,
    /// The game is over.
    GameAlreadyEnded,
    /// Unknown participant.
    AuthFailed,
    /// Unreadable frame or wrong channel.
    InvalidMessage,
    /// Storage failed; retry later.
    Unavailable,
}

impl RejectReason {
    /// Wire form of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GameNotFound => "game_not_found",
            Self::NotYourTurn => "not_your_turn",
            Self::OutOfBounds => "out_of_bounds",
            Self::Occupied => "occupied",
            Self::ForbiddenOverline => "forbidden_overline",
            Self::Forbidden33 => "forbidden_33",
            Self::Forbidden44 => "forbidden_44",
            Self::GameAlreadyEnded => "game_already_ended",
            Self::AuthFailed => "auth_failed",
            Self::InvalidMessage => "invalid_message",
            Self::Unavailable => "unavailable",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Why a game ended.
pub enum EndReason {
    /// The winner completed a line of five.
    FiveInRow,
    /// The loser conceded.
    Resign,
    /// The loser ran out of turn time.
    Timeout,
    /// The loser did not come back within the grace period.
    Disconnect,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
/// Events pushed to clients, framed as `{"event": "...", "data": {...}}`.
#[serde(tag = "event", content = "data")]
pub enum OutboundEvent {
    #[serde(rename = "OnGameStarted")]
    /// A participant joined a fresh session.
    GameStarted(GameStarted),
    #[serde(rename = "OnGameResumed")]
    /// A participant came back within the grace period.
    GameResumed(GameResumed),
    #[serde(rename = "OnMoveMade")]
    /// A stone was placed.
    MoveMade(MoveMade),
    #[serde(rename = "OnMoveRejected")]
    /// The caller's request was refused.
    MoveRejected(MoveRejected),
    #[serde(rename = "OnTimerUpdate")]
    /// One second elapsed on the turn clock.
    TimerUpdate(TimerUpdate),
    #[serde(rename = "OnOpponentDisconnected")]
    /// The opponent dropped; the grace period started.
    OpponentDisconnected(OpponentDisconnected),
    #[serde(rename = "OnOpponentReconnected")]
    /// The opponent came back.
    OpponentReconnected(OpponentReconnected),
    #[serde(rename = "OnGameEnded")]
    /// The game ended and ratings were updated.
    GameEnded(GameEnded),
    #[serde(rename = "OnMatchFound")]
    /// Matchmaking created a game.
    MatchFound(MatchFound),
    #[serde(rename = "OnMatchmakingStatus")]
    /// Current wait time and tolerance.
    MatchmakingStatus(MatchmakingStatus),
    #[serde(rename = "OnError")]
    /// A matchmaking or handshake request failed.
    Error(ErrorEvent),
}

impl OutboundEvent {
    /// Name of the event as seen on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GameStarted(_) => "OnGameStarted",
            Self::GameResumed(_) => "OnGameResumed",
            Self::MoveMade(_) => "OnMoveMade",
            Self::MoveRejected(_) => "OnMoveRejected",
            Self::TimerUpdate(_) => "OnTimerUpdate",
            Self::OpponentDisconnected(_) => "OnOpponentDisconnected",
            Self::OpponentReconnected(_) => "OnOpponentReconnected",
            Self::GameEnded(_) => "OnGameEnded",
            Self::MatchFound(_) => "OnMatchFound",
            Self::MatchmakingStatus(_) => "OnMatchmakingStatus",
            Self::Error(_) => "OnError",
        }
    }

    /// `OnMoveRejected` for the cell at `(x, y)`.
    pub fn rejected(x: i32, y: i32, reason: RejectReason) -> Self {
        Self::MoveRejected(MoveRejected { x, y, reason })
    }

    /// `OnError` with a code and message.
    pub fn error(code: RejectReason, message: impl Into<String>) -> Self {
        Self::Error(ErrorEvent {
            code,
            message: message.into(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
/// Payload of `OnGameStarted`.
pub struct GameStarted {
    /// Game being played.
    pub game_id: Uuid,
    /// Participant playing black.
    pub black_id: String,
    /// Participant playing white.
    pub white_id: String,
    /// Color of the recipient.
    pub your_color: Stone,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
/// Full state sent to a participant coming back after a disconnect.
pub struct GameResumed {
    /// 225 row-major cell codes: 0 empty, 1 black, 2 white.
    pub board: Vec<u8>,
    /// Color of the recipient.
    pub your_color: Stone,
    /// Color to move.
    pub current_turn: Stone,
    /// Seconds left on the turn clock.
    pub remaining_seconds: u32,
    /// Whether the opponent currently has a live socket.
    pub opponent_connected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
/// `x` is the column, `y` the row.
pub struct MoveMade {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// Color of the placed stone.
    pub color: Stone,
    /// Full turn time granted to the next player.
    pub remaining_time: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
/// Payload of `OnMoveRejected`; `-1, -1` for join and resign failures.
pub struct MoveRejected {
    /// Column of the refused request.
    pub x: i32,
    /// Row of the refused request.
    pub y: i32,
    /// Why the request was refused.
    pub reason: RejectReason,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
/// Payload of `OnTimerUpdate`.
pub struct TimerUpdate {
    /// Color whose clock is running.
    pub current_player: Stone,
    /// Seconds left.
    pub remaining_seconds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
/// Payload of `OnOpponentDisconnected`.
pub struct OpponentDisconnected {
    /// Seconds the opponent has to come back.
    pub grace_period_seconds: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
/// Payload of `OnOpponentReconnected`.
pub struct OpponentReconnected {}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
/// Payload of `OnGameEnded`.
pub struct GameEnded {
    /// Participant that won.
    pub winner_id: String,
    /// How the game ended.
    pub reason: EndReason,
    /// Rating deltas of both sides.
    pub elo_change: EloChange,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
/// Signed rating deltas applied to each side.
pub struct EloChange {
    /// Delta applied to the winner.
    pub winner: i32,
    /// Delta applied to the loser.
    pub loser: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
/// Payload of `OnMatchFound`.
pub struct MatchFound {
    /// Game to join on the game channel.
    pub game_id: Uuid,
    /// Display name of the opponent.
    pub opponent_name: String,
    /// Color assigned to the recipient.
    pub your_color: Stone,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
/// Payload of `OnMatchmakingStatus`.
pub struct MatchmakingStatus {
    /// Seconds since the participant joined the queue.
    pub waiting_seconds: u64,
    /// `None` once any opponent is acceptable.
    pub current_range: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
/// Payload of `OnError`.
pub struct ErrorEvent {
    /// Machine-readable failure code.
    pub code: RejectReason,
    /// Human-readable detail.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn inbound_messages_use_camel_case_tags() {
        let msg = InboundMessage::from_json_str(
            r#"{"type":"placeStone","gameId":"g-1","x":7,"y":3}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            InboundMessage::PlaceStone {
                game_id: "g-1".into(),
                x: 7,
                y: 3
            }
        );

        let ident =
            InboundMessage::from_json_str(r#"{"type":"identify","participantId":"alice"}"#)
                .unwrap();
        assert_eq!(ident.identification_id(), Some("alice"));

        let leave = InboundMessage::from_json_str(r#"{"type":"leaveMatchmaking"}"#).unwrap();
        assert_eq!(leave, InboundMessage::LeaveMatchmaking);
        assert!(InboundMessage::from_json_str(r#"{"type":"buzz"}"#).is_err());
    }

    #[test]
    fn outbound_events_carry_their_wire_name() {
        let event = OutboundEvent::rejected(3, 4, RejectReason::Forbidden33);
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "event": "OnMoveRejected",
                "data": { "x": 3, "y": 4, "reason": "forbidden_33" }
            })
        );

        let status = OutboundEvent::MatchmakingStatus(MatchmakingStatus {
            waiting_seconds: 200,
            current_range: None,
        });
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({
                "event": "OnMatchmakingStatus",
                "data": { "waitingSeconds": 200, "currentRange": null }
            })
        );
        assert_eq!(status.name(), "OnMatchmakingStatus");

        let reconnected = OutboundEvent::OpponentReconnected(OpponentReconnected {});
        assert_eq!(
            serde_json::to_value(&reconnected).unwrap(),
            json!({ "event": "OnOpponentReconnected", "data": {} })
        );
    }

    #[test]
    fn every_event_name_matches_its_serialized_tag() {
        let game_id = Uuid::nil();
        let events = [
            OutboundEvent::GameStarted(GameStarted {
                game_id,
                black_id: "alice".into(),
                white_id: "bob".into(),
                your_color: Stone::Black,
            }),
            OutboundEvent::GameResumed(GameResumed {
                board: vec![0; 225],
                your_color: Stone::White,
                current_turn: Stone::Black,
                remaining_seconds: 12,
                opponent_connected: true,
            }),
            OutboundEvent::MoveMade(MoveMade {
                x: 7,
                y: 7,
                color: Stone::Black,
                remaining_time: 30,
            }),
            OutboundEvent::rejected(-1, -1, RejectReason::GameNotFound),
            OutboundEvent::TimerUpdate(TimerUpdate {
                current_player: Stone::White,
                remaining_seconds: 29,
            }),
            OutboundEvent::OpponentDisconnected(OpponentDisconnected {
                grace_period_seconds: 60,
            }),
            OutboundEvent::OpponentReconnected(OpponentReconnected {}),
            OutboundEvent::GameEnded(GameEnded {
                winner_id: "alice".into(),
                reason: EndReason::Timeout,
                elo_change: EloChange {
                    winner: 16,
                    loser: -16,
                },
            }),
            OutboundEvent::MatchFound(MatchFound {
                game_id,
                opponent_name: "Bob".into(),
                your_color: Stone::White,
            }),
            OutboundEvent::MatchmakingStatus(MatchmakingStatus {
                waiting_seconds: 5,
                current_range: Some(100),
            }),
            OutboundEvent::error(RejectReason::Unavailable, "storage down"),
        ];

        for event in &events {
            let value = serde_json::to_value(event).unwrap();
            assert_eq!(value["event"], event.name(), "{event:?}");
        }
    }

    #[test]
    fn reason_codes_match_their_serialized_form() {
        for reason in [
            RejectReason::GameNotFound,
            RejectReason::NotYourTurn,
            RejectReason::OutOfBounds,
            RejectReason::Occupied,
            RejectReason::ForbiddenOverline,
            RejectReason::Forbidden33,
            RejectReason::Forbidden44,
            RejectReason::GameAlreadyEnded,
            RejectReason::AuthFailed,
            RejectReason::InvalidMessage,
            RejectReason::Unavailable,
        ] {
            assert_eq!(
                serde_json::to_value(reason).unwrap(),
                json!(reason.as_str())
            );
        }
    }
}
