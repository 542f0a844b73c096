use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Rating every newly registered player starts from.
pub const DEFAULT_RATING: i32 = 1200;

/// Lifecycle of a persisted game record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Paired and not finished yet.
    InProgress,
    /// Finished with a winner.
    Completed,
    /// Closed without a result.
    Abandoned,
}

/// Durable record of a paired game. Created by matchmaking, finalized once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Participant playing black.
    pub black_id: String,
    /// Participant playing white.
    pub white_id: String,
    /// Set once the game completes.
    pub winner_id: Option<String>,
    /// Current lifecycle stage.
    pub status: GameStatus,
    /// Board as a JSON array of 225 cell codes; cleared on completion.
    pub board_snapshot: Option<String>,
    /// When matchmaking created the record.
    pub created_at: SystemTime,
    /// Set once the game completes.
    pub ended_at: Option<SystemTime>,
}

impl GameEntity {
    /// New in-progress game with an empty board.
    pub fn new(black_id: impl Into<String>, white_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            black_id: black_id.into(),
            white_id: white_id.into(),
            winner_id: None,
            status: GameStatus::InProgress,
            board_snapshot: None,
            created_at: SystemTime::now(),
            ended_at: None,
        }
    }

    /// Whether `participant_id` plays in this game.
    pub fn has_participant(&self, participant_id: &str) -> bool {
        self.black_id == participant_id || self.white_id == participant_id
    }
}

/// Rating record of a player. Only game termination mutates it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Stable participant identifier.
    pub id: String,
    /// Name shown to opponents.
    pub display_name: String,
    /// Current Elo rating.
    pub rating: i32,
    /// Games won.
    pub wins: u32,
    /// Games lost.
    pub losses: u32,
    /// End of the most recent rated game.
    pub last_played_at: Option<SystemTime>,
}

impl PlayerEntity {
    /// Fresh record with no games played.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, rating: i32) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            rating,
            wins: 0,
            losses: 0,
            last_played_at: None,
        }
    }
}

/// A participant waiting to be paired. At most one per participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueEntryEntity {
    /// Queued participant; at most one entry each.
    pub participant_id: String,
    /// Rating at the time the participant joined the queue.
    pub rating: i32,
    /// First time the participant joined; kept on re-join.
    pub enqueued_at: SystemTime,
    /// Matchmaking connection that should receive the pairing result.
    pub channel: Option<Uuid>,
}

/// Everything written when a game finishes, applied as one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameResultEntity {
    /// Completed game record.
    pub game: GameEntity,
    /// Winner record with the new rating applied.
    pub winner: PlayerEntity,
    /// Loser record with the new rating applied.
    pub loser: PlayerEntity,
}
