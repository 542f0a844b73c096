use uuid::Uuid;

use crate::{
    dao::models::GameEntity,
    dto::ws::EndReason,
    rules::{Board, RuleEngine, Stone},
};

/// Live state of one game, owned exclusively by its session actor.
#[derive(Debug, Clone)]
pub struct GameSession {
    /// Primary key of the game record this session caches.
    pub game_id: Uuid,
    /// Participant playing black.
    pub black_id: String,
    /// Participant playing white.
    pub white_id: String,
    /// Board and turn order.
    pub engine: RuleEngine,
    /// Seconds left on the running turn clock.
    pub remaining_seconds: u32,
    /// Participant currently inside a disconnect grace window.
    pub disconnected: Option<String>,
    /// Set exactly once; every mutation checks it first.
    pub ended: bool,
    /// Set when the game ends.
    pub winner_id: Option<String>,
    /// Set when the game ends.
    pub end_reason: Option<EndReason>,
}

impl GameSession {
    /// Session for `game` on top of an already restored board.
    pub fn new(game: &GameEntity, board: Board, turn_seconds: u32) -> Self {
        Self {
            game_id: game.id,
            black_id: game.black_id.clone(),
            white_id: game.white_id.clone(),
            engine: RuleEngine::from_board(board),
            remaining_seconds: turn_seconds,
            disconnected: None,
            ended: false,
            winner_id: None,
            end_reason: None,
        }
    }

    /// Color played by `participant_id`, if a participant.
    pub fn color_of(&self, participant_id: &str) -> Option<Stone> {
        if participant_id == self.black_id {
            Some(Stone::Black)
        } else if participant_id == self.white_id {
            Some(Stone::White)
        } else {
            None
        }
    }

    /// Participant playing `stone`.
    pub fn participant(&self, stone: Stone) -> &str {
        match stone {
            Stone::Black => &self.black_id,
            Stone::White => &self.white_id,
        }
    }

    /// The other player of this game, if `participant_id` is one of them.
    pub fn opponent_of(&self, participant_id: &str) -> Option<&str> {
        self.color_of(participant_id)
            .map(|stone| self.participant(stone.opponent()))
    }

    /// Participant whose move it is.
    pub fn turn_holder(&self) -> &str {
        self.participant(self.engine.turn())
    }

    /// Whether `participant_id` is inside the grace period.
    pub fn is_disconnected(&self, participant_id: &str) -> bool {
        self.disconnected.as_deref() == Some(participant_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restored_board_decides_the_turn_holder() {
        let game = GameEntity::new("alice", "bob");
        let mut engine = RuleEngine::new();
        engine.place_stone(7, 7).unwrap();

        let session = GameSession::new(&game, engine.board().clone(), 30);
        assert_eq!(session.turn_holder(), "bob");
        assert_eq!(session.opponent_of("bob"), Some("alice"));
        assert_eq!(session.opponent_of("mallory"), None);

        let fresh = GameSession::new(&game, Board::new(), 30);
        assert_eq!(fresh.turn_holder(), "alice");
    }
}
