//! Live game sessions, one actor task per game.
//!
//! Every request for a game is a message into its actor's inbox, so joins, moves,
//! disconnects and timer firings of one game are applied strictly one after the
//! other while different games run in parallel.

mod actor;
mod commands;
mod handle;
mod timers;

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

pub use self::commands::SessionSnapshot;
pub use self::handle::SessionHandle;
use self::actor::run_session_actor;
use crate::{
    config::GameSettings,
    dao::{game_store::ArenaStore, models::GameEntity},
    rules::Board,
    services::{notifier::Notifier, rating::RatingCalculator},
    state::game::GameSession,
};

const INBOX_CAPACITY: usize = 32;

/// Collaborators shared by every session actor.
#[derive(Clone)]
pub struct SessionContext {
    /// Persistence collaborators.
    pub store: Arc<dyn ArenaStore>,
    /// Delivery of session events to participants.
    pub notifier: Arc<dyn Notifier>,
    /// Rating update applied at game end.
    pub rating: RatingCalculator,
    /// Turn clock and grace period.
    pub settings: GameSettings,
}

/// Concurrent registry of resident sessions keyed by game id.
pub struct SessionStore {
    sessions: Arc<DashMap<Uuid, SessionHandle>>,
    ctx: SessionContext,
}

impl SessionStore {
    /// Empty registry.
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ctx,
        }
    }

    /// Live session of `game_id`, if resident.
    pub fn get(&self, game_id: Uuid) -> Option<SessionHandle> {
        self.sessions
            .get(&game_id)
            .map(|entry| entry.value().clone())
            .filter(|handle| !handle.is_closed())
    }

    /// Resident session for `game`, spawning its actor on first use.
    pub fn get_or_spawn(&self, game: &GameEntity) -> SessionHandle {
        let entry = self.sessions.entry(game.id);
        if let Entry::Occupied(existing) = &entry {
            if !existing.get().is_closed() {
                return existing.get().clone();
            }
        }

        let handle = self.spawn(game);
        entry.insert(handle.clone());
        handle
    }

    /// Every resident session `participant_id` plays in.
    pub fn sessions_for(&self, participant_id: &str) -> Vec<SessionHandle> {
        self.sessions
            .iter()
            .filter(|entry| entry.has_participant(participant_id))
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Number of resident sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is resident.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn spawn(&self, game: &GameEntity) -> SessionHandle {
        let board = match game.board_snapshot.as_deref() {
            Some(snapshot) => Board::from_snapshot(snapshot).unwrap_or_else(|err| {
                warn!(game_id = %game.id, error = %err, "discarding unreadable board snapshot");
                Board::new()
            }),
            None => Board::new(),
        };
        let session = GameSession::new(game, board, self.ctx.settings.turn_seconds);

        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        let handle = SessionHandle::new(
            game.id,
            game.black_id.clone(),
            game.white_id.clone(),
            tx.clone(),
        );
        tokio::spawn(run_session_actor(
            session,
            self.ctx.clone(),
            rx,
            tx.downgrade(),
            Arc::clone(&self.sessions),
        ));
        handle
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time;

    use super::*;
    use crate::{
        dao::{
            game_store::memory::MemoryStore,
            models::{GameStatus, PlayerEntity},
        },
        dto::ws::{EndReason, OutboundEvent},
        error::SessionError,
        rules::{PlacementError, Stone},
        services::notifier::testing::RecordingNotifier,
    };

    struct Fixture {
        store: MemoryStore,
        notifier: Arc<RecordingNotifier>,
        sessions: SessionStore,
        game: GameEntity,
    }

    async fn fixture(turn_seconds: u32, with_players: bool) -> Fixture {
        let players = if with_players {
            vec![
                PlayerEntity::new("alice", "Alice", 1200),
                PlayerEntity::new("bob", "Bob", 1200),
            ]
        } else {
            Vec::new()
        };
        let store = MemoryStore::with_players(players);
        let game = GameEntity::new("alice", "bob");
        ArenaStore::save_game(&store, game.clone()).await.unwrap();

        let notifier = RecordingNotifier::shared();
        let sessions = SessionStore::new(SessionContext {
            store: Arc::new(store.clone()),
            notifier: notifier.clone(),
            rating: RatingCalculator::default(),
            settings: GameSettings {
                turn_seconds,
                disconnect_grace_seconds: 30,
            },
        });
        Fixture {
            store,
            notifier,
            sessions,
            game,
        }
    }

    impl Fixture {
        async fn joined(&self) -> SessionHandle {
            let handle = self.sessions.get_or_spawn(&self.game);
            handle.join("alice").await.unwrap();
            handle.join("bob").await.unwrap();
            handle
        }

        async fn stored_game(&self) -> GameEntity {
            ArenaStore::find_game(&self.store, self.game.id)
                .await
                .unwrap()
                .unwrap()
        }

        async fn player(&self, id: &str) -> PlayerEntity {
            ArenaStore::find_player(&self.store, id.into())
                .await
                .unwrap()
                .unwrap()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_out_of_turn_and_outsiders() {
        let fx = fixture(30, true).await;
        let handle = fx.joined().await;

        assert!(matches!(
            handle.place_stone("bob", 7, 7).await,
            Err(SessionError::NotYourTurn)
        ));
        assert!(matches!(
            handle.place_stone("mallory", 7, 7).await,
            Err(SessionError::GameNotFound)
        ));
        assert!(matches!(
            handle.join("mallory").await,
            Err(SessionError::GameNotFound)
        ));

        handle.place_stone("alice", 7, 7).await.unwrap();
        assert!(matches!(
            handle.place_stone("bob", 7, 7).await,
            Err(SessionError::Placement(PlacementError::Occupied))
        ));
        assert!(matches!(
            handle.place_stone("bob", 15, 0).await,
            Err(SessionError::Placement(PlacementError::OutOfBounds { .. }))
        ));

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.turn_holder, "bob");
        assert_eq!(snapshot.board.count(Stone::Black), 1);
        assert_eq!(snapshot.board.count(Stone::White), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn accepted_moves_are_broadcast_and_persisted() {
        let fx = fixture(30, true).await;
        let handle = fx.joined().await;
        fx.notifier.clear();

        handle.place_stone("alice", 3, 5).await.unwrap();

        for participant in ["alice", "bob"] {
            let events = fx.notifier.events_for(participant);
            assert!(events.iter().any(|event| matches!(
                event,
                OutboundEvent::MoveMade(made)
                    if made.x == 5 && made.y == 3 && made.color == Stone::Black && made.remaining_time == 30
            )));
        }

        let snapshot = fx.stored_game().await.board_snapshot.unwrap();
        let board = Board::from_snapshot(&snapshot).unwrap();
        assert_eq!(board.stone_at(3, 5), Some(Stone::Black));
    }

    #[tokio::test(start_paused = true)]
    async fn five_in_row_finalizes_ratings_once() {
        let fx = fixture(30, true).await;
        let handle = fx.joined().await;

        for col in 0..4 {
            handle.place_stone("alice", 7, col).await.unwrap();
            handle.place_stone("bob", 0, col).await.unwrap();
        }
        handle.place_stone("alice", 7, 4).await.unwrap();

        let game = fx.stored_game().await;
        assert_eq!(game.status, GameStatus::Completed);
        assert_eq!(game.winner_id.as_deref(), Some("alice"));
        assert!(game.board_snapshot.is_none());
        assert!(game.ended_at.is_some());

        let alice = fx.player("alice").await;
        let bob = fx.player("bob").await;
        assert_eq!((alice.rating, alice.wins, alice.losses), (1216, 1, 0));
        assert_eq!((bob.rating, bob.wins, bob.losses), (1184, 0, 1));

        let ended: Vec<_> = fx
            .notifier
            .events_for("bob")
            .into_iter()
            .filter_map(|event| match event {
                OutboundEvent::GameEnded(ended) => Some(ended),
                _ => None,
            })
            .collect();
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].reason, EndReason::FiveInRow);
        assert_eq!(ended[0].elo_change.winner, 16);
        assert_eq!(ended[0].elo_change.loser, -16);

        // A late resign cannot terminate the game a second time.
        assert!(matches!(
            handle.resign("bob").await,
            Err(SessionError::GameAlreadyEnded)
        ));
        assert_eq!(fx.player("alice").await.wins, 1);
        time::sleep(Duration::from_millis(10)).await;
        assert!(fx.sessions.get(fx.game.id).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn turn_clock_timeout_awards_the_opponent() {
        let fx = fixture(3, true).await;
        let _handle = fx.joined().await;

        time::sleep(Duration::from_secs(5)).await;

        let game = fx.stored_game().await;
        assert_eq!(game.status, GameStatus::Completed);
        assert_eq!(game.winner_id.as_deref(), Some("bob"));

        let names = fx.notifier.names_for("alice");
        assert!(names.contains(&"OnTimerUpdate"));
        assert_eq!(names.last(), Some(&"OnGameEnded"));
        assert!(fx.notifier.events_for("alice").iter().any(|event| matches!(
            event,
            OutboundEvent::GameEnded(ended) if ended.reason == EndReason::Timeout
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_racing_a_resignation_ends_the_game_once() {
        let fx = fixture(1, true).await;
        let handle = fx.joined().await;

        time::advance(Duration::from_secs(1)).await;
        let resigned = handle.resign("alice").await;
        assert!(matches!(
            resigned,
            Ok(()) | Err(SessionError::GameAlreadyEnded)
        ));
        time::sleep(Duration::from_millis(10)).await;

        for participant in ["alice", "bob"] {
            let ended = fx
                .notifier
                .names_for(participant)
                .into_iter()
                .filter(|name| *name == "OnGameEnded")
                .count();
            assert_eq!(ended, 1, "{participant} saw {ended} endings");
        }

        let alice = fx.player("alice").await;
        let bob = fx.player("bob").await;
        assert_eq!((alice.rating, alice.wins, alice.losses), (1184, 0, 1));
        assert_eq!((bob.rating, bob.wins, bob.losses), (1216, 1, 0));
        assert_eq!(fx.stored_game().await.winner_id.as_deref(), Some("bob"));
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_within_grace_restores_board_and_turn() {
        let fx = fixture(120, true).await;
        let handle = fx.joined().await;
        handle.place_stone("alice", 7, 7).await.unwrap();

        // bob holds the turn when he drops.
        handle.disconnect("bob").await;
        time::sleep(Duration::from_secs(10)).await;
        assert!(fx.notifier.events_for("alice").iter().any(|event| matches!(
            event,
            OutboundEvent::OpponentDisconnected(d) if d.grace_period_seconds == 30
        )));

        fx.notifier.clear();
        handle.join("bob").await.unwrap();
        time::sleep(Duration::from_secs(40)).await;

        let resumed = fx
            .notifier
            .events_for("bob")
            .into_iter()
            .find_map(|event| match event {
                OutboundEvent::GameResumed(resumed) => Some(resumed),
                _ => None,
            })
            .unwrap();
        assert_eq!(resumed.your_color, Stone::White);
        assert_eq!(resumed.current_turn, Stone::White);
        assert_eq!(resumed.board[7 * 15 + 7], 1);
        assert_eq!(resumed.board.iter().filter(|&&code| code != 0).count(), 1);
        assert!(resumed.opponent_connected);
        assert!(fx.notifier.names_for("alice").contains(&"OnOpponentReconnected"));

        let snapshot = handle.snapshot().await.unwrap();
        assert!(!snapshot.ended);
        assert_eq!(snapshot.disconnected, None);
        assert_eq!(snapshot.turn_holder, "bob");
        assert_eq!(fx.stored_game().await.status, GameStatus::InProgress);
    }

    #[tokio::test(start_paused = true)]
    async fn resume_reports_an_absent_opponent() {
        let fx = fixture(120, true).await;
        let handle = fx.joined().await;

        handle.disconnect("alice").await;
        handle.disconnect("bob").await;
        fx.notifier.set_offline("alice", true);
        handle.join("bob").await.unwrap();

        let resumed = fx
            .notifier
            .events_for("bob")
            .into_iter()
            .find_map(|event| match event {
                OutboundEvent::GameResumed(resumed) => Some(resumed),
                _ => None,
            })
            .unwrap();
        assert!(!resumed.opponent_connected);
        assert_eq!(resumed.current_turn, Stone::Black);
    }

    #[tokio::test(start_paused = true)]
    async fn grace_expiry_forfeits_the_absent_player() {
        let fx = fixture(120, true).await;
        let handle = fx.joined().await;

        handle.disconnect("bob").await;
        time::sleep(Duration::from_secs(31)).await;

        let game = fx.stored_game().await;
        assert_eq!(game.status, GameStatus::Completed);
        assert_eq!(game.winner_id.as_deref(), Some("alice"));
        assert!(fx.notifier.events_for("alice").iter().any(|event| matches!(
            event,
            OutboundEvent::GameEnded(ended) if ended.reason == EndReason::Disconnect
        )));
        assert!(matches!(
            handle.join("bob").await,
            Err(SessionError::GameAlreadyEnded)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_result_write_still_ends_the_session() {
        let fx = fixture(30, false).await;
        let handle = fx.joined().await;

        handle.resign("alice").await.unwrap();

        let snapshot = handle.snapshot().await.unwrap();
        assert!(snapshot.ended);
        assert_eq!(snapshot.winner_id.as_deref(), Some("bob"));
        assert_eq!(snapshot.end_reason, Some(EndReason::Resign));
        assert_eq!(fx.stored_game().await.status, GameStatus::InProgress);
        assert!(!fx.notifier.names_for("bob").contains(&"OnGameEnded"));

        assert!(matches!(
            handle.place_stone("alice", 7, 7).await,
            Err(SessionError::GameAlreadyEnded)
        ));
        assert!(matches!(
            handle.resign("bob").await,
            Err(SessionError::GameAlreadyEnded)
        ));
        assert!(fx.sessions.get(fx.game.id).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn restores_snapshot_with_inferred_turn() {
        let fx = fixture(30, true).await;
        let mut game = fx.game.clone();
        let mut engine = crate::rules::RuleEngine::new();
        engine.place_stone(7, 7).unwrap();
        game.board_snapshot = Some(engine.board().to_snapshot().unwrap());

        let handle = fx.sessions.get_or_spawn(&game);
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.board.stone_at(7, 7), Some(Stone::Black));
        assert_eq!(snapshot.turn_holder, "bob");

        let other = fx.sessions.get_or_spawn(&game);
        assert_eq!(other.game_id(), handle.game_id());
        assert_eq!(fx.sessions.len(), 1);
        assert_eq!(fx.sessions.sessions_for("alice").len(), 1);
        assert!(fx.sessions.sessions_for("carol").is_empty());
    }
}
