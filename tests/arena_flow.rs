use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use axum::extract::ws::Message;
use serde_json::Value;
use tokio::sync::mpsc;

use gomoku_arena::{
    config::AppConfig,
    dao::{
        game_store::{ArenaStore, memory::MemoryStore},
        models::{GameStatus, PlayerEntity},
    },
    error::SessionError,
    services::{
        game_service,
        matchmaking::{self, MatchmakingScheduler},
    },
    state::{AppState, SharedState},
};

fn drain(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<Value> {
    let mut out = Vec::new();
    while let Ok(message) = rx.try_recv() {
        if let Message::Text(text) = message {
            out.push(serde_json::from_str(text.as_str()).unwrap());
        }
    }
    out
}

fn events(frames: &[Value]) -> Vec<&str> {
    frames
        .iter()
        .map(|frame| frame["event"].as_str().unwrap())
        .collect()
}

fn arena() -> (SharedState, MemoryStore) {
    let store = MemoryStore::with_players([
        PlayerEntity::new("alice", "Alice", 1200),
        PlayerEntity::new("bob", "Bob", 1200),
    ]);
    let state = AppState::new(AppConfig::default(), Arc::new(store.clone()));
    (state, store)
}

#[tokio::test(start_paused = true)]
async fn queued_players_are_paired_and_play_to_a_rated_finish() {
    let (state, store) = arena();

    let (alice_mm, mut alice_mm_rx) = mpsc::unbounded_channel();
    let (bob_mm, mut bob_mm_rx) = mpsc::unbounded_channel();
    let alice_channel = state.matchmaking_hub().register("alice", alice_mm);
    let bob_channel = state.matchmaking_hub().register("bob", bob_mm);
    matchmaking::join_queue(&state, "alice", alice_channel)
        .await
        .unwrap();
    matchmaking::join_queue(&state, "bob", bob_channel)
        .await
        .unwrap();

    let mut scheduler = MatchmakingScheduler::from_state(&state);
    let game = scheduler
        .tick(SystemTime::now())
        .await
        .unwrap()
        .expect("equal ratings pair on the first pass");
    assert!(ArenaStore::list_queue(&store).await.unwrap().is_empty());

    let alice_frames = drain(&mut alice_mm_rx);
    let found = alice_frames
        .iter()
        .find(|frame| frame["event"] == "OnMatchFound")
        .expect("alice notified");
    assert_eq!(found["data"]["gameId"], game.id.to_string());
    assert_eq!(found["data"]["opponentName"], "Bob");
    assert!(events(&drain(&mut bob_mm_rx)).contains(&"OnMatchFound"));

    let (black_tx, mut black_rx) = mpsc::unbounded_channel();
    let (white_tx, mut white_rx) = mpsc::unbounded_channel();
    state.game_hub().register(&game.black_id, black_tx);
    state.game_hub().register(&game.white_id, white_tx);

    let id = game.id.to_string();
    game_service::join_game(&state, &game.black_id, &id)
        .await
        .unwrap();
    game_service::join_game(&state, &game.white_id, &id)
        .await
        .unwrap();
    let started = drain(&mut black_rx);
    assert_eq!(started[0]["event"], "OnGameStarted");
    assert_eq!(started[0]["data"]["yourColor"], "black");
    drain(&mut white_rx);

    for x in 0..4 {
        game_service::place_stone(&state, &game.black_id, &id, x, 7)
            .await
            .unwrap();
        game_service::place_stone(&state, &game.white_id, &id, x, 9)
            .await
            .unwrap();
    }
    game_service::place_stone(&state, &game.black_id, &id, 4, 7)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let white_frames = drain(&mut white_rx);
    let ended = white_frames
        .iter()
        .find(|frame| frame["event"] == "OnGameEnded")
        .expect("game ended for white");
    assert_eq!(ended["data"]["winnerId"], game.black_id.as_str());
    assert_eq!(ended["data"]["reason"], "five_in_row");
    assert_eq!(ended["data"]["eloChange"]["winner"], 16);
    assert_eq!(ended["data"]["eloChange"]["loser"], -16);
    assert!(events(&drain(&mut black_rx)).contains(&"OnGameEnded"));

    let stored = ArenaStore::find_game(&store, game.id).await.unwrap().unwrap();
    assert_eq!(stored.status, GameStatus::Completed);
    assert_eq!(stored.winner_id.as_deref(), Some(game.black_id.as_str()));
    let winner = ArenaStore::find_player(&store, game.black_id.clone()).await.unwrap().unwrap();
    let loser = ArenaStore::find_player(&store, game.white_id.clone()).await.unwrap().unwrap();
    assert_eq!((winner.rating, winner.wins), (1216, 1));
    assert_eq!((loser.rating, loser.losses), (1184, 1));

    assert!(matches!(
        game_service::place_stone(&state, &game.white_id, &id, 8, 8).await,
        Err(SessionError::GameAlreadyEnded)
    ));
}

#[tokio::test(start_paused = true)]
async fn leaving_the_queue_prevents_pairing() {
    let (state, store) = arena();
    let (tx, _rx) = mpsc::unbounded_channel();
    let channel = state.matchmaking_hub().register("alice", tx);
    matchmaking::join_queue(&state, "alice", channel)
        .await
        .unwrap();
    matchmaking::join_queue(&state, "bob", channel).await.unwrap();

    assert!(matchmaking::leave_queue(&state, "bob").await.unwrap());
    assert!(!matchmaking::leave_queue(&state, "bob").await.unwrap());

    let mut scheduler = MatchmakingScheduler::from_state(&state);
    assert!(scheduler.tick(SystemTime::now()).await.unwrap().is_none());
    assert_eq!(ArenaStore::list_queue(&store).await.unwrap().len(), 1);
}
