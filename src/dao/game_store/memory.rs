use std::{collections::HashMap, sync::Arc};

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::dao::{
    game_store::ArenaStore,
    models::{GameEntity, GameResultEntity, PlayerEntity, QueueEntryEntity},
    storage::{StorageError, StorageResult},
};

/// Single-process store keeping every table behind one lock.
///
/// Holding the lock for the whole of a multi-table write is what makes
/// `claim_pair` and `commit_game_result` atomic.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

#[derive(Default)]
struct Tables {
    games: HashMap<Uuid, GameEntity>,
    players: HashMap<String, PlayerEntity>,
    /// Keyed by participant; insertion order is enqueue order.
    queue: IndexMap<String, QueueEntryEntity>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with the given players.
    pub fn with_players(players: impl IntoIterator<Item = PlayerEntity>) -> Self {
        let tables = Tables {
            players: players
                .into_iter()
                .map(|player| (player.id.clone(), player))
                .collect(),
            ..Tables::default()
        };
        Self {
            tables: Arc::new(Mutex::new(tables)),
        }
    }

    async fn find_game(&self, id: Uuid) -> Option<GameEntity> {
        self.tables.lock().await.games.get(&id).cloned()
    }

    async fn save_game(&self, game: GameEntity) {
        self.tables.lock().await.games.insert(game.id, game);
    }

    async fn find_player(&self, id: &str) -> Option<PlayerEntity> {
        self.tables.lock().await.players.get(id).cloned()
    }

    async fn save_player(&self, player: PlayerEntity) {
        self.tables
            .lock()
            .await
            .players
            .insert(player.id.clone(), player);
    }

    async fn commit_game_result(&self, result: GameResultEntity) -> StorageResult<()> {
        let mut tables = self.tables.lock().await;
        if !tables.games.contains_key(&result.game.id) {
            return Err(StorageError::missing("game", result.game.id.to_string()));
        }
        for player in [&result.winner, &result.loser] {
            if !tables.players.contains_key(&player.id) {
                return Err(StorageError::missing("player", player.id.clone()));
            }
        }

        tables.games.insert(result.game.id, result.game);
        tables
            .players
            .insert(result.winner.id.clone(), result.winner);
        tables.players.insert(result.loser.id.clone(), result.loser);
        Ok(())
    }

    async fn list_queue(&self) -> Vec<QueueEntryEntity> {
        let mut entries: Vec<_> = self.tables.lock().await.queue.values().cloned().collect();
        entries.sort_by_key(|entry| entry.enqueued_at);
        entries
    }

    async fn find_queue_entry(&self, participant_id: &str) -> Option<QueueEntryEntity> {
        self.tables.lock().await.queue.get(participant_id).cloned()
    }

    async fn upsert_queue_entry(&self, entry: QueueEntryEntity) -> QueueEntryEntity {
        let channel = entry.channel;
        let mut tables = self.tables.lock().await;
        let stored = tables
            .queue
            .entry(entry.participant_id.clone())
            .and_modify(|existing| existing.channel = channel)
            .or_insert(entry);
        stored.clone()
    }

    async fn remove_queue_entry(&self, participant_id: &str) -> bool {
        self.tables
            .lock()
            .await
            .queue
            .shift_remove(participant_id)
            .is_some()
    }

    async fn claim_pair(&self, first: &str, second: &str, game: Option<GameEntity>) -> bool {
        let mut tables = self.tables.lock().await;
        if first == second || !tables.queue.contains_key(first) || !tables.queue.contains_key(second)
        {
            return false;
        }

        tables.queue.shift_remove(first);
        tables.queue.shift_remove(second);
        if let Some(game) = game {
            tables.games.insert(game.id, game);
        }
        true
    }
}

impl ArenaStore for MemoryStore {
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.find_game(id).await) })
    }

    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.save_game(game).await;
            Ok(())
        })
    }

    fn find_player(&self, id: String) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.find_player(&id).await) })
    }

    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.save_player(player).await;
            Ok(())
        })
    }

    fn commit_game_result(&self, result: GameResultEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.commit_game_result(result).await })
    }

    fn list_queue(&self) -> BoxFuture<'static, StorageResult<Vec<QueueEntryEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.list_queue().await) })
    }

    fn find_queue_entry(
        &self,
        participant_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<QueueEntryEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.find_queue_entry(&participant_id).await) })
    }

    fn upsert_queue_entry(
        &self,
        entry: QueueEntryEntity,
    ) -> BoxFuture<'static, StorageResult<QueueEntryEntity>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.upsert_queue_entry(entry).await) })
    }

    fn remove_queue_entry(&self, participant_id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.remove_queue_entry(&participant_id).await) })
    }

    fn claim_pair(
        &self,
        first: String,
        second: String,
        game: Option<GameEntity>,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.claim_pair(&first, &second, game).await) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
