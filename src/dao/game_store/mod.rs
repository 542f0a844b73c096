/// In-process implementation of [`ArenaStore`].
pub mod memory;

use crate::dao::models::{GameEntity, GameResultEntity, PlayerEntity, QueueEntryEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Persistence collaborators consumed by the session coordinator and matchmaking.
pub trait ArenaStore: Send + Sync {
    /// Game record by id.
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Insert or replace a game record.
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Player record by participant id.
    fn find_player(&self, id: String) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>>;
    /// Insert or replace a player record.
    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Write the finished game and both player records together, or nothing.
    fn commit_game_result(&self, result: GameResultEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Queue entries ordered by enqueue time.
    fn list_queue(&self) -> BoxFuture<'static, StorageResult<Vec<QueueEntryEntity>>>;
    /// Queue entry of `participant_id`, if queued.
    fn find_queue_entry(
        &self,
        participant_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<QueueEntryEntity>>>;
    /// Insert an entry, or refresh the channel of an existing one while keeping
    /// its original enqueue time. Returns the stored entry.
    fn upsert_queue_entry(
        &self,
        entry: QueueEntryEntity,
    ) -> BoxFuture<'static, StorageResult<QueueEntryEntity>>;
    /// Returns whether an entry was removed.
    fn remove_queue_entry(&self, participant_id: String) -> BoxFuture<'static, StorageResult<bool>>;
    /// Atomically remove both entries and, when given, insert the new game.
    ///
    /// Nothing is written and `false` is returned if either entry is already gone,
    /// so two concurrent claims can never both take the same participant.
    fn claim_pair(
        &self,
        first: String,
        second: String,
        game: Option<GameEntity>,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Fails when the backend cannot serve requests.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
