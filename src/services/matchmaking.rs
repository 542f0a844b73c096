//! Rating-based matchmaking: queue membership and the periodic pairing loop.

use std::{
    panic::AssertUnwindSafe,
    sync::Arc,
    time::{Duration, SystemTime},
};

use futures::FutureExt;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    config::MatchmakingSettings,
    dao::{
        game_store::ArenaStore,
        models::{GameEntity, QueueEntryEntity},
    },
    dto::ws::{MatchFound, MatchmakingStatus, OutboundEvent},
    error::ServiceError,
    rules::Stone,
    services::notifier::Notifier,
    state::SharedState,
};

/// Upper bound for one scheduler pass before it is abandoned.
const TICK_TIMEOUT: Duration = Duration::from_secs(5);

/// Put `participant_id` in the queue, or refresh its channel if already queued.
///
/// The participant is acknowledged right away with its current wait status.
pub async fn join_queue(
    state: &SharedState,
    participant_id: &str,
    channel: Uuid,
) -> Result<QueueEntryEntity, ServiceError> {
    let store = state.store();
    let player = store
        .find_player(participant_id.to_string())
        .await?
        .ok_or_else(|| ServiceError::Unauthorized(format!("unknown player `{participant_id}`")))?;

    let now = SystemTime::now();
    let entry = store
        .upsert_queue_entry(QueueEntryEntity {
            participant_id: player.id.clone(),
            rating: player.rating,
            enqueued_at: now,
            channel: Some(channel),
        })
        .await?;
    info!(participant_id, rating = entry.rating, "joined matchmaking");

    let config = state.config();
    let waited = waited(&entry, now);
    let status = OutboundEvent::MatchmakingStatus(MatchmakingStatus {
        waiting_seconds: waited.as_secs(),
        current_range: tolerance_window(&config.matchmaking, waited),
    });
    state
        .matchmaking_hub()
        .send_on_channel(participant_id, channel, &status);
    Ok(entry)
}

/// Remove `participant_id` from the queue. Returns whether it was queued.
pub async fn leave_queue(state: &SharedState, participant_id: &str) -> Result<bool, ServiceError> {
    let removed = state
        .store()
        .remove_queue_entry(participant_id.to_string())
        .await?;
    if removed {
        info!(participant_id, "left matchmaking");
    }
    Ok(removed)
}

/// Maximum accepted rating gap after waiting `waited`; `None` accepts anyone.
pub fn tolerance_window(settings: &MatchmakingSettings, waited: Duration) -> Option<u32> {
    let secs = waited.as_secs();
    if secs > settings.match_anyone_after_secs {
        return None;
    }
    let steps = u32::try_from(secs / settings.tolerance_step_secs).unwrap_or(u32::MAX);
    Some(
        settings
            .base_tolerance
            .saturating_add(settings.tolerance_step.saturating_mul(steps)),
    )
}

fn waited(entry: &QueueEntryEntity, now: SystemTime) -> Duration {
    now.duration_since(entry.enqueued_at).unwrap_or_default()
}

/// Oldest entry and its best partner, as indices into `queue`.
///
/// `queue` must be ordered by enqueue time. The partner is the closest rating
/// within the oldest entry's tolerance, earliest enqueue time first on ties.
fn select_pair(
    queue: &[QueueEntryEntity],
    settings: &MatchmakingSettings,
    now: SystemTime,
) -> Option<(usize, usize)> {
    let anchor = queue.first()?;
    let tolerance = tolerance_window(settings, waited(anchor, now));

    queue
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, entry)| entry.participant_id != anchor.participant_id)
        .map(|(index, entry)| (index, entry.rating.abs_diff(anchor.rating), entry.enqueued_at))
        .filter(|(_, gap, _)| tolerance.is_none_or(|limit| *gap <= limit))
        .min_by_key(|(_, gap, enqueued_at)| (*gap, *enqueued_at))
        .map(|(index, _, _)| (0, index))
}

/// Periodic loop pairing waiting participants.
pub struct MatchmakingScheduler {
    store: Arc<dyn ArenaStore>,
    notifier: Arc<dyn Notifier>,
    settings: MatchmakingSettings,
    last_status: Option<SystemTime>,
}

impl MatchmakingScheduler {
    /// Scheduler over explicit collaborators.
    pub fn new(
        store: Arc<dyn ArenaStore>,
        notifier: Arc<dyn Notifier>,
        settings: MatchmakingSettings,
    ) -> Self {
        Self {
            store,
            notifier,
            settings,
            last_status: None,
        }
    }

    /// Scheduler wired to the shared store and the matchmaking channel.
    pub fn from_state(state: &SharedState) -> Self {
        Self::new(
            state.store(),
            state.matchmaking_hub().clone(),
            state.config().matchmaking.clone(),
        )
    }

    /// Run forever. A failing, panicking or stuck pass is logged and the next
    /// one starts after the usual delay.
    pub async fn run(mut self) {
        info!(tick_millis = self.settings.tick_millis, "matchmaking scheduler started");
        let mut interval = time::interval(self.settings.tick());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let pass = AssertUnwindSafe(self.tick(SystemTime::now())).catch_unwind();
            match time::timeout(TICK_TIMEOUT, pass).await {
                Ok(Ok(Ok(_))) => {}
                Ok(Ok(Err(err))) => warn!(error = %err, "matchmaking tick failed"),
                Ok(Err(_)) => error!("matchmaking tick panicked"),
                Err(_) => warn!("matchmaking tick timed out"),
            }
        }
    }

    /// One scheduler pass: maybe broadcast wait status, then try one pairing.
    pub async fn tick(&mut self, now: SystemTime) -> Result<Option<GameEntity>, ServiceError> {
        let queue = self.store.list_queue().await?;

        let status_due = self.last_status.is_none_or(|last| {
            now.duration_since(last).unwrap_or_default() >= self.settings.status_interval()
        });
        if status_due {
            self.broadcast_status(&queue, now);
            self.last_status = Some(now);
        }

        let Some((anchor, partner)) = select_pair(&queue, &self.settings, now) else {
            return Ok(None);
        };
        self.pair(&queue[anchor], &queue[partner]).await
    }

    fn broadcast_status(&self, queue: &[QueueEntryEntity], now: SystemTime) {
        for entry in queue {
            let waited = waited(entry, now);
            let event = OutboundEvent::MatchmakingStatus(MatchmakingStatus {
                waiting_seconds: waited.as_secs(),
                current_range: tolerance_window(&self.settings, waited),
            });
            self.deliver(entry, &event);
        }
    }

    async fn pair(
        &self,
        first: &QueueEntryEntity,
        second: &QueueEntryEntity,
    ) -> Result<Option<GameEntity>, ServiceError> {
        let first_player = self
            .store
            .find_player(first.participant_id.clone())
            .await?;
        let second_player = self
            .store
            .find_player(second.participant_id.clone())
            .await?;

        let (Some(first_player), Some(second_player)) = (first_player, second_player) else {
            let removed = self
                .store
                .claim_pair(
                    first.participant_id.clone(),
                    second.participant_id.clone(),
                    None,
                )
                .await?;
            warn!(
                first = %first.participant_id,
                second = %second.participant_id,
                removed,
                "player record missing; pairing aborted"
            );
            return Ok(None);
        };

        let (black, white) = if rand::random::<bool>() {
            (first_player, second_player)
        } else {
            (second_player, first_player)
        };
        let game = GameEntity::new(black.id.clone(), white.id.clone());

        let claimed = self
            .store
            .claim_pair(
                first.participant_id.clone(),
                second.participant_id.clone(),
                Some(game.clone()),
            )
            .await?;
        if !claimed {
            debug!(
                first = %first.participant_id,
                second = %second.participant_id,
                "entries already claimed"
            );
            return Ok(None);
        }

        info!(
            game_id = %game.id,
            black = %black.id,
            white = %white.id,
            gap = black.rating.abs_diff(white.rating),
            "paired players"
        );
        let seats = [
            (&black, Stone::Black, &white),
            (&white, Stone::White, &black),
        ];
        for entry in [first, second] {
            let Some((_, color, opponent)) = seats
                .iter()
                .find(|(player, _, _)| player.id == entry.participant_id)
            else {
                continue;
            };
            self.deliver(
                entry,
                &OutboundEvent::MatchFound(MatchFound {
                    game_id: game.id,
                    opponent_name: opponent.display_name.clone(),
                    your_color: *color,
                }),
            );
        }
        Ok(Some(game))
    }

    fn deliver(&self, entry: &QueueEntryEntity, event: &OutboundEvent) {
        let delivered = match entry.channel {
            Some(channel) => self
                .notifier
                .send_on_channel(&entry.participant_id, channel, event),
            None => self.notifier.send(&entry.participant_id, event),
        };
        if !delivered {
            debug!(participant_id = %entry.participant_id, event = event.name(), "event not delivered");
        }
    }
}
