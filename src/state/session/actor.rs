use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use super::{
    SessionContext,
    commands::{SessionCommand, SessionSnapshot},
    handle::SessionHandle,
    timers::SessionTimers,
};
use crate::{
    dao::{
        models::{GameResultEntity, GameStatus},
        storage::{StorageError, StorageResult},
    },
    dto::ws::{
        EloChange, EndReason, GameEnded, GameResumed, GameStarted, MoveMade, OpponentDisconnected,
        OpponentReconnected, OutboundEvent, TimerUpdate,
    },
    error::SessionError,
    services::rating::RatingChange,
    state::game::GameSession,
};

/// Run the actor owning `session` until it has ended and its result is stored.
pub(crate) async fn run_session_actor(
    session: GameSession,
    ctx: SessionContext,
    inbox: mpsc::Receiver<SessionCommand>,
    weak_tx: mpsc::WeakSender<SessionCommand>,
    registry: Arc<DashMap<Uuid, SessionHandle>>,
) {
    let game_id = session.game_id;
    let actor = SessionActor {
        session,
        ctx,
        timers: SessionTimers::new(weak_tx),
        recorded: false,
    };
    actor
        .run(inbox, registry)
        .instrument(info_span!("session", %game_id))
        .await;
}

struct SessionActor {
    session: GameSession,
    ctx: SessionContext,
    timers: SessionTimers,
    /// Whether the final result reached the store.
    recorded: bool,
}

impl SessionActor {
    async fn run(
        mut self,
        mut inbox: mpsc::Receiver<SessionCommand>,
        registry: Arc<DashMap<Uuid, SessionHandle>>,
    ) {
        debug!("session actor started");

        while let Some(cmd) = inbox.recv().await {
            self.handle(cmd).await;
            if self.session.ended && self.recorded {
                break;
            }
        }

        inbox.close();
        while let Some(cmd) = inbox.recv().await {
            cmd.reject(|| SessionError::GameAlreadyEnded);
        }
        registry.remove_if(&self.session.game_id, |_, handle| handle.is_closed());

        debug!("session actor exited");
    }

    async fn handle(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Join {
                participant_id,
                reply,
            } => {
                let _ = reply.send(self.join(&participant_id));
            }
            SessionCommand::PlaceStone {
                participant_id,
                row,
                col,
                reply,
            } => {
                let result = self.place_stone(&participant_id, row, col).await;
                let _ = reply.send(result);
            }
            SessionCommand::Resign {
                participant_id,
                reply,
            } => {
                let result = self.resign(&participant_id).await;
                let _ = reply.send(result);
            }
            SessionCommand::Disconnect { participant_id } => self.disconnect(participant_id),
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            SessionCommand::ClockTick { epoch } => self.clock_tick(epoch).await,
            SessionCommand::GraceExpired {
                epoch,
                participant_id,
            } => self.grace_expired(epoch, &participant_id).await,
        }
    }

    fn join(&mut self, participant_id: &str) -> Result<(), SessionError> {
        let color = self
            .session
            .color_of(participant_id)
            .ok_or(SessionError::GameNotFound)?;
        if self.session.ended {
            return Err(SessionError::GameAlreadyEnded);
        }

        if self.session.is_disconnected(participant_id) {
            self.session.disconnected = None;
            self.timers.cancel_grace();

            let opponent = self.session.participant(color.opponent()).to_string();
            self.notify(
                participant_id,
                OutboundEvent::GameResumed(GameResumed {
                    board: self.session.engine.board().codes(),
                    your_color: color,
                    current_turn: self.session.engine.turn(),
                    remaining_seconds: self.session.remaining_seconds,
                    opponent_connected: self.ctx.notifier.is_connected(&opponent),
                }),
            );
            self.notify(
                &opponent,
                OutboundEvent::OpponentReconnected(OpponentReconnected {}),
            );
            info!(participant_id, "participant reconnected");
        } else {
            self.notify(
                participant_id,
                OutboundEvent::GameStarted(GameStarted {
                    game_id: self.session.game_id,
                    black_id: self.session.black_id.clone(),
                    white_id: self.session.white_id.clone(),
                    your_color: color,
                }),
            );
            if !self.timers.is_clock_running() {
                self.timers.arm_clock();
            }
            info!(participant_id, color = ?color, "participant joined");
        }
        Ok(())
    }

    async fn place_stone(
        &mut self,
        participant_id: &str,
        row: i32,
        col: i32,
    ) -> Result<(), SessionError> {
        if self.session.ended {
            return Err(SessionError::GameAlreadyEnded);
        }
        if self.session.color_of(participant_id).is_none() {
            return Err(SessionError::GameNotFound);
        }
        if self.session.turn_holder() != participant_id {
            return Err(SessionError::NotYourTurn);
        }

        let placement = self.session.engine.place_stone(row, col)?;
        let turn_seconds = self.ctx.settings.turn_seconds;
        self.session.remaining_seconds = turn_seconds;
        self.broadcast(OutboundEvent::MoveMade(MoveMade {
            x: col,
            y: row,
            color: placement.stone,
            remaining_time: turn_seconds,
        }));
        self.persist_board().await;

        if placement.winning {
            self.end_game(participant_id.to_string(), EndReason::FiveInRow)
                .await;
        } else {
            self.timers.arm_clock();
        }
        Ok(())
    }

    async fn resign(&mut self, participant_id: &str) -> Result<(), SessionError> {
        if self.session.ended {
            return Err(SessionError::GameAlreadyEnded);
        }
        let winner = self
            .session
            .opponent_of(participant_id)
            .ok_or(SessionError::GameNotFound)?
            .to_string();
        info!(participant_id, "participant resigned");
        self.end_game(winner, EndReason::Resign).await;
        Ok(())
    }

    fn disconnect(&mut self, participant_id: String) {
        if self.session.ended {
            return;
        }
        let Some(opponent) = self.session.opponent_of(&participant_id).map(str::to_string) else {
            return;
        };

        let grace_seconds = self.ctx.settings.disconnect_grace_seconds;
        self.notify(
            &opponent,
            OutboundEvent::OpponentDisconnected(OpponentDisconnected {
                grace_period_seconds: grace_seconds,
            }),
        );
        info!(%participant_id, grace_seconds, "participant disconnected");
        self.session.disconnected = Some(participant_id.clone());
        self.timers
            .arm_grace(participant_id, Duration::from_secs(u64::from(grace_seconds)));
    }

    async fn clock_tick(&mut self, epoch: u64) {
        if self.session.ended || !self.timers.is_current_clock(epoch) {
            return;
        }

        self.session.remaining_seconds = self.session.remaining_seconds.saturating_sub(1);
        self.broadcast(OutboundEvent::TimerUpdate(TimerUpdate {
            current_player: self.session.engine.turn(),
            remaining_seconds: self.session.remaining_seconds,
        }));

        if self.session.remaining_seconds == 0 {
            let holder = self.session.turn_holder().to_string();
            info!(participant_id = %holder, "turn clock ran out");
            let winner = self
                .session
                .participant(self.session.engine.turn().opponent())
                .to_string();
            self.end_game(winner, EndReason::Timeout).await;
        }
    }

    async fn grace_expired(&mut self, epoch: u64, participant_id: &str) {
        if self.session.ended
            || !self.timers.is_current_grace(epoch)
            || !self.session.is_disconnected(participant_id)
        {
            return;
        }
        let Some(winner) = self.session.opponent_of(participant_id).map(str::to_string) else {
            return;
        };
        info!(participant_id, "grace period expired");
        self.end_game(winner, EndReason::Disconnect).await;
    }

    /// Terminate the session once; later calls are no-ops.
    async fn end_game(&mut self, winner_id: String, reason: EndReason) {
        if self.session.ended {
            return;
        }
        self.session.ended = true;
        self.session.winner_id = Some(winner_id.clone());
        self.session.end_reason = Some(reason);
        self.timers.cancel_all();

        let loser_id = self
            .session
            .opponent_of(&winner_id)
            .unwrap_or_default()
            .to_string();
        info!(%winner_id, %loser_id, ?reason, "game ended");

        match self.record_result(&winner_id, &loser_id).await {
            Ok(change) => {
                self.recorded = true;
                self.broadcast(OutboundEvent::GameEnded(GameEnded {
                    winner_id,
                    reason,
                    elo_change: EloChange {
                        winner: change.winner_delta,
                        loser: change.loser_delta,
                    },
                }));
            }
            Err(err) => {
                error!(
                    %winner_id,
                    %loser_id,
                    ?reason,
                    error = %err,
                    "failed to record game result; session ended without rating changes"
                );
            }
        }
    }

    /// Apply the rating update and completion to the store as one write.
    async fn record_result(&self, winner_id: &str, loser_id: &str) -> StorageResult<RatingChange> {
        let store = &self.ctx.store;
        let game_id = self.session.game_id;

        let mut game = store
            .find_game(game_id)
            .await?
            .ok_or_else(|| StorageError::missing("game", game_id.to_string()))?;
        let mut winner = store
            .find_player(winner_id.to_string())
            .await?
            .ok_or_else(|| StorageError::missing("player", winner_id))?;
        let mut loser = store
            .find_player(loser_id.to_string())
            .await?
            .ok_or_else(|| StorageError::missing("player", loser_id))?;

        let change = self.ctx.rating.calculate(winner.rating, loser.rating);
        let now = SystemTime::now();

        winner.rating = change.winner_rating;
        winner.wins += 1;
        winner.last_played_at = Some(now);
        loser.rating = change.loser_rating;
        loser.losses += 1;
        loser.last_played_at = Some(now);

        game.status = GameStatus::Completed;
        game.winner_id = Some(winner_id.to_string());
        game.ended_at = Some(now);
        game.board_snapshot = None;

        store
            .commit_game_result(GameResultEntity {
                game,
                winner,
                loser,
            })
            .await?;
        Ok(change)
    }

    /// Store the board after an accepted move. Failures only cost resumability.
    async fn persist_board(&self) {
        let snapshot = match self.session.engine.board().to_snapshot() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, "failed to encode board snapshot");
                return;
            }
        };
        let store = &self.ctx.store;
        let result = match store.find_game(self.session.game_id).await {
            Ok(Some(mut game)) if game.status == GameStatus::InProgress => {
                game.board_snapshot = Some(snapshot);
                store.save_game(game).await
            }
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(StorageError::missing(
                "game",
                self.session.game_id.to_string(),
            )),
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            warn!(error = %err, "failed to persist board snapshot");
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            game_id: self.session.game_id,
            board: self.session.engine.board().clone(),
            turn: self.session.engine.turn(),
            turn_holder: self.session.turn_holder().to_string(),
            remaining_seconds: self.session.remaining_seconds,
            disconnected: self.session.disconnected.clone(),
            ended: self.session.ended,
            winner_id: self.session.winner_id.clone(),
            end_reason: self.session.end_reason,
        }
    }

    fn notify(&self, participant_id: &str, event: OutboundEvent) {
        if !self.ctx.notifier.send(participant_id, &event) {
            debug!(participant_id, event = event.name(), "event not delivered");
        }
    }

    fn broadcast(&self, event: OutboundEvent) {
        self.notify(&self.session.black_id, event.clone());
        self.notify(&self.session.white_id, event);
    }
}
