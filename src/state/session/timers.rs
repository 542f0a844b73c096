use std::time::Duration;

use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use super::commands::SessionCommand;

const CLOCK_PERIOD: Duration = Duration::from_secs(1);

struct Armed {
    epoch: u64,
    task: JoinHandle<()>,
}

/// Cancelable turn clock and grace timer of one session.
///
/// Every arming takes a fresh epoch and stamps it on the messages its task sends.
/// Only a message carrying the epoch of the currently armed timer is current, so
/// a tick or expiry that was already queued when its timer got cancelled is
/// recognised and dropped by the actor.
pub(crate) struct SessionTimers {
    next_epoch: u64,
    clock: Option<Armed>,
    grace: Option<Armed>,
    inbox: mpsc::WeakSender<SessionCommand>,
}

impl SessionTimers {
    pub(crate) fn new(inbox: mpsc::WeakSender<SessionCommand>) -> Self {
        Self {
            next_epoch: 0,
            clock: None,
            grace: None,
            inbox,
        }
    }

    pub(crate) fn is_clock_running(&self) -> bool {
        self.clock.is_some()
    }

    /// (Re)start the one-second turn clock.
    pub(crate) fn arm_clock(&mut self) {
        self.cancel_clock();
        let epoch = self.bump();
        let inbox = self.inbox.clone();
        let task = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + CLOCK_PERIOD, CLOCK_PERIOD);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(tx) = inbox.upgrade() else { break };
                if tx.send(SessionCommand::ClockTick { epoch }).await.is_err() {
                    break;
                }
            }
        });
        self.clock = Some(Armed { epoch, task });
    }

    pub(crate) fn cancel_clock(&mut self) {
        if let Some(armed) = self.clock.take() {
            armed.task.abort();
        }
    }

    pub(crate) fn is_current_clock(&self, epoch: u64) -> bool {
        self.clock.as_ref().is_some_and(|armed| armed.epoch == epoch)
    }

    /// Arm the one-shot grace timer for `participant_id`, replacing any pending one.
    pub(crate) fn arm_grace(&mut self, participant_id: String, period: Duration) {
        self.cancel_grace();
        let epoch = self.bump();
        let inbox = self.inbox.clone();
        let task = tokio::spawn(async move {
            time::sleep(period).await;
            if let Some(tx) = inbox.upgrade() {
                let _ = tx
                    .send(SessionCommand::GraceExpired {
                        epoch,
                        participant_id,
                    })
                    .await;
            }
        });
        self.grace = Some(Armed { epoch, task });
    }

    pub(crate) fn cancel_grace(&mut self) {
        if let Some(armed) = self.grace.take() {
            armed.task.abort();
        }
    }

    pub(crate) fn is_current_grace(&self, epoch: u64) -> bool {
        self.grace.as_ref().is_some_and(|armed| armed.epoch == epoch)
    }

    pub(crate) fn cancel_all(&mut self) {
        self.cancel_clock();
        self.cancel_grace();
    }

    fn bump(&mut self) -> u64 {
        self.next_epoch += 1;
        self.next_epoch
    }
}

impl Drop for SessionTimers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn rearming_makes_earlier_ticks_stale() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut timers = SessionTimers::new(tx.downgrade());

        timers.arm_clock();
        let first = match rx.recv().await {
            Some(SessionCommand::ClockTick { epoch }) => epoch,
            _ => panic!("expected a clock tick"),
        };
        assert!(timers.is_current_clock(first));

        timers.arm_clock();
        assert!(!timers.is_current_clock(first));
        match rx.recv().await {
            Some(SessionCommand::ClockTick { epoch }) => assert!(timers.is_current_clock(epoch)),
            _ => panic!("expected a clock tick"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_grace_never_fires() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut timers = SessionTimers::new(tx.downgrade());

        timers.arm_grace("bob".into(), Duration::from_secs(30));
        time::sleep(Duration::from_secs(10)).await;
        timers.cancel_grace();
        time::sleep(Duration::from_secs(60)).await;

        assert!(rx.try_recv().is_err());
    }
}
