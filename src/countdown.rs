use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::entities::{Plan, UserId};
use crate::repositories::UserRepository;

const TICK: Duration = Duration::from_secs(1);

/// counts down the remaining time of `plan` once per second while a session is
/// signed in. at zero the plan falls back to FREE and the task ends. the task
/// also ends, without writing, once the stored plan is no longer `plan`.
pub struct Countdown {
    handle: JoinHandle<()>,
    remaining: watch::Receiver<u64>,
}

impl Countdown {
    pub fn spawn(
        users: Arc<dyn UserRepository + Sync + Send>,
        id: UserId,
        plan: Plan,
        initial: u64,
    ) -> Self {
        let (tx, rx) = watch::channel(initial);
        let span = tracing::info_span!("countdown", user = %id, plan = %plan);

        let handle = tokio::spawn(
            async move {
                let mut remaining = initial;
                let mut interval = tokio::time::interval(TICK);
                // first tick completes immediately
                interval.tick().await;

                while remaining > 0 {
                    interval.tick().await;

                    let next = remaining - 1;
                    match users.tick_plan(&id, plan, next).await {
                        Ok(true) => (),
                        Ok(false) => {
                            tracing::info!("plan changed, countdown stopped");
                            return;
                        },
                        Err(e) => {
                            tracing::warn!("failed to persist remaining time: {}", e);
                            if next == 0 {
                                // expiry was not stored; try again next tick
                                continue;
                            }
                        },
                    }

                    remaining = next;
                    tx.send_replace(remaining);
                }

                tracing::info!("plan expired, back to {}", Plan::Free);
            }
            .instrument(span),
        );

        Self {
            handle,
            remaining: rx,
        }
    }

    pub fn remaining(&self) -> u64 { *self.remaining.borrow() }

    pub fn is_finished(&self) -> bool { self.handle.is_finished() }

    /// aborts the task and waits until no tick can be written anymore.
    pub async fn stop(mut self) {
        self.handle.abort();
        if let Err(e) = (&mut self.handle).await {
            tracing::trace!("countdown stopped: {}", e);
        }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) { self.handle.abort(); }
}
