//! Periodic sequence rotation.
//!
//! One background task, started lazily by the first `/rotate` and torn down
//! cooperatively by `/cancel_rotation`. The task re-applies a fresh
//! sequence on a fixed interval and fans the result out to whoever is on
//! the roster at that moment — late joiners receive subsequent rotations,
//! not missed ones.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use knockgate_core::{next_sequence, ChannelId, Config, UserId};
use knockgate_knockd::{KnockController, ServiceRunner};

use crate::commands::sequence_reply;
use crate::transport::ChatTransport;

/// Bounded wait for the background task to observe cancellation.
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

type Roster = Arc<StdMutex<Vec<(UserId, ChannelId)>>>;

struct ActiveRotation {
    roster: Roster,
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Supervises the single rotation task and its subscriber roster.
pub struct RotationScheduler<R: ServiceRunner + 'static> {
    config: Arc<Config>,
    controller: Arc<KnockController<R>>,
    sink: Arc<dyn ChatTransport>,
    state: Mutex<Option<ActiveRotation>>,
}

impl<R: ServiceRunner + 'static> RotationScheduler<R> {
    pub fn new(
        config: Arc<Config>,
        controller: Arc<KnockController<R>>,
        sink: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            config,
            controller,
            sink,
            state: Mutex::new(None),
        }
    }

    /// Subscribe `user` (notified via `channel`) to periodic rotation.
    ///
    /// The first request applies one sequence immediately, notifies only
    /// the requester, and starts the background task. Later requests join
    /// the live roster; repeat requests from the same user change nothing.
    pub async fn request_rotation(&self, user: &UserId, channel: &ChannelId) -> String {
        let mut state = self.state.lock().await;

        if let Some(active) = state.as_ref() {
            let mut roster = match active.roster.lock() {
                Ok(roster) => roster,
                Err(poisoned) => poisoned.into_inner(),
            };
            if roster.iter().any(|(subscriber, _)| subscriber == user) {
                return "Already subscribed to periodic rotation.".to_string();
            }
            roster.push((user.clone(), channel.clone()));
            return format!(
                "Subscribed to periodic rotation ({} subscribers).",
                roster.len()
            );
        }

        // First subscriber: rotate once right away and notify only them.
        let message = rotate_once(&self.config, &self.controller).await;
        if let Err(e) = self.sink.send_message(channel, &message, None).await {
            warn!(%channel, error = %e, "could not deliver first rotation notice");
        }

        let roster: Roster = Arc::new(StdMutex::new(vec![(user.clone(), channel.clone())]));
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(rotation_loop(
            self.config.clone(),
            self.controller.clone(),
            self.sink.clone(),
            roster.clone(),
            cancel_rx,
        ));
        *state = Some(ActiveRotation {
            roster,
            cancel: cancel_tx,
            task,
        });

        info!(%user, "periodic rotation started");
        format!(
            "Periodic rotation started: a new sequence every {} seconds.",
            self.config.rotation_interval_secs
        )
    }

    /// Stop the rotation task, waiting (bounded) for it to exit, and clear
    /// the roster. Returns false when no rotation was running.
    pub async fn cancel(&self) -> bool {
        let mut state = self.state.lock().await;
        let Some(active) = state.take() else {
            return false;
        };

        let _ = active.cancel.send(true);
        let abort = active.task.abort_handle();
        if tokio::time::timeout(JOIN_TIMEOUT, active.task).await.is_err() {
            warn!("rotation task missed the cancel window; aborting it");
            abort.abort();
        }

        info!("periodic rotation cancelled");
        true
    }

    /// Whether the background task is currently running.
    pub async fn is_active(&self) -> bool {
        self.state.lock().await.is_some()
    }

    /// Current roster size; zero when inactive.
    pub async fn subscriber_count(&self) -> usize {
        match self.state.lock().await.as_ref() {
            Some(active) => match active.roster.lock() {
                Ok(roster) => roster.len(),
                Err(poisoned) => poisoned.into_inner().len(),
            },
            None => 0,
        }
    }
}

/// Apply one rotation and describe the outcome.
async fn rotate_once<R: ServiceRunner>(
    config: &Config,
    controller: &KnockController<R>,
) -> String {
    let sequence = next_sequence(config);
    match controller.apply_sequence(&sequence).await {
        Ok(()) => sequence_reply(&sequence),
        Err(e) => format!("Periodic rotation failed: {e}."),
    }
}

async fn rotation_loop<R: ServiceRunner>(
    config: Arc<Config>,
    controller: Arc<KnockController<R>>,
    sink: Arc<dyn ChatTransport>,
    roster: Roster,
    mut cancel: watch::Receiver<bool>,
) {
    let interval = Duration::from_secs(config.rotation_interval_secs);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = cancel.changed() => {
                // A dropped sender counts as cancellation.
                if changed.is_err() {
                    break;
                }
            }
        }
        if *cancel.borrow() {
            break;
        }

        let message = rotate_once(&config, &controller).await;

        // Re-check before fanning out; cancellation may have landed while
        // the sequence was being applied.
        if *cancel.borrow() {
            break;
        }

        let recipients: Vec<ChannelId> = {
            let roster = match roster.lock() {
                Ok(roster) => roster,
                Err(poisoned) => poisoned.into_inner(),
            };
            roster.iter().map(|(_, channel)| channel.clone()).collect()
        };
        for channel in &recipients {
            if let Err(e) = sink.send_message(channel, &message, None).await {
                warn!(%channel, error = %e, "rotation notice delivery failed");
            }
        }
    }
}
