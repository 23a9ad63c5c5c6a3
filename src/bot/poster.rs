//! Auto-poster: unprompted chat messages on a randomized timer.
//!
//! One task per connection. The supervisor spawns it after the handshake and
//! cancels and joins it before closing the connection, so a poster never
//! outlives the session it writes to.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rand::seq::IndexedRandom;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::transport::LineSender;

use super::config::AutoPostConfig;

// ============================================================================
// PostSchedule
// ============================================================================

/// Phrase set and wait bounds, shared with the poster task.
#[derive(Debug, Clone)]
pub struct PostSchedule {
    /// Non-empty phrase set.
    phrases: Arc<[String]>,
    /// Inclusive lower bound, in milliseconds.
    min_ms: u64,
    /// Inclusive upper bound, in milliseconds.
    max_ms: u64,
}

impl From<&AutoPostConfig> for PostSchedule {
    fn from(config: &AutoPostConfig) -> Self {
        let min_ms = u64::try_from(config.min_interval().as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(config.max_interval().as_millis()).unwrap_or(u64::MAX);

        Self {
            phrases: config.phrases.clone().into(),
            min_ms: min_ms.min(max_ms),
            max_ms,
        }
    }
}

impl PostSchedule {
    /// Draws the next wait uniformly from `[min, max]`.
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        Duration::from_millis(rand::rng().random_range(self.min_ms..=self.max_ms))
    }

    /// Picks a phrase uniformly. `None` only for an empty set.
    #[must_use]
    pub fn pick_phrase(&self) -> Option<&str> {
        self.phrases.choose(&mut rand::rng()).map(String::as_str)
    }
}

// ============================================================================
// AutoPoster
// ============================================================================

/// Handle to a running auto-poster task.
#[derive(Debug)]
pub struct AutoPoster {
    /// Stops the task.
    token: CancellationToken,
    /// Task handle, joined by [`AutoPoster::stop`].
    handle: JoinHandle<()>,
}

impl AutoPoster {
    /// Spawns the poster for one connection.
    ///
    /// The task exits when `token` (or a parent) is cancelled.
    pub fn spawn(sender: LineSender, schedule: PostSchedule, token: CancellationToken) -> Self {
        let handle = tokio::spawn(run(sender, schedule, token.clone()));
        Self { token, handle }
    }

    /// Cancels the task and waits for it to exit.
    ///
    /// A send already in progress is abandoned, so a peer that stopped
    /// reading cannot hold this up.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Auto-poster task ended abnormally");
        }
    }
}

// ============================================================================
// Task
// ============================================================================

/// Sleep, post, repeat until cancelled.
async fn run(sender: LineSender, schedule: PostSchedule, token: CancellationToken) {
    debug!(channel = sender.channel(), "Auto-poster started");

    loop {
        let delay = schedule.next_delay();

        tokio::select! {
            () = token.cancelled() => break,
            () = sleep(delay) => {}
        }

        if !sender.is_open() {
            warn!("Auto-post skipped: connection closed");
            continue;
        }

        let Some(phrase) = schedule.pick_phrase() else {
            warn!("Auto-post skipped: no phrases");
            continue;
        };

        let sent = tokio::select! {
            () = token.cancelled() => break,
            sent = sender.send_chat(phrase) => sent,
        };

        match sent {
            Ok(()) => info!(phrase, waited_secs = delay.as_secs(), "Auto-post sent"),
            Err(e) => warn!(error = %e, "Auto-post failed"),
        }
    }

    debug!("Auto-poster stopped");
}

// ============================================================================
// Tests
// ============================================================================
