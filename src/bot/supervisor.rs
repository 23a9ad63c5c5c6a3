//! Connection supervisor: the bot's top-level control loop.
//!
//! # State Machine
//!
//! ```text
//!                 ┌──────────────── backoff ◄───────────────┐
//!                 ▼                                         │
//! Disconnected ─► Connecting ─► Connected ─► Failed/Closing ─┘
//!      ▲              │
//!      └── backoff ◄──┘ (connect or handshake failed)
//!
//! any state ── shutdown token ──► Stopped
//! ```
//!
//! Two backoff delays are used: [`RetryPolicy::connect_failure_delay`] after
//! a failed attempt and [`RetryPolicy::reconnect_delay`] after an established
//! connection drops. Retries never stop until the shutdown token fires.
//!
//! [`RetryPolicy::connect_failure_delay`]: super::RetryPolicy::connect_failure_delay
//! [`RetryPolicy::reconnect_delay`]: super::RetryPolicy::reconnect_delay

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::protocol::{Command, Line, LineFramer};
use crate::transport::{Connector, LineSender, Session};

use super::config::BotConfig;
use super::poster::{AutoPoster, PostSchedule};

// ============================================================================
// ConnectionState
// ============================================================================

/// Supervisor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No connection; waiting to (re)connect.
    Disconnected,
    /// Connecting and sending the handshake.
    Connecting,
    /// Handshake sent; receive loop and auto-poster running.
    Connected,
    /// Connection lost; tearing down before backoff.
    Failed,
    /// Shutdown requested while connected; tearing down.
    Closing,
    /// Supervisor has returned. Terminal.
    Stopped,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Failed => "failed",
            Self::Closing => "closing",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Types
// ============================================================================

/// Why a connected session ended.
enum SessionEnd {
    /// The shutdown token fired.
    Shutdown,
    /// Transport failure or remote close.
    Lost(Error),
}

// ============================================================================
// Supervisor
// ============================================================================

/// Keeps one session alive, reconnecting after every failure.
///
/// # Example
///
/// ```no_run
/// use tokio_util::sync::CancellationToken;
/// use twitch_chatbot::{BotBuilder, BotConfig};
///
/// # async fn example() -> twitch_chatbot::Result<()> {
/// let supervisor = BotBuilder::from_config(BotConfig::from_env()?).build()?;
/// let shutdown = CancellationToken::new();
///
/// let stopper = shutdown.clone();
/// tokio::spawn(async move {
///     let _ = tokio::signal::ctrl_c().await;
///     stopper.cancel();
/// });
///
/// supervisor.run(shutdown).await;
/// # Ok(())
/// # }
/// ```
pub struct Supervisor {
    /// Immutable configuration.
    config: Arc<BotConfig>,
    /// Opens the transport for each attempt.
    connector: Arc<dyn Connector>,
    /// Chat command table.
    dispatcher: Arc<Dispatcher>,
    /// Current state, observable via [`Supervisor::subscribe`].
    state: watch::Sender<ConnectionState>,
}

impl fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Supervisor - Public API
// ============================================================================

impl Supervisor {
    /// Creates a supervisor. Nothing connects until [`Supervisor::run`].
    #[must_use]
    pub fn new(config: BotConfig, connector: Arc<dyn Connector>, dispatcher: Dispatcher) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        Self {
            config: Arc::new(config),
            connector,
            dispatcher: Arc::new(dispatcher),
            state,
        }
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Returns the command table.
    #[inline]
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Subscribes to state transitions.
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Runs until `shutdown` is cancelled.
    ///
    /// Connects, serves the session, and after any failure waits the
    /// matching backoff delay and connects again. On shutdown the open
    /// connection (if any) is closed before returning.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut attempt: u64 = 0;

        while !shutdown.is_cancelled() {
            attempt += 1;
            self.set_state(ConnectionState::Connecting);
            info!(attempt, server = %self.config.server, "Connecting");

            let established = tokio::select! {
                () = shutdown.cancelled() => break,
                result = Session::establish(self.connector.as_ref(), &self.config) => result,
            };

            let delay = match established {
                Ok(session) => {
                    info!(attempt, channel = %self.config.channel, "Connected and joined");
                    match self.serve(session, &shutdown).await {
                        SessionEnd::Shutdown => break,
                        SessionEnd::Lost(e) if e.is_timeout() => {
                            warn!(attempt, error = %e, "Disconnected, server stopped reading");
                        }
                        SessionEnd::Lost(e) => warn!(attempt, error = %e, "Disconnected"),
                    }
                    self.config.retry.reconnect_delay()
                }
                Err(e) => {
                    // Retried either way; only the log level differs.
                    if e.is_recoverable() {
                        warn!(attempt, error = %e, "Connection failed");
                    } else {
                        error!(attempt, error = %e, "Connection failed, check server settings");
                    }
                    self.set_state(ConnectionState::Disconnected);
                    self.config.retry.connect_failure_delay()
                }
            };

            info!(delay_secs = delay.as_secs(), "Waiting before reconnect");
            if !sleep_or_cancel(delay, &shutdown).await {
                break;
            }
        }

        self.set_state(ConnectionState::Stopped);
        info!("Supervisor stopped");
    }
}

// ============================================================================
// Supervisor - Internal API
// ============================================================================

impl Supervisor {
    /// Publishes a state transition.
    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "State transition");
        }
    }

    /// Drives one connected session until it ends, then tears it down.
    async fn serve(&self, mut session: Session, shutdown: &CancellationToken) -> SessionEnd {
        self.set_state(ConnectionState::Connected);

        let sender = session.sender();
        let poster = self.config.auto_post.as_ref().map(|auto_post| {
            AutoPoster::spawn(
                sender.clone(),
                PostSchedule::from(auto_post),
                shutdown.child_token(),
            )
        });

        let end = match self.receive_loop(&mut session, &sender, shutdown).await {
            Ok(()) => {
                self.set_state(ConnectionState::Closing);
                SessionEnd::Shutdown
            }
            Err(e) => {
                self.set_state(ConnectionState::Failed);
                SessionEnd::Lost(e)
            }
        };

        if let Some(poster) = poster {
            poster.stop().await;
        }
        session.close().await;
        self.set_state(ConnectionState::Disconnected);

        end
    }

    /// Reads, frames and handles lines until shutdown (`Ok`) or failure.
    async fn receive_loop(
        &self,
        session: &mut Session,
        sender: &LineSender,
        shutdown: &CancellationToken,
    ) -> Result<()> {
        let mut framer = LineFramer::new();

        loop {
            let chunk = tokio::select! {
                () = shutdown.cancelled() => return Ok(()),
                chunk = session.receive_chunk() => chunk?,
            };

            let Some(bytes) = chunk else {
                return Err(Error::ConnectionClosed);
            };

            for line in framer.push(bytes) {
                tokio::select! {
                    () = shutdown.cancelled() => return Ok(()),
                    handled = self.handle_line(&line, sender) => handled?,
                }
            }
        }
    }

    /// Reacts to one inbound line.
    ///
    /// Only connection errors are returned; everything else is logged.
    async fn handle_line(&self, line: &str, sender: &LineSender) -> Result<()> {
        trace!(line, "Line received");

        match Line::parse(line) {
            Line::Probe => {
                sender.send_line(&Command::Pong.to_string()).await?;
                debug!("Keep-alive answered");
            }

            Line::Chat(message) => {
                if message.is_from(&self.config.nickname) {
                    trace!("Own message ignored");
                    return Ok(());
                }

                let Some(reply) = self.dispatcher.dispatch(&message.sender, &message.text) else {
                    return Ok(());
                };

                match sender.send_chat(&reply).await {
                    Ok(()) => debug!(to = %message.sender, "Reply sent"),
                    Err(e) if e.is_connection_error() => return Err(e),
                    Err(e) => warn!(error = %e, "Reply dropped"),
                }
            }

            Line::Other => {}
        }

        Ok(())
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Sleeps for `delay`. Returns `false` if `shutdown` fired first.
async fn sleep_or_cancel(delay: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        () = shutdown.cancelled() => false,
        () = sleep(delay) => true,
    }
}

// ============================================================================
// Tests
// ============================================================================
