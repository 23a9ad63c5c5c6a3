//! Twitch chat bot - persistent IRC-over-TLS chat client.
//!
//! Keeps one authenticated connection to a channel alive indefinitely,
//! answers keep-alive probes, reacts to `!` commands and posts phrases on a
//! randomized timer.
//!
//! # Architecture
//!
//! ```text
//!              ┌──────────────────── Supervisor ────────────────────┐
//!              │                                                    │
//! Connector ──►│ Session ──► LineFramer ──► Line::parse ──► Dispatcher
//!              │    ▲                           │                   │
//!              │    └──── LineSender ◄── PONG ──┘  ◄── reply ───────┘
//!              │              ▲                                     │
//!              │              └──────── AutoPoster (timer)          │
//!              └────────────────────────────────────────────────────┘
//! ```
//!
//! Key design principles:
//!
//! - One supervisor, one connection at a time, unbounded retries
//! - Every connection gets a fresh line buffer and a fresh poster task
//! - All outbound lines go through one serialized writer
//! - Handler failures are contained at the dispatch boundary
//!
//! # Quick Start
//!
//! ```no_run
//! use tokio_util::sync::CancellationToken;
//! use twitch_chatbot::{BotConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let supervisor = BotConfig::builder()
//!         .nickname("my_bot_account")
//!         .token("oauth:xxxxxxxx")
//!         .channel("my_channel")
//!         .post_interval(20, 40)
//!         .build()?;
//!
//!     supervisor.run(CancellationToken::new()).await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bot`] | Configuration, [`Supervisor`], [`AutoPoster`] |
//! | [`dispatch`] | Chat command table and built-in commands |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`protocol`] | Line framing, parsing and outbound commands |
//! | [`transport`] | TCP/TLS connector and session |

// ============================================================================
// Modules
// ============================================================================

/// Configuration, supervisor and auto-poster.
///
/// Use [`BotConfig::builder()`] to create a configured supervisor.
pub mod bot;

/// Chat command dispatch.
pub mod dispatch;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Line framing, classification and outbound commands.
pub mod protocol;

/// TCP/TLS transport and chat session.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Bot types
pub use bot::{
    AutoPostConfig, AutoPoster, BotBuilder, BotConfig, ConnectionState, PostSchedule,
    RetryPolicy, ServerConfig, Supervisor,
};

// Dispatch types
pub use dispatch::{CommandHandler, Dispatcher, DispatcherBuilder};

// Error types
pub use error::{Error, Result};

// Protocol types
pub use protocol::{ChatMessage, Command, Line, LineFramer};

// Transport types
pub use transport::{Connector, LineSender, Session, TlsConnector};
