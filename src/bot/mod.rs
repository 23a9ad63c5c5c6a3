//! The bot: configuration, auto-poster and connection supervisor.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`BotConfig`] | Server, identity, posting and retry settings |
//! | [`BotBuilder`] | Fluent configuration builder |
//! | [`Supervisor`] | Connect, serve, back off, repeat |
//! | [`AutoPoster`] | Randomized unprompted posts for one connection |
//! | [`ConnectionState`] | Observable supervisor state |
//!
//! # Example
//!
//! ```no_run
//! use tokio_util::sync::CancellationToken;
//! use twitch_chatbot::BotConfig;
//!
//! # async fn example() -> twitch_chatbot::Result<()> {
//! let supervisor = BotConfig::builder()
//!     .nickname("my_bot_account")
//!     .token("oauth:xxxxxxxx")
//!     .channel("my_channel")
//!     .build()?;
//!
//! supervisor.run(CancellationToken::new()).await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for bot configuration.
pub mod builder;

/// Configuration schema, defaults and validation.
pub mod config;

/// Timed unprompted posts.
pub mod poster;

/// Reconnecting control loop.
pub mod supervisor;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::BotBuilder;
pub use config::{
    AutoPostConfig, BotConfig, CHANNEL_ENV, DEFAULT_HOST, DEFAULT_TLS_PORT, NICKNAME_ENV,
    RetryPolicy, ServerConfig, TOKEN_ENV,
};
pub use poster::{AutoPoster, PostSchedule};
pub use supervisor::{ConnectionState, Supervisor};
