//! Builder pattern for bot configuration.
//!
//! Provides a fluent API for configuring and creating [`Supervisor`]
//! instances.
//!
//! # Example
//!
//! ```no_run
//! use twitch_chatbot::BotConfig;
//!
//! # fn example() -> twitch_chatbot::Result<()> {
//! let supervisor = BotConfig::builder()
//!     .nickname("my_bot_account")
//!     .token("oauth:xxxxxxxx")
//!     .channel("#my_channel")
//!     .post_interval(20, 40)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::transport::{Connector, TlsConnector};

use super::config::{AutoPostConfig, BotConfig};
use super::supervisor::Supervisor;

// ============================================================================
// BotBuilder
// ============================================================================

/// Builder for a [`BotConfig`] and the [`Supervisor`] that runs it.
///
/// Use [`BotConfig::builder()`] to create a new builder.
#[derive(Default)]
pub struct BotBuilder {
    /// Configuration being assembled.
    config: BotConfig,
    /// Command table; built-ins when unset.
    dispatcher: Option<Dispatcher>,
    /// Transport; [`TlsConnector`] when unset.
    connector: Option<Arc<dyn Connector>>,
}

impl fmt::Debug for BotBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotBuilder")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .field("custom_connector", &self.connector.is_some())
            .finish()
    }
}

// ============================================================================
// BotBuilder Implementation
// ============================================================================

impl BotBuilder {
    /// Creates a builder with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration.
    #[inline]
    #[must_use]
    pub fn from_config(config: BotConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Sets the server host and port.
    #[inline]
    #[must_use]
    pub fn server(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.server.host = host.into();
        self.config.server.port = port;
        self
    }

    /// Enables or disables TLS.
    #[inline]
    #[must_use]
    pub fn tls(mut self, enabled: bool) -> Self {
        self.config.server.tls = enabled;
        self
    }

    /// Sets the bot login name.
    #[inline]
    #[must_use]
    pub fn nickname(mut self, nickname: impl Into<String>) -> Self {
        self.config.nickname = nickname.into();
        self
    }

    /// Sets the OAuth token (`oauth:...`).
    #[inline]
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = token.into();
        self
    }

    /// Sets the channel to join. The `#` prefix is optional.
    #[inline]
    #[must_use]
    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.config.channel = channel.into();
        self
    }

    /// Replaces the auto-post phrase list.
    #[must_use]
    pub fn phrases(mut self, phrases: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let auto_post = self.config.auto_post.get_or_insert_with(AutoPostConfig::default);
        auto_post.phrases = phrases.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the auto-post interval bounds in seconds.
    #[must_use]
    pub fn post_interval(mut self, min_secs: u64, max_secs: u64) -> Self {
        let auto_post = self.config.auto_post.get_or_insert_with(AutoPostConfig::default);
        auto_post.min_interval_secs = min_secs;
        auto_post.max_interval_secs = max_secs;
        self
    }

    /// Turns the auto-poster off.
    #[inline]
    #[must_use]
    pub fn disable_auto_post(mut self) -> Self {
        self.config.auto_post = None;
        self
    }

    /// Sets both backoff delays in seconds.
    #[inline]
    #[must_use]
    pub fn retry_delays(mut self, connect_failure_secs: u64, reconnect_secs: u64) -> Self {
        self.config.retry.connect_failure_delay_secs = connect_failure_secs;
        self.config.retry.reconnect_delay_secs = reconnect_secs;
        self
    }

    /// Sets the connect timeout in seconds.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs;
        self
    }

    /// Sets the command table.
    #[inline]
    #[must_use]
    pub fn dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Sets a custom transport connector.
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Normalizes and validates the configuration without building a bot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if validation fails.
    pub fn build_config(self) -> Result<BotConfig> {
        let mut config = self.config;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Builds the supervisor.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`](crate::Error::Config) if validation fails
    /// - [`Error::Tls`](crate::Error::Tls) if the TLS client cannot be set up
    pub fn build(self) -> Result<Supervisor> {
        let Self {
            config,
            dispatcher,
            connector,
        } = self;
        let config = Self::from_config(config).build_config()?;
        let dispatcher = dispatcher.unwrap_or_else(Dispatcher::with_builtins);

        let connector = match connector {
            Some(connector) => connector,
            None => Arc::new(TlsConnector::new(config.connect_timeout())?),
        };

        Ok(Supervisor::new(config, connector, dispatcher))
    }
}

// ============================================================================
// Tests
// ============================================================================
