//! Bot configuration.
//!
//! Loaded once at startup, validated, then shared read-only.
//!
//! # File Format
//!
//! ```json
//! {
//!   "server": { "host": "irc.chat.twitch.tv", "port": 6697, "tls": true },
//!   "nickname": "my_bot_account",
//!   "channel": "#my_channel",
//!   "auto_post": {
//!     "phrases": ["Have a great day everyone!"],
//!     "min_interval_secs": 20,
//!     "max_interval_secs": 40
//!   },
//!   "retry": { "connect_failure_delay_secs": 10, "reconnect_delay_secs": 5 }
//! }
//! ```
//!
//! Every field is optional. `"auto_post": null` disables auto-posting. The
//! token is usually left out of the file and read from
//! `TWITCH_OAUTH_TOKEN`.

// ============================================================================
// Imports
// ============================================================================

use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::builder::BotBuilder;

// ============================================================================
// Constants
// ============================================================================

/// Default chat server.
pub const DEFAULT_HOST: &str = "irc.chat.twitch.tv";

/// Default TLS port (6667 is the plain-text port).
pub const DEFAULT_TLS_PORT: u16 = 6697;

/// Environment variable for the login name.
pub const NICKNAME_ENV: &str = "TWITCH_NICKNAME";

/// Environment variable for the OAuth token.
pub const TOKEN_ENV: &str = "TWITCH_OAUTH_TOKEN";

/// Environment variable for the channel.
pub const CHANNEL_ENV: &str = "TWITCH_CHANNEL";

/// Channel name prefix.
const CHANNEL_PREFIX: char = '#';

/// Default TCP/TLS connect timeout.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default delay after a failed connection attempt.
const DEFAULT_CONNECT_FAILURE_DELAY_SECS: u64 = 10;

/// Default delay after an established connection drops.
const DEFAULT_RECONNECT_DELAY_SECS: u64 = 5;

// Default auto-post bounds.
const DEFAULT_MIN_INTERVAL_SECS: u64 = 20;
const DEFAULT_MAX_INTERVAL_SECS: u64 = 40;

/// Longest accepted auto-post wait: one day.
pub const MAX_INTERVAL_SECS: u64 = 86_400;

/// Default auto-post phrases.
const DEFAULT_PHRASES: &[&str] = &[
    "Follow for more amazing content!",
    "Have a great day everyone 🌞",
    "Welcome new viewers! Say hi 👋",
];

// ============================================================================
// ServerConfig
// ============================================================================

/// Chat server address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Host name, also used to verify the TLS certificate.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Wrap the connection in TLS.
    pub tls: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_TLS_PORT,
            tls: true,
        }
    }
}

impl fmt::Display for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ============================================================================
// AutoPostConfig
// ============================================================================

/// Unprompted chat messages on a randomized timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AutoPostConfig {
    /// Phrases to pick from. Must not be empty.
    pub phrases: Vec<String>,
    /// Shortest wait between posts, in seconds.
    pub min_interval_secs: u64,
    /// Longest wait between posts, in seconds.
    pub max_interval_secs: u64,
}

impl Default for AutoPostConfig {
    fn default() -> Self {
        Self {
            phrases: DEFAULT_PHRASES.iter().map(ToString::to_string).collect(),
            min_interval_secs: DEFAULT_MIN_INTERVAL_SECS,
            max_interval_secs: DEFAULT_MAX_INTERVAL_SECS,
        }
    }
}

impl AutoPostConfig {
    /// Shortest wait between posts.
    #[inline]
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_secs)
    }

    /// Longest wait between posts.
    #[inline]
    #[must_use]
    pub const fn max_interval(&self) -> Duration {
        Duration::from_secs(self.max_interval_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.phrases.is_empty() {
            return Err(Error::config("auto_post.phrases must not be empty"));
        }
        if self.phrases.iter().any(|p| p.trim().is_empty()) {
            return Err(Error::config("auto_post.phrases must not contain blank entries"));
        }
        if self.phrases.iter().any(|p| p.contains(['\r', '\n'])) {
            return Err(Error::config("auto_post.phrases must be single lines"));
        }
        if self.min_interval_secs == 0 {
            return Err(Error::config("auto_post.min_interval_secs must be positive"));
        }
        if self.max_interval_secs > MAX_INTERVAL_SECS {
            return Err(Error::config(format!(
                "auto_post.max_interval_secs must be at most {MAX_INTERVAL_SECS}"
            )));
        }
        if self.min_interval_secs > self.max_interval_secs {
            return Err(Error::config(format!(
                "auto_post interval is empty: min {}s > max {}s",
                self.min_interval_secs, self.max_interval_secs
            )));
        }
        Ok(())
    }
}

// ============================================================================
// RetryPolicy
// ============================================================================

/// Backoff delays for the two failure paths.
///
/// Both are fixed; there is no retry limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    /// Wait after a connection attempt fails, in seconds.
    pub connect_failure_delay_secs: u64,
    /// Wait after an established connection drops, in seconds.
    pub reconnect_delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            connect_failure_delay_secs: DEFAULT_CONNECT_FAILURE_DELAY_SECS,
            reconnect_delay_secs: DEFAULT_RECONNECT_DELAY_SECS,
        }
    }
}

impl RetryPolicy {
    /// Wait after a connection attempt fails.
    #[inline]
    #[must_use]
    pub const fn connect_failure_delay(&self) -> Duration {
        Duration::from_secs(self.connect_failure_delay_secs)
    }

    /// Wait after an established connection drops.
    #[inline]
    #[must_use]
    pub const fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

// ============================================================================
// BotConfig
// ============================================================================

/// Complete bot configuration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BotConfig {
    /// Chat server address.
    pub server: ServerConfig,
    /// Bot login name.
    pub nickname: String,
    /// OAuth token, sent as `PASS`.
    pub token: String,
    /// Channel to join (with `#`).
    pub channel: String,
    /// Auto-poster settings; `None` disables it.
    pub auto_post: Option<AutoPostConfig>,
    /// Reconnect backoff.
    pub retry: RetryPolicy,
    /// TCP connect and TLS negotiation timeout, in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            nickname: String::new(),
            token: String::new(),
            channel: String::new(),
            auto_post: Some(AutoPostConfig::default()),
            retry: RetryPolicy::default(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("server", &self.server)
            .field("nickname", &self.nickname)
            .field("token", &"<redacted>")
            .field("channel", &self.channel)
            .field("auto_post", &self.auto_post)
            .field("retry", &self.retry)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

// ============================================================================
// BotConfig - Loading
// ============================================================================

impl BotConfig {
    /// Creates a fluent builder.
    #[inline]
    #[must_use]
    pub fn builder() -> BotBuilder {
        BotBuilder::new()
    }

    /// Loads a JSON configuration file.
    ///
    /// Empty `nickname`, `token` and `channel` fall back to the
    /// `TWITCH_*` environment variables.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the file cannot be read
    /// - [`Error::Json`] if it is not valid JSON for this schema
    /// - [`Error::Config`] if validation fails
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.finish(|key| env::var(key).ok())
    }

    /// Builds a configuration from defaults and the environment only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if required values are missing.
    pub fn from_env() -> Result<Self> {
        Self::default().finish(|key| env::var(key).ok())
    }

    /// Fills gaps from `lookup`, normalizes, then validates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if validation fails.
    pub fn finish(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        self.fill_from(lookup);
        self.normalize();
        self.validate()?;
        Ok(self)
    }

    /// Fills empty `nickname`, `token` and `channel` from `lookup`.
    pub fn fill_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for (field, key) in [
            (&mut self.nickname, NICKNAME_ENV),
            (&mut self.token, TOKEN_ENV),
            (&mut self.channel, CHANNEL_ENV),
        ] {
            if field.is_empty()
                && let Some(value) = lookup(key)
            {
                *field = value;
            }
        }
    }

    /// Trims identity fields and adds the `#` channel prefix if missing.
    pub fn normalize(&mut self) {
        self.nickname = self.nickname.trim().to_string();
        self.token = self.token.trim().to_string();
        self.channel = self.channel.trim().to_string();

        if !self.channel.is_empty() && !self.channel.starts_with(CHANNEL_PREFIX) {
            self.channel.insert(0, CHANNEL_PREFIX);
        }
    }
}

// ============================================================================
// BotConfig - Validation
// ============================================================================

impl BotConfig {
    /// Checks every invariant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        require_token("server.host", &self.server.host)?;
        if self.server.port == 0 {
            return Err(Error::config("server.port must be positive"));
        }

        require_token("nickname", &self.nickname)?;
        require_token("token", &self.token)?;
        require_token("channel", &self.channel)?;
        if self.channel.len() == 1 {
            return Err(Error::config("channel must name a channel after '#'"));
        }

        if self.connect_timeout_secs == 0 {
            return Err(Error::config("connect_timeout_secs must be positive"));
        }

        if let Some(auto_post) = &self.auto_post {
            auto_post.validate()?;
        }

        Ok(())
    }

    /// TCP connect and TLS negotiation timeout.
    #[inline]
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Requires a non-empty value without whitespace.
fn require_token(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::config(format!("{field} is required")));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(Error::config(format!("{field} must not contain whitespace")));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn minimal() -> BotConfig {
        BotConfig {
            nickname: "bot1".to_string(),
            token: "oauth:secret".to_string(),
            channel: "#chan".to_string(),
            ..BotConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = BotConfig::default();
        assert_eq!(config.server.host, "irc.chat.twitch.tv");
        assert_eq!(config.server.port, 6697);
        assert!(config.server.tls);
        assert_eq!(config.retry.connect_failure_delay(), Duration::from_secs(10));
        assert_eq!(config.retry.reconnect_delay(), Duration::from_secs(5));

        let auto_post = config.auto_post.expect("auto-post on by default");
        assert_eq!(auto_post.min_interval(), Duration::from_secs(20));
        assert_eq!(auto_post.max_interval(), Duration::from_secs(40));
        assert!(!auto_post.phrases.is_empty());
    }

    #[test]
    fn test_minimal_config_is_valid() {
        assert!(minimal().validate().is_ok());
    }

    #[test]
    fn test_missing_identity_is_rejected() {
        let err = BotConfig::default().finish(no_env).expect_err("nothing set");
        assert!(err.to_string().contains("nickname"));
    }

    #[test]
    fn test_fill_from_only_fills_gaps() {
        let mut config = BotConfig {
            nickname: "from_file".to_string(),
            ..BotConfig::default()
        };
        config.fill_from(|key| Some(format!("env_{key}")));

        assert_eq!(config.nickname, "from_file");
        assert_eq!(config.token, "env_TWITCH_OAUTH_TOKEN");
        assert_eq!(config.channel, "env_TWITCH_CHANNEL");
    }

    #[test]
    fn test_channel_prefix_added() {
        let config = BotConfig {
            channel: " chan ".to_string(),
            ..minimal()
        }
        .finish(no_env)
        .expect("valid");
        assert_eq!(config.channel, "#chan");
    }

    #[test]
    fn test_bare_prefix_channel_rejected() {
        let config = BotConfig {
            channel: "#".to_string(),
            ..minimal()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_port_rejected() {
        let mut config = minimal();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_whitespace_in_nickname_rejected() {
        let config = BotConfig {
            nickname: "bot one".to_string(),
            ..minimal()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_auto_post_validation() {
        let mut config = minimal();

        config.auto_post = Some(AutoPostConfig {
            phrases: Vec::new(),
            ..AutoPostConfig::default()
        });
        assert!(config.validate().is_err());

        config.auto_post = Some(AutoPostConfig {
            min_interval_secs: 50,
            max_interval_secs: 40,
            ..AutoPostConfig::default()
        });
        assert!(config.validate().is_err());

        config.auto_post = Some(AutoPostConfig {
            min_interval_secs: 0,
            ..AutoPostConfig::default()
        });
        assert!(config.validate().is_err());

        config.auto_post = Some(AutoPostConfig {
            max_interval_secs: u64::MAX,
            ..AutoPostConfig::default()
        });
        let err = config.validate().expect_err("interval too long");
        assert!(err.to_string().contains("max_interval_secs"));

        config.auto_post = Some(AutoPostConfig {
            max_interval_secs: MAX_INTERVAL_SECS,
            ..AutoPostConfig::default()
        });
        assert!(config.validate().is_ok());

        config.auto_post = Some(AutoPostConfig {
            phrases: vec!["two\r\nlines".to_string()],
            ..AutoPostConfig::default()
        });
        assert!(config.validate().is_err());

        config.auto_post = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", minimal());
        assert!(!rendered.contains("oauth:secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{
                "server": {{ "port": 6667, "tls": false }},
                "nickname": "bot1",
                "token": "oauth:secret",
                "channel": "chan",
                "auto_post": null,
                "retry": {{ "reconnect_delay_secs": 7 }}
            }}"#
        )
        .expect("write config");

        let config = BotConfig::from_file(file.path()).expect("valid file");
        assert_eq!(config.server.host, "irc.chat.twitch.tv");
        assert_eq!(config.server.port, 6667);
        assert!(!config.server.tls);
        assert_eq!(config.channel, "#chan");
        assert!(config.auto_post.is_none());
        assert_eq!(config.retry.reconnect_delay_secs, 7);
        assert_eq!(config.retry.connect_failure_delay_secs, 10);
    }

    #[test]
    fn test_from_file_rejects_unknown_fields() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "nick": "typo" }}"#).expect("write config");

        let err = BotConfig::from_file(file.path()).expect_err("unknown field");
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_server_display() {
        assert_eq!(ServerConfig::default().to_string(), "irc.chat.twitch.tv:6697");
    }
}
