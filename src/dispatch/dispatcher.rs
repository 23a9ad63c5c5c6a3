//! Command table and dispatch boundary.
//!
//! # Example
//!
//! ```
//! use twitch_chatbot::Result;
//! use twitch_chatbot::dispatch::Dispatcher;
//!
//! let dispatcher = Dispatcher::builder()
//!     .command("ping", |_sender: &str, _args: &str| -> Result<Option<String>> {
//!         Ok(Some("pong".to_string()))
//!     })
//!     .build();
//!
//! assert_eq!(dispatcher.dispatch("alice", "!PING"), Some("pong".to_string()));
//! assert_eq!(dispatcher.dispatch("alice", "ping"), None);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::error::Result;

use super::builtin;

// ============================================================================
// Constants
// ============================================================================

/// Prefix that marks a chat message as a command.
pub const COMMAND_PREFIX: char = '!';

// ============================================================================
// CommandHandler
// ============================================================================

/// Reaction to one chat command.
///
/// Receives the sender's login and the argument text (everything after the
/// command token, trimmed). Returns the chat text to post, if any.
pub trait CommandHandler: Send + Sync {
    /// Handles one invocation.
    ///
    /// # Errors
    ///
    /// Errors are logged by the [`Dispatcher`] and never reach the session.
    fn handle(&self, sender: &str, args: &str) -> Result<Option<String>>;
}

impl<F> CommandHandler for F
where
    F: Fn(&str, &str) -> Result<Option<String>> + Send + Sync,
{
    fn handle(&self, sender: &str, args: &str) -> Result<Option<String>> {
        self(sender, args)
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Maps command tokens to handlers.
///
/// Lookup is case-insensitive. Unknown commands, handler errors and handler
/// panics all yield `None`.
#[derive(Clone, Default)]
pub struct Dispatcher {
    /// Handlers keyed by lower-case command name (no prefix).
    handlers: FxHashMap<String, Arc<dyn CommandHandler>>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut commands: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        commands.sort_unstable();

        f.debug_struct("Dispatcher")
            .field("commands", &commands)
            .finish()
    }
}

impl Dispatcher {
    /// Creates a builder with no commands.
    #[inline]
    #[must_use]
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Creates a dispatcher with the built-in `!hello` and `!dice` commands.
    #[must_use]
    pub fn with_builtins() -> Self {
        Self::builder().builtins().build()
    }

    /// Returns `true` if `command` (without prefix) is registered.
    #[inline]
    #[must_use]
    pub fn contains(&self, command: &str) -> bool {
        self.handlers.contains_key(&command.to_lowercase())
    }

    /// Returns the number of registered commands.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if no commands are registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Reacts to a chat payload.
    ///
    /// Returns `None` unless `text` starts with `!` and names a known command
    /// whose handler produced a reply.
    #[must_use]
    pub fn dispatch(&self, sender: &str, text: &str) -> Option<String> {
        let (command, args) = split_command(text)?;
        self.dispatch_command(sender, command, args)
    }

    /// Runs the handler registered for `command` (without prefix).
    #[must_use]
    pub fn dispatch_command(&self, sender: &str, command: &str, args: &str) -> Option<String> {
        let key = command.to_lowercase();
        let Some(handler) = self.handlers.get(&key) else {
            debug!(command = %key, sender, "Unknown command ignored");
            return None;
        };

        match catch_unwind(AssertUnwindSafe(|| handler.handle(sender, args))) {
            Ok(Ok(reply)) => {
                debug!(command = %key, sender, replied = reply.is_some(), "Command handled");
                reply
            }
            Ok(Err(e)) => {
                warn!(command = %key, sender, error = %e, "Command handler failed");
                None
            }
            Err(_) => {
                warn!(command = %key, sender, "Command handler panicked");
                None
            }
        }
    }
}

// ============================================================================
// DispatcherBuilder
// ============================================================================

/// Builder for a [`Dispatcher`].
#[derive(Default)]
pub struct DispatcherBuilder {
    handlers: FxHashMap<String, Arc<dyn CommandHandler>>,
}

impl fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("count", &self.handlers.len())
            .finish()
    }
}

impl DispatcherBuilder {
    /// Registers a handler, replacing any previous one with the same name.
    ///
    /// A leading `!` in `name` is ignored.
    #[must_use]
    pub fn command(mut self, name: &str, handler: impl CommandHandler + 'static) -> Self {
        let key = name.trim_start_matches(COMMAND_PREFIX).to_lowercase();
        self.handlers.insert(key, Arc::new(handler));
        self
    }

    /// Registers the built-in `!hello` and `!dice` commands.
    #[must_use]
    pub fn builtins(self) -> Self {
        self.command(builtin::HELLO, builtin::hello)
            .command(builtin::DICE, builtin::dice)
    }

    /// Finishes the table.
    #[must_use]
    pub fn build(self) -> Dispatcher {
        Dispatcher {
            handlers: self.handlers,
        }
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Splits `!command args...` into `("command", "args...")`.
///
/// Returns `None` when the prefix is missing or the command token is empty.
fn split_command(text: &str) -> Option<(&str, &str)> {
    let body = text.strip_prefix(COMMAND_PREFIX)?;
    let (command, args) = match body.split_once(char::is_whitespace) {
        Some((command, args)) => (command, args.trim()),
        None => (body, ""),
    };

    if command.is_empty() {
        return None;
    }

    Some((command, args))
}

// ============================================================================
// Tests
// ============================================================================
