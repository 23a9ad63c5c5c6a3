//! Chat command dispatch.
//!
//! A chat payload starting with `!` is a command: the first whitespace
//! separated token names the handler, the rest is its argument text.
//!
//! ```text
//! "!dice"          → dice(sender, "")
//! "!Hello world"   → hello(sender, "world")
//! "hi there"       → (no reaction)
//! ```
//!
//! The table is built once and injected into the supervisor, so new commands
//! never touch parsing or session code.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builtin` | `!hello` and `!dice` |
//! | `dispatcher` | Handler trait, command table, dispatch boundary |

// ============================================================================
// Submodules
// ============================================================================

/// Built-in chat commands.
pub mod builtin;

/// Handler trait, command table and dispatch boundary.
pub mod dispatcher;

// ============================================================================
// Re-exports
// ============================================================================

pub use dispatcher::{COMMAND_PREFIX, CommandHandler, Dispatcher, DispatcherBuilder};
