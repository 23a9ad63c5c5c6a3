//! Chat line protocol.
//!
//! IRC-derived text lines, each terminated by `\r\n`.
//!
//! # Data Flow
//!
//! ```text
//! bytes ──► LineFramer ──► Line::parse ──► Probe  ──► PONG
//!                                      ├─► Chat   ──► Dispatcher
//!                                      └─► Other  ──► (dropped)
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Outbound line builders |
//! | `framer` | Byte stream to line framing |
//! | `message` | Inbound line classification |

// ============================================================================
// Submodules
// ============================================================================

/// Outbound line builders.
pub mod command;

/// Byte stream to line framing.
pub mod framer;

/// Inbound line classification.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{Command, SERVER_IDENTITY};
pub use framer::{LINE_TERMINATOR, LineFramer, split_lines};
pub use message::{ChatMessage, Line};
