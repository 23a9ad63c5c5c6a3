//! Encrypted stream transport and chat session.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Supervisor     │                              │  Chat server    │
//! │                 │        TLS over TCP          │                 │
//! │  Connector      │─────────────────────────────►│  host:6697      │
//! │  → Session      │◄─────────────────────────────│                 │
//! │  → LineSender   │      \r\n-terminated lines   │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connector` | TCP/TLS stream establishment |
//! | `session` | Handshake, line I/O, shared send capability |

// ============================================================================
// Submodules
// ============================================================================

/// TCP/TLS stream establishment.
pub mod connector;

/// Handshake, line I/O and the shared send capability.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use connector::{BoxedTransport, Connector, TlsConnector, Transport};
pub use session::{LineSender, Session, WRITE_TIMEOUT};
