//! Outbound protocol lines.
//!
//! Builders for every line the bot writes. None of them include the `\r\n`
//! terminator; [`Session::send_line`](crate::transport::Session::send_line)
//! appends it.
//!
//! | Command | Format |
//! |---------|--------|
//! | Credential | `PASS <token>` |
//! | Identity | `NICK <nickname>` |
//! | Join | `JOIN <#channel>` |
//! | Keep-alive reply | `PONG :tmi.twitch.tv` |
//! | Chat | `PRIVMSG <#channel> :<text>` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// Constants
// ============================================================================

/// Identity token the server expects echoed in keep-alive replies.
pub const SERVER_IDENTITY: &str = "tmi.twitch.tv";

// ============================================================================
// Command
// ============================================================================

/// A single outbound protocol line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// `PASS <token>` (first handshake line).
    Pass(&'a str),
    /// `NICK <nickname>` (second handshake line).
    Nick(&'a str),
    /// `JOIN <channel>` (third handshake line).
    Join(&'a str),
    /// `PONG :tmi.twitch.tv`.
    Pong,
    /// `PRIVMSG <channel> :<text>`.
    PrivMsg {
        /// Target channel.
        channel: &'a str,
        /// Message text.
        text: &'a str,
    },
}

impl fmt::Display for Command<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass(token) => write!(f, "PASS {token}"),
            Self::Nick(nickname) => write!(f, "NICK {nickname}"),
            Self::Join(channel) => write!(f, "JOIN {channel}"),
            Self::Pong => write!(f, "PONG :{SERVER_IDENTITY}"),
            Self::PrivMsg { channel, text } => write!(f, "PRIVMSG {channel} :{text}"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
