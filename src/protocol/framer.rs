//! Line framing for the inbound byte stream.
//!
//! TCP delivers bytes in arbitrary chunks. [`LineFramer`] buffers partial
//! input and yields each complete `\r\n`-terminated line exactly once, in
//! arrival order.
//!
//! Framing happens on raw bytes and decoding happens per finished line, so a
//! multi-byte UTF-8 character split across two reads still decodes intact.
//! Invalid sequences are replaced with `U+FFFD` instead of failing.
//!
//! # Example
//!
//! ```
//! use twitch_chatbot::protocol::LineFramer;
//!
//! let mut framer = LineFramer::new();
//! assert!(framer.push(b"PING :tmi.tw").is_empty());
//! assert_eq!(framer.push(b"itch.tv\r\n"), vec!["PING :tmi.twitch.tv"]);
//! assert_eq!(framer.pending(), 0);
//! ```

// ============================================================================
// Constants
// ============================================================================

/// Line terminator on the wire.
pub const LINE_TERMINATOR: &[u8] = b"\r\n";

/// Initial receive buffer capacity (one typical read).
const INITIAL_CAPACITY: usize = 2048;

// ============================================================================
// LineFramer
// ============================================================================

/// Receive buffer that turns byte chunks into protocol lines.
///
/// Owned by the receive loop of a single connection. Create a fresh framer
/// per connection so no partial line survives a reconnect.
#[derive(Debug, Clone)]
pub struct LineFramer {
    /// Bytes received but not yet terminated by `\r\n`.
    buffer: Vec<u8>,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFramer {
    /// Creates an empty framer.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(INITIAL_CAPACITY),
        }
    }

    /// Appends a chunk and returns every line it completes.
    ///
    /// Lines are returned without their terminator. A line is only returned
    /// once both `\r` and `\n` have arrived.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        split_lines(&mut self.buffer)
    }

    /// Returns the number of buffered bytes awaiting a terminator.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Removes every complete line from the front of `buffer`.
///
/// On return `buffer` holds only the unterminated remainder.
pub fn split_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    let mut start = 0;

    while let Some(offset) = find_terminator(&buffer[start..]) {
        let end = start + offset;
        lines.push(String::from_utf8_lossy(&buffer[start..end]).into_owned());
        start = end + LINE_TERMINATOR.len();
    }

    if start > 0 {
        buffer.drain(..start);
    }

    lines
}

/// Finds the offset of the first `\r\n` in `bytes`.
fn find_terminator(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(LINE_TERMINATOR.len())
        .position(|window| window == LINE_TERMINATOR)
}

// ============================================================================
// Tests
// ============================================================================
