//! Inbound line classification.
//!
//! Every framed line is one of three things:
//!
//! | Variant | Example | Reaction |
//! |---------|---------|----------|
//! | [`Line::Probe`] | `PING :tmi.twitch.tv` | reply `PONG` immediately |
//! | [`Line::Chat`] | `:alice!a@a.tmi.twitch.tv PRIVMSG #chan :!hello` | dispatch |
//! | [`Line::Other`] | `:tmi.twitch.tv 001 bot :Welcome` | ignore |
//!
//! [`Line::parse`] is total: malformed input is `Other`, never an error.

// ============================================================================
// Imports
// ============================================================================

use std::sync::LazyLock;

use regex::Regex;

// ============================================================================
// Constants
// ============================================================================

/// Keep-alive probe keyword.
const PROBE_KEYWORD: &str = "PING";

/// `[:]sender!user@host PRIVMSG #channel :text`
static CHAT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^:?(?P<sender>[^!\s]+)!\S*\s+PRIVMSG\s+(?P<channel>\S+)\s+:(?P<text>.*)$")
        .expect("chat pattern is a valid regex")
});

// ============================================================================
// ChatMessage
// ============================================================================

/// A chat message posted to a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Login name of the author.
    pub sender: String,
    /// Channel the message was posted to (with `#`).
    pub channel: String,
    /// Message text, trimmed.
    pub text: String,
}

impl ChatMessage {
    /// Returns `true` if `nickname` wrote this message (case-insensitive).
    #[inline]
    #[must_use]
    pub fn is_from(&self, nickname: &str) -> bool {
        self.sender.eq_ignore_ascii_case(nickname)
    }
}

// ============================================================================
// Line
// ============================================================================

/// Classification of one inbound protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Server keep-alive probe. Must be answered before anything else.
    Probe,
    /// Channel chat message.
    Chat(ChatMessage),
    /// Anything else (numerics, JOIN echoes, CAP replies, junk).
    Other,
}

impl Line {
    /// Classifies a single line (without its `\r\n`).
    #[must_use]
    pub fn parse(line: &str) -> Self {
        if line.starts_with(PROBE_KEYWORD) {
            return Self::Probe;
        }

        let Some(caps) = CHAT_PATTERN.captures(line) else {
            return Self::Other;
        };

        Self::Chat(ChatMessage {
            sender: caps["sender"].to_string(),
            channel: caps["channel"].to_string(),
            text: caps["text"].trim().to_string(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn chat(line: &str) -> ChatMessage {
        match Line::parse(line) {
            Line::Chat(msg) => msg,
            other => panic!("expected chat message, got {other:?}"),
        }
    }

    #[test]
    fn test_probe() {
        assert_eq!(Line::parse("PING :tmi.twitch.tv"), Line::Probe);
        assert_eq!(Line::parse("PING"), Line::Probe);
    }

    #[test]
    fn test_probe_keyword_must_lead() {
        assert_eq!(Line::parse(":tmi.twitch.tv PONG tmi.twitch.tv :PING"), Line::Other);
    }

    #[test]
    fn test_chat_message() {
        let msg = chat(":alice!a@a.tmi.twitch.tv PRIVMSG #chan :!hello");
        assert_eq!(msg.sender, "alice");
        assert_eq!(msg.channel, "#chan");
        assert_eq!(msg.text, "!hello");
    }

    #[test]
    fn test_chat_without_leading_colon() {
        let msg = chat("alice!a@a.tmi.twitch.tv PRIVMSG #chan :hi");
        assert_eq!(msg.sender, "alice");
    }

    #[test]
    fn test_chat_text_is_trimmed() {
        let msg = chat(":bob!b@b.tmi.twitch.tv PRIVMSG #chan :   hi there  \t");
        assert_eq!(msg.text, "hi there");
    }

    #[test]
    fn test_chat_text_may_contain_colons() {
        let msg = chat(":bob!b@b PRIVMSG #chan :see: this :)");
        assert_eq!(msg.text, "see: this :)");
    }

    #[test]
    fn test_chat_empty_text() {
        let msg = chat(":bob!b@b PRIVMSG #chan :");
        assert_eq!(msg.text, "");
    }

    #[test]
    fn test_privmsg_with_missing_segments_is_other() {
        assert_eq!(Line::parse(":alice!a@a PRIVMSG"), Line::Other);
        assert_eq!(Line::parse(":alice!a@a PRIVMSG #chan"), Line::Other);
        assert_eq!(Line::parse("PRIVMSG #chan :hi"), Line::Other);
        assert_eq!(Line::parse(":alice PRIVMSG #chan :hi"), Line::Other);
    }

    #[test]
    fn test_other_lines() {
        assert_eq!(Line::parse(":tmi.twitch.tv 001 bot1 :Welcome, GLHF!"), Line::Other);
        assert_eq!(Line::parse(":bot1!bot1@bot1.tmi.twitch.tv JOIN #chan"), Line::Other);
        assert_eq!(Line::parse(""), Line::Other);
    }

    #[test]
    fn test_is_from_ignores_case() {
        let msg = chat(":Bot1!bot1@bot1.tmi.twitch.tv PRIVMSG #chan :!hello");
        assert!(msg.is_from("bot1"));
        assert!(msg.is_from("BOT1"));
        assert!(!msg.is_from("bot2"));
    }

    proptest! {
        #[test]
        fn prop_lines_without_privmsg_are_not_chat(line in "[^\r\n]*") {
            prop_assume!(!line.contains("PRIVMSG"));
            prop_assert!(!matches!(Line::parse(&line), Line::Chat(_)));
        }

        #[test]
        fn prop_parse_never_panics(line in any::<String>()) {
            let _ = Line::parse(&line);
        }
    }
}
