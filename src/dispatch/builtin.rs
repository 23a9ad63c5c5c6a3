//! Built-in chat commands.

// ============================================================================
// Imports
// ============================================================================

use rand::Rng;

use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Greeting command name.
pub const HELLO: &str = "hello";

/// Dice roll command name.
pub const DICE: &str = "dice";

/// Faces on the die.
const DIE_FACES: u8 = 6;

// ============================================================================
// Handlers
// ============================================================================

/// `!hello` greets the sender by name.
pub fn hello(sender: &str, _args: &str) -> Result<Option<String>> {
    Ok(Some(format!("Hello, {sender}!")))
}

/// `!dice` rolls a six-sided die.
pub fn dice(sender: &str, _args: &str) -> Result<Option<String>> {
    Ok(Some(format!("{sender} rolled a {} 🎲", roll_die())))
}

/// Returns a uniformly random face in `1..=6`.
#[must_use]
pub fn roll_die() -> u8 {
    rand::rng().random_range(1..=DIE_FACES)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hello() {
        assert_eq!(
            hello("alice", "").expect("hello never fails"),
            Some("Hello, alice!".to_string())
        );
    }

    #[test]
    fn test_dice_reply_format() {
        let reply = dice("bob", "").expect("dice never fails").expect("dice always replies");
        assert!(reply.starts_with("bob rolled a "));
        assert!(reply.ends_with(" 🎲"));
    }

    #[test]
    fn test_roll_range_and_coverage() {
        let mut seen = [0usize; DIE_FACES as usize];

        for _ in 0..10_000 {
            let roll = roll_die();
            assert!((1..=DIE_FACES).contains(&roll), "roll out of range: {roll}");
            seen[usize::from(roll - 1)] += 1;
        }

        assert!(seen.iter().all(|&count| count > 0), "faces seen: {seen:?}");
    }
}
