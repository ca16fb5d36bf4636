//! Language difficulty levels and escalation policy.
//!
//! Difficulty controls how much of the NPC reply is in the target
//! language versus English. Levels run 1..=5; out-of-range input clamps
//! rather than failing so a bad caller can never break a turn.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A language-mix difficulty level, always within 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Difficulty(u8);

impl Difficulty {
    pub const MIN: Difficulty = Difficulty(1);
    pub const MAX: Difficulty = Difficulty(5);

    /// Create a difficulty, clamping out-of-range values to 1..=5.
    pub fn new(level: u8) -> Self {
        Self(level.clamp(1, 5))
    }

    pub fn level(&self) -> u8 {
        self.0
    }

    /// Language-mixing instruction for the reply generator.
    pub fn instruction(&self) -> &'static str {
        match self.0 {
            1 => "Speak mostly in English, but introduce key Polish words (e.g., 'kot', 'tak'). Translate them immediately.",
            2 => "Speak in simple Polish sentences, but repeat important parts in English.",
            3 => "Speak in Polish. Only use English if the player seems very confused.",
            4 => "Speak only in Polish, but keep grammar simple and speak slowly.",
            _ => "Speak naturally in Polish.",
        }
    }

    /// The next level up, capped at the maximum.
    pub fn bumped(&self) -> Self {
        Self::new(self.0.saturating_add(1))
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::MIN
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strategy for raising difficulty as the player keeps talking.
///
/// The default ties escalation to turn count; swapping in a
/// performance-driven policy only requires a new implementation.
pub trait EscalationPolicy: Send + Sync {
    /// Decide the difficulty after a completed turn.
    ///
    /// `turns_completed` is the process-wide count of successful turns,
    /// including the one that just finished. Must never decrease the level.
    fn next(&self, turns_completed: u64, current: Difficulty) -> Difficulty;
}

/// Raise difficulty by one level every `turns_per_level` completed turns.
#[derive(Debug, Clone)]
pub struct TurnParityEscalation {
    pub turns_per_level: u64,
}

impl TurnParityEscalation {
    pub fn new(turns_per_level: u64) -> Self {
        Self {
            turns_per_level: turns_per_level.max(1),
        }
    }
}

impl Default for TurnParityEscalation {
    fn default() -> Self {
        Self::new(2)
    }
}

impl EscalationPolicy for TurnParityEscalation {
    fn next(&self, turns_completed: u64, current: Difficulty) -> Difficulty {
        if turns_completed > 0 && turns_completed % self.turns_per_level == 0 {
            current.bumped()
        } else {
            current
        }
    }
}

/// Never changes the level. Useful for demos and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedDifficulty;

impl EscalationPolicy for FixedDifficulty {
    fn next(&self, _turns_completed: u64, current: Difficulty) -> Difficulty {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamping() {
        assert_eq!(Difficulty::new(0).level(), 1);
        assert_eq!(Difficulty::new(3).level(), 3);
        assert_eq!(Difficulty::new(9).level(), 5);
    }

    #[test]
    fn test_instructions_distinct() {
        let texts: Vec<_> = (1..=5).map(|l| Difficulty::new(l).instruction()).collect();
        for (i, a) in texts.iter().enumerate() {
            for b in texts.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_bumped_caps_at_max() {
        assert_eq!(Difficulty::new(4).bumped(), Difficulty::MAX);
        assert_eq!(Difficulty::MAX.bumped(), Difficulty::MAX);
    }

    #[test]
    fn test_turn_parity_escalates_every_two_turns() {
        let policy = TurnParityEscalation::default();
        let mut difficulty = Difficulty::MIN;

        for turn in 1..=10u64 {
            difficulty = policy.next(turn, difficulty);
            let expected = Difficulty::new(1 + (turn / 2) as u8);
            assert_eq!(difficulty, expected, "after turn {turn}");
        }
        assert_eq!(difficulty, Difficulty::MAX);
    }

    #[test]
    fn test_escalation_never_exceeds_max() {
        let policy = TurnParityEscalation::default();
        let mut difficulty = Difficulty::MIN;
        for turn in 1..=100u64 {
            let next = policy.next(turn, difficulty);
            assert!(next >= difficulty);
            difficulty = next;
        }
        assert_eq!(difficulty, Difficulty::MAX);
    }
}
