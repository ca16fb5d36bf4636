//! Quest progression: steps, per-NPC rules, and the state machine.
//!
//! The story is a linear chain of steps 1 through 5. At each step exactly
//! one NPC is the "target": talking to that NPC and receiving a completion
//! signal from its generated reply advances the step. Every other NPC gets
//! a redirect or idle instruction so the player is never stuck.

use crate::npc::NpcId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Errors from quest operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuestError {
    #[error("invalid quest step: {0} (valid range {min}..={max})", min = QuestStep::FIRST.get(), max = QuestStep::LAST.get())]
    InvalidStep(u8),

    #[error("quest step {0} has no target NPC")]
    MissingTarget(QuestStep),

    #[error("quest step {0} has more than one target NPC")]
    AmbiguousTarget(QuestStep),
}

/// Global story progress, an integer in 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestStep(u8);

impl QuestStep {
    pub const FIRST: QuestStep = QuestStep(1);
    pub const LAST: QuestStep = QuestStep(5);

    /// Create a step, rejecting values outside the configured range.
    pub fn new(step: u8) -> Result<Self, QuestError> {
        if (Self::FIRST.0..=Self::LAST.0).contains(&step) {
            Ok(Self(step))
        } else {
            Err(QuestError::InvalidStep(step))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = QuestStep> {
        (Self::FIRST.0..=Self::LAST.0).map(QuestStep)
    }
}

impl fmt::Display for QuestStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What one NPC should do at one quest step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestRule {
    /// Situation instruction fed to the reply generator.
    pub instruction: String,
    /// Whether this NPC can advance the step.
    pub is_target: bool,
    /// Where the story goes when this NPC signals completion.
    pub next_step: Option<QuestStep>,
}

impl QuestRule {
    /// A non-advancing rule with the given instruction.
    pub fn idle(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            is_target: false,
            next_step: None,
        }
    }

    /// An advancing rule: this NPC is the step's target.
    pub fn target(instruction: impl Into<String>, next_step: Option<QuestStep>) -> Self {
        Self {
            instruction: instruction.into(),
            is_target: true,
            next_step,
        }
    }
}

/// Player-facing summary of a quest step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Objective {
    pub text: String,
    pub location: String,
}

/// The immutable rule table for a playthrough.
#[derive(Debug, Clone)]
pub struct QuestBook {
    rules: HashMap<(QuestStep, NpcId), QuestRule>,
    objectives: HashMap<QuestStep, Objective>,
}

impl QuestBook {
    /// Build a book and verify the one-target-per-step invariant.
    pub fn new(
        rules: HashMap<(QuestStep, NpcId), QuestRule>,
        objectives: HashMap<QuestStep, Objective>,
    ) -> Result<Self, QuestError> {
        for step in QuestStep::all() {
            let targets = NpcId::all()
                .iter()
                .filter(|npc| {
                    rules
                        .get(&(step, **npc))
                        .map(|r| r.is_target)
                        .unwrap_or(false)
                })
                .count();
            match targets {
                0 => return Err(QuestError::MissingTarget(step)),
                1 => {}
                _ => return Err(QuestError::AmbiguousTarget(step)),
            }
        }
        Ok(Self { rules, objectives })
    }

    /// The built-in lost-cat storyline.
    pub fn lost_cat() -> Self {
        let mut rules = HashMap::new();
        let step = |n: u8| QuestStep::new(n).expect("builtin step in range");

        // Child: opens the quest (step 1) and closes it (step 5).
        rules.insert(
            (step(1), NpcId::Child),
            QuestRule::target(
                "The player needs to find your cat. Ask them for help. \
                 Tell them to ask Mati in the Market. \
                 Once they agree or understand, append [DONE].",
                Some(step(2)),
            ),
        );
        rules.insert(
            (step(2), NpcId::Child),
            QuestRule::idle("You are waiting. Tell the player: 'Zapytaj Mati w Rynku' (Ask Mati in the Market)."),
        );
        rules.insert(
            (step(3), NpcId::Child),
            QuestRule::idle("You are waiting. Tell the player: 'Mati wie gdzie jest kot' (Mati knows where the cat is)."),
        );
        rules.insert(
            (step(4), NpcId::Child),
            QuestRule::idle("You are waiting for the player to find your cat."),
        );
        rules.insert(
            (step(5), NpcId::Child),
            QuestRule::target(
                "The player has found your cat! Thank them profusely in Polish. Append [DONE].",
                None,
            ),
        );

        // Mati: the step-2 clue.
        rules.insert(
            (step(1), NpcId::Mati),
            QuestRule::idle(
                "The child in the square looks sad. Tell the player to go talk to the child first.",
            ),
        );
        rules.insert(
            (step(2), NpcId::Mati),
            QuestRule::target(
                "The player is looking for the cat. Tell them you saw it run towards the Alley. \
                 Suggest they ask Jade. Once they understand, append [DONE].",
                Some(step(3)),
            ),
        );
        rules.insert(
            (step(3), NpcId::Mati),
            QuestRule::idle("I saw the cat go to the Alley. Go ask Jade."),
        );

        // Jade: the step-3 clue.
        rules.insert(
            (step(1), NpcId::Jade),
            QuestRule::idle("I haven't seen anything. Maybe ask Mati in the Market?"),
        );
        rules.insert(
            (step(2), NpcId::Jade),
            QuestRule::idle("I haven't seen anything. Maybe ask Mati in the Market?"),
        );
        rules.insert(
            (step(3), NpcId::Jade),
            QuestRule::target(
                "The player is looking for the cat. Tell them you saw it go into the Garden. \
                 Warn them to be quiet. Once they understand, append [DONE].",
                Some(step(4)),
            ),
        );

        // Kitty: found in the garden at step 4.
        rules.insert(
            (step(4), NpcId::Kitty),
            QuestRule::target(
                "The player is trying to call you. If they say 'Kici kici' or your name, \
                 meow happily and follow them. Append [DONE].",
                Some(step(5)),
            ),
        );

        let mut objectives = HashMap::new();
        objectives.insert(
            step(1),
            Objective {
                text: "Talk to the sad child in the Square".to_string(),
                location: "Square".to_string(),
            },
        );
        objectives.insert(
            step(2),
            Objective {
                text: "Ask Mati in the Market about the cat".to_string(),
                location: "Market".to_string(),
            },
        );
        objectives.insert(
            step(3),
            Objective {
                text: "Find Jade in the Alley".to_string(),
                location: "Alley".to_string(),
            },
        );
        objectives.insert(
            step(4),
            Objective {
                text: "Call Kitty in the Garden".to_string(),
                location: "Garden".to_string(),
            },
        );
        objectives.insert(
            step(5),
            Objective {
                text: "Bring the news back to the child".to_string(),
                location: "Square".to_string(),
            },
        );

        Self::new(rules, objectives).expect("builtin quest book is valid")
    }

    /// Rule for an (NPC, step) pair. Falls back to a neutral idle rule so
    /// a table gap can never block the player.
    pub fn rule_for(&self, npc: NpcId, step: QuestStep) -> QuestRule {
        self.rules
            .get(&(step, npc))
            .cloned()
            .unwrap_or_else(|| Self::default_rule(npc))
    }

    fn default_rule(npc: NpcId) -> QuestRule {
        let instruction = match npc {
            NpcId::Kitty => "You are hiding.",
            NpcId::Mati => "You are busy selling fruit. You haven't seen the cat recently.",
            NpcId::Jade => "You are enjoying the quiet alley.",
            NpcId::Bird => "Offer a hint about the current objective if asked, or translate.",
            NpcId::Child => "You are waiting for the player to find your cat.",
        };
        QuestRule::idle(instruction)
    }

    /// Player-facing objective for a step.
    pub fn objective(&self, step: QuestStep) -> Objective {
        self.objectives.get(&step).cloned().unwrap_or(Objective {
            text: "Explore the village".to_string(),
            location: "Square".to_string(),
        })
    }

    /// The target NPC for a step, if the table defines one.
    pub fn target_for(&self, step: QuestStep) -> Option<NpcId> {
        NpcId::all()
            .into_iter()
            .find(|npc| self.rule_for(*npc, step).is_target)
    }
}

impl Default for QuestBook {
    fn default() -> Self {
        Self::lost_cat()
    }
}

/// Owns the authoritative current step and decides advancement.
///
/// Callers are expected to hold this behind the dialogue engine's state
/// lock; the machine itself is plain data.
#[derive(Debug, Clone)]
pub struct QuestStateMachine {
    book: QuestBook,
    current: QuestStep,
    completed: bool,
}

impl QuestStateMachine {
    pub fn new(book: QuestBook) -> Self {
        Self {
            book,
            current: QuestStep::FIRST,
            completed: false,
        }
    }

    pub fn current_step(&self) -> QuestStep {
        self.current
    }

    /// True once the terminal step's target has signaled completion.
    pub fn is_complete(&self) -> bool {
        self.completed
    }

    pub fn book(&self) -> &QuestBook {
        &self.book
    }

    /// Rule for an NPC at the current step.
    pub fn rule_for(&self, npc: NpcId) -> QuestRule {
        self.book.rule_for(npc, self.current)
    }

    /// Advance the step if `npc` is the current target and its reply
    /// signaled completion. Returns the (possibly unchanged) step and
    /// whether a transition occurred.
    ///
    /// Safe against repeated completion signals: once the step advances,
    /// the stale NPC is no longer the target and nothing moves.
    pub fn try_advance(&mut self, npc: NpcId, completion_signaled: bool) -> (QuestStep, bool) {
        if !completion_signaled {
            return (self.current, false);
        }

        let rule = self.book.rule_for(npc, self.current);
        if !rule.is_target {
            return (self.current, false);
        }

        match rule.next_step {
            Some(next) => {
                tracing::info!(from = %self.current, to = %next, npc = %npc, "quest advanced");
                self.current = next;
                (self.current, true)
            }
            None => {
                // Terminal step: nothing past it, but the story is done.
                if !self.completed {
                    tracing::info!(step = %self.current, npc = %npc, "quest completed");
                }
                self.completed = true;
                (self.current, false)
            }
        }
    }

    /// Administrative override for test/demo reset.
    pub fn set_step(&mut self, step: u8) -> Result<QuestStep, QuestError> {
        self.current = QuestStep::new(step)?;
        self.completed = false;
        Ok(self.current)
    }
}

impl Default for QuestStateMachine {
    fn default() -> Self {
        Self::new(QuestBook::lost_cat())
    }
}
