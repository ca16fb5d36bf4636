//! Testing utilities for the dialogue engine.
//!
//! This module provides tools for integration testing:
//! - `MockGenerator` for deterministic testing without API calls
//! - `TestHarness` for scripted conversation scenarios
//! - Assertion helpers for verifying quest and difficulty state

use crate::dialogue::{DialogueEngine, TurnOutcome};
use crate::generate::{GenerationError, ReplyGenerator};
use crate::npc::NpcId;
use crate::session::Turn;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One recorded call to the mock generator.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub directive: String,
    pub history_len: usize,
    pub user_input: String,
}

enum MockBehavior {
    Scripted,
    Failing,
    Hanging,
}

/// A reply generator that returns scripted responses in order.
///
/// Use this for deterministic tests without API calls. Once the script
/// is exhausted it returns a default line, matching how a test should
/// notice over-consumption without panicking inside the engine.
pub struct MockGenerator {
    responses: Mutex<Vec<String>>,
    index: Mutex<usize>,
    calls: Mutex<Vec<RecordedCall>>,
    behavior: MockBehavior,
}

impl MockGenerator {
    /// Scripted replies, returned in order.
    pub fn scripted(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            index: Mutex::new(0),
            calls: Mutex::new(Vec::new()),
            behavior: MockBehavior::Scripted,
        }
    }

    /// A generator that always fails, for exercising the fallback path.
    pub fn failing() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            index: Mutex::new(0),
            calls: Mutex::new(Vec::new()),
            behavior: MockBehavior::Failing,
        }
    }

    /// A generator that never returns, for exercising timeouts.
    pub fn hanging() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            index: Mutex::new(0),
            calls: Mutex::new(Vec::new()),
            behavior: MockBehavior::Hanging,
        }
    }

    /// Append a reply to the script.
    pub fn queue(&self, response: impl Into<String>) {
        self.responses.lock().unwrap().push(response.into());
    }

    /// Replay the script from the beginning.
    pub fn reset(&self) {
        *self.index.lock().unwrap() = 0;
        self.calls.lock().unwrap().clear();
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplyGenerator for MockGenerator {
    async fn generate(
        &self,
        directive: &str,
        history: &[Turn],
        user_input: &str,
    ) -> Result<String, GenerationError> {
        self.calls.lock().unwrap().push(RecordedCall {
            directive: directive.to_string(),
            history_len: history.len(),
            user_input: user_input.to_string(),
        });

        match self.behavior {
            MockBehavior::Failing => {
                Err(GenerationError::Backend("scripted failure".to_string()))
            }
            MockBehavior::Hanging => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(GenerationError::Timeout)
            }
            MockBehavior::Scripted => {
                let responses = self.responses.lock().unwrap();
                let mut index = self.index.lock().unwrap();
                let reply = responses
                    .get(*index)
                    .cloned()
                    .unwrap_or_else(|| "The NPC has no more scripted replies.".to_string());
                *index += 1;
                Ok(reply)
            }
        }
    }
}

/// Test harness wiring an engine to a shared mock generator.
pub struct TestHarness {
    /// The mock generator, for queuing replies and inspecting calls.
    pub generator: Arc<MockGenerator>,
    /// The engine under test.
    pub engine: DialogueEngine,
}

impl TestHarness {
    /// Create a harness with an empty script.
    pub fn new() -> Self {
        let generator = Arc::new(MockGenerator::scripted(&[]));
        let engine = DialogueEngine::new(generator.clone());
        Self { generator, engine }
    }

    /// Queue a scripted NPC reply.
    pub fn expect_reply(&self, text: impl Into<String>) -> &Self {
        self.generator.queue(text);
        self
    }

    /// Approach an NPC.
    pub async fn start(&self, npc: NpcId) -> TurnOutcome {
        self.engine.start_interaction(npc).await
    }

    /// Say something to an NPC.
    pub async fn say(&self, npc: NpcId, text: &str) -> TurnOutcome {
        self.engine.respond(npc, text).await
    }

    /// Current quest step number.
    pub async fn step(&self) -> u8 {
        self.engine.quest_state().await.0.get()
    }

    /// Current difficulty level.
    pub async fn difficulty(&self) -> u8 {
        self.engine.difficulty().await.level()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the current quest step.
#[track_caller]
pub fn assert_step(outcome: &TurnOutcome, step: u8) {
    assert_eq!(
        outcome.quest_step.get(),
        step,
        "Expected quest step {step}, got {}",
        outcome.quest_step
    );
}

/// Assert the current difficulty level.
#[track_caller]
pub fn assert_difficulty(outcome: &TurnOutcome, level: u8) {
    assert_eq!(
        outcome.difficulty.level(),
        level,
        "Expected difficulty {level}, got {}",
        outcome.difficulty
    );
}

/// Assert that a turn advanced the quest.
#[track_caller]
pub fn assert_advanced(outcome: &TurnOutcome) {
    assert!(outcome.advanced_quest, "Expected the quest to advance");
}

/// Assert that a turn did NOT advance the quest.
#[track_caller]
pub fn assert_not_advanced(outcome: &TurnOutcome) {
    assert!(!outcome.advanced_quest, "Expected the quest to NOT advance");
}
