//! The dialogue turn orchestrator.
//!
//! `DialogueEngine` is the single entry point for player/NPC interaction.
//! It composes the generation directive (persona + quest situation +
//! language level), calls the reply generator under a timeout, strips the
//! control tags out of the raw reply, applies quest and difficulty
//! transitions, and records the exchange.
//!
//! All shared mutable state (quest step, difficulty, turn counter, the
//! session store) lives behind one lock. The generator call happens
//! outside the lock, and state only mutates after a reply is obtained, so
//! a timeout or backend failure can never leave a half-applied turn.

use crate::difficulty::{Difficulty, EscalationPolicy, TurnParityEscalation};
use crate::generate::{GenerationError, ReplyGenerator};
use crate::markup::{parse_reply, ParsedReply};
use crate::npc::{NpcId, PersonaCatalog};
use crate::quest::{Objective, QuestBook, QuestError, QuestStateMachine, QuestStep};
use crate::session::{SessionStore, Turn, HISTORY_WINDOW};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// What the player said when they walk up, from the NPC's point of view.
const APPROACH_INPUT: &str = "The player has just approached you. Greet them in character.";

/// Neutral line used when the generator is unavailable mid-conversation.
const FALLBACK_REPLY: &str = "That's great! Keep practicing.";

/// Instructions shared by every NPC directive.
const BASE_INSTRUCTION: &str = "You are a character in a language learning game called 'Mówka'. \
The player is learning Polish. \
Your goal is to help them practice by speaking in simple, clear Polish. \
If the player makes a mistake, gently correct them in your response. \
Keep your responses short (1-2 sentences). \
Stay in character at all times. \
VOICE INSTRUCTIONS: You can use tags to control your voice tone. Use [sadly], [excited], \
[whispers], [laughs], [sighs], [sarcastic], or [curious] at the start of sentences to change \
how you sound. Example: '[sadly] I lost my cat.' or '[excited] I found it!' \
IMPORTANT: If you are the correct NPC for the current quest step and you have successfully \
conveyed the necessary clue or information to the player (or if they have acknowledged it), \
append '[DONE]' to the end of your response. \
If you are NOT the correct NPC, politely direct the player to the correct person.";

/// Tuning for the dialogue engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on one generation call.
    pub generation_timeout: Duration,
    /// How many recent turns are sent to the generator.
    pub history_window: usize,
    /// Reply substituted when generation fails mid-conversation.
    pub fallback_reply: String,
    /// Difficulty at the start of a playthrough.
    pub initial_difficulty: Difficulty,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self {
            generation_timeout: Duration::from_secs(30),
            history_window: HISTORY_WINDOW,
            fallback_reply: FALLBACK_REPLY.to_string(),
            initial_difficulty: Difficulty::MIN,
        }
    }

    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window.max(1);
        self
    }

    pub fn with_fallback_reply(mut self, reply: impl Into<String>) -> Self {
        self.fallback_reply = reply.into();
        self
    }

    pub fn with_initial_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.initial_difficulty = difficulty;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The result of one dialogue turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Player-visible reply with control tags stripped.
    pub reply: String,
    /// Voice expression hints from the reply, in order.
    pub expressions: Vec<String>,
    /// Quest step after this turn.
    pub quest_step: QuestStep,
    /// Difficulty after this turn.
    pub difficulty: Difficulty,
    /// Whether this turn advanced the quest.
    pub advanced_quest: bool,
    /// Whether the whole storyline is finished.
    pub quest_complete: bool,
    /// Completed exchanges in this NPC's session.
    pub turn_count: u32,
    /// True when the reply is the fallback line rather than generated text.
    pub degraded: bool,
}

/// Serializable engine state for persistence.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EngineSnapshot {
    pub quest_step: u8,
    pub difficulty: Difficulty,
    pub turns_completed: u64,
    pub sessions: SessionStore,
}

/// Shared mutable game state, guarded by the engine's lock.
struct GameState {
    quest: QuestStateMachine,
    difficulty: Difficulty,
    turns_completed: u64,
    sessions: SessionStore,
}

/// The dialogue turn orchestrator.
pub struct DialogueEngine {
    generator: Arc<dyn ReplyGenerator>,
    catalog: PersonaCatalog,
    escalation: Box<dyn EscalationPolicy>,
    config: EngineConfig,
    state: Mutex<GameState>,
}

impl DialogueEngine {
    /// Create an engine with the built-in storyline and default tuning.
    pub fn new(generator: Arc<dyn ReplyGenerator>) -> Self {
        Self::with_book(generator, QuestBook::lost_cat())
    }

    /// Create an engine with a custom quest book.
    pub fn with_book(generator: Arc<dyn ReplyGenerator>, book: QuestBook) -> Self {
        let config = EngineConfig::new();
        Self {
            generator,
            catalog: PersonaCatalog::default_catalog().clone(),
            escalation: Box::new(TurnParityEscalation::default()),
            state: Mutex::new(GameState {
                quest: QuestStateMachine::new(book),
                difficulty: config.initial_difficulty,
                turns_completed: 0,
                sessions: SessionStore::new(),
            }),
            config,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.state.get_mut().difficulty = config.initial_difficulty;
        self.config = config;
        self
    }

    pub fn with_catalog(mut self, catalog: PersonaCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_escalation(mut self, policy: Box<dyn EscalationPolicy>) -> Self {
        self.escalation = policy;
        self
    }

    pub fn catalog(&self) -> &PersonaCatalog {
        &self.catalog
    }

    /// Begin (or restart) a conversation with an NPC.
    ///
    /// The NPC's session is reset before anything else, so starting is an
    /// idempotent reset even when generation later fails. A completion
    /// marker in a greeting is stripped but never advances the quest.
    pub async fn start_interaction(&self, npc: NpcId) -> TurnOutcome {
        let (directive, difficulty) = {
            let mut state = self.state.lock().await;
            state.sessions.start(npc);
            let rule = state.quest.rule_for(npc);
            (
                self.build_directive(npc, &rule.instruction, state.difficulty),
                state.difficulty,
            )
        };

        let generated = self.generate(&directive, &[], APPROACH_INPUT).await;

        let (greeting, expressions, degraded) = match generated {
            Ok(raw) => {
                let ParsedReply {
                    text, expressions, ..
                } = parse_reply(&raw);
                (text, expressions, false)
            }
            Err(err) => {
                tracing::warn!(npc = %npc, error = %err, "greeting generation failed, using static greeting");
                (self.catalog.get(npc).greeting.clone(), Vec::new(), true)
            }
        };

        let mut state = self.state.lock().await;
        state.sessions.get_or_create(npc).record_greeting(&greeting);
        TurnOutcome {
            reply: greeting,
            expressions,
            quest_step: state.quest.current_step(),
            difficulty,
            advanced_quest: false,
            quest_complete: state.quest.is_complete(),
            turn_count: 0,
            degraded,
        }
    }

    /// Process one player utterance to an NPC.
    pub async fn respond(&self, npc: NpcId, user_input: &str) -> TurnOutcome {
        // Snapshot everything the generator needs, then release the lock
        // for the slow call.
        let (directive, window, step_before, complete_before, difficulty_before, turn_count_before) = {
            let state = self.state.lock().await;
            let rule = state.quest.rule_for(npc);
            let (window, turn_count) = match state.sessions.get(npc) {
                Some(session) => (
                    session.window(self.config.history_window).to_vec(),
                    session.turn_count(),
                ),
                None => (Vec::new(), 0),
            };
            (
                self.build_directive(npc, &rule.instruction, state.difficulty),
                window,
                state.quest.current_step(),
                state.quest.is_complete(),
                state.difficulty,
                turn_count,
            )
        };

        let raw = match self.generate(&directive, &window, user_input).await {
            Ok(raw) => raw,
            Err(err) => {
                // Fail soft: the player always gets a reply, and nothing
                // in the game state moves.
                tracing::warn!(npc = %npc, error = %err, "reply generation failed, substituting fallback");
                return TurnOutcome {
                    reply: self.config.fallback_reply.clone(),
                    expressions: Vec::new(),
                    quest_step: step_before,
                    difficulty: difficulty_before,
                    advanced_quest: false,
                    quest_complete: complete_before,
                    turn_count: turn_count_before,
                    degraded: true,
                };
            }
        };

        let parsed = parse_reply(&raw);

        let mut state = self.state.lock().await;
        let (quest_step, advanced_quest) = state.quest.try_advance(npc, parsed.completed);
        let quest_complete = state.quest.is_complete();

        let session = state.sessions.get_or_create(npc);
        session.record_exchange(user_input, &parsed.text);
        let turn_count = session.turn_count();

        state.turns_completed += 1;
        state.difficulty = self
            .escalation
            .next(state.turns_completed, state.difficulty);

        TurnOutcome {
            reply: parsed.text,
            expressions: parsed.expressions,
            quest_step,
            difficulty: state.difficulty,
            advanced_quest,
            quest_complete,
            turn_count,
            degraded: false,
        }
    }

    /// Current step plus its player-facing objective.
    pub async fn quest_state(&self) -> (QuestStep, Objective, bool) {
        let state = self.state.lock().await;
        let step = state.quest.current_step();
        (
            step,
            state.quest.book().objective(step),
            state.quest.is_complete(),
        )
    }

    /// Administrative quest override for test/demo reset.
    pub async fn set_quest_step(&self, step: u8) -> Result<QuestStep, QuestError> {
        let mut state = self.state.lock().await;
        state.quest.set_step(step)
    }

    pub async fn difficulty(&self) -> Difficulty {
        self.state.lock().await.difficulty
    }

    /// Retained history for an NPC, if a session exists.
    pub async fn history(&self, npc: NpcId) -> Option<Vec<Turn>> {
        let state = self.state.lock().await;
        state.sessions.get(npc).map(|s| s.history().to_vec())
    }

    /// Identifier of an NPC's live session, if one exists.
    pub async fn session_id(&self, npc: NpcId) -> Option<crate::session::SessionId> {
        let state = self.state.lock().await;
        state.sessions.get(npc).map(|s| s.id)
    }

    /// Snapshot of an NPC's session counters, if a session exists.
    pub async fn session_info(&self, npc: NpcId) -> Option<SessionInfo> {
        let state = self.state.lock().await;
        state.sessions.get(npc).map(|session| SessionInfo {
            turn_count: session.turn_count(),
            vocabulary_learned: session.vocabulary().iter().cloned().collect(),
            history_len: session.history().len(),
        })
    }

    /// Merge newly learned words into an NPC's session.
    pub async fn record_vocabulary<I, S>(&self, npc: NpcId, words: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state.lock().await;
        state.sessions.get_or_create(npc).add_vocabulary(words);
    }

    /// End a conversation, dropping its history. Returns whether one existed.
    pub async fn end_interaction(&self, npc: NpcId) -> bool {
        let mut state = self.state.lock().await;
        state.sessions.remove(npc).is_some()
    }

    /// Drop sessions idle longer than `ttl`. Returns how many were evicted.
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let mut state = self.state.lock().await;
        state.sessions.evict_idle(ttl)
    }

    /// Serializable copy of the mutable state, for persistence.
    pub async fn snapshot(&self) -> EngineSnapshot {
        let state = self.state.lock().await;
        EngineSnapshot {
            quest_step: state.quest.current_step().get(),
            difficulty: state.difficulty,
            turns_completed: state.turns_completed,
            sessions: state.sessions.clone(),
        }
    }

    /// Restore a previously saved snapshot.
    pub async fn restore(&self, snapshot: EngineSnapshot) -> Result<(), QuestError> {
        let mut state = self.state.lock().await;
        state.quest.set_step(snapshot.quest_step)?;
        state.difficulty = snapshot.difficulty;
        state.turns_completed = snapshot.turns_completed;
        state.sessions = snapshot.sessions;
        Ok(())
    }

    async fn generate(
        &self,
        directive: &str,
        window: &[Turn],
        user_input: &str,
    ) -> Result<String, GenerationError> {
        match tokio::time::timeout(
            self.config.generation_timeout,
            self.generator.generate(directive, window, user_input),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout),
        }
    }

    fn build_directive(&self, npc: NpcId, quest_instruction: &str, difficulty: Difficulty) -> String {
        let persona = self.catalog.get(npc);

        let mut directive = String::new();
        directive.push_str(BASE_INSTRUCTION);
        directive.push_str("\n\nCharacter Profile:\n");
        directive.push_str(&persona.description);
        directive.push_str("\n\nCurrent Situation:\n");
        directive.push_str(quest_instruction);
        directive.push_str(&format!(
            "\n\nLanguage Level (Difficulty {difficulty}):\n{}",
            difficulty.instruction()
        ));
        tracing::debug!(npc = %npc, len = directive.len(), "assembled directive");
        directive
    }
}

/// Counters exposed for one NPC session.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionInfo {
    pub turn_count: u32,
    pub vocabulary_learned: Vec<String>,
    pub history_len: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGenerator;

    fn engine_with(replies: &[&str]) -> DialogueEngine {
        DialogueEngine::new(Arc::new(MockGenerator::scripted(replies)))
    }

    #[tokio::test]
    async fn test_respond_records_history_in_order() {
        let engine = engine_with(&["Cześć!", "Tak, kot."]);

        engine.respond(NpcId::Child, "hello").await;
        engine.respond(NpcId::Child, "more").await;

        let history = engine.history(NpcId::Child).await.unwrap();
        let texts: Vec<_> = history.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["hello", "Cześć!", "more", "Tak, kot."]);
    }

    #[tokio::test]
    async fn test_wrong_npc_done_is_ignored() {
        let engine = engine_with(&["[DONE] ok"]);

        let outcome = engine.respond(NpcId::Mati, "hi").await;
        assert_eq!(outcome.quest_step.get(), 1);
        assert!(!outcome.advanced_quest);
        assert_eq!(outcome.reply, "ok");
    }

    #[tokio::test]
    async fn test_target_npc_done_advances() {
        let engine = engine_with(&["[DONE] ok"]);

        let outcome = engine.respond(NpcId::Child, "hi").await;
        assert_eq!(outcome.quest_step.get(), 2);
        assert!(outcome.advanced_quest);
    }

    #[tokio::test]
    async fn test_difficulty_escalates_every_two_turns() {
        let engine = engine_with(&["a", "b", "c", "d"]);

        assert_eq!(engine.respond(NpcId::Bird, "1").await.difficulty.level(), 1);
        assert_eq!(engine.respond(NpcId::Bird, "2").await.difficulty.level(), 2);
        assert_eq!(engine.respond(NpcId::Bird, "3").await.difficulty.level(), 2);
        assert_eq!(engine.respond(NpcId::Bird, "4").await.difficulty.level(), 3);
    }

    #[tokio::test]
    async fn test_fallback_mutates_nothing() {
        let engine = DialogueEngine::new(Arc::new(MockGenerator::failing()));

        let outcome = engine.respond(NpcId::Child, "hello").await;
        assert_eq!(outcome.reply, FALLBACK_REPLY);
        assert!(outcome.degraded);
        assert!(!outcome.advanced_quest);
        assert_eq!(outcome.quest_step.get(), 1);
        assert_eq!(outcome.difficulty.level(), 1);

        // No session was created and nothing global moved.
        assert!(engine.history(NpcId::Child).await.is_none());
        assert_eq!(engine.difficulty().await.level(), 1);
        let (step, _, _) = engine.quest_state().await;
        assert_eq!(step.get(), 1);
    }

    /// Returns its scripted replies, then errors once they run out.
    struct ExhaustibleGenerator {
        replies: std::sync::Mutex<Vec<String>>,
    }

    impl ExhaustibleGenerator {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: std::sync::Mutex::new(
                    replies.iter().rev().map(|s| s.to_string()).collect(),
                ),
            }
        }
    }

    #[async_trait::async_trait]
    impl ReplyGenerator for ExhaustibleGenerator {
        async fn generate(
            &self,
            _directive: &str,
            _history: &[Turn],
            _user_input: &str,
        ) -> Result<String, GenerationError> {
            self.replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| GenerationError::Backend("backend offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_fallback_reports_existing_completion() {
        let engine =
            DialogueEngine::new(Arc::new(ExhaustibleGenerator::new(&["[DONE] Dziękuję!"])));
        engine.set_quest_step(5).await.unwrap();

        let outcome = engine.respond(NpcId::Child, "I found Kitty!").await;
        assert!(outcome.quest_complete);

        // The generator is now exhausted; the degraded turn must still
        // report that the storyline is finished.
        let outcome = engine.respond(NpcId::Child, "Hello again").await;
        assert!(outcome.degraded);
        assert!(outcome.quest_complete);
        assert_eq!(outcome.quest_step, QuestStep::LAST);
    }

    #[tokio::test]
    async fn test_start_resets_session() {
        let engine = engine_with(&["Witaj!", "reply", "Witaj znowu!"]);

        engine.start_interaction(NpcId::Jade).await;
        engine.respond(NpcId::Jade, "hi").await;
        assert_eq!(engine.history(NpcId::Jade).await.unwrap().len(), 3);

        let outcome = engine.start_interaction(NpcId::Jade).await;
        assert_eq!(outcome.reply, "Witaj znowu!");
        // Reset: only the fresh greeting remains.
        assert_eq!(engine.history(NpcId::Jade).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_start_never_advances_quest() {
        let engine = engine_with(&["[DONE] Cześć!"]);

        let outcome = engine.start_interaction(NpcId::Child).await;
        assert_eq!(outcome.reply, "Cześć!");
        assert!(!outcome.advanced_quest);
        assert_eq!(outcome.quest_step.get(), 1);
    }

    #[tokio::test]
    async fn test_start_falls_back_to_static_greeting() {
        let engine = DialogueEngine::new(Arc::new(MockGenerator::failing()));

        let outcome = engine.start_interaction(NpcId::Mati).await;
        assert!(outcome.degraded);
        assert_eq!(
            outcome.reply,
            PersonaCatalog::default_catalog().get(NpcId::Mati).greeting
        );
    }

    #[tokio::test]
    async fn test_generation_timeout_falls_back() {
        let engine = DialogueEngine::new(Arc::new(MockGenerator::hanging())).with_config(
            EngineConfig::new().with_generation_timeout(Duration::from_millis(10)),
        );

        let outcome = engine.respond(NpcId::Child, "hello").await;
        assert!(outcome.degraded);
        assert_eq!(outcome.reply, FALLBACK_REPLY);
        assert!(engine.history(NpcId::Child).await.is_none());
    }

    #[tokio::test]
    async fn test_full_playthrough_advances_to_completion() {
        let engine = engine_with(&["[DONE] a", "[DONE] b", "[DONE] c", "[DONE] d", "[DONE] e"]);

        for npc in [NpcId::Child, NpcId::Mati, NpcId::Jade, NpcId::Kitty] {
            let outcome = engine.respond(npc, "hi").await;
            assert!(outcome.advanced_quest, "visiting {npc}");
        }

        let outcome = engine.respond(NpcId::Child, "I found Kitty!").await;
        assert!(!outcome.advanced_quest);
        assert_eq!(outcome.quest_step, QuestStep::LAST);
        assert!(outcome.quest_complete);
    }

    #[tokio::test]
    async fn test_snapshot_restore_round_trip() {
        let engine = engine_with(&["[DONE] a", "b"]);
        engine.respond(NpcId::Child, "hi").await;
        engine.respond(NpcId::Child, "again").await;

        let snapshot = engine.snapshot().await;
        assert_eq!(snapshot.quest_step, 2);

        let restored = DialogueEngine::new(Arc::new(MockGenerator::scripted(&[])));
        restored.restore(snapshot).await.unwrap();
        let (step, _, _) = restored.quest_state().await;
        assert_eq!(step.get(), 2);
        assert_eq!(
            restored.history(NpcId::Child).await.unwrap().len(),
            4
        );
    }

    #[tokio::test]
    async fn test_directive_contains_all_sections() {
        let engine = engine_with(&[]);
        let directive =
            engine.build_directive(NpcId::Mati, "Sell bread.", Difficulty::new(3));

        assert!(directive.contains("Mówka"));
        assert!(directive.contains("Character Profile:"));
        assert!(directive.contains("shopkeeper"));
        assert!(directive.contains("Current Situation:\nSell bread."));
        assert!(directive.contains("Language Level (Difficulty 3):"));
    }
}
