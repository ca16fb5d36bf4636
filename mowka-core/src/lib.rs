//! Conversational Polish-learning game engine.
//!
//! This crate provides:
//! - A cast of NPCs for a lost-cat quest, each with a persona and voice
//! - A linear quest state machine driven by in-dialogue completion markers
//! - Per-NPC conversation sessions with bounded history
//! - An AI dialogue orchestrator with fail-soft fallback replies
//! - Adaptive difficulty that escalates Polish usage as the player practices
//!
//! # Quick Start
//!
//! ```ignore
//! use mowka_core::{DialogueEngine, GameService, generate::ClaudeGenerator};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let generator = Arc::new(ClaudeGenerator::from_env()?);
//!     let service = GameService::new(DialogueEngine::new(generator));
//!
//!     let start = service.start_interaction("child").await?;
//!     println!("{}", start.greeting);
//!
//!     let reply = service.respond_text("child", "What happened?").await?;
//!     println!("{}", reply.reply);
//!     Ok(())
//! }
//! ```

pub mod dialogue;
pub mod difficulty;
pub mod generate;
pub mod markup;
pub mod npc;
pub mod quest;
pub mod service;
pub mod session;
pub mod speech;
pub mod testing;

// Primary public API
pub use dialogue::{DialogueEngine, EngineConfig, EngineSnapshot, SessionInfo, TurnOutcome};
pub use difficulty::{Difficulty, EscalationPolicy, FixedDifficulty, TurnParityEscalation};
pub use generate::{ClaudeGenerator, GenerationError, ReplyGenerator};
pub use markup::{parse_reply, ParsedReply};
pub use npc::{NpcId, Persona, PersonaCatalog, UnknownNpc};
pub use quest::{Objective, QuestBook, QuestError, QuestStateMachine, QuestStep};
pub use service::{ConversationReply, GameService, QuestStateView, ServiceError, StartReply};
pub use session::{ConversationSession, SessionId, SessionStore, Speaker, Turn};
pub use testing::{MockGenerator, TestHarness};
