//! Integration tests that call the real Claude API.
//!
//! These tests require ANTHROPIC_API_KEY to be set (via .env file or environment).
//! Run with: `cargo test -p mowka-core --test api_integration -- --ignored`
//!
//! These are marked #[ignore] by default to avoid:
//! - API costs in CI
//! - Test failures when no API key is available
//! - Slow test runs (API calls take seconds)

use mowka_core::generate::ClaudeGenerator;
use mowka_core::{DialogueEngine, NpcId};
use std::sync::Arc;

/// Load environment variables from .env file
fn setup() {
    let _ = dotenvy::dotenv();
}

/// Check if API key is available
fn has_api_key() -> bool {
    std::env::var("ANTHROPIC_API_KEY").is_ok()
}

#[tokio::test]
#[ignore] // Run with: cargo test -p mowka-core --test api_integration -- --ignored
async fn test_npc_greets_in_character() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: ANTHROPIC_API_KEY not set");
        return;
    }

    let generator = ClaudeGenerator::from_env().expect("Failed to create generator");
    let engine = DialogueEngine::new(Arc::new(generator));

    let outcome = engine.start_interaction(NpcId::Child).await;

    println!("Greeting: {}", outcome.reply);
    println!("Expressions: {:?}", outcome.expressions);

    assert!(!outcome.reply.is_empty(), "NPC should greet the player");
    assert!(!outcome.degraded, "A real API call should not degrade");
    assert!(
        !outcome.reply.contains('['),
        "Control tags should be stripped from the player-visible reply"
    );
}

#[tokio::test]
#[ignore]
async fn test_conversation_turn_with_real_api() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: ANTHROPIC_API_KEY not set");
        return;
    }

    let generator = ClaudeGenerator::from_env().expect("Failed to create generator");
    let engine = DialogueEngine::new(Arc::new(generator));

    engine.start_interaction(NpcId::Child).await;
    let outcome = engine
        .respond(NpcId::Child, "Don't worry, I will help you find your cat!")
        .await;

    println!("Reply: {}", outcome.reply);
    println!("Quest step: {}", outcome.quest_step);
    println!("Advanced: {}", outcome.advanced_quest);

    assert!(!outcome.reply.is_empty());
    assert!(!outcome.degraded);
    assert_eq!(outcome.turn_count, 1);

    // History now holds greeting + player turn + NPC turn.
    let history = engine.history(NpcId::Child).await.unwrap();
    assert_eq!(history.len(), 3);
}
