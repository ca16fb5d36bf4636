//! QA tests for the lost-cat quest flow using scripted replies.
//!
//! These tests verify the full gameplay loop without any API calls:
//! - Quest progression through all five steps
//! - Completion markers from the wrong NPC are ignored
//! - Difficulty escalation as the player practices
//! - Fallback behavior leaves game state untouched
//!
//! Run with: `cargo test -p mowka-core --test qa_quest_flow`

use mowka_core::testing::{
    assert_advanced, assert_difficulty, assert_not_advanced, assert_step, TestHarness,
};
use mowka_core::{DialogueEngine, EngineConfig, MockGenerator, NpcId};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// QUEST PROGRESSION
// =============================================================================

#[tokio::test]
async fn test_full_playthrough_to_completion() {
    let harness = TestHarness::new();
    harness
        .expect_reply("Kitty likes the shop! Ask Mati. [DONE]")
        .expect_reply("I saw her run to the park! [DONE]")
        .expect_reply("She chased a bird near the fountain. [DONE]")
        .expect_reply("Miau! [DONE]")
        .expect_reply("[joyful] Kitty! Dziękuję! [DONE]");

    let t1 = harness.say(NpcId::Child, "What happened?").await;
    assert_advanced(&t1);
    assert_step(&t1, 2);

    let t2 = harness.say(NpcId::Mati, "Have you seen a cat?").await;
    assert_advanced(&t2);
    assert_step(&t2, 3);

    let t3 = harness.say(NpcId::Jade, "Did a cat come through here?").await;
    assert_advanced(&t3);
    assert_step(&t3, 4);

    let t4 = harness.say(NpcId::Kitty, "Here, kitty kitty!").await;
    assert_advanced(&t4);
    assert_step(&t4, 5);
    assert!(!t4.quest_complete);

    let t5 = harness.say(NpcId::Child, "I found Kitty!").await;
    assert_not_advanced(&t5);
    assert_step(&t5, 5);
    assert!(t5.quest_complete);
    assert_eq!(t5.expressions, vec!["joyful".to_string()]);
}

#[tokio::test]
async fn test_done_from_wrong_npc_is_ignored() {
    let harness = TestHarness::new();
    harness.expect_reply("I only sell pierogi here. [DONE]");

    // At step 1 the target is the child, not Mati.
    let outcome = harness.say(NpcId::Mati, "Where is the cat?").await;
    assert_not_advanced(&outcome);
    assert_step(&outcome, 1);
}

#[tokio::test]
async fn test_reply_without_marker_never_advances() {
    let harness = TestHarness::new();
    harness
        .expect_reply("I am so sad about Kitty.")
        .expect_reply("She has white paws.");

    assert_not_advanced(&harness.say(NpcId::Child, "Hello").await);
    assert_not_advanced(&harness.say(NpcId::Child, "What does she look like?").await);
    assert_eq!(harness.step().await, 1);
}

#[tokio::test]
async fn test_greeting_never_advances_the_quest() {
    let harness = TestHarness::new();
    // Even a confused generator emitting the marker in a greeting
    // must not move the quest.
    harness.expect_reply("Cześć! [DONE]");

    let outcome = harness.start(NpcId::Child).await;
    assert_not_advanced(&outcome);
    assert_step(&outcome, 1);
}

#[tokio::test]
async fn test_approach_resets_the_conversation() {
    let harness = TestHarness::new();
    harness
        .expect_reply("Cześć!")
        .expect_reply("She is small and white.")
        .expect_reply("Cześć again!");

    harness.start(NpcId::Child).await;
    harness.say(NpcId::Child, "Tell me about Kitty").await;

    let before = harness.engine.session_info(NpcId::Child).await.unwrap();
    assert_eq!(before.turn_count, 1);

    // Walking away and back starts a fresh session.
    harness.start(NpcId::Child).await;
    let after = harness.engine.session_info(NpcId::Child).await.unwrap();
    assert_eq!(after.turn_count, 0);
    assert_eq!(after.history_len, 1);
}

// =============================================================================
// DIFFICULTY ESCALATION
// =============================================================================

#[tokio::test]
async fn test_difficulty_climbs_every_other_turn() {
    let harness = TestHarness::new();
    for _ in 0..4 {
        harness.expect_reply("Dobrze!");
    }

    let t1 = harness.say(NpcId::Bird, "one").await;
    assert_difficulty(&t1, 1);
    let t2 = harness.say(NpcId::Bird, "two").await;
    assert_difficulty(&t2, 2);
    let t3 = harness.say(NpcId::Bird, "three").await;
    assert_difficulty(&t3, 2);
    let t4 = harness.say(NpcId::Bird, "four").await;
    assert_difficulty(&t4, 3);
}

#[tokio::test]
async fn test_difficulty_is_shared_across_npcs() {
    let harness = TestHarness::new();
    harness.expect_reply("Tak.").expect_reply("Nie.");

    harness.say(NpcId::Child, "one").await;
    let outcome = harness.say(NpcId::Mati, "two").await;
    assert_difficulty(&outcome, 2);
}

// =============================================================================
// FAIL-SOFT BEHAVIOR
// =============================================================================

#[tokio::test]
async fn test_generation_failure_leaves_state_untouched() {
    let engine = DialogueEngine::new(Arc::new(MockGenerator::failing()));

    let outcome = engine.respond(NpcId::Child, "Hello!").await;
    assert!(outcome.degraded);
    assert_eq!(outcome.reply, "That's great! Keep practicing.");
    assert_not_advanced(&outcome);
    assert_eq!(outcome.turn_count, 0);

    // The failed turn is not written into history either.
    assert!(engine.history(NpcId::Child).await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_hanging_generator_hits_the_timeout() {
    let engine = DialogueEngine::new(Arc::new(MockGenerator::hanging())).with_config(
        EngineConfig::new().with_generation_timeout(Duration::from_millis(20)),
    );

    let outcome = engine.respond(NpcId::Jade, "Hello?").await;
    assert!(outcome.degraded);
    assert_eq!(outcome.reply, "That's great! Keep practicing.");
}
