//! Quick end-to-end demo of the lost-cat quest (calls the Claude API).
//!
//! Run with: `ANTHROPIC_API_KEY=... cargo run -p mowka-core --example demo_conversation`

use mowka_core::generate::ClaudeGenerator;
use mowka_core::{DialogueEngine, GameService, NpcId};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    println!("=== Mówka Demo Conversation ===\n");

    // Test 1: Create the game service
    println!("1. Creating game service...");
    let generator = Arc::new(ClaudeGenerator::from_env()?);
    let service = GameService::new(DialogueEngine::new(generator));
    println!("   Service created successfully");

    // Test 2: Check quest state
    println!("\n2. Checking quest state...");
    let quest = service.quest_state().await;
    println!("   Step: {}", quest.current_step);
    println!("   Objective: {}", quest.objective);
    println!("   Location: {}", quest.location);

    // Test 3: Approach the crying child
    println!("\n3. Approaching the child (this calls the Claude API)...");
    let start = service.start_interaction("child").await?;
    println!("   Session: {}", start.session_id);
    println!("   Greeting: {}", start.greeting);

    // Test 4: A few conversation turns
    let lines = [
        "Hello! Why are you crying?",
        "What does your cat look like?",
        "Don't worry, I will find Kitty for you!",
    ];
    for (i, line) in lines.iter().enumerate() {
        println!("\n{}. Player: {line}", i + 4);
        let reply = service.respond_text("child", line).await?;
        println!("   NPC: {}", reply.reply);
        println!(
            "   [step {} | difficulty {} | turn {}{}]",
            reply.quest_step,
            reply.difficulty,
            reply.turn_count,
            if reply.advanced_quest { " | quest advanced!" } else { "" }
        );
    }

    // Test 5: Final quest state
    println!("\n7. Final quest state...");
    let quest = service.quest_state().await;
    println!("   Step: {}", quest.current_step);
    println!("   Objective: {}", quest.objective);

    println!("\n=== Demo complete ===");
    Ok(())
}
