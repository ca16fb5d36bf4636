//! Mówka console: a line-oriented interface to the lost-cat quest.
//!
//! This provides a simple protocol for playing from a terminal or driving
//! the game from another process:
//! - Plain lines are spoken to the NPC you are currently talking to
//! - Lines starting with `#` are commands (talk, quest, save, load, quit)

use mowka_core::generate::ClaudeGenerator;
use mowka_core::{DialogueEngine, GameService, NpcId, ServiceError};
use std::io::{self, BufRead};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(io::stderr)
        .init();

    // Check for API key
    if std::env::var("ANTHROPIC_API_KEY").is_err() {
        eprintln!("Error: ANTHROPIC_API_KEY environment variable not set.");
        eprintln!("Please set it in .env file or with: export ANTHROPIC_API_KEY=your_key_here");
        std::process::exit(1);
    }

    let generator = Arc::new(ClaudeGenerator::from_env()?);
    let service = GameService::new(DialogueEngine::new(generator));

    println!("=== Mówka: The Lost Cat ===");
    let quest = service.quest_state().await;
    println!("Objective: {}", quest.objective);
    println!("Location: {}", quest.location);
    println!();
    print_help();
    println!();

    let mut current_npc: Option<NpcId> = None;
    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        // Handle commands
        if let Some(rest) = line.strip_prefix('#') {
            let parts: Vec<&str> = rest.split_whitespace().collect();
            match parts.first().copied() {
                Some("quit") | Some("exit") => {
                    println!("Do widzenia!");
                    break;
                }
                Some("talk") => {
                    if let Some(name) = parts.get(1) {
                        match service.start_interaction(name).await {
                            Ok(start) => {
                                current_npc = name.parse().ok();
                                println!("[{}] {}", name.to_lowercase(), start.greeting);
                            }
                            Err(e) => println!("[ERROR] {e}"),
                        }
                    } else {
                        println!("[ERROR] Usage: #talk <child|mati|jade|kitty|bird>");
                    }
                }
                Some("leave") => {
                    if let Some(npc) = current_npc.take() {
                        let _ = service.end_interaction(npc.as_str()).await;
                        println!("You walk away from {npc}.");
                    } else {
                        println!("You are not talking to anyone.");
                    }
                }
                Some("quest") => {
                    let quest = service.quest_state().await;
                    println!("[QUEST]");
                    println!("  Step: {}/5", quest.current_step);
                    println!("  Objective: {}", quest.objective);
                    println!("  Location: {}", quest.location);
                    if quest.completed {
                        println!("  The story is complete!");
                    }
                }
                Some("step") => {
                    match parts.get(1).and_then(|s| s.parse::<u8>().ok()) {
                        Some(step) => match service.set_quest_state(step).await {
                            Ok(view) => println!("[QUEST] Now at step {}/5", view.current_step),
                            Err(e) => println!("[ERROR] {e}"),
                        },
                        None => println!("[ERROR] Usage: #step <1-5>"),
                    }
                }
                Some("session") => {
                    let name = parts
                        .get(1)
                        .map(|s| s.to_string())
                        .or_else(|| current_npc.map(|n| n.as_str().to_string()));
                    match name {
                        Some(name) => match service.session(&name).await {
                            Ok(info) => {
                                println!("[SESSION] {name}");
                                println!("  Turns: {}", info.turn_count);
                                println!("  History: {} entries", info.history_len);
                                if !info.vocabulary_learned.is_empty() {
                                    println!(
                                        "  Vocabulary: {}",
                                        info.vocabulary_learned.join(", ")
                                    );
                                }
                            }
                            Err(e) => println!("[ERROR] {e}"),
                        },
                        None => println!("[ERROR] Usage: #session <npc>"),
                    }
                }
                Some("save") => {
                    if let Some(path) = parts.get(1) {
                        match service.save(path).await {
                            Ok(()) => {
                                tracing::info!(path, "game saved");
                                println!("[SAVED] Game saved to {path}");
                            }
                            Err(e) => {
                                tracing::warn!(path, error = %e, "save failed");
                                println!("[ERROR] Save failed: {e}");
                            }
                        }
                    } else {
                        println!("[ERROR] Usage: #save <path>");
                    }
                }
                Some("load") => {
                    if let Some(path) = parts.get(1) {
                        match service.load(path).await {
                            Ok(()) => {
                                let quest = service.quest_state().await;
                                tracing::info!(path, step = quest.current_step, "game loaded");
                                println!("[LOADED] Game loaded from {path}");
                                println!("[QUEST] Step {}/5: {}", quest.current_step, quest.objective);
                            }
                            Err(e) => {
                                tracing::warn!(path, error = %e, "load failed");
                                println!("[ERROR] Load failed: {e}");
                            }
                        }
                    } else {
                        println!("[ERROR] Usage: #load <path>");
                    }
                }
                Some("help") => print_help(),
                Some(other) => println!("[ERROR] Unknown command: #{other} (try #help)"),
                None => println!("[ERROR] Empty command (try #help)"),
            }
            continue;
        }

        // Plain input goes to the current NPC
        let Some(npc) = current_npc else {
            println!("You are not talking to anyone. Try: #talk child");
            continue;
        };

        match service.respond_text(npc.as_str(), line).await {
            Ok(reply) => {
                println!("[{npc}] {}", reply.reply);
                if reply.advanced_quest {
                    let quest = service.quest_state().await;
                    println!("[QUEST] Step {}/5: {}", quest.current_step, quest.objective);
                }
                if reply.quest_complete {
                    println!("[QUEST] You reunited the child with Kitty. Gratulacje!");
                }
            }
            Err(ServiceError::UnknownNpc(e)) => println!("[ERROR] {e}"),
            Err(e) => println!("[ERROR] {e}"),
        }
    }

    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  #talk <npc>    - Approach an NPC (child, mati, jade, kitty, bird)");
    println!("  #leave         - End the current conversation");
    println!("  #quest         - Show the current objective");
    println!("  #step <1-5>    - Jump to a quest step");
    println!("  #session <npc> - Show session counters for an NPC");
    println!("  #save <path>   - Save the game");
    println!("  #load <path>   - Load a saved game");
    println!("  #help          - Show this help");
    println!("  #quit          - Exit");
    println!();
    println!("Anything else you type is said to the NPC you are talking to.");
}
