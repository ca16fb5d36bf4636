//! The reply-generation seam.
//!
//! Everything non-deterministic lives behind `ReplyGenerator`: the
//! dialogue engine only sees a directive, a history window, and untrusted
//! free text back. `ClaudeGenerator` is the production implementation;
//! tests inject a scripted mock instead.

use crate::session::{Speaker, Turn};
use async_trait::async_trait;
use thiserror::Error;

/// Errors from the external reply generator.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation backend error: {0}")]
    Backend(String),

    #[error("generation timed out")]
    Timeout,

    #[error("generator returned an empty reply")]
    EmptyReply,
}

impl From<claude::Error> for GenerationError {
    fn from(err: claude::Error) -> Self {
        GenerationError::Backend(err.to_string())
    }
}

/// Produces an in-character NPC reply from a directive and recent history.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(
        &self,
        directive: &str,
        history: &[Turn],
        user_input: &str,
    ) -> Result<String, GenerationError>;
}

/// Production generator backed by the Claude Messages API.
#[derive(Clone)]
pub struct ClaudeGenerator {
    client: claude::Claude,
    max_tokens: usize,
    temperature: Option<f32>,
}

impl ClaudeGenerator {
    /// Replies are short (1-2 sentences), so the token budget is small.
    const DEFAULT_MAX_TOKENS: usize = 300;

    pub fn new(client: claude::Claude) -> Self {
        Self {
            client,
            max_tokens: Self::DEFAULT_MAX_TOKENS,
            temperature: Some(0.8),
        }
    }

    /// Create a generator from the ANTHROPIC_API_KEY environment variable.
    pub fn from_env() -> Result<Self, GenerationError> {
        Ok(Self::new(claude::Claude::from_env()?))
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn build_messages(history: &[Turn], user_input: &str) -> Vec<claude::Message> {
        let mut messages: Vec<claude::Message> = history
            .iter()
            .map(|turn| match turn.speaker {
                Speaker::Player => claude::Message::user(&turn.text),
                Speaker::Npc => claude::Message::assistant(&turn.text),
            })
            .collect();
        messages.push(claude::Message::user(user_input));
        messages
    }
}

#[async_trait]
impl ReplyGenerator for ClaudeGenerator {
    async fn generate(
        &self,
        directive: &str,
        history: &[Turn],
        user_input: &str,
    ) -> Result<String, GenerationError> {
        let mut request = claude::Request::new(Self::build_messages(history, user_input))
            .with_system(directive)
            .with_max_tokens(self.max_tokens);

        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }

        let response = self.client.complete(request).await?;
        if response.text.trim().is_empty() {
            return Err(GenerationError::EmptyReply);
        }
        Ok(response.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_messages_alternates_roles() {
        let history = vec![
            Turn::player("Cześć"),
            Turn::npc("Cześć! Jak się masz?"),
        ];
        let messages = ClaudeGenerator::build_messages(&history, "Dobrze!");

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, claude::Role::User);
        assert_eq!(messages[1].role, claude::Role::Assistant);
        assert_eq!(messages[2].role, claude::Role::User);
        assert_eq!(messages[2].content, "Dobrze!");
    }
}
