//! High-level game service.
//!
//! `GameService` wraps the dialogue engine with the outward-facing
//! concerns a frontend needs: string NPC identifiers, optional voice
//! synthesis and transcription, quest views, and save/load of game
//! state to disk. The engine stays pure game logic; everything that
//! talks to the outside world lives here.

use crate::dialogue::{DialogueEngine, SessionInfo, TurnOutcome};
use crate::npc::{NpcId, UnknownNpc};
use crate::quest::QuestError;
use crate::session::SessionId;
use crate::speech::{SpeechSynthesizer, SpeechTranscriber, TranscriptionError};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Errors surfaced to the service's callers.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    UnknownNpc(#[from] UnknownNpc),

    #[error("no active session for {0}")]
    SessionNotFound(NpcId),

    #[error(transparent)]
    Quest(#[from] QuestError),

    #[error("transcription failed: {0}")]
    Transcription(#[from] TranscriptionError),

    #[error("no speech transcriber is configured")]
    TranscriberUnavailable,

    #[error("save file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("save file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// What the frontend gets back when the player approaches an NPC.
#[derive(Debug, Serialize)]
pub struct StartReply {
    pub greeting: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<Vec<u8>>,
    pub session_id: SessionId,
    pub quest_step: u8,
}

/// What the frontend gets back for one conversation turn.
#[derive(Debug, Serialize)]
pub struct ConversationReply {
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<Vec<u8>>,
    pub quest_step: u8,
    pub difficulty: u8,
    pub advanced_quest: bool,
    pub quest_complete: bool,
    pub turn_count: u32,
}

/// Player-facing quest status.
#[derive(Debug, Clone, Serialize)]
pub struct QuestStateView {
    pub current_step: u8,
    pub objective: String,
    pub location: String,
    pub completed: bool,
}

/// The outward-facing game facade.
pub struct GameService {
    engine: DialogueEngine,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    transcriber: Option<Arc<dyn SpeechTranscriber>>,
}

impl GameService {
    pub fn new(engine: DialogueEngine) -> Self {
        Self {
            engine,
            synthesizer: None,
            transcriber: None,
        }
    }

    /// Attach a voice synthesizer. Replies will carry audio when it succeeds.
    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Attach a voice transcriber, enabling [`GameService::respond_voice`].
    pub fn with_transcriber(mut self, transcriber: Arc<dyn SpeechTranscriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    /// Direct access to the underlying engine.
    pub fn engine(&self) -> &DialogueEngine {
        &self.engine
    }

    /// The player walks up to an NPC. Resets that NPC's conversation and
    /// returns an in-character greeting.
    pub async fn start_interaction(&self, npc_id: &str) -> Result<StartReply, ServiceError> {
        let npc: NpcId = npc_id.parse()?;
        let outcome = self.engine.start_interaction(npc).await;
        let audio = self.synthesize(npc, &outcome).await;
        let session_id = self
            .engine
            .session_id(npc)
            .await
            .ok_or(ServiceError::SessionNotFound(npc))?;

        Ok(StartReply {
            greeting: outcome.reply,
            audio,
            session_id,
            quest_step: outcome.quest_step.get(),
        })
    }

    /// One typed conversation turn with an NPC.
    pub async fn respond_text(
        &self,
        npc_id: &str,
        text: &str,
    ) -> Result<ConversationReply, ServiceError> {
        let npc: NpcId = npc_id.parse()?;
        let outcome = self.engine.respond(npc, text).await;
        let audio = self.synthesize(npc, &outcome).await;

        Ok(ConversationReply {
            reply: outcome.reply,
            audio,
            quest_step: outcome.quest_step.get(),
            difficulty: outcome.difficulty.level(),
            advanced_quest: outcome.advanced_quest,
            quest_complete: outcome.quest_complete,
            turn_count: outcome.turn_count,
        })
    }

    /// One spoken conversation turn: transcribe the player's audio, then
    /// run a normal text turn. Inaudible audio is surfaced as an error
    /// rather than fed to the NPC.
    pub async fn respond_voice(
        &self,
        npc_id: &str,
        audio: &[u8],
    ) -> Result<ConversationReply, ServiceError> {
        let transcriber = self
            .transcriber
            .as_ref()
            .ok_or(ServiceError::TranscriberUnavailable)?;
        let text = transcriber.transcribe(audio).await?;
        self.respond_text(npc_id, &text).await
    }

    /// Current quest status for the frontend's objective banner.
    pub async fn quest_state(&self) -> QuestStateView {
        let (step, objective, completed) = self.engine.quest_state().await;
        QuestStateView {
            current_step: step.get(),
            objective: objective.text,
            location: objective.location,
            completed,
        }
    }

    /// Administrative quest override. Rejects out-of-range steps.
    pub async fn set_quest_state(&self, step: u8) -> Result<QuestStateView, ServiceError> {
        self.engine.set_quest_step(step).await?;
        Ok(self.quest_state().await)
    }

    /// Counters for an NPC's live session.
    pub async fn session(&self, npc_id: &str) -> Result<SessionInfo, ServiceError> {
        let npc: NpcId = npc_id.parse()?;
        self.engine
            .session_info(npc)
            .await
            .ok_or(ServiceError::SessionNotFound(npc))
    }

    /// Merge words the player just learned into an NPC's session, so the
    /// frontend's vocabulary tracker survives page reloads with the save.
    pub async fn record_vocabulary<I, S>(&self, npc_id: &str, words: I) -> Result<(), ServiceError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let npc: NpcId = npc_id.parse()?;
        self.engine.record_vocabulary(npc, words).await;
        Ok(())
    }

    /// End a conversation, dropping its history.
    pub async fn end_interaction(&self, npc_id: &str) -> Result<bool, ServiceError> {
        let npc: NpcId = npc_id.parse()?;
        Ok(self.engine.end_interaction(npc).await)
    }

    /// Save the full game state as JSON.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), ServiceError> {
        let snapshot = self.engine.snapshot().await;
        let json = serde_json::to_string_pretty(&snapshot)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Load game state previously written by [`GameService::save`].
    pub async fn load(&self, path: impl AsRef<Path>) -> Result<(), ServiceError> {
        let json = tokio::fs::read_to_string(path).await?;
        let snapshot = serde_json::from_str(&json)?;
        self.engine.restore(snapshot).await?;
        Ok(())
    }

    /// Synthesize a reply if a synthesizer is attached. Synthesis failures
    /// degrade to text-only replies rather than failing the turn.
    async fn synthesize(&self, npc: NpcId, outcome: &TurnOutcome) -> Option<Vec<u8>> {
        let synthesizer = self.synthesizer.as_ref()?;
        let voice_id = &self.engine.catalog().get(npc).voice_id;
        let expression = outcome.expressions.first().map(String::as_str);
        match synthesizer
            .synthesize(&outcome.reply, voice_id, expression)
            .await
        {
            Ok(audio) => Some(audio),
            Err(err) => {
                tracing::warn!(npc = %npc, error = %err, "voice synthesis failed, sending text only");
                None
            }
        }
    }
}
