//! Per-NPC conversation sessions.
//!
//! Each NPC the player talks to gets an ordered, append-only history plus
//! turn counters and a vocabulary accumulator. The full history is kept
//! for display and audit (up to a retention cap); only a short window of
//! the most recent turns is sent to the reply generator.

use crate::npc::NpcId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// How many turns are sent to the reply generator.
pub const HISTORY_WINDOW: usize = 10;

/// How many turns are retained in a session before the oldest are dropped.
pub const MAX_RETAINED_TURNS: usize = 200;

/// Who spoke a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Player,
    Npc,
}

/// One utterance in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

impl Turn {
    pub fn player(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Player,
            text: text.into(),
        }
    }

    pub fn npc(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Npc,
            text: text.into(),
        }
    }
}

/// Unique identifier for one conversation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The ongoing dialogue with one NPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    pub id: SessionId,
    history: Vec<Turn>,
    turn_count: u32,
    vocabulary: BTreeSet<String>,
    #[serde(skip, default = "Instant::now")]
    last_active: Instant,
}

impl ConversationSession {
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            history: Vec::new(),
            turn_count: 0,
            vocabulary: BTreeSet::new(),
            last_active: Instant::now(),
        }
    }

    /// The full retained history, oldest first.
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// The most recent turns, for the generator context window.
    pub fn window(&self, size: usize) -> &[Turn] {
        let start = self.history.len().saturating_sub(size);
        &self.history[start..]
    }

    /// Completed player/NPC exchanges.
    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    /// Words the player has picked up during this session.
    pub fn vocabulary(&self) -> &BTreeSet<String> {
        &self.vocabulary
    }

    /// Record one completed exchange: the player turn, then the NPC turn.
    pub fn record_exchange(&mut self, player_text: &str, npc_text: &str) {
        self.history.push(Turn::player(player_text));
        self.history.push(Turn::npc(npc_text));
        self.turn_count += 1;
        self.touch();
        self.trim();
    }

    /// Record an NPC greeting that was not prompted by a player turn.
    /// Does not count as a completed exchange.
    pub fn record_greeting(&mut self, npc_text: &str) {
        self.history.push(Turn::npc(npc_text));
        self.touch();
        self.trim();
    }

    /// Merge newly learned words into the session's accumulator.
    pub fn add_vocabulary<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for word in words {
            let word = word.into();
            if !word.trim().is_empty() {
                self.vocabulary.insert(word);
            }
        }
        self.touch();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_active.elapsed()
    }

    fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    fn trim(&mut self) {
        if self.history.len() > MAX_RETAINED_TURNS {
            let excess = self.history.len() - MAX_RETAINED_TURNS;
            self.history.drain(..excess);
        }
    }
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Owner of all live conversation sessions, keyed by NPC.
///
/// The dialogue engine mutates sessions exclusively through this store;
/// nothing else holds a copy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionStore {
    sessions: HashMap<NpcId, ConversationSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) a conversation with an NPC.
    ///
    /// Starting is an idempotent reset: any prior history for this NPC is
    /// discarded and a fresh session id is issued.
    pub fn start(&mut self, npc: NpcId) -> &mut ConversationSession {
        self.sessions.insert(npc, ConversationSession::new());
        self.sessions
            .get_mut(&npc)
            .expect("session inserted above")
    }

    pub fn get(&self, npc: NpcId) -> Option<&ConversationSession> {
        self.sessions.get(&npc)
    }

    /// Fetch the session for an NPC, creating it on first contact.
    pub fn get_or_create(&mut self, npc: NpcId) -> &mut ConversationSession {
        self.sessions.entry(npc).or_default()
    }

    /// Explicitly end a conversation, dropping its history.
    pub fn remove(&mut self, npc: NpcId) -> Option<ConversationSession> {
        self.sessions.remove(&npc)
    }

    /// Drop sessions idle longer than `ttl`. Returns how many were evicted.
    pub fn evict_idle(&mut self, ttl: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.idle_for() < ttl);
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
