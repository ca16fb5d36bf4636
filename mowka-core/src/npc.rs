//! NPC identities and the persona catalog.
//!
//! Each NPC in the village scene has a static persona: a character
//! description used to build the generation directive, a canned greeting
//! used when generation is unavailable, and the voice used for speech
//! synthesis. The catalog is loaded once at startup and never mutated.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// The NPCs of the lost-cat scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NpcId {
    Child,
    Mati,
    Jade,
    Kitty,
    Bird,
}

impl NpcId {
    pub fn as_str(&self) -> &'static str {
        match self {
            NpcId::Child => "child",
            NpcId::Mati => "mati",
            NpcId::Jade => "jade",
            NpcId::Kitty => "kitty",
            NpcId::Bird => "bird",
        }
    }

    pub fn all() -> [NpcId; 5] {
        [NpcId::Child, NpcId::Mati, NpcId::Jade, NpcId::Kitty, NpcId::Bird]
    }
}

impl fmt::Display for NpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized NPC identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown NPC id: {0}")]
pub struct UnknownNpc(pub String);

impl FromStr for NpcId {
    type Err = UnknownNpc;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "child" => Ok(NpcId::Child),
            "mati" => Ok(NpcId::Mati),
            "jade" => Ok(NpcId::Jade),
            "kitty" => Ok(NpcId::Kitty),
            "bird" => Ok(NpcId::Bird),
            other => Err(UnknownNpc(other.to_string())),
        }
    }
}

/// A static NPC character sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    /// Display name shown to the player.
    pub name: String,
    /// Where this NPC stands in the scene.
    pub location: String,
    /// Character description fed to the reply generator.
    pub description: String,
    /// Canned greeting used when generation is unavailable.
    pub greeting: String,
    /// Voice used for speech synthesis.
    pub voice_id: String,
}

impl Persona {
    fn new(
        name: &str,
        location: &str,
        description: &str,
        greeting: &str,
        voice_id: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            location: location.to_string(),
            description: description.to_string(),
            greeting: greeting.to_string(),
            voice_id: voice_id.to_string(),
        }
    }
}

/// Immutable mapping from NPC id to persona.
#[derive(Debug, Clone)]
pub struct PersonaCatalog {
    personas: HashMap<NpcId, Persona>,
}

impl PersonaCatalog {
    /// Build a catalog from explicit entries. Missing NPCs fall back to
    /// the default catalog's entry so lookups stay total over the enum.
    pub fn new(personas: HashMap<NpcId, Persona>) -> Self {
        let mut merged = DEFAULT_CATALOG.personas.clone();
        merged.extend(personas);
        Self { personas: merged }
    }

    /// The built-in village cast.
    pub fn default_catalog() -> &'static PersonaCatalog {
        &DEFAULT_CATALOG
    }

    /// Look up a persona. Total over `NpcId`.
    pub fn get(&self, npc: NpcId) -> &Persona {
        // Every constructor guarantees full coverage of the enum.
        self.personas
            .get(&npc)
            .unwrap_or_else(|| panic!("persona catalog missing {npc}"))
    }
}

lazy_static::lazy_static! {
    static ref DEFAULT_CATALOG: PersonaCatalog = {
        let mut personas = HashMap::new();
        personas.insert(
            NpcId::Child,
            Persona::new(
                "Child",
                "Square",
                "You are a young child (age 6) in a Polish village. \
                 You are sad because you lost your cat, Kitty. \
                 You speak very simple Polish. \
                 You are currently in the Square.",
                "Cześć! (Hello!) I am so sad... I lost my cat, Kitty. Can you help me find her?",
                "21m00Tcm4TlvDq8ikWAM",
            ),
        );
        personas.insert(
            NpcId::Mati,
            Persona::new(
                "Mati",
                "Market",
                "You are Mati, a friendly shopkeeper in the Market. \
                 You sell fruit and bread. \
                 You saw the cat run towards the Alley. \
                 You speak polite but casual Polish.",
                "Dzień dobry! (Good morning!) Welcome to my shop. I have fresh bread and fruit.",
                "ErXwobaYiN019PkySvjV",
            ),
        );
        personas.insert(
            NpcId::Jade,
            Persona::new(
                "Jade",
                "Alley",
                "You are Jade, a young woman standing in the Alley. \
                 You are helpful and kind. \
                 You saw the cat go into the Garden. \
                 You speak clear, standard Polish.",
                "Cześć. (Hi.) It is very quiet in this alley... perfect for reading.",
                "EXAVITQu4vr4xnSDxMaL",
            ),
        );
        personas.insert(
            NpcId::Kitty,
            Persona::new(
                "Kitty",
                "Garden",
                "You are Kitty, the lost cat. You are actually a Babel Spirit. \
                 You mostly meow, but if the player speaks kindly, you might say \
                 a simple word like 'Tak' or 'Dom'. \
                 You are in the Garden.",
                "Meow...",
                "TX3LPaxmHKxFdv7VOQHJ",
            ),
        );
        personas.insert(
            NpcId::Bird,
            Persona::new(
                "Bird",
                "Square",
                "You are a magical helper bird. \
                 You speak both English and Polish. \
                 Your job is to help the player if they are stuck. \
                 You can translate things if asked.",
                "Tweet tweet! I can help you speak Polish. Just ask!",
                "MF3mGyEYCl7XYWlgT9FX",
            ),
        );
        PersonaCatalog { personas }
    };
}
