/*!
 * Voice profiles and voice resolution.
 *
 * A small built-in table maps narrative roles to acoustic profiles, and a
 * second table maps character labels to roles. Profiles registered at runtime
 * live for the lifetime of the registry.
 */

use std::collections::HashMap;

use anyhow::{Result, anyhow};
use log::debug;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Narrative role a voice is selected for
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum VoiceType {
    #[default]
    Narrator,
    Character,
    Child,
    Adult,
}

impl VoiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Narrator => "narrator",
            Self::Character => "character",
            Self::Child => "child",
            Self::Adult => "adult",
        }
    }
}

impl std::fmt::Display for VoiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for VoiceType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "narrator" => Ok(Self::Narrator),
            "character" => Ok(Self::Character),
            "child" => Ok(Self::Child),
            "adult" => Ok(Self::Adult),
            _ => Err(anyhow!("Invalid voice type: {}", s)),
        }
    }
}

/// Acoustic parameters for one named voice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub name: String,

    /// ISO 639-1 language code
    #[serde(default = "default_lang")]
    pub lang: String,

    /// Regional variant (top-level domain style, e.g. "com", "co.uk")
    #[serde(default = "default_tld")]
    pub tld: String,

    /// Descriptive flag for slower-spoken voices; it does not change the
    /// synthesized pace
    #[serde(default)]
    pub slow: bool,

    #[serde(default)]
    pub pitch: Option<f32>,

    /// Speed multiplier applied on top of the requested rate
    #[serde(default)]
    pub speed: Option<f32>,
}

fn default_lang() -> String {
    "en".to_string()
}

fn default_tld() -> String {
    "com".to_string()
}

impl VoiceProfile {
    fn builtin(name: &str, slow: bool) -> Self {
        Self {
            name: name.to_string(),
            lang: default_lang(),
            tld: default_tld(),
            slow,
            pitch: None,
            speed: None,
        }
    }
}

/// Optional characteristics supplied when registering a profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceCharacteristics {
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub tld: Option<String>,
    #[serde(default)]
    pub slow: Option<bool>,
    #[serde(default)]
    pub pitch: Option<f32>,
    #[serde(default)]
    pub speed: Option<f32>,
}

/// Listing entry for an available voice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceDescriptor {
    pub name: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub voice_type: String,
    pub description: String,
}

static BUILTIN_PROFILES: Lazy<Vec<VoiceProfile>> = Lazy::new(|| {
    vec![
        VoiceProfile::builtin("narrator", false),
        VoiceProfile::builtin("child", true),
        VoiceProfile::builtin("adult", false),
        VoiceProfile::builtin("character", false),
    ]
});

/// Character label -> narrative role
static CHARACTER_ROLES: Lazy<HashMap<&'static str, VoiceType>> = Lazy::new(|| {
    HashMap::from([
        ("narrator", VoiceType::Narrator),
        ("protagonist", VoiceType::Child),
        ("antagonist", VoiceType::Adult),
        ("parent", VoiceType::Adult),
        ("teacher", VoiceType::Adult),
        ("friend", VoiceType::Child),
    ])
});

static BUILTIN_DESCRIPTORS: Lazy<Vec<VoiceDescriptor>> = Lazy::new(|| {
    [
        ("narrator", "Narrator", "Clear, neutral voice for narration"),
        ("child", "Child Voice", "Friendly, slower voice for young characters"),
        ("adult", "Adult Voice", "Mature, authoritative voice for adult characters"),
        ("character", "Character Voice", "Dynamic voice that adapts to character personality"),
    ]
    .into_iter()
    .map(|(name, display_name, description)| VoiceDescriptor {
        name: name.to_string(),
        display_name: display_name.to_string(),
        voice_type: name.to_string(),
        description: description.to_string(),
    })
    .collect()
});

/// Role a character label narrates with; unmapped labels narrate
pub fn role_for_character(character: &str) -> VoiceType {
    CHARACTER_ROLES
        .get(character.trim().to_lowercase().as_str())
        .copied()
        .unwrap_or(VoiceType::Narrator)
}

/// Registry of voice profiles keyed by lowercase name
#[derive(Debug)]
pub struct VoiceRegistry {
    profiles: RwLock<HashMap<String, VoiceProfile>>,
    custom: RwLock<Vec<String>>,
}

impl Default for VoiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceRegistry {
    /// Create a registry holding the built-in profiles
    pub fn new() -> Self {
        let profiles = BUILTIN_PROFILES
            .iter()
            .map(|p| (p.name.clone(), p.clone()))
            .collect();
        Self {
            profiles: RwLock::new(profiles),
            custom: RwLock::new(Vec::new()),
        }
    }

    /// Look up a profile by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<VoiceProfile> {
        self.profiles.read().get(&name.trim().to_lowercase()).cloned()
    }

    fn narrator(&self) -> VoiceProfile {
        self.get(VoiceType::Narrator.as_str())
            .unwrap_or_else(|| VoiceProfile::builtin("narrator", false))
    }

    fn for_role(&self, role: VoiceType) -> VoiceProfile {
        self.get(role.as_str()).unwrap_or_else(|| self.narrator())
    }

    /// Resolve the profile for a synthesis request.
    ///
    /// Precedence: an explicit registered voice name, then the character's
    /// role, then the voice type.
    pub fn resolve(
        &self,
        character: Option<&str>,
        voice_type: VoiceType,
        voice_name: Option<&str>,
    ) -> VoiceProfile {
        if let Some(profile) = voice_name.and_then(|name| self.get(name)) {
            return profile;
        }

        if let Some(character) = character {
            return self.for_role(role_for_character(character));
        }

        self.for_role(voice_type)
    }

    /// Register (or replace) a named profile
    pub fn register(&self, name: &str, characteristics: VoiceCharacteristics) -> VoiceProfile {
        let name = name.trim().to_lowercase();
        let profile = VoiceProfile {
            name: name.clone(),
            lang: characteristics.lang.unwrap_or_else(default_lang),
            tld: characteristics.tld.unwrap_or_else(default_tld),
            slow: characteristics.slow.unwrap_or(false),
            pitch: Some(characteristics.pitch.unwrap_or(1.0)),
            speed: Some(characteristics.speed.unwrap_or(1.0)),
        };

        debug!("Registering voice profile '{}'", name);
        let replaced = self.profiles.write().insert(name.clone(), profile.clone());
        let is_builtin = BUILTIN_PROFILES.iter().any(|p| p.name == name);
        if replaced.is_none() && !is_builtin {
            self.custom.write().push(name);
        }
        profile
    }

    /// Built-in voices followed by runtime-registered ones
    pub fn available_voices(&self) -> Vec<VoiceDescriptor> {
        let mut voices = BUILTIN_DESCRIPTORS.clone();
        voices.extend(self.custom.read().iter().map(|name| VoiceDescriptor {
            name: name.clone(),
            display_name: name.clone(),
            voice_type: VoiceType::Character.to_string(),
            description: "Custom voice profile".to_string(),
        }));
        voices
    }
}
