//! Common types shared across QuestCards crates
//!
//! - `Character`: the four playable character cards
//! - `AppConfig`: narration + scanning settings, loaded from `questcards.toml`
//!   with environment overrides for the narration credentials

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Playable characters, one physical card each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Character {
    Goblin,
    Troll,
    Cyclops,
    Witch,
}

impl Character {
    /// Get the display name for this character
    pub fn display_name(&self) -> &'static str {
        match self {
            Character::Goblin => "Goblin",
            Character::Troll => "Troll",
            Character::Cyclops => "Cyclops",
            Character::Witch => "Witch",
        }
    }

    /// Card number printed in the `Character-NNN` code
    pub fn card_number(&self) -> u32 {
        match self {
            Character::Goblin => 1,
            Character::Troll => 2,
            Character::Cyclops => 3,
            Character::Witch => 4,
        }
    }

    /// Look up a character by its card number (1-4)
    pub fn from_card_number(n: u32) -> Option<Character> {
        match n {
            1 => Some(Character::Goblin),
            2 => Some(Character::Troll),
            3 => Some(Character::Cyclops),
            4 => Some(Character::Witch),
            _ => None,
        }
    }

    /// Get all characters in card order
    pub fn all() -> [Character; 4] {
        [
            Character::Goblin,
            Character::Troll,
            Character::Cyclops,
            Character::Witch,
        ]
    }
}

/// Errors raised while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid TOML in {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Which remote narration backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Talk to the ElevenLabs text-to-speech API directly
    ElevenLabs,
    /// POST `{text}` to a `/tts` proxy that returns audio/mpeg
    Proxy,
    /// Never call a remote provider; local voice only
    None,
}

/// Narration (text-to-speech) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationConfig {
    pub provider: ProviderKind,
    pub voice_id: Option<String>,
    pub api_key: Option<String>,
    pub model_id: String,
    pub api_base: String,
    pub proxy_url: Option<String>,
    /// Remote request timeout; on expiry the local voice takes over
    pub timeout_ms: u64,
    /// Fade-out length used when narration is cancelled by a reset
    pub fade_ms: u64,
    /// Program run for local speech, text appended as the last argument
    pub local_voice_command: Option<String>,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::ElevenLabs,
            voice_id: None,
            api_key: None,
            model_id: "eleven_multilingual_v2".to_string(),
            api_base: "https://api.elevenlabs.io/v1".to_string(),
            proxy_url: None,
            timeout_ms: 8000,
            fade_ms: 400,
            local_voice_command: None,
        }
    }
}

impl NarrationConfig {
    /// ElevenLabs credentials, if both are present and non-empty
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let voice = self.voice_id.as_deref().filter(|s| !s.trim().is_empty())?;
        let key = self.api_key.as_deref().filter(|s| !s.trim().is_empty())?;
        Some((voice, key))
    }
}

/// Camera / card scanning settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Decode loop period (one display frame)
    pub tick_ms: u64,
    /// How long a just-rejected character card is ignored after the
    /// capture restarts
    pub rejected_hold_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            tick_ms: 16,
            rejected_hold_ms: 1500,
        }
    }
}

/// Application-wide configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub narration: NarrationConfig,
    pub scan: ScanConfig,
}

impl AppConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Apply `VOICE_ID`, `ELEVENLABS_API_KEY` and `QUESTCARDS_TTS_URL`.
    /// Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(voice) = get("VOICE_ID") {
            self.narration.voice_id = Some(voice);
        }
        if let Some(key) = get("ELEVENLABS_API_KEY") {
            self.narration.api_key = Some(key);
        }
        if let Some(url) = get("QUESTCARDS_TTS_URL") {
            self.narration.proxy_url = Some(url);
            self.narration.provider = ProviderKind::Proxy;
        }
    }
}
