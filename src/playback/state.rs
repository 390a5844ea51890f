/*!
 * Playback state, voice settings and timing tunables.
 */

use log::warn;
use serde::{Deserialize, Deserializer, Serialize};

use crate::layout::Line;
use crate::speech::{SynthesisRequest, VoiceType};

/// Observable state of a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// No session has been started
    Idle,
    Playing,
    Paused,
    /// Terminal until the next start
    Stopped,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Stopped => "stopped",
        };
        write!(f, "{}", name)
    }
}

/// Unknown voice types fall back to the narrator instead of rejecting the
/// whole settings object.
fn lenient_voice_type<'de, D>(deserializer: D) -> Result<Option<VoiceType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.map(|value| {
        value.parse::<VoiceType>().unwrap_or_else(|_| {
            warn!("Unknown voice type '{}', using narrator", value);
            VoiceType::Narrator
        })
    }))
}

/// Voice settings of a session. Every field is optional so partial updates
/// can be merged in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    #[serde(default, deserialize_with = "lenient_voice_type", skip_serializing_if = "Option::is_none")]
    pub voice_type: Option<VoiceType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_name: Option<String>,
}

impl VoiceSettings {
    pub fn with_voice_type(mut self, voice_type: VoiceType) -> Self {
        self.voice_type = Some(voice_type);
        self
    }

    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn with_voice_name(mut self, voice_name: impl Into<String>) -> Self {
        self.voice_name = Some(voice_name.into());
        self
    }

    /// Overwrite the fields present in `update`
    pub fn merge(&mut self, update: &VoiceSettings) {
        if update.voice_type.is_some() {
            self.voice_type = update.voice_type;
        }
        if update.rate.is_some() {
            self.rate = update.rate;
        }
        if update.voice_name.is_some() {
            self.voice_name = update.voice_name.clone();
        }
    }

    /// Build the synthesis request for a line under these settings
    pub fn request_for(&self, line: &Line) -> SynthesisRequest {
        let mut request = SynthesisRequest::new(line.text.clone())
            .voice_type(self.voice_type.unwrap_or_default())
            .rate(self.rate.unwrap_or(1.0));
        request.character = line.character.clone();
        request.voice_name = self.voice_name.clone();
        request
    }
}

/// Snapshot returned by `get_status`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub state: PlaybackState,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_line: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_settings: Option<VoiceSettings>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_advance: Option<bool>,

    pub total_lines: usize,
}

impl SessionStatus {
    /// Status reported when no session exists
    pub fn absent() -> Self {
        Self {
            state: PlaybackState::Stopped,
            current_line: None,
            voice_settings: None,
            auto_advance: None,
            total_lines: 0,
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_inter_line_pause_ms() -> u64 {
    500
}

fn default_error_cooldown_ms() -> u64 {
    1000
}

fn default_line_duration_ms() -> u64 {
    2000
}

/// Timing tunables of the reading loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Upper bound between state checks during a line wait
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Pause between consecutive lines when auto-advancing
    #[serde(default = "default_inter_line_pause_ms")]
    pub inter_line_pause_ms: u64,

    /// Delay after a failed line before moving on
    #[serde(default = "default_error_cooldown_ms")]
    pub error_cooldown_ms: u64,

    /// Wait used for lines without word timings
    #[serde(default = "default_line_duration_ms")]
    pub default_line_duration_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            inter_line_pause_ms: default_inter_line_pause_ms(),
            error_cooldown_ms: default_error_cooldown_ms(),
            default_line_duration_ms: default_line_duration_ms(),
        }
    }
}
