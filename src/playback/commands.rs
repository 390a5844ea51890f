/*!
 * Session commands.
 *
 * Commands arrive as JSON objects of the form
 * `{"command": "skip_to", "params": {"line_index": 3}}` or as one-letter
 * shorthands typed on a terminal, and are dispatched to a session.
 */

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::Value;

use crate::playback::session::PlaybackSession;
use crate::playback::state::VoiceSettings;

/// A command for a running session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Pause,
    Resume,
    Stop,
    SkipTo { line_index: usize },
    UpdateVoice { voice_settings: VoiceSettings },
    SetAutoAdvance { auto_advance: bool },
}

#[derive(Debug, Deserialize)]
struct RawCommand {
    command: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Default, Deserialize)]
struct SkipParams {
    #[serde(default)]
    line_index: usize,
}

#[derive(Debug, Default, Deserialize)]
struct VoiceParams {
    #[serde(default)]
    voice_settings: VoiceSettings,
}

fn default_auto_advance() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct AutoAdvanceParams {
    #[serde(default = "default_auto_advance")]
    auto_advance: bool,
}

impl Default for AutoAdvanceParams {
    fn default() -> Self {
        Self {
            auto_advance: default_auto_advance(),
        }
    }
}

/// Missing or null params mean "all defaults"
fn params<T>(value: Value) -> Result<T>
where
    T: Default + for<'de> Deserialize<'de>,
{
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value).context("Invalid command parameters")
}

impl SessionCommand {
    /// Parse a JSON command message
    pub fn from_json(message: &str) -> Result<Self> {
        let raw: RawCommand = serde_json::from_str(message).context("Malformed command message")?;

        match raw.command.as_str() {
            "pause" => Ok(Self::Pause),
            "resume" => Ok(Self::Resume),
            "stop" => Ok(Self::Stop),
            "skip_to" => {
                let p: SkipParams = params(raw.params)?;
                Ok(Self::SkipTo { line_index: p.line_index })
            }
            "update_voice" => {
                let p: VoiceParams = params(raw.params)?;
                Ok(Self::UpdateVoice {
                    voice_settings: p.voice_settings,
                })
            }
            "set_auto_advance" => {
                let p: AutoAdvanceParams = params(raw.params)?;
                Ok(Self::SetAutoAdvance {
                    auto_advance: p.auto_advance,
                })
            }
            other => Err(anyhow!("Unknown command: {}", other)),
        }
    }

    /// Parse a terminal shorthand: `p`, `r`, `s`, `a`/`m` for auto/manual
    /// advance, or a line number to skip to
    pub fn from_shorthand(input: &str) -> Option<Self> {
        let input = input.trim();
        match input {
            "p" => Some(Self::Pause),
            "r" => Some(Self::Resume),
            "s" => Some(Self::Stop),
            "a" => Some(Self::SetAutoAdvance { auto_advance: true }),
            "m" => Some(Self::SetAutoAdvance { auto_advance: false }),
            _ => input.parse().ok().map(|line_index| Self::SkipTo { line_index }),
        }
    }

    /// Apply the command to a session
    pub async fn apply(self, session: &PlaybackSession) {
        match self {
            Self::Pause => session.pause().await,
            Self::Resume => session.resume().await,
            Self::Stop => session.stop().await,
            Self::SkipTo { line_index } => session.skip_to_line(line_index).await,
            Self::UpdateVoice { voice_settings } => session.set_voice_settings(voice_settings).await,
            Self::SetAutoAdvance { auto_advance } => session.set_auto_advance(auto_advance).await,
        }
    }
}
