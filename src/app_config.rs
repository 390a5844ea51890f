use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::playback::PlaybackConfig;
use crate::speech::VoiceCharacteristics;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Speech synthesis config
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Playback timing config
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// Extra voice profiles registered at startup, by name
    #[serde(default)]
    pub voices: BTreeMap<String, VoiceCharacteristics>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Speech backend type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpeechBackendKind {
    // @backend: offline paced silence
    #[default]
    Mock,
    // @backend: speech service over HTTP
    Http,
}

impl SpeechBackendKind {
    // @returns: Capitalized backend name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Mock => "Mock",
            Self::Http => "HTTP",
        }
    }
}

impl std::fmt::Display for SpeechBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mock => write!(f, "mock"),
            Self::Http => write!(f, "http"),
        }
    }
}

impl std::str::FromStr for SpeechBackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "http" => Ok(Self::Http),
            _ => Err(anyhow!("Invalid speech backend: {}", s)),
        }
    }
}

/// Speech synthesis configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpeechConfig {
    // @field: Backend selection
    #[serde(default)]
    pub backend: SpeechBackendKind,

    // @field: Synthesis endpoint for the http backend
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    // @field: Request timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Directory audio artifacts are written to
    #[serde(default = "default_audio_dir")]
    pub audio_dir: PathBuf,

    // @field: Public prefix of returned audio references
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,

    // @field: Memoize synthesis results
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    // @field: Silence between combined segments
    #[serde(default = "default_segment_gap_ms")]
    pub segment_gap_ms: u64,

    // @field: Mock backend pace
    #[serde(default = "default_mock_ms_per_word")]
    pub mock_ms_per_word: u64,

    // @field: Mock backend output sample rate
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            backend: SpeechBackendKind::default(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            audio_dir: default_audio_dir(),
            url_prefix: default_url_prefix(),
            cache_enabled: default_true(),
            segment_gap_ms: default_segment_gap_ms(),
            mock_ms_per_word: default_mock_ms_per_word(),
            sample_rate: default_sample_rate(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_endpoint() -> String {
    "http://localhost:5002/api/tts".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_audio_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("readaloud")
        .join("audio")
}

fn default_url_prefix() -> String {
    "/static/audio".to_string()
}

fn default_true() -> bool {
    true
}

fn default_segment_gap_ms() -> u64 {
    200
}

fn default_mock_ms_per_word() -> u64 {
    220
}

fn default_sample_rate() -> u32 {
    16_000
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.into(),
    }
}

impl Config {
    /// Load a configuration file, writing the defaults there when it does
    /// not exist yet
    pub async fn load_or_create(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            let config = Config::default();
            let json = serde_json::to_string_pretty(&config)?;
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write default config to {}", path.display()))?;
            log::info!("Created default configuration at {}", path.display());
            return Ok(config);
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.speech.backend == SpeechBackendKind::Http {
            let endpoint = url::Url::parse(&self.speech.endpoint)
                .map_err(|e| invalid("speech.endpoint", e.to_string()))?;
            if !matches!(endpoint.scheme(), "http" | "https") {
                return Err(invalid("speech.endpoint", "endpoint must use http or https"));
            }
        }

        if self.speech.timeout_secs == 0 {
            return Err(invalid("speech.timeout_secs", "timeout must be positive"));
        }
        if self.speech.audio_dir.as_os_str().is_empty() {
            return Err(invalid("speech.audio_dir", "audio directory is required"));
        }
        if self.speech.sample_rate == 0 {
            return Err(invalid("speech.sample_rate", "sample rate must be positive"));
        }
        if self.playback.poll_interval_ms == 0 {
            return Err(invalid("playback.poll_interval_ms", "poll interval must be positive"));
        }

        for (name, voice) in &self.voices {
            if name.trim().is_empty() {
                return Err(invalid("voices", "voice names must not be empty"));
            }
            if let Some(lang) = &voice.lang {
                crate::language_utils::validate_language_code(lang)
                    .map_err(|e| invalid(&format!("voices.{}.lang", name), e.to_string()))?;
            }
            if let Some(tld) = &voice.tld {
                crate::language_utils::validate_tld(tld)
                    .map_err(|e| invalid(&format!("voices.{}.tld", name), e.to_string()))?;
            }
            for (field, value) in [("pitch", voice.pitch), ("speed", voice.speed)] {
                if value.is_some_and(|v| !v.is_finite() || v <= 0.0) {
                    return Err(invalid(&format!("voices.{}.{}", name, field), "must be a positive number"));
                }
            }
        }

        Ok(())
    }
}
