/*!
 * Timed speech synthesis.
 *
 * The synthesizer resolves a voice, asks the backend for audio, applies the
 * requested rate, stores the rendered artifact and derives the word timing
 * table from the audio's actual duration. Results are cached per
 * (text, character, voice type, rate).
 */

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::SpeechError;
use crate::speech::audio::{self, AudioClip};
use crate::speech::backends::SpeechBackend;
use crate::speech::cache::SynthesisCache;
use crate::speech::store::AudioStore;
use crate::speech::timing::{self, WordTiming};
use crate::speech::voices::{VoiceCharacteristics, VoiceDescriptor, VoiceProfile, VoiceRegistry, VoiceType};

/// Silence inserted between consecutive segments of a combined clip
pub const DEFAULT_SEGMENT_GAP_MS: u64 = 200;

/// One synthesis request
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub text: String,
    pub character: Option<String>,
    pub voice_type: VoiceType,
    pub rate: f32,
    pub voice_name: Option<String>,
}

impl SynthesisRequest {
    /// Narrator request at normal rate
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            character: None,
            voice_type: VoiceType::Narrator,
            rate: 1.0,
            voice_name: None,
        }
    }

    pub fn character(mut self, character: impl Into<String>) -> Self {
        self.character = Some(character.into());
        self
    }

    pub fn voice_type(mut self, voice_type: VoiceType) -> Self {
        self.voice_type = voice_type;
        self
    }

    pub fn rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    pub fn voice_name(mut self, voice_name: impl Into<String>) -> Self {
        self.voice_name = Some(voice_name.into());
        self
    }
}

/// Audio reference plus word timings for one line of text.
///
/// An empty `audio_url` means no audio is available for the line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedLine {
    pub audio_url: String,
    pub timings: Vec<WordTiming>,
    pub duration_ms: u64,
    pub character: Option<String>,
}

impl SynthesizedLine {
    /// A result carrying no audio
    pub fn empty(character: Option<String>) -> Self {
        Self {
            audio_url: String::new(),
            timings: Vec::new(),
            duration_ms: 0,
            character,
        }
    }

    pub fn has_audio(&self) -> bool {
        !self.audio_url.is_empty()
    }
}

/// One entry of a multi-voice segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    #[serde(default)]
    pub character: Option<String>,
}

impl Segment {
    pub fn new(text: impl Into<String>, character: Option<&str>) -> Self {
        Self {
            text: text.into(),
            character: character.map(str::to_string),
        }
    }
}

/// Seam between the playback engine and whatever renders its lines
#[async_trait]
pub trait LineSynthesizer: Send + Sync {
    /// Render one line, reporting failures to the caller
    async fn synthesize_line(&self, request: &SynthesisRequest) -> Result<SynthesizedLine, SpeechError>;
}

/// Non-finite or non-positive rates play at normal speed
fn effective_rate(rate: f32, voice: &VoiceProfile) -> f32 {
    let rate = if rate.is_finite() && rate > 0.0 {
        rate
    } else {
        warn!("Ignoring invalid speech rate {}", rate);
        1.0
    };
    let speed = voice.speed.filter(|s| s.is_finite() && *s > 0.0).unwrap_or(1.0);
    rate * speed
}

/// Speech synthesizer with voice resolution, caching and artifact storage
#[derive(Debug)]
pub struct SpeechSynthesizer {
    backend: Arc<dyn SpeechBackend>,
    voices: VoiceRegistry,
    cache: SynthesisCache,
    store: AudioStore,
    segment_gap_ms: u64,
}

impl SpeechSynthesizer {
    /// Create a synthesizer with an enabled cache and the default segment gap
    pub fn new(backend: Arc<dyn SpeechBackend>, store: AudioStore) -> Self {
        Self {
            backend,
            voices: VoiceRegistry::new(),
            cache: SynthesisCache::default(),
            store,
            segment_gap_ms: DEFAULT_SEGMENT_GAP_MS,
        }
    }

    pub fn with_cache(mut self, cache: SynthesisCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_segment_gap(mut self, gap_ms: u64) -> Self {
        self.segment_gap_ms = gap_ms;
        self
    }

    pub fn voices(&self) -> &VoiceRegistry {
        &self.voices
    }

    pub fn cache(&self) -> &SynthesisCache {
        &self.cache
    }

    pub fn store(&self) -> &AudioStore {
        &self.store
    }

    /// Register a runtime voice profile
    pub fn register_voice(&self, name: &str, characteristics: VoiceCharacteristics) -> VoiceProfile {
        self.voices.register(name, characteristics)
    }

    pub fn available_voices(&self) -> Vec<VoiceDescriptor> {
        self.voices.available_voices()
    }

    /// Synthesize a line. Never fails: backend or storage errors yield an
    /// empty result, which callers treat as "no audio for this line".
    pub async fn synthesize(&self, request: &SynthesisRequest) -> SynthesizedLine {
        match self.try_synthesize(request).await {
            Ok(line) => line,
            Err(e) => {
                error!("Error in speech synthesis: {}", e);
                SynthesizedLine::empty(request.character.clone())
            }
        }
    }

    /// Synthesize a line, reporting failures
    pub async fn try_synthesize(&self, request: &SynthesisRequest) -> Result<SynthesizedLine, SpeechError> {
        if let Some(line) = self.cache.get(request) {
            return Ok(line);
        }

        if request.text.split_whitespace().next().is_none() {
            return Ok(SynthesizedLine::empty(request.character.clone()));
        }

        let voice = self.voices.resolve(
            request.character.as_deref(),
            request.voice_type,
            request.voice_name.as_deref(),
        );
        debug!("Synthesizing with voice '{}' via {}", voice.name, self.backend.name());

        let clip = self.backend.synthesize(&request.text, &voice).await?;
        let clip = clip.with_playback_rate(effective_rate(request.rate, &voice));
        let duration_ms = clip.duration_ms();
        let audio_url = self.store.persist(&clip, "tts").await?;

        let line = SynthesizedLine {
            audio_url,
            timings: timing::word_timings(&request.text, duration_ms, request.character.as_deref()),
            duration_ms,
            character: request.character.clone(),
        };
        self.cache.store(request, &line);
        Ok(line)
    }

    /// Synthesize segments and join them into one clip. Never fails: returns
    /// an empty reference when nothing could be rendered.
    pub async fn synthesize_segments(&self, segments: &[Segment]) -> String {
        match self.try_synthesize_segments(segments).await {
            Ok(reference) => reference,
            Err(e) => {
                error!("Error creating combined segment: {}", e);
                String::new()
            }
        }
    }

    /// Synthesize segments concurrently and join them in input order with a
    /// short silence between consecutive audible segments. Empty segments
    /// are skipped entirely.
    pub async fn try_synthesize_segments(&self, segments: &[Segment]) -> Result<String, SpeechError> {
        let requests: Vec<SynthesisRequest> = segments
            .iter()
            .filter(|s| !s.text.trim().is_empty())
            .map(|s| {
                let request = SynthesisRequest::new(s.text.clone());
                match &s.character {
                    Some(character) => request.character(character.clone()).voice_type(VoiceType::Character),
                    None => request,
                }
            })
            .collect();

        let results = join_all(requests.iter().map(|r| self.try_synthesize(r))).await;

        let mut clips: Vec<AudioClip> = Vec::with_capacity(results.len());
        for (request, result) in requests.iter().zip(results) {
            match result {
                Ok(line) if line.has_audio() => clips.push(self.store.load(&line.audio_url).await?),
                Ok(_) => {}
                Err(e) => warn!("Skipping segment '{}': {}", request.text, e),
            }
        }

        let Some(combined) = audio::concatenate(&clips, self.segment_gap_ms) else {
            info!("No audible segments to combine");
            return Ok(String::new());
        };

        let reference = self.store.persist(&combined, "audiobook").await?;
        info!(
            "Combined {} segment(s) into {} ({} ms)",
            clips.len(),
            reference,
            combined.duration_ms()
        );
        Ok(reference)
    }
}

#[async_trait]
impl LineSynthesizer for SpeechSynthesizer {
    async fn synthesize_line(&self, request: &SynthesisRequest) -> Result<SynthesizedLine, SpeechError> {
        self.try_synthesize(request).await
    }
}
