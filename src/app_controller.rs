use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::app_config::Config;
use crate::language_utils;
use crate::layout::{DocumentEnrichment, DocumentLayout, LayoutExtractor};
use crate::playback::{ChannelSubscriber, PlaybackEvent, PlaybackSession, SessionCommand, VoiceSettings};
use crate::speech::backends::{self, SpeechBackend};
use crate::speech::cache::truncate_text;
use crate::speech::{
    AudioStore, Segment, SpeechSynthesizer, SynthesisCache, SynthesisRequest, SynthesizedLine, VoiceDescriptor,
};

// @module: Application controller wiring extraction, synthesis and playback

/// Options for a reading run
#[derive(Debug, Clone)]
pub struct ReadOptions {
    pub start_line: usize,
    pub auto_advance: bool,
    pub voice_settings: VoiceSettings,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            start_line: 0,
            auto_advance: true,
            voice_settings: VoiceSettings::default(),
        }
    }
}

/// How a reading run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Completed,
    Stopped,
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    extractor: LayoutExtractor,
    backend: Arc<dyn SpeechBackend>,
    synthesizer: Arc<SpeechSynthesizer>,
}

impl Controller {
    // @method: Create a controller with the backend selected in the configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let backend = backends::from_config(&config.speech).context("Failed to create speech backend")?;
        Self::with_backend(config, backend)
    }

    // @method: Create a controller around an explicit speech backend
    pub fn with_backend(config: Config, backend: Arc<dyn SpeechBackend>) -> Result<Self> {
        config.validate()?;

        let store = AudioStore::new(config.speech.audio_dir.clone(), &config.speech.url_prefix);
        let synthesizer = SpeechSynthesizer::new(backend.clone(), store)
            .with_cache(SynthesisCache::new(config.speech.cache_enabled))
            .with_segment_gap(config.speech.segment_gap_ms);

        for (name, characteristics) in &config.voices {
            let mut characteristics = characteristics.clone();
            if let Some(lang) = &characteristics.lang {
                characteristics.lang = Some(language_utils::normalize_voice_language(lang)?);
            }
            let profile = synthesizer.register_voice(name, characteristics);
            debug!(
                "Configured voice '{}' ({})",
                profile.name,
                language_utils::get_language_name(&profile.lang).unwrap_or_else(|_| profile.lang.clone())
            );
        }

        Ok(Self {
            config,
            extractor: LayoutExtractor::new(),
            backend,
            synthesizer: Arc::new(synthesizer),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn synthesizer(&self) -> &Arc<SpeechSynthesizer> {
        &self.synthesizer
    }

    /// Check that the speech backend answers
    pub async fn test_backend(&self) -> Result<()> {
        self.backend
            .test_connection()
            .await
            .with_context(|| format!("Speech backend '{}' is not reachable", self.backend.name()))
    }

    /// Extract the layout of a document file, applying enrichment when given
    pub async fn extract_file(&self, path: &Path, enrichment: Option<&Path>) -> Result<DocumentLayout> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read document: {}", path.display()))?;
        let mut layout = self.extractor.extract(&bytes);
        info!(
            "Extracted {} line(s) on {} page(s) from {}",
            layout.total_lines(),
            layout.pages.len(),
            path.display()
        );

        if let Some(enrichment_path) = enrichment {
            let content = tokio::fs::read_to_string(enrichment_path)
                .await
                .with_context(|| format!("Failed to read enrichment: {}", enrichment_path.display()))?;
            let enrichment: DocumentEnrichment = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse enrichment: {}", enrichment_path.display()))?;
            let applied = enrichment.apply(&mut layout);
            info!("Applied enrichment to {} line(s)", applied);
        }

        Ok(layout)
    }

    /// Synthesize one line of text
    pub async fn speak(&self, request: &SynthesisRequest) -> SynthesizedLine {
        self.synthesizer.synthesize(request).await
    }

    /// Synthesize the segments listed in a JSON file into one clip
    pub async fn speak_segments_file(&self, path: &Path) -> Result<String> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read segments: {}", path.display()))?;
        let segments: Vec<Segment> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse segments: {}", path.display()))?;
        Ok(self.synthesizer.synthesize_segments(&segments).await)
    }

    pub fn voices(&self) -> Vec<VoiceDescriptor> {
        self.synthesizer.available_voices()
    }

    /// Create an idle playback session reading through this controller's synthesizer
    pub fn new_session(&self) -> PlaybackSession {
        PlaybackSession::new(self.synthesizer.clone(), self.config.playback.clone())
    }

    /// Read a document aloud, printing events above a line progress bar and
    /// applying commands as they arrive. Returns once the document completes
    /// or the session is stopped.
    pub async fn read(
        &self,
        layout: DocumentLayout,
        options: ReadOptions,
        mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    ) -> Result<ReadOutcome> {
        let start_time = std::time::Instant::now();
        let total_lines = layout.total_lines() as u64;

        let session = self.new_session();
        let (subscriber, mut events) = ChannelSubscriber::new();
        session.subscribe(Arc::new(subscriber));

        let progress_bar = ProgressBar::new(total_lines);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} lines {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));

        session
            .start(layout, options.start_line, options.voice_settings, options.auto_advance)
            .await;

        // Once the command source is gone, a session waiting on a command
        // can never continue; it is stopped on the next check.
        let mut idle_check = tokio::time::interval(std::time::Duration::from_millis(
            self.config.playback.poll_interval_ms.max(1),
        ));
        let mut commands_open = true;
        let outcome = loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        break ReadOutcome::Stopped;
                    };
                    progress_bar.println(
                        serde_json::json!({"event": event.event_type(), "data": event.payload()}).to_string(),
                    );
                    match &event {
                        PlaybackEvent::LineChange { line_index, line, .. } => {
                            progress_bar.set_position(*line_index as u64);
                            progress_bar.set_message(truncate_text(&line.text, 40));
                        }
                        PlaybackEvent::Error { message, .. } => warn!("{}", message),
                        PlaybackEvent::DocumentComplete => {
                            progress_bar.set_position(total_lines);
                            break ReadOutcome::Completed;
                        }
                        PlaybackEvent::Stopped => break ReadOutcome::Stopped,
                        _ => {}
                    }
                }
                command = commands.recv(), if commands_open => {
                    match command {
                        Some(command) => command.apply(&session).await,
                        None => {
                            debug!("Command channel closed");
                            commands_open = false;
                        }
                    }
                }
                _ = idle_check.tick(), if !commands_open => {
                    if session.awaiting_command() {
                        info!("No more commands can arrive; stopping the paused or manual session");
                        session.stop().await;
                    }
                }
            }
        };

        progress_bar.finish_and_clear();
        info!(
            "Reading {} after {}",
            if outcome == ReadOutcome::Completed { "completed" } else { "stopped" },
            Self::format_duration(start_time.elapsed())
        );
        Ok(outcome)
    }

    // Format duration in a human-readable format
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

