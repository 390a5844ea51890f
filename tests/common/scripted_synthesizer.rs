/*!
 * Scripted line synthesizer and event recorder for playback tests.
 *
 * The synthesizer never touches disk: it paces lines at a fixed time per
 * word, can fail or panic on chosen texts and can answer after a delay.
 */

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use readaloud::errors::{BackendError, SpeechError, SubscriberError};
use readaloud::playback::{EventSubscriber, PlaybackEvent};
use readaloud::speech::timing::word_timings;
use readaloud::speech::{LineSynthesizer, SynthesisRequest, SynthesizedLine};

/// Line synthesizer with scripted behavior
pub struct ScriptedSynthesizer {
    ms_per_word: u64,
    delay_ms: u64,
    fail_on: Vec<String>,
    panic_on: Vec<String>,
    requests: Mutex<Vec<SynthesisRequest>>,
}

impl ScriptedSynthesizer {
    /// Synthesizer producing `ms_per_word` of audio per word
    pub fn new(ms_per_word: u64) -> Self {
        Self {
            ms_per_word,
            delay_ms: 0,
            fail_on: Vec::new(),
            panic_on: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fail every text containing `fragment`
    pub fn failing_on(mut self, fragment: &str) -> Self {
        self.fail_on.push(fragment.to_string());
        self
    }

    /// Panic on every text containing `fragment`
    pub fn panicking_on(mut self, fragment: &str) -> Self {
        self.panic_on.push(fragment.to_string());
        self
    }

    /// Answer each request after `delay_ms`
    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<SynthesisRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl LineSynthesizer for ScriptedSynthesizer {
    async fn synthesize_line(&self, request: &SynthesisRequest) -> Result<SynthesizedLine, SpeechError> {
        let call = {
            let mut requests = self.requests.lock();
            requests.push(request.clone());
            requests.len()
        };

        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }

        if self.panic_on.iter().any(|f| request.text.contains(f.as_str())) {
            panic!("scripted panic for '{}'", request.text);
        }
        if self.fail_on.iter().any(|f| request.text.contains(f.as_str())) {
            return Err(SpeechError::Backend(BackendError::RequestFailed(format!(
                "scripted failure for '{}'",
                request.text
            ))));
        }

        let words = request.text.split_whitespace().count() as u64;
        let duration_ms = words * self.ms_per_word;
        Ok(SynthesizedLine {
            audio_url: format!("/static/audio/scripted_{}.wav", call),
            timings: word_timings(&request.text, duration_ms, request.character.as_deref()),
            duration_ms,
            character: request.character.clone(),
        })
    }
}

/// Subscriber keeping every event it receives
#[derive(Default)]
pub struct EventRecorder {
    events: Mutex<Vec<PlaybackEvent>>,
}

impl EventRecorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<PlaybackEvent> {
        self.events.lock().clone()
    }

    /// Wire names of the recorded events, in order
    pub fn types(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|e| e.event_type()).collect()
    }

    pub fn count(&self, event_type: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.event_type() == event_type)
            .count()
    }

    /// Line positions announced by lineChange events
    pub fn line_changes(&self) -> Vec<usize> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                PlaybackEvent::LineChange { line_index, .. } => Some(*line_index),
                _ => None,
            })
            .collect()
    }

    /// Line positions announced by audioReady events
    pub fn audio_ready(&self) -> Vec<usize> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                PlaybackEvent::AudioReady { line_index, .. } => Some(*line_index),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

#[async_trait]
impl EventSubscriber for EventRecorder {
    async fn notify(&self, event: &PlaybackEvent) -> Result<(), SubscriberError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}
