/*!
 * Mock speech backend.
 *
 * Produces silence paced at a fixed time per word, so playback timing is
 * realistic without any speech engine:
 * - `MockSpeechBackend::working()` - Always succeeds
 * - `MockSpeechBackend::failing()` - Always fails with an error
 * - `MockSpeechBackend::fail_on(text)` - Fails for texts containing `text`
 */

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::BackendError;
use crate::speech::audio::AudioClip;
use crate::speech::backends::SpeechBackend;
use crate::speech::voices::VoiceProfile;

/// Default pace: roughly 220 ms per word at normal speed
pub const DEFAULT_MS_PER_WORD: u64 = 220;

/// Default output sample rate
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// Behavior mode for the mock backend
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Always fails with an error
    Failing,
    /// Fails for any text containing the given fragment
    FailOn { fragment: String },
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Succeeds after a delay
    Slow { delay_ms: u64 },
}

/// Mock backend for offline use and testing
#[derive(Debug)]
pub struct MockSpeechBackend {
    behavior: MockBehavior,
    ms_per_word: u64,
    sample_rate: u32,
    request_count: Arc<AtomicUsize>,
}

impl MockSpeechBackend {
    /// Create a new mock backend with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            ms_per_word: DEFAULT_MS_PER_WORD,
            sample_rate: DEFAULT_SAMPLE_RATE,
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a working mock backend that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a failing mock backend that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that fails on texts containing `fragment`
    pub fn fail_on(fragment: &str) -> Self {
        Self::new(MockBehavior::FailOn {
            fragment: fragment.to_string(),
        })
    }

    /// Create an intermittently failing mock backend
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a mock that answers after a delay
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    pub fn with_ms_per_word(mut self, ms_per_word: u64) -> Self {
        self.ms_per_word = ms_per_word;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate.max(1);
        self
    }

    /// Number of synthesis requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Shared handle to the request counter
    pub fn counter(&self) -> Arc<AtomicUsize> {
        self.request_count.clone()
    }

    /// Every voice is rendered at the same canonical pace; speaking rate is
    /// applied to the audio afterwards.
    fn render(&self, text: &str) -> AudioClip {
        let words = text.split_whitespace().count() as u64;
        AudioClip::silence(words * self.ms_per_word, self.sample_rate, 1)
    }
}

#[async_trait]
impl SpeechBackend for MockSpeechBackend {
    async fn synthesize(&self, text: &str, _voice: &VoiceProfile) -> Result<AudioClip, BackendError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst) + 1;

        match &self.behavior {
            MockBehavior::Working => Ok(self.render(text)),
            MockBehavior::Failing => Err(BackendError::Unavailable("mock backend failure".to_string())),
            MockBehavior::FailOn { fragment } => {
                if text.contains(fragment.as_str()) {
                    Err(BackendError::RequestFailed(format!("mock failure for '{}'", text)))
                } else {
                    Ok(self.render(text))
                }
            }
            MockBehavior::Intermittent { fail_every } => {
                if *fail_every > 0 && count % fail_every == 0 {
                    Err(BackendError::ConnectionError(format!(
                        "intermittent failure on request {}",
                        count
                    )))
                } else {
                    Ok(self.render(text))
                }
            }
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                Ok(self.render(text))
            }
        }
    }

    async fn test_connection(&self) -> Result<(), BackendError> {
        match self.behavior {
            MockBehavior::Failing => Err(BackendError::Unavailable("mock backend failure".to_string())),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
