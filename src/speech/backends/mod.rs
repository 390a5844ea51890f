/*!
 * Speech backend implementations.
 *
 * This module contains the backends that turn text into raw audio:
 * - Http: a speech service reached over HTTP that answers with WAV audio
 * - Mock: an offline backend producing paced silence
 */

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::app_config::{SpeechBackendKind, SpeechConfig};
use crate::errors::BackendError;
use crate::speech::audio::AudioClip;
use crate::speech::voices::VoiceProfile;

/// Common trait for all speech backends
///
/// Backends synthesize at their canonical pace; rate changes are applied by
/// the synthesizer afterwards.
#[async_trait]
pub trait SpeechBackend: Send + Sync + Debug {
    /// Render `text` with the given voice
    async fn synthesize(&self, text: &str, voice: &VoiceProfile) -> Result<AudioClip, BackendError>;

    /// Check that the backend is reachable
    async fn test_connection(&self) -> Result<(), BackendError>;

    /// Short name for logging
    fn name(&self) -> &str;
}

/// Build the backend selected in the configuration
pub fn from_config(config: &SpeechConfig) -> Result<Arc<dyn SpeechBackend>, BackendError> {
    match config.backend {
        SpeechBackendKind::Mock => Ok(Arc::new(
            mock::MockSpeechBackend::working()
                .with_ms_per_word(config.mock_ms_per_word)
                .with_sample_rate(config.sample_rate),
        )),
        SpeechBackendKind::Http => Ok(Arc::new(http::HttpSpeechBackend::new(
            &config.endpoint,
            config.timeout_secs,
        )?)),
    }
}

pub mod http;
pub mod mock;
