use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::BackendError;
use crate::speech::audio::AudioClip;
use crate::speech::backends::SpeechBackend;
use crate::speech::voices::VoiceProfile;

/// Speech service reached over HTTP.
///
/// The service receives a JSON [`SpeechRequest`] and answers with a 16-bit
/// PCM WAV body.
#[derive(Debug)]
pub struct HttpSpeechBackend {
    /// Synthesis endpoint URL
    endpoint: String,
    /// HTTP client for making requests
    client: Client,
}

/// Synthesis request body
#[derive(Debug, Serialize, Deserialize)]
pub struct SpeechRequest {
    /// Text to speak
    pub text: String,
    /// Language code
    pub lang: String,
    /// Regional variant
    pub tld: String,
    /// Engine-side slow mode; always off, pace is controlled through the
    /// playback rate
    pub slow: bool,
    /// Pitch multiplier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f32>,
}

impl SpeechRequest {
    fn for_voice(text: &str, voice: &VoiceProfile) -> Self {
        Self {
            text: text.to_string(),
            lang: voice.lang.clone(),
            tld: voice.tld.clone(),
            slow: false,
            pitch: voice.pitch,
        }
    }
}

impl HttpSpeechBackend {
    /// Create a backend posting to `endpoint` with the given request timeout
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| BackendError::ConnectionError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_request_error(error: reqwest::Error) -> BackendError {
        if error.is_connect() || error.is_timeout() {
            BackendError::ConnectionError(error.to_string())
        } else {
            BackendError::RequestFailed(error.to_string())
        }
    }
}

#[async_trait]
impl SpeechBackend for HttpSpeechBackend {
    async fn synthesize(&self, text: &str, voice: &VoiceProfile) -> Result<AudioClip, BackendError> {
        let request = SpeechRequest::for_voice(text, voice);
        debug!("POST {} ({} chars, voice '{}')", self.endpoint, text.len(), voice.name);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!("Speech service error ({}): {}", status, message);
            return Err(BackendError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await.map_err(Self::map_request_error)?;
        AudioClip::from_wav_bytes(&body).map_err(|e| BackendError::DecodeError(e.to_string()))
    }

    async fn test_connection(&self) -> Result<(), BackendError> {
        // Any HTTP answer means the service is up.
        self.client
            .get(&self.endpoint)
            .send()
            .await
            .map(|_| ())
            .map_err(Self::map_request_error)
    }

    fn name(&self) -> &str {
        "http"
    }
}
