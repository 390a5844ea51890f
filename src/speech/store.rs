/*!
 * Audio artifact store.
 *
 * Rendered audio is written to a directory under a unique name and handed
 * out as an opaque reference (`<url_prefix>/<file name>`). Callers never look
 * inside a reference beyond checking whether it is empty.
 */

use std::path::{Path, PathBuf};

use log::debug;
use uuid::Uuid;

use crate::errors::SpeechError;
use crate::speech::audio::AudioClip;

/// Directory-backed store for WAV artifacts
#[derive(Debug, Clone)]
pub struct AudioStore {
    dir: PathBuf,
    url_prefix: String,
}

impl AudioStore {
    /// Create a store writing into `dir` and publishing under `url_prefix`
    pub fn new(dir: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a clip as `<prefix>_<uuid>.wav` and return its reference
    pub async fn persist(&self, clip: &AudioClip, prefix: &str) -> Result<String, SpeechError> {
        let bytes = clip.to_wav_bytes()?;
        let file_name = format!("{}_{}.wav", prefix, Uuid::new_v4().simple());

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&file_name), bytes).await?;

        debug!("Stored {} ms of audio as {}", clip.duration_ms(), file_name);
        Ok(format!("{}/{}", self.url_prefix, file_name))
    }

    /// Map a reference back to its file, rejecting anything that could
    /// escape the store directory
    pub fn resolve(&self, reference: &str) -> Option<PathBuf> {
        let file_name = reference.rsplit('/').next()?;
        if file_name.is_empty() || file_name.contains("..") || file_name.contains('\\') {
            return None;
        }
        Some(self.dir.join(file_name))
    }

    /// Load a previously stored clip
    pub async fn load(&self, reference: &str) -> Result<AudioClip, SpeechError> {
        let path = self.resolve(reference).ok_or_else(|| {
            SpeechError::Store(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("not an audio reference: '{}'", reference),
            ))
        })?;
        let bytes = tokio::fs::read(path).await?;
        AudioClip::from_wav_bytes(&bytes)
    }
}
