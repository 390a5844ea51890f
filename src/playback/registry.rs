/*!
 * Keyed playback sessions.
 *
 * The registry owns one session per key, all reading through the same
 * synthesizer. Starting under a key replaces whatever that key's session was
 * reading, so there is never more than one active run per key.
 */

use std::collections::HashMap;
use std::sync::Arc;

use log::info;
use parking_lot::RwLock;

use crate::layout::DocumentLayout;
use crate::playback::session::PlaybackSession;
use crate::playback::state::{PlaybackConfig, VoiceSettings};
use crate::speech::LineSynthesizer;

pub struct SessionRegistry {
    synthesizer: Arc<dyn LineSynthesizer>,
    config: PlaybackConfig,
    sessions: RwLock<HashMap<String, PlaybackSession>>,
}

impl SessionRegistry {
    pub fn new(synthesizer: Arc<dyn LineSynthesizer>, config: PlaybackConfig) -> Self {
        Self {
            synthesizer,
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Session registered under `key`, if any
    pub fn get(&self, key: &str) -> Option<PlaybackSession> {
        self.sessions.read().get(key).cloned()
    }

    /// Session under `key`, created idle when missing
    pub fn get_or_create(&self, key: &str) -> PlaybackSession {
        if let Some(session) = self.get(key) {
            return session;
        }
        self.sessions
            .write()
            .entry(key.to_string())
            .or_insert_with(|| PlaybackSession::new(self.synthesizer.clone(), self.config.clone()))
            .clone()
    }

    /// Start reading under `key`, replacing that key's current run
    pub async fn start(
        &self,
        key: &str,
        layout: DocumentLayout,
        start_line: usize,
        voice_settings: VoiceSettings,
        auto_advance: bool,
    ) -> PlaybackSession {
        let session = self.get_or_create(key);
        session.start(layout, start_line, voice_settings, auto_advance).await;
        session
    }

    /// Stop and forget the session under `key`
    pub async fn remove(&self, key: &str) -> bool {
        let removed = self.sessions.write().remove(key);
        match removed {
            Some(session) => {
                session.stop().await;
                info!("Removed playback session '{}'", key);
                true
            }
            None => false,
        }
    }

    /// Stop every registered session
    pub async fn stop_all(&self) {
        let sessions: Vec<PlaybackSession> = self.sessions.read().values().cloned().collect();
        for session in sessions {
            session.stop().await;
        }
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sessions.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
