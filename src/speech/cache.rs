/*!
 * Synthesis caching functionality.
 *
 * Results are memoized by (text, character, voice type, rate) so repeated
 * requests never reach the backend twice. Two callers missing on the same
 * key at once may both synthesize; the last store wins, which is harmless
 * because equal inputs give equivalent results.
 */

use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::RwLock;
use log::debug;

use crate::speech::synthesizer::{SynthesisRequest, SynthesizedLine};
use crate::speech::voices::VoiceType;

/// Cache key combining text, character, voice type and rate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    text: String,
    character: Option<String>,
    voice_type: VoiceType,
    /// Rate stored by bit pattern so the key stays hashable
    rate_bits: u32,
}

impl CacheKey {
    fn from_request(request: &SynthesisRequest) -> Self {
        Self {
            text: request.text.clone(),
            character: request.character.clone(),
            voice_type: request.voice_type,
            rate_bits: request.rate.to_bits(),
        }
    }
}

/// Synthesis cache for storing and retrieving rendered lines
pub struct SynthesisCache {
    /// Internal cache storage
    cache: Arc<RwLock<HashMap<CacheKey, SynthesizedLine>>>,

    /// Cache hit counter
    hits: Arc<RwLock<usize>>,

    /// Cache miss counter
    misses: Arc<RwLock<usize>>,

    /// Whether caching is enabled
    enabled: bool,
}

impl SynthesisCache {
    /// Create a new synthesis cache
    pub fn new(enabled: bool) -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            hits: Arc::new(RwLock::new(0)),
            misses: Arc::new(RwLock::new(0)),
            enabled,
        }
    }

    /// Get a rendered line from the cache
    pub fn get(&self, request: &SynthesisRequest) -> Option<SynthesizedLine> {
        if !self.enabled {
            return None;
        }

        let key = CacheKey::from_request(request);
        let cache = self.cache.read();

        match cache.get(&key) {
            Some(line) => {
                *self.hits.write() += 1;
                debug!("Synthesis cache hit for '{}'", truncate_text(&request.text, 30));
                Some(line.clone())
            }
            None => {
                *self.misses.write() += 1;
                debug!("Synthesis cache miss for '{}'", truncate_text(&request.text, 30));
                None
            }
        }
    }

    /// Store a rendered line in the cache
    pub fn store(&self, request: &SynthesisRequest, line: &SynthesizedLine) {
        if !self.enabled {
            return;
        }

        let key = CacheKey::from_request(request);
        self.cache.write().insert(key, line.clone());
    }

    /// Get cache statistics as (hits, misses, hit rate)
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = *self.hits.read();
        let misses = *self.misses.read();
        let total = hits + misses;

        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        (hits, misses, hit_rate)
    }

    /// Clear the cache and its counters
    pub fn clear(&self) {
        self.cache.write().clear();
        *self.hits.write() = 0;
        *self.misses.write() = 0;
        debug!("Synthesis cache cleared");
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    /// Enable or disable the cache
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for SynthesisCache {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Clone for SynthesisCache {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            hits: self.hits.clone(),
            misses: self.misses.clone(),
            enabled: self.enabled,
        }
    }
}

impl std::fmt::Debug for SynthesisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesisCache")
            .field("entries", &self.len())
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Truncate text to a maximum number of characters with ellipsis
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
