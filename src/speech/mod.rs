/*!
 * Speech synthesis.
 *
 * This module provides:
 * - Voice profiles and the voice registry
 * - Speech backends (HTTP service and offline mock)
 * - Audio clips, WAV encoding and artifact storage
 * - Word timing derivation and the synthesis cache
 * - The speech synthesizer used by playback
 */

pub mod audio;
pub mod backends;
pub mod cache;
pub mod store;
pub mod synthesizer;
pub mod timing;
pub mod voices;

// Re-export main types
pub use audio::AudioClip;
pub use backends::SpeechBackend;
pub use backends::mock::MockSpeechBackend;
pub use cache::SynthesisCache;
pub use store::AudioStore;
pub use synthesizer::{LineSynthesizer, Segment, SpeechSynthesizer, SynthesisRequest, SynthesizedLine};
pub use timing::WordTiming;
pub use voices::{VoiceCharacteristics, VoiceDescriptor, VoiceProfile, VoiceRegistry, VoiceType};
