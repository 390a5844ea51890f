/*!
 * # readaloud - document read-aloud pipeline
 *
 * A Rust library that turns documents into narratable lines, synthesizes
 * timed speech for them and plays them back under interactive control.
 *
 * ## Features
 *
 * - Extract ordered pages and lines from documents:
 *   - PDF content streams, clustered into lines by position
 *   - Plain-text fallback when no structure is available
 * - Synthesize speech per line with word-level timings
 *   - Character and role based voice selection
 *   - Rate adjustment and result caching
 *   - Multi-voice segment concatenation
 * - Play documents back line by line with pause, resume, stop and skip
 * - Broadcast playback events to any number of subscribers
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `layout`: Document layout model and extraction:
 *   - `layout::extractor`: Token clustering and fallbacks
 *   - `layout::pdf`: PDF backend
 *   - `layout::enrichment`: Per-line metadata supplied by collaborators
 * - `speech`: Timed speech synthesis:
 *   - `speech::synthesizer`: Voice resolution, rate, caching and storage
 *   - `speech::backends`: Speech backends (HTTP service, mock)
 *   - `speech::voices`: Voice profiles and registry
 * - `playback`: Playback session engine, events and commands
 * - `app_config`: Configuration management
 * - `app_controller`: Application controller used by the CLI
 * - `language_utils`: ISO language code utilities for voices
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod language_utils;
pub mod layout;
pub mod playback;
pub mod speech;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{AppError, BackendError, LayoutError, SpeechError, SubscriberError};
pub use layout::{DocumentLayout, LayoutExtractor, Line, Page, Word};
pub use playback::{PlaybackEvent, PlaybackSession, SessionRegistry};
pub use speech::{SpeechSynthesizer, SynthesisRequest, SynthesizedLine};
