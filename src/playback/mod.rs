/*!
 * Playback session engine.
 *
 * This module provides:
 * - The session state machine and its reading loop
 * - Lifecycle events and the subscriber fan-out
 * - Command parsing for command channels
 * - A registry of keyed sessions
 */

pub mod commands;
pub mod events;
pub mod registry;
pub mod session;
pub mod state;

// Re-export main types
pub use commands::SessionCommand;
pub use events::{ChannelSubscriber, EventBus, EventSubscriber, FnSubscriber, LineInfo, PlaybackEvent, SubscriptionId};
pub use registry::SessionRegistry;
pub use session::PlaybackSession;
pub use state::{PlaybackConfig, PlaybackState, SessionStatus, VoiceSettings};
