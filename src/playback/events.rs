/*!
 * Playback events and subscriber fan-out.
 *
 * Every state transition and line milestone of a session is delivered to all
 * registered subscribers in registration order. A subscriber that fails or
 * panics is logged and skipped; delivery to the rest continues.
 */

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::FutureExt;
use log::{error, trace, warn};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::errors::SubscriberError;
use crate::layout::Line;
use crate::playback::state::VoiceSettings;
use crate::speech::WordTiming;

/// Line details sent to observers for highlighting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineInfo {
    pub text: String,
    pub index: usize,
    pub character: Option<String>,
    pub importance_score: f32,
    pub key_concepts: Vec<String>,
    pub reading_difficulty: f32,
}

impl LineInfo {
    /// Describe `line` at the given document-wide position
    pub fn from_line(position: usize, line: &Line) -> Self {
        Self {
            text: line.text.clone(),
            index: position,
            character: line.character.clone(),
            importance_score: line.importance_score,
            key_concepts: line.key_concepts.clone(),
            reading_difficulty: line.reading_difficulty,
        }
    }
}

/// Lifecycle event of a playback session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum PlaybackEvent {
    LineChange {
        line_index: usize,
        page_index: usize,
        line: LineInfo,
        total_lines: usize,
    },
    AudioReady {
        line_index: usize,
        page_index: usize,
        audio_url: String,
        word_timings: Vec<WordTiming>,
        line: LineInfo,
    },
    Paused,
    Resumed,
    Stopped,
    LineSkip {
        line_index: usize,
    },
    VoiceSettingsChanged(VoiceSettings),
    AutoAdvanceChanged {
        auto_advance: bool,
    },
    DocumentComplete,
    Error {
        line_index: Option<usize>,
        message: String,
    },
}

impl PlaybackEvent {
    /// Wire name of the event
    pub fn event_type(&self) -> &'static str {
        match self {
            PlaybackEvent::LineChange { .. } => "lineChange",
            PlaybackEvent::AudioReady { .. } => "audioReady",
            PlaybackEvent::Paused => "paused",
            PlaybackEvent::Resumed => "resumed",
            PlaybackEvent::Stopped => "stopped",
            PlaybackEvent::LineSkip { .. } => "lineSkip",
            PlaybackEvent::VoiceSettingsChanged(_) => "voiceSettingsChanged",
            PlaybackEvent::AutoAdvanceChanged { .. } => "autoAdvanceChanged",
            PlaybackEvent::DocumentComplete => "documentComplete",
            PlaybackEvent::Error { .. } => "error",
        }
    }

    /// Structured payload; events without data yield an empty object
    pub fn payload(&self) -> Value {
        serde_json::to_value(self)
            .ok()
            .and_then(|mut v| v.get_mut("data").map(Value::take))
            .unwrap_or_else(|| Value::Object(Default::default()))
    }

    /// Document-wide line position the event refers to, if any
    pub fn line_index(&self) -> Option<usize> {
        match self {
            PlaybackEvent::LineChange { line_index, .. }
            | PlaybackEvent::AudioReady { line_index, .. }
            | PlaybackEvent::LineSkip { line_index } => Some(*line_index),
            PlaybackEvent::Error { line_index, .. } => *line_index,
            _ => None,
        }
    }
}

/// Receiver of playback events
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Handle one event
    async fn notify(&self, event: &PlaybackEvent) -> Result<(), SubscriberError>;
}

/// Subscriber wrapping a plain closure
pub struct FnSubscriber<F> {
    callback: F,
}

impl<F> FnSubscriber<F>
where
    F: Fn(&PlaybackEvent) -> Result<(), SubscriberError> + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

#[async_trait]
impl<F> EventSubscriber for FnSubscriber<F>
where
    F: Fn(&PlaybackEvent) -> Result<(), SubscriberError> + Send + Sync,
{
    async fn notify(&self, event: &PlaybackEvent) -> Result<(), SubscriberError> {
        (self.callback)(event)
    }
}

/// Subscriber forwarding events into a channel
pub struct ChannelSubscriber {
    sender: mpsc::UnboundedSender<PlaybackEvent>,
}

impl ChannelSubscriber {
    /// Create the subscriber together with its receiving end
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PlaybackEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl EventSubscriber for ChannelSubscriber {
    async fn notify(&self, event: &PlaybackEvent) -> Result<(), SubscriberError> {
        self.sender.send(event.clone()).map_err(|_| SubscriberError::Closed)
    }
}

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Ordered fan-out of events to subscribers
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<Vec<(SubscriptionId, Arc<dyn EventSubscriber>)>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber; it receives events emitted from now on
    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.subscribers.write().push((id, subscriber));
        id
    }

    /// Remove a subscriber. Returns false when it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Deliver an event to every subscriber, returning how many accepted it
    pub async fn emit(&self, event: &PlaybackEvent) -> usize {
        let subscribers: Vec<Arc<dyn EventSubscriber>> =
            self.subscribers.read().iter().map(|(_, s)| s.clone()).collect();

        trace!("Emitting {} to {} subscriber(s)", event.event_type(), subscribers.len());

        let mut delivered = 0;
        for subscriber in subscribers {
            match AssertUnwindSafe(subscriber.notify(event)).catch_unwind().await {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => warn!("Subscriber failed on {}: {}", event.event_type(), e),
                Err(_) => error!("Subscriber panicked on {}", event.event_type()),
            }
        }
        delivered
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
