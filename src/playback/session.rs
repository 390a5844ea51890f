/*!
 * Playback session engine.
 *
 * A session reads a document line by line: it announces the line, asks the
 * synthesizer for timed audio, waits for the audio's duration and then moves
 * on. The reading loop runs as its own task; commands mutate a small shared
 * state and wake the loop, which reacts no later than one poll interval.
 *
 * Every loop run carries a generation number. Commands that restart reading
 * (`start`, `resume`, `skip_to_line`) or end it (`stop`) bump the generation,
 * and a loop whose generation is no longer current exits without touching
 * the session again. A synthesis call still in flight for an abandoned line
 * may finish, but its result is discarded.
 */

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::FutureExt;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::{Instant, sleep};

use crate::layout::DocumentLayout;
use crate::playback::events::{EventBus, EventSubscriber, LineInfo, PlaybackEvent, SubscriptionId};
use crate::playback::state::{PlaybackConfig, PlaybackState, SessionStatus, VoiceSettings};
use crate::speech::timing;
use crate::speech::{LineSynthesizer, SynthesisRequest, SynthesizedLine};

/// Mutable state of the active reading run
#[derive(Debug)]
struct RunState {
    layout: Arc<DocumentLayout>,
    cursor: usize,
    playing: bool,
    paused: bool,
    voice_settings: VoiceSettings,
    auto_advance: bool,
    /// The current line finished without auto-advance; reading resumes only
    /// on a command
    line_done: bool,
}

impl RunState {
    fn state(&self) -> PlaybackState {
        if self.paused {
            PlaybackState::Paused
        } else if self.playing {
            PlaybackState::Playing
        } else {
            PlaybackState::Stopped
        }
    }
}

/// How the wait for a line's audio ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitOutcome {
    Completed,
    Abandoned,
}

struct SessionInner {
    synthesizer: Arc<dyn LineSynthesizer>,
    events: EventBus,
    config: PlaybackConfig,
    run: Mutex<Option<RunState>>,
    generation: AtomicU64,
    wake: Notify,
    /// Serializes loop emissions so a stale loop cannot interleave its
    /// events with those of the run that replaced it
    emission: tokio::sync::Mutex<()>,
}

/// Handle to a playback session. Clones share the same session.
#[derive(Clone)]
pub struct PlaybackSession {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("state", &self.state())
            .field("generation", &self.inner.generation.load(Ordering::SeqCst))
            .field("events", &self.inner.events)
            .finish()
    }
}

impl PlaybackSession {
    /// Create an idle session reading through `synthesizer`
    pub fn new(synthesizer: Arc<dyn LineSynthesizer>, config: PlaybackConfig) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                synthesizer,
                events: EventBus::new(),
                config,
                run: Mutex::new(None),
                generation: AtomicU64::new(0),
                wake: Notify::new(),
                emission: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Register an event subscriber
    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) -> SubscriptionId {
        self.inner.events.subscribe(subscriber)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.events.unsubscribe(id)
    }

    pub fn state(&self) -> PlaybackState {
        self.inner
            .run
            .lock()
            .as_ref()
            .map(RunState::state)
            .unwrap_or(PlaybackState::Idle)
    }

    /// Start reading `layout` at a document-wide line position, replacing
    /// any run already in progress
    pub async fn start(
        &self,
        layout: DocumentLayout,
        start_line: usize,
        voice_settings: VoiceSettings,
        auto_advance: bool,
    ) {
        info!(
            "Starting playback at line {} of {} (auto-advance {})",
            start_line,
            layout.total_lines(),
            if auto_advance { "on" } else { "off" }
        );

        let generation = {
            let mut run = self.inner.run.lock();
            *run = Some(RunState {
                layout: Arc::new(layout),
                cursor: start_line,
                playing: true,
                paused: false,
                voice_settings,
                auto_advance,
                line_done: false,
            });
            self.inner.bump_generation()
        };
        self.inner.wake.notify_waiters();
        self.spawn_loop(generation);
    }

    /// Pause reading; the current line's wait stops accruing time
    pub async fn pause(&self) {
        let changed = self.inner.update(|run| {
            if !run.playing || run.paused {
                return false;
            }
            run.paused = true;
            true
        });
        if changed != Some(true) {
            debug!("Pause ignored: nothing is playing");
            return;
        }
        self.inner.wake.notify_waiters();
        self.inner.events.emit(&PlaybackEvent::Paused).await;
    }

    /// Resume reading. The current line is read again from its start.
    pub async fn resume(&self) {
        let resumed = self.inner.update(|run| {
            if !run.playing {
                return false;
            }
            run.paused = false;
            run.line_done = false;
            true
        });
        if resumed != Some(true) {
            debug!("Resume ignored: no active session");
            return;
        }

        let generation = self.inner.bump_generation();
        self.inner.wake.notify_waiters();
        self.inner.events.emit(&PlaybackEvent::Resumed).await;
        self.spawn_loop(generation);
    }

    /// Stop reading. The cursor keeps its last value.
    pub async fn stop(&self) {
        let stopped = self.inner.update(|run| {
            run.playing = false;
            run.paused = false;
        });
        if stopped.is_none() {
            debug!("Stop ignored: no active session");
            return;
        }

        self.inner.bump_generation();
        self.inner.wake.notify_waiters();
        info!("Playback stopped");
        self.inner.events.emit(&PlaybackEvent::Stopped).await;
    }

    /// Move the cursor to `line_index`. While playing, reading restarts there
    /// immediately and the wait for the previous line is abandoned.
    pub async fn skip_to_line(&self, line_index: usize) {
        let restart = self.inner.update(|run| {
            run.cursor = line_index;
            let restart = run.playing && !run.paused;
            if restart {
                run.line_done = false;
            }
            restart
        });
        let Some(restart) = restart else {
            debug!("Skip ignored: no active session");
            return;
        };

        let generation = if restart {
            let generation = self.inner.bump_generation();
            self.inner.wake.notify_waiters();
            Some(generation)
        } else {
            None
        };

        self.inner.events.emit(&PlaybackEvent::LineSkip { line_index }).await;

        if let Some(generation) = generation {
            self.spawn_loop(generation);
        }
    }

    /// Merge voice settings; they apply from the next synthesized line
    pub async fn set_voice_settings(&self, update: VoiceSettings) {
        if self.inner.update(|run| run.voice_settings.merge(&update)).is_none() {
            debug!("Voice settings ignored: no active session");
            return;
        }
        self.inner
            .events
            .emit(&PlaybackEvent::VoiceSettingsChanged(update))
            .await;
    }

    pub async fn set_auto_advance(&self, auto_advance: bool) {
        if self.inner.update(|run| run.auto_advance = auto_advance).is_none() {
            debug!("Auto-advance change ignored: no active session");
            return;
        }
        self.inner
            .events
            .emit(&PlaybackEvent::AutoAdvanceChanged { auto_advance })
            .await;
    }

    /// True while a run exists but nothing will be read until a command
    /// arrives: the session is paused, or the last line finished with
    /// auto-advance off
    pub fn awaiting_command(&self) -> bool {
        self.inner
            .run
            .lock()
            .as_ref()
            .is_some_and(|run| run.playing && (run.paused || run.line_done))
    }

    pub fn get_status(&self) -> SessionStatus {
        match self.inner.run.lock().as_ref() {
            None => SessionStatus::absent(),
            Some(run) => SessionStatus {
                state: run.state(),
                current_line: Some(run.cursor),
                voice_settings: Some(run.voice_settings.clone()),
                auto_advance: Some(run.auto_advance),
                total_lines: run.layout.total_lines(),
            },
        }
    }

    fn spawn_loop(&self, generation: u64) {
        let inner = self.inner.clone();
        tokio::spawn(async move { inner.reading_loop(generation).await });
    }
}

impl SessionInner {
    fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Apply `f` to the run state, or return None when no session exists
    fn update<R>(&self, f: impl FnOnce(&mut RunState) -> R) -> Option<R> {
        self.run.lock().as_mut().map(f)
    }

    /// Emit an event on behalf of a loop, dropping it if the loop is stale
    async fn emit_current(&self, generation: u64, event: PlaybackEvent) -> bool {
        let _gate = self.emission.lock().await;
        if !self.is_current(generation) {
            debug!("Dropping {} from an abandoned run", event.event_type());
            return false;
        }
        self.events.emit(&event).await;
        true
    }

    async fn reading_loop(&self, generation: u64) {
        loop {
            let snapshot = {
                let run = self.run.lock();
                match run.as_ref() {
                    Some(run) if self.is_current(generation) && run.playing && !run.paused => Some((
                        run.layout.clone(),
                        run.cursor,
                        run.voice_settings.clone(),
                    )),
                    _ => None,
                }
            };
            let Some((layout, cursor, voice_settings)) = snapshot else {
                return;
            };

            let Some((page_index, line)) = layout.line_at(cursor) else {
                info!("Reached the end of the document");
                self.emit_current(generation, PlaybackEvent::DocumentComplete).await;
                return;
            };
            let info = LineInfo::from_line(cursor, line);

            let announced = self
                .emit_current(
                    generation,
                    PlaybackEvent::LineChange {
                        line_index: cursor,
                        page_index,
                        line: info.clone(),
                        total_lines: layout.total_lines(),
                    },
                )
                .await;
            if !announced {
                return;
            }

            let request = voice_settings.request_for(line);
            match self.synthesize(&request).await {
                Ok(synthesized) => {
                    let duration_ms = line_duration_ms(&synthesized, self.config.default_line_duration_ms);
                    let ready = self
                        .emit_current(
                            generation,
                            PlaybackEvent::AudioReady {
                                line_index: cursor,
                                page_index,
                                audio_url: synthesized.audio_url,
                                word_timings: synthesized.timings,
                                line: info,
                            },
                        )
                        .await;
                    if !ready {
                        return;
                    }

                    if self.wait_for_audio(generation, Duration::from_millis(duration_ms)).await
                        == WaitOutcome::Abandoned
                    {
                        return;
                    }

                    let advanced = self.run.lock().as_mut().is_some_and(|run| {
                        let current = self.is_current(generation) && run.playing && !run.paused;
                        let advance = current && run.auto_advance;
                        if advance {
                            run.cursor += 1;
                        } else if current {
                            run.line_done = true;
                        }
                        advance
                    });
                    if !advanced {
                        debug!("Line {} complete, awaiting command", cursor);
                        return;
                    }
                    sleep(Duration::from_millis(self.config.inter_line_pause_ms)).await;
                }
                Err(message) => {
                    error!("Error reading line {}: {}", cursor, message);
                    let reported = self
                        .emit_current(
                            generation,
                            PlaybackEvent::Error {
                                line_index: Some(cursor),
                                message,
                            },
                        )
                        .await;
                    if !reported {
                        return;
                    }

                    if let Some(run) = self.run.lock().as_mut() {
                        if self.is_current(generation) {
                            run.cursor = cursor + 1;
                        }
                    }
                    sleep(Duration::from_millis(self.config.error_cooldown_ms)).await;
                }
            }
        }
    }

    /// Synthesize one line, turning errors and panics into a message
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesizedLine, String> {
        match AssertUnwindSafe(self.synthesizer.synthesize_line(request))
            .catch_unwind()
            .await
        {
            Ok(Ok(line)) => Ok(line),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err("speech synthesis panicked".to_string()),
        }
    }

    /// Wait until `duration` of unpaused time has passed. Returns early as
    /// abandoned when the session stops or the run is replaced.
    async fn wait_for_audio(&self, generation: u64, duration: Duration) -> WaitOutcome {
        let poll = Duration::from_millis(self.config.poll_interval_ms.max(1));
        let mut elapsed = Duration::ZERO;

        loop {
            let notified = self.wake.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let paused = {
                let run = self.run.lock();
                match run.as_ref() {
                    Some(run) if self.is_current(generation) && run.playing => run.paused,
                    _ => return WaitOutcome::Abandoned,
                }
            };

            if !paused && elapsed >= duration {
                return WaitOutcome::Completed;
            }

            let nap = if paused { poll } else { (duration - elapsed).min(poll) };
            let tick = Instant::now();
            tokio::select! {
                _ = sleep(nap) => {}
                _ = &mut notified => {}
            }
            if !paused {
                elapsed += tick.elapsed();
            }
        }
    }
}

/// Audio length of a line: the last word's end, or the default when the
/// line has no timings
fn line_duration_ms(line: &SynthesizedLine, default_ms: u64) -> u64 {
    match timing::total_duration_ms(&line.timings) {
        Some(end) => end,
        None => {
            if line.has_audio() {
                warn!("Audio without word timings, waiting the default duration");
            }
            default_ms
        }
    }
}
