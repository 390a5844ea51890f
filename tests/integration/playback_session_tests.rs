/*!
 * Playback session behavior, driven on a paused tokio clock so waits are
 * deterministic
 */

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use readaloud::errors::SubscriberError;
use readaloud::playback::{
    FnSubscriber, PlaybackConfig, PlaybackEvent, PlaybackSession, PlaybackState, SessionStatus, VoiceSettings,
};
use readaloud::speech::VoiceType;

use crate::common::scripted_synthesizer::{EventRecorder, ScriptedSynthesizer};
use crate::common::{init_test_logging, layout_from_lines, layout_from_pages};

const TEN_WORDS: &str = "one two three four five six seven eight nine ten";

/// Session over `synthesizer` with default timings and a recorder attached
fn session_with(synthesizer: Arc<ScriptedSynthesizer>) -> (PlaybackSession, Arc<EventRecorder>) {
    init_test_logging();
    let session = PlaybackSession::new(synthesizer, PlaybackConfig::default());
    let recorder = EventRecorder::new();
    session.subscribe(recorder.clone());
    (session, recorder)
}

fn position_of(recorder: &EventRecorder, predicate: impl Fn(&PlaybackEvent) -> bool) -> Option<usize> {
    recorder.events().iter().position(predicate)
}

#[tokio::test(start_paused = true)]
async fn test_start_withAutoAdvance_shouldReadEveryLineThenComplete() {
    let (session, recorder) = session_with(Arc::new(ScriptedSynthesizer::new(100)));

    session
        .start(layout_from_lines(&["one two", "three four", "five six"]), 0, VoiceSettings::default(), true)
        .await;
    sleep(Duration::from_secs(10)).await;

    assert_eq!(recorder.line_changes(), vec![0, 1, 2]);
    assert_eq!(recorder.count("documentComplete"), 1);
    assert_eq!(
        recorder.types(),
        vec![
            "lineChange",
            "audioReady",
            "lineChange",
            "audioReady",
            "lineChange",
            "audioReady",
            "documentComplete"
        ]
    );

    let status = session.get_status();
    assert_eq!(status.state, PlaybackState::Playing);
    assert_eq!(status.current_line, Some(3));
    assert_eq!(status.total_lines, 3);
}

#[tokio::test(start_paused = true)]
async fn test_start_shouldWaitForAudioAndInterLinePause() {
    let (session, recorder) = session_with(Arc::new(ScriptedSynthesizer::new(100)));

    session
        .start(layout_from_lines(&[TEN_WORDS, "next"]), 0, VoiceSettings::default(), true)
        .await;

    // 1000 ms of audio plus 500 ms between lines
    sleep(Duration::from_millis(1400)).await;
    assert_eq!(recorder.line_changes(), vec![0]);

    sleep(Duration::from_millis(200)).await;
    assert_eq!(recorder.line_changes(), vec![0, 1]);
}

#[tokio::test(start_paused = true)]
async fn test_audioReady_shouldCarryTimingsAndLineInfo() {
    let (session, recorder) = session_with(Arc::new(ScriptedSynthesizer::new(100)));

    session
        .start(layout_from_lines(&["Hello brave world"]), 0, VoiceSettings::default(), false)
        .await;
    sleep(Duration::from_millis(50)).await;

    let ready = recorder
        .events()
        .into_iter()
        .find(|e| e.event_type() == "audioReady")
        .unwrap();
    match ready {
        PlaybackEvent::AudioReady {
            line_index,
            page_index,
            audio_url,
            word_timings,
            line,
        } => {
            assert_eq!((line_index, page_index), (0, 0));
            assert!(!audio_url.is_empty());
            assert_eq!(word_timings.len(), 3);
            assert_eq!(word_timings.last().map(|t| t.end_ms), Some(300));
            assert_eq!(line.text, "Hello brave world");
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_pause_thenResume_shouldExcludePausedTimeAndReReadLine() {
    let (session, recorder) = session_with(Arc::new(ScriptedSynthesizer::new(100)));

    session
        .start(layout_from_lines(&[TEN_WORDS, "the end"]), 0, VoiceSettings::default(), true)
        .await;
    sleep(Duration::from_millis(300)).await;

    session.pause().await;
    assert_eq!(session.state(), PlaybackState::Paused);

    // Far longer than the line's audio; nothing may advance while paused
    sleep(Duration::from_secs(5)).await;
    assert_eq!(recorder.line_changes(), vec![0]);
    assert_eq!(recorder.count("documentComplete"), 0);

    recorder.clear();
    session.resume().await;
    assert_eq!(session.state(), PlaybackState::Playing);
    sleep(Duration::from_millis(10)).await;
    assert_eq!(recorder.types(), vec!["resumed", "lineChange", "audioReady"]);
    assert_eq!(recorder.line_changes(), vec![0]);

    sleep(Duration::from_millis(900)).await;
    assert_eq!(recorder.line_changes(), vec![0]);

    sleep(Duration::from_millis(700)).await;
    assert_eq!(recorder.line_changes(), vec![0, 1]);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(recorder.count("documentComplete"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_pause_whenNotPlaying_shouldBeIgnored() {
    let (session, recorder) = session_with(Arc::new(ScriptedSynthesizer::new(100)));

    session
        .start(layout_from_lines(&["just one"]), 0, VoiceSettings::default(), true)
        .await;
    sleep(Duration::from_millis(50)).await;
    session.pause().await;
    session.pause().await;
    assert_eq!(recorder.count("paused"), 1);

    session.stop().await;
    session.pause().await;
    session.resume().await;
    assert_eq!(recorder.count("paused"), 1);
    assert_eq!(recorder.count("resumed"), 0);
    assert_eq!(session.state(), PlaybackState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_skipToLine_whileReading_shouldAbandonWaitAndResumeThere() {
    let (session, recorder) = session_with(Arc::new(ScriptedSynthesizer::new(100)));
    let lines = [TEN_WORDS; 5];

    session
        .start(layout_from_lines(&lines), 0, VoiceSettings::default(), true)
        .await;
    sleep(Duration::from_millis(200)).await;

    session.skip_to_line(2).await;
    sleep(Duration::from_millis(10)).await;

    let skip = position_of(&recorder, |e| *e == PlaybackEvent::LineSkip { line_index: 2 }).unwrap();
    let change = position_of(&recorder, |e| {
        matches!(e, PlaybackEvent::LineChange { line_index: 2, .. })
    })
    .unwrap();
    assert!(skip < change);
    assert_eq!(session.get_status().current_line, Some(2));

    sleep(Duration::from_secs(30)).await;
    assert_eq!(recorder.line_changes(), vec![0, 2, 3, 4]);
    assert_eq!(recorder.count("documentComplete"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_skipToLine_whilePaused_shouldOnlyMoveCursor() {
    let (session, recorder) = session_with(Arc::new(ScriptedSynthesizer::new(100)));

    session
        .start(layout_from_lines(&[TEN_WORDS, TEN_WORDS, TEN_WORDS, "last"]), 0, VoiceSettings::default(), true)
        .await;
    sleep(Duration::from_millis(100)).await;
    session.pause().await;
    session.skip_to_line(3).await;
    sleep(Duration::from_secs(5)).await;

    assert_eq!(recorder.line_changes(), vec![0]);
    assert_eq!(session.get_status().current_line, Some(3));

    session.resume().await;
    sleep(Duration::from_millis(10)).await;
    assert_eq!(recorder.line_changes(), vec![0, 3]);
}

#[tokio::test(start_paused = true)]
async fn test_skipToLine_withSlowSynthesis_shouldDiscardStaleAudio() {
    let synthesizer = Arc::new(ScriptedSynthesizer::new(100).with_delay(500));
    let (session, recorder) = session_with(synthesizer.clone());

    session
        .start(layout_from_lines(&["a b", "c d", "e f", "g h"]), 0, VoiceSettings::default(), true)
        .await;
    sleep(Duration::from_millis(100)).await;
    session.skip_to_line(2).await;
    sleep(Duration::from_secs(30)).await;

    assert_eq!(recorder.line_changes(), vec![0, 2, 3]);
    assert_eq!(recorder.audio_ready(), vec![2, 3]);
    assert_eq!(recorder.count("documentComplete"), 1);
    assert_eq!(synthesizer.request_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_synthesisFailure_shouldReportAndSkipBrokenLine() {
    let (session, recorder) = session_with(Arc::new(ScriptedSynthesizer::new(100).failing_on("broken")));

    session
        .start(
            layout_from_lines(&["first line", "a broken line", "last line"]),
            0,
            VoiceSettings::default(),
            true,
        )
        .await;
    sleep(Duration::from_secs(10)).await;

    assert_eq!(recorder.line_changes(), vec![0, 1, 2]);
    assert_eq!(recorder.audio_ready(), vec![0, 2]);
    let errors: Vec<Option<usize>> = recorder
        .events()
        .iter()
        .filter(|e| e.event_type() == "error")
        .map(|e| e.line_index())
        .collect();
    assert_eq!(errors, vec![Some(1)]);
    assert_eq!(recorder.count("documentComplete"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_synthesisPanic_shouldBeTreatedAsFailure() {
    let (session, recorder) = session_with(Arc::new(ScriptedSynthesizer::new(100).panicking_on("explodes")));

    session
        .start(
            layout_from_lines(&["this explodes", "this does not"]),
            0,
            VoiceSettings::default(),
            true,
        )
        .await;
    sleep(Duration::from_secs(10)).await;

    assert_eq!(recorder.count("error"), 1);
    assert_eq!(recorder.audio_ready(), vec![1]);
    assert_eq!(recorder.count("documentComplete"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_midWait_shouldEndReadingAndKeepCursor() {
    let (session, recorder) = session_with(Arc::new(ScriptedSynthesizer::new(100)));

    session
        .start(layout_from_lines(&[TEN_WORDS, TEN_WORDS, TEN_WORDS]), 0, VoiceSettings::default(), true)
        .await;
    sleep(Duration::from_millis(300)).await;
    session.stop().await;
    sleep(Duration::from_secs(10)).await;

    assert_eq!(recorder.types(), vec!["lineChange", "audioReady", "stopped"]);
    let status = session.get_status();
    assert_eq!(status.state, PlaybackState::Stopped);
    assert_eq!(status.current_line, Some(0));
}

#[tokio::test(start_paused = true)]
async fn test_commands_withoutSession_shouldDoNothing() {
    let synthesizer = Arc::new(ScriptedSynthesizer::new(100));
    let (session, recorder) = session_with(synthesizer.clone());

    session.pause().await;
    session.resume().await;
    session.stop().await;
    session.skip_to_line(3).await;
    session.set_voice_settings(VoiceSettings::default().with_rate(2.0)).await;
    session.set_auto_advance(false).await;
    sleep(Duration::from_secs(1)).await;

    assert!(recorder.events().is_empty());
    assert_eq!(synthesizer.request_count(), 0);
    assert_eq!(session.state(), PlaybackState::Idle);
    assert_eq!(session.get_status(), SessionStatus::absent());
}

#[tokio::test(start_paused = true)]
async fn test_manualAdvance_shouldWaitForCommandAfterEachLine() {
    let (session, recorder) = session_with(Arc::new(ScriptedSynthesizer::new(100)));

    session
        .start(layout_from_lines(&["one two", "three four", "five"]), 0, VoiceSettings::default(), false)
        .await;
    sleep(Duration::from_secs(5)).await;

    assert_eq!(recorder.line_changes(), vec![0]);
    let status = session.get_status();
    assert_eq!(status.state, PlaybackState::Playing);
    assert_eq!(status.current_line, Some(0));
    assert_eq!(status.auto_advance, Some(false));

    session.skip_to_line(1).await;
    sleep(Duration::from_secs(5)).await;
    assert_eq!(recorder.line_changes(), vec![0, 1]);
    assert_eq!(recorder.count("documentComplete"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_awaitingCommand_shouldTrackManualLineEndAndPause() {
    let (session, _recorder) = session_with(Arc::new(ScriptedSynthesizer::new(100)));
    assert!(!session.awaiting_command());

    session
        .start(layout_from_lines(&["one two three", "four"]), 0, VoiceSettings::default(), false)
        .await;
    sleep(Duration::from_millis(100)).await;
    assert!(!session.awaiting_command());

    sleep(Duration::from_secs(5)).await;
    assert!(session.awaiting_command());

    session.skip_to_line(1).await;
    assert!(!session.awaiting_command());

    session.pause().await;
    assert!(session.awaiting_command());

    session.stop().await;
    assert!(!session.awaiting_command());
}

#[tokio::test(start_paused = true)]
async fn test_setAutoAdvance_midLine_shouldStopAfterCurrentLine() {
    let (session, recorder) = session_with(Arc::new(ScriptedSynthesizer::new(100)));

    session
        .start(layout_from_lines(&[TEN_WORDS, "two", "three"]), 0, VoiceSettings::default(), true)
        .await;
    sleep(Duration::from_millis(200)).await;
    session.set_auto_advance(false).await;
    sleep(Duration::from_secs(5)).await;

    assert_eq!(recorder.line_changes(), vec![0]);
    assert_eq!(recorder.count("autoAdvanceChanged"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_setVoiceSettings_shouldApplyFromNextLine() {
    let synthesizer = Arc::new(ScriptedSynthesizer::new(100));
    let (session, recorder) = session_with(synthesizer.clone());

    session
        .start(
            layout_from_lines(&["one two", "three four", "five six"]),
            0,
            VoiceSettings::default().with_rate(1.0),
            true,
        )
        .await;
    sleep(Duration::from_millis(50)).await;
    session
        .set_voice_settings(VoiceSettings::default().with_rate(1.5).with_voice_type(VoiceType::Child))
        .await;
    sleep(Duration::from_secs(10)).await;

    let requests = synthesizer.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].rate, 1.0);
    assert_eq!(requests[0].voice_type, VoiceType::Narrator);
    assert_eq!(requests[1].rate, 1.5);
    assert_eq!(requests[2].voice_type, VoiceType::Child);
    assert_eq!(recorder.count("voiceSettingsChanged"), 1);
    assert_eq!(session.get_status().voice_settings.and_then(|v| v.rate), Some(1.5));
}

#[tokio::test(start_paused = true)]
async fn test_lineCharacter_shouldReachSynthesisRequest() {
    let synthesizer = Arc::new(ScriptedSynthesizer::new(100));
    let (session, _recorder) = session_with(synthesizer.clone());

    let mut layout = layout_from_lines(&["Who goes there"]);
    layout.pages[0].lines[0].character = Some("antagonist".to_string());
    session.start(layout, 0, VoiceSettings::default(), true).await;
    sleep(Duration::from_secs(2)).await;

    assert_eq!(synthesizer.requests()[0].character.as_deref(), Some("antagonist"));
}

#[tokio::test(start_paused = true)]
async fn test_lineWithoutTimings_shouldWaitDefaultDuration() {
    let (session, recorder) = session_with(Arc::new(ScriptedSynthesizer::new(100)));

    session
        .start(layout_from_lines(&["   ", "after"]), 0, VoiceSettings::default(), true)
        .await;

    sleep(Duration::from_millis(2200)).await;
    assert_eq!(recorder.line_changes(), vec![0]);

    sleep(Duration::from_millis(500)).await;
    assert_eq!(recorder.line_changes(), vec![0, 1]);
}

#[tokio::test(start_paused = true)]
async fn test_start_shouldTraverseAllPagesWithDocumentPositions() {
    let (session, recorder) = session_with(Arc::new(ScriptedSynthesizer::new(100)));

    let layout = layout_from_pages(&[&["page zero a", "page zero b"], &[], &["page two a"]]);
    session.start(layout, 0, VoiceSettings::default(), true).await;
    sleep(Duration::from_secs(10)).await;

    let pages: Vec<(usize, usize)> = recorder
        .events()
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::LineChange {
                line_index,
                page_index,
                total_lines,
                ..
            } => {
                assert_eq!(*total_lines, 3);
                Some((*line_index, *page_index))
            }
            _ => None,
        })
        .collect();
    assert_eq!(pages, vec![(0, 0), (1, 0), (2, 2)]);
    assert_eq!(recorder.count("documentComplete"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_start_beyondEnd_shouldCompleteImmediately() {
    let (session, recorder) = session_with(Arc::new(ScriptedSynthesizer::new(100)));

    session
        .start(layout_from_lines(&["only line"]), 5, VoiceSettings::default(), true)
        .await;
    sleep(Duration::from_millis(10)).await;

    assert_eq!(recorder.types(), vec!["documentComplete"]);
}

#[tokio::test(start_paused = true)]
async fn test_start_whilePlaying_shouldReplaceRun() {
    let (session, recorder) = session_with(Arc::new(ScriptedSynthesizer::new(100)));

    session
        .start(layout_from_lines(&[TEN_WORDS, TEN_WORDS]), 0, VoiceSettings::default(), true)
        .await;
    sleep(Duration::from_millis(300)).await;
    session
        .start(layout_from_lines(&["fresh start"]), 0, VoiceSettings::default(), true)
        .await;
    sleep(Duration::from_secs(10)).await;

    let texts: Vec<String> = recorder
        .events()
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::LineChange { line, .. } => Some(line.text.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(texts, vec![TEN_WORDS.to_string(), "fresh start".to_string()]);
    assert_eq!(recorder.count("documentComplete"), 1);
    assert_eq!(session.get_status().total_lines, 1);
}

#[tokio::test(start_paused = true)]
async fn test_failingSubscribers_shouldNotHaltSession() {
    let (session, recorder) = session_with(Arc::new(ScriptedSynthesizer::new(100)));
    session.subscribe(Arc::new(FnSubscriber::new(|event: &PlaybackEvent| {
        if event.event_type() == "lineChange" {
            panic!("observer crashed");
        }
        Err(SubscriberError::DeliveryFailed("observer offline".to_string()))
    })));

    session
        .start(layout_from_lines(&["one", "two"]), 0, VoiceSettings::default(), true)
        .await;
    sleep(Duration::from_secs(5)).await;

    assert_eq!(recorder.line_changes(), vec![0, 1]);
    assert_eq!(recorder.count("documentComplete"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unsubscribe_shouldStopDeliveryToThatSubscriber() {
    let (session, recorder) = session_with(Arc::new(ScriptedSynthesizer::new(100)));
    let late = EventRecorder::new();
    let id = session.subscribe(late.clone());

    session
        .start(layout_from_lines(&[TEN_WORDS, "two"]), 0, VoiceSettings::default(), true)
        .await;
    sleep(Duration::from_millis(100)).await;
    assert!(session.unsubscribe(id));
    sleep(Duration::from_secs(5)).await;

    assert_eq!(late.line_changes(), vec![0]);
    assert_eq!(recorder.line_changes(), vec![0, 1]);
}
