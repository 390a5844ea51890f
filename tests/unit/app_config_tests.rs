/*!
 * Tests for application configuration
 */

use readaloud::app_config::{Config, LogLevel, SpeechBackendKind};
use readaloud::speech::VoiceCharacteristics;

use crate::common::{create_temp_dir, create_test_file};

#[test]
fn test_default_config_shouldValidate() {
    let config = Config::default();

    assert!(config.validate().is_ok());
    assert_eq!(config.speech.backend, SpeechBackendKind::Mock);
    assert!(config.speech.cache_enabled);
    assert_eq!(config.speech.segment_gap_ms, 200);
    assert_eq!(config.playback.poll_interval_ms, 100);
    assert_eq!(config.playback.inter_line_pause_ms, 500);
    assert_eq!(config.playback.error_cooldown_ms, 1000);
    assert_eq!(config.log_level, LogLevel::Info);
}

#[test]
fn test_backend_kind_fromStr_shouldBeCaseInsensitive() {
    assert_eq!("HTTP".parse::<SpeechBackendKind>().unwrap(), SpeechBackendKind::Http);
    assert_eq!("mock".parse::<SpeechBackendKind>().unwrap(), SpeechBackendKind::Mock);
    assert!("espeak".parse::<SpeechBackendKind>().is_err());
    assert_eq!(SpeechBackendKind::Http.to_string(), "http");
    assert_eq!(SpeechBackendKind::Http.display_name(), "HTTP");
}

#[test]
fn test_log_level_shouldMapToFilter() {
    assert_eq!(LogLevel::Warn.to_level_filter(), log::LevelFilter::Warn);
    assert_eq!(LogLevel::Trace.to_level_filter(), log::LevelFilter::Trace);
}

#[test]
fn test_validate_withZeroValues_shouldFail() {
    let mut config = Config::default();
    config.speech.timeout_secs = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.playback.poll_interval_ms = 0;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("playback.poll_interval_ms"));
}

#[test]
fn test_validate_withHttpBackend_shouldCheckEndpointScheme() {
    let mut config = Config::default();
    config.speech.backend = SpeechBackendKind::Http;
    config.speech.endpoint = "ftp://speech.local/tts".to_string();
    assert!(config.validate().is_err());

    config.speech.endpoint = "https://speech.local/tts".to_string();
    tokio_test::assert_ok!(config.validate());
}

#[test]
fn test_validate_withBadVoice_shouldNameTheField() {
    let mut config = Config::default();
    config.voices.insert(
        "giant".to_string(),
        VoiceCharacteristics {
            speed: Some(-1.0),
            ..Default::default()
        },
    );
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("voices.giant.speed"));

    let mut config = Config::default();
    config.voices.insert(
        "scot".to_string(),
        VoiceCharacteristics {
            tld: Some("co..uk".to_string()),
            ..Default::default()
        },
    );
    assert!(config.validate().unwrap_err().to_string().contains("voices.scot.tld"));
}

#[tokio::test]
async fn test_load_or_create_withMissingFile_shouldWriteDefaults() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("readaloud.json");

    let config = Config::load_or_create(&path).await.unwrap();

    assert!(path.exists());
    assert_eq!(config.speech.endpoint, Config::default().speech.endpoint);
    let reloaded = Config::load_or_create(&path).await.unwrap();
    assert_eq!(reloaded.speech.audio_dir, config.speech.audio_dir);
}

#[tokio::test]
async fn test_load_or_create_withPartialFile_shouldFillDefaults() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(
        dir.path(),
        "config.json",
        r#"{"playback": {"poll_interval_ms": 20}, "voices": {"bard": {"lang": "eng", "slow": true}}}"#,
    )
    .unwrap();

    let config = Config::load_or_create(&path).await.unwrap();

    assert_eq!(config.playback.poll_interval_ms, 20);
    assert_eq!(config.playback.default_line_duration_ms, 2000);
    assert_eq!(config.voices["bard"].slow, Some(true));
    assert!(config.validate().is_ok());
}

#[tokio::test]
async fn test_load_or_create_withMalformedFile_shouldFail() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(dir.path(), "config.json", "{ not json").unwrap();
    tokio_test::assert_err!(Config::load_or_create(&path).await);
}
