/*!
 * End-to-end tests of the narration pipeline with mock engines
 */

use anyhow::Result;
use narravid::app_controller::Controller;
use narravid::errors::CompositionError;
use narravid::word_timing::TranscriptSegment;
use crate::common;
use crate::common::mock_engines::{MockMediaBackend, MockSpeechEngine, MockTranscriber};

const HOLA_MUNDO_SRT: &str = "1\n00:00:00,000 --> 00:00:00,955\nhola\n\n2\n00:00:00,955 --> 00:00:01,910\nmundo\n\n";

/// Test a complete run producing audio, video and subtitles
#[tokio::test]
async fn test_run_withValidInput_shouldProduceAllOutputs() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    let config = common::test_config(&dir);
    common::create_test_video(&dir, "base_video.mp4")?;
    let input = common::create_test_file(&dir, "story.txt", "  hola mundo\n")?;
    let output_dir = dir.join("output");

    let speech = MockSpeechEngine::new();
    let speech_calls = speech.calls();
    let backend = MockMediaBackend::new(10.0, 3.0);
    let jobs = backend.jobs();
    let mut controller = Controller::with_engines(
        config,
        Box::new(speech),
        Box::new(MockTranscriber::hola_mundo()),
        Box::new(backend),
    )?;

    let output = controller.run(&input, &output_dir, false).await?.expect("pipeline output");

    assert_eq!(output.audio, output_dir.join("output_audio.wav"));
    assert_eq!(output.video, output_dir.join("output_video.mp4"));
    assert_eq!(output.subtitles, output_dir.join("output_video.srt"));
    assert_eq!(output.subtitle_entries, 2);
    assert_eq!(output.loop_repetitions, 4);
    assert!(output.audio.is_file());
    assert!(output.video.is_file());
    assert_eq!(std::fs::read_to_string(&output.subtitles)?, HOLA_MUNDO_SRT);

    let speech_calls = speech_calls.lock().unwrap();
    assert_eq!(speech_calls.len(), 1);
    assert_eq!(speech_calls[0].text, "hola mundo");
    assert_eq!(speech_calls[0].voice_id.as_deref(), Some("es"));

    let jobs = jobs.lock().unwrap();
    assert_eq!(jobs[0].audio, output.audio);
    assert_eq!(jobs[0].base_video, dir.join("base_video.mp4"));

    Ok(())
}

/// Test that a missing base video aborts before subtitles without crashing
#[tokio::test]
async fn test_run_withMissingBaseVideo_shouldFailWithoutVideoOrSubtitles() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    let config = common::test_config(&dir);
    let input = common::create_test_file(&dir, "story.txt", "hola mundo")?;
    let output_dir = dir.join("output");

    let transcriber = MockTranscriber::hola_mundo();
    let transcriber_calls = transcriber.calls();
    let mut controller = Controller::with_engines(
        config,
        Box::new(MockSpeechEngine::new()),
        Box::new(transcriber),
        Box::new(MockMediaBackend::new(10.0, 3.0)),
    )?;

    let error = controller.run(&input, &output_dir, false).await.unwrap_err();

    assert!(matches!(
        error.downcast_ref::<CompositionError>(),
        Some(CompositionError::MissingVideo(_))
    ));
    assert!(output_dir.join("output_audio.wav").is_file());
    assert!(!output_dir.join("output_video.mp4").exists());
    assert!(!output_dir.join("output_video.srt").exists());
    assert!(transcriber_calls.lock().unwrap().is_empty());

    Ok(())
}

/// Test that an engine leaving no audio stops the run
#[tokio::test]
async fn test_run_withSilentSpeechEngine_shouldFailBeforeComposition() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    common::create_test_video(&dir, "base_video.mp4")?;
    let input = common::create_test_file(&dir, "story.txt", "hola mundo")?;

    let backend = MockMediaBackend::new(10.0, 3.0);
    let jobs = backend.jobs();
    let mut controller = Controller::with_engines(
        common::test_config(&dir),
        Box::new(MockSpeechEngine::new().without_output()),
        Box::new(MockTranscriber::hola_mundo()),
        Box::new(backend),
    )?;

    let result = controller.run(&input, &dir.join("output"), false).await;

    assert!(result.is_err());
    assert!(jobs.lock().unwrap().is_empty());

    Ok(())
}

/// Test that missing or empty input files are skipped quietly
#[tokio::test]
async fn test_run_withEmptyOrMissingText_shouldReturnNone() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    common::create_test_video(&dir, "base_video.mp4")?;
    let empty = common::create_test_file(&dir, "empty.txt", "   \n")?;
    let output_dir = dir.join("output");

    let speech = MockSpeechEngine::new();
    let speech_calls = speech.calls();
    let mut controller = Controller::with_engines(
        common::test_config(&dir),
        Box::new(speech),
        Box::new(MockTranscriber::hola_mundo()),
        Box::new(MockMediaBackend::new(10.0, 3.0)),
    )?;

    assert!(controller.run(&empty, &output_dir, false).await?.is_none());
    assert!(controller.run(&dir.join("missing.txt"), &output_dir, false).await?.is_none());
    assert!(speech_calls.lock().unwrap().is_empty());
    assert!(!output_dir.exists());

    Ok(())
}

/// Test that a transcript without speech yields an empty subtitle file
#[tokio::test]
async fn test_run_withSilentTranscript_shouldWriteEmptySubtitles() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    common::create_test_video(&dir, "base_video.mp4")?;
    let input = common::create_test_file(&dir, "story.txt", "...")?;

    let mut controller = Controller::with_engines(
        common::test_config(&dir),
        Box::new(MockSpeechEngine::new()),
        Box::new(MockTranscriber::new(Vec::new())),
        Box::new(MockMediaBackend::new(1.0, 3.0)),
    )?;

    let output = controller.run(&input, &dir.join("output"), false).await?.expect("pipeline output");

    assert_eq!(output.subtitle_entries, 0);
    assert_eq!(output.loop_repetitions, 1);
    assert_eq!(std::fs::read_to_string(&output.subtitles)?, "");

    Ok(())
}

/// Test that a transcription failure leaves the video but no subtitles
#[tokio::test]
async fn test_run_withTranscriptionFailure_shouldKeepVideoAndFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    common::create_test_video(&dir, "base_video.mp4")?;
    let input = common::create_test_file(&dir, "story.txt", "hola mundo")?;
    let output_dir = dir.join("output");

    let mut controller = Controller::with_engines(
        common::test_config(&dir),
        Box::new(MockSpeechEngine::new()),
        Box::new(MockTranscriber::failing()),
        Box::new(MockMediaBackend::new(10.0, 3.0)),
    )?;

    assert!(controller.run(&input, &output_dir, false).await.is_err());
    assert!(output_dir.join("output_video.mp4").is_file());
    assert!(!output_dir.join("output_video.srt").exists());

    Ok(())
}

/// Test the configurable adjustment factor flowing through the pipeline
#[tokio::test]
async fn test_generate_subtitles_withCustomFactor_shouldStretchWords() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    let audio = common::create_test_file(&dir, "narration.wav", "audio")?;
    let srt = dir.join("narration.srt");

    let mut config = common::test_config(&dir);
    config.subtitle.adjustment_factor = 1.0;
    let controller = Controller::with_engines(
        config,
        Box::new(MockSpeechEngine::new()),
        Box::new(MockTranscriber::new(vec![TranscriptSegment::new("uno dos", 0.0, 2.0)])),
        Box::new(MockMediaBackend::new(2.0, 3.0)),
    )?;

    let count = controller.generate_subtitles(&audio, &srt).await?;

    assert_eq!(count, 2);
    let content = std::fs::read_to_string(&srt)?;
    assert!(content.contains("00:00:01,000 --> 00:00:02,000\ndos"));

    Ok(())
}

/// Test that an explicit voice marker picks the matching voice for the run
#[tokio::test]
async fn test_run_withVoiceMarker_shouldNarrateWithMatchingVoice() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    common::create_test_video(&dir, "base_video.mp4")?;
    let input = common::create_test_file(&dir, "story.txt", "hello world")?;

    let mut config = common::test_config(&dir);
    config.language = "en".to_string();
    config.speech.voice_marker = Some("GREAT BRITAIN".to_string());

    let speech = MockSpeechEngine::new();
    let speech_calls = speech.calls();
    let mut controller = Controller::with_engines(
        config,
        Box::new(speech),
        Box::new(MockTranscriber::hola_mundo()),
        Box::new(MockMediaBackend::new(10.0, 3.0)),
    )?;

    controller.run(&input, &dir.join("output"), false).await?.expect("pipeline output");

    let speech_calls = speech_calls.lock().unwrap();
    assert_eq!(speech_calls.len(), 1);
    assert_eq!(speech_calls[0].voice_id.as_deref(), Some("en"));

    Ok(())
}
