/*!
 * Speech recognition backends.
 *
 * - `whisper_cli`: the local openai-whisper command line tool
 * - `openai`: an OpenAI-compatible `/audio/transcriptions` endpoint
 *
 * Both report whisper-style segments, which feed the word timing estimator.
 */

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt::Debug;
use std::path::Path;

use crate::app_config::{TranscriptionConfig, TranscriptionProvider};
use crate::errors::TranscriptionError;
use crate::word_timing::TranscriptSegment;

pub mod openai;
pub mod whisper_cli;

pub use openai::OpenAiTranscriber;
pub use whisper_cli::WhisperCli;

/// Result of one transcription pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    /// Segments in playback order
    pub segments: Vec<TranscriptSegment>,
    /// Language detected or used by the engine
    pub language: Option<String>,
}

/// Common trait for all transcription backends
#[async_trait]
pub trait Transcriber: Send + Sync + Debug {
    /// Backend identifier used in logs
    fn name(&self) -> &str;

    /// Transcribe an audio file. No speech yields an empty transcript.
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript, TranscriptionError>;
}

/// Create the backend named by the configuration.
/// `language` is passed to the engine as a recognition hint.
pub fn create_transcriber(config: &TranscriptionConfig, language: &str) -> Box<dyn Transcriber> {
    let language = crate::language_utils::normalize_to_part1_or_part2t(language).ok();

    match config.provider {
        TranscriptionProvider::Whisper => Box::new(WhisperCli::new(
            config.command.clone(),
            config.get_model(),
            language,
            config.timeout_secs,
        )),
        TranscriptionProvider::OpenAI => Box::new(OpenAiTranscriber::new(
            config.api_key.clone(),
            config.endpoint.clone(),
            config.get_model(),
            language,
            config.timeout_secs,
        )),
    }
}

/// Whisper JSON document, as written by the CLI and returned as `verbose_json`
#[derive(Debug, Deserialize)]
struct WhisperDocument {
    #[serde(default)]
    segments: Vec<WhisperSegment>,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    #[serde(default)]
    text: String,
}

/// Parse whisper-style JSON into a transcript
pub fn parse_whisper_json(content: &str) -> Result<Transcript, TranscriptionError> {
    let document: WhisperDocument = serde_json::from_str(content)
        .map_err(|e| TranscriptionError::ParseError(e.to_string()))?;

    let segments = document
        .segments
        .into_iter()
        .map(|s| TranscriptSegment::new(s.text.trim(), s.start, s.end))
        .collect();

    Ok(Transcript {
        segments,
        language: document.language,
    })
}
