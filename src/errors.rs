/*!
 * Error types for the narravid application.
 *
 * This module contains custom error types for the different pipeline stages,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while synthesizing speech
#[derive(Error, Debug)]
pub enum SpeechError {
    /// The engine finished but no audio file exists at the expected path
    #[error("No audio file was created at {}", path.display())]
    MissingAudioOutput {
        /// Path where the audio was expected
        path: PathBuf,
    },

    /// The engine process could not be started or exited with an error
    #[error("Speech engine '{engine}' failed: {message}")]
    EngineFailed {
        /// Engine identifier
        engine: String,
        /// Error details, usually filtered stderr
        message: String,
    },

    /// The engine did not finish in time
    #[error("Speech engine timed out after {0} seconds")]
    Timeout(u64),
}

/// Errors that can occur during transcription
#[derive(Error, Debug)]
pub enum TranscriptionError {
    /// Error when making an API request fails
    #[error("Transcription request failed: {0}")]
    RequestFailed(String),

    /// Error when the engine output cannot be parsed
    #[error("Failed to parse transcription output: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// The local transcription process failed
    #[error("Transcription engine failed: {0}")]
    EngineFailed(String),

    /// The engine did not finish in time
    #[error("Transcription timed out after {0} seconds")]
    Timeout(u64),
}

/// Errors that can occur while composing the output video
#[derive(Error, Debug)]
pub enum CompositionError {
    /// The base video does not exist
    #[error("Base video file does not exist: {}", .0.display())]
    MissingVideo(PathBuf),

    /// The narration audio does not exist
    #[error("Audio file does not exist: {}", .0.display())]
    MissingAudio(PathBuf),

    /// A media duration could not be determined
    #[error("Failed to probe media duration for {}: {message}", path.display())]
    ProbeFailed {
        /// Probed file
        path: PathBuf,
        /// Error details
        message: String,
    },

    /// A probed duration is zero or negative, so it cannot be looped
    #[error("Invalid media duration {duration} for {}", path.display())]
    InvalidDuration {
        /// Probed file
        path: PathBuf,
        /// Reported duration in seconds
        duration: f64,
    },

    /// Encoding the final video failed
    #[error("Video encoding failed: {0}")]
    EncodeFailed(String),
}
