/*!
 * # narravid - Narrated videos with word-level subtitles
 *
 * A Rust library that turns a plain text file into a narrated video.
 *
 * ## Features
 *
 * - Synthesize speech from text with a local voice engine:
 *   - espeak-ng
 *   - Piper
 * - Transcribe the synthesized audio:
 *   - Local whisper CLI
 *   - OpenAI-compatible transcription API
 * - Derive word-by-word subtitle timings from segment timestamps
 * - Loop a base video to cover the narration and mux both with ffmpeg
 * - Optional layered pitch-shift voice effect
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle_processor`: SRT entries, timestamps, reading and writing
 * - `word_timing`: Word-level timing estimation from transcript segments
 * - `speech`: Speech synthesis engines and voice selection
 * - `transcription`: Speech recognition backends
 * - `video_composer`: Base video looping and audio muxing
 * - `voice_effect`: Optional audio post-processing
 * - `process_runner`: Child processes with timeouts
 * - `file_utils`: File system operations
 * - `app_controller`: Main pipeline controller
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod file_utils;
pub mod subtitle_processor;
pub mod word_timing;
pub mod speech;
pub mod transcription;
pub mod video_composer;
pub mod voice_effect;
pub mod process_runner;
pub mod app_controller;
pub mod language_utils;
pub mod errors;

// Re-export main types for easier usage
pub use app_config::Config;
pub use subtitle_processor::{SubtitleCollection, SubtitleEntry};
pub use word_timing::{TranscriptSegment, WordTiming, WordTimingEstimator};
pub use speech::{SpeechEngine, SpeechSynthesizer, Voice};
pub use transcription::{Transcriber, Transcript};
pub use video_composer::{LoopPlan, MediaBackend, VideoComposer};
pub use app_controller::{Controller, FolderSummary, PipelineOutput};
pub use language_utils::{get_language_name, normalize_to_part2t, voice_marker_for};
pub use errors::{CompositionError, SpeechError, TranscriptionError};
