/*!
 * Application configuration: the `conf.json` model with defaults,
 * provider selection and validation.
 */

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::PathBuf;
use url::Url;

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Narration language code (ISO)
    #[serde(default = "default_language")]
    pub language: String,

    /// Input and output locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Speech synthesis config
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Transcription config
    #[serde(default)]
    pub transcription: TranscriptionConfig,

    /// Subtitle timing config
    #[serde(default)]
    pub subtitle: SubtitleConfig,

    /// Video composition config
    #[serde(default)]
    pub video: VideoConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Speech engine type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpeechProvider {
    // @provider: espeak-ng
    #[default]
    Espeak,
    // @provider: Piper neural TTS
    Piper,
}

impl SpeechProvider {
    // @returns: Capitalized engine name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Espeak => "eSpeak NG",
            Self::Piper => "Piper",
        }
    }

    // @returns: Lowercase engine identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Espeak => "espeak".to_string(),
            Self::Piper => "piper".to_string(),
        }
    }
}

impl std::fmt::Display for SpeechProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for SpeechProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "espeak" | "espeak-ng" => Ok(Self::Espeak),
            "piper" => Ok(Self::Piper),
            _ => Err(anyhow!("Invalid speech engine: {}", s)),
        }
    }
}

/// Transcription backend type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionProvider {
    // @provider: Local whisper CLI
    #[default]
    Whisper,
    // @provider: OpenAI-compatible transcription API
    OpenAI,
}

impl TranscriptionProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Whisper => "Whisper",
            Self::OpenAI => "OpenAI",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Whisper => "whisper".to_string(),
            Self::OpenAI => "openai".to_string(),
        }
    }
}

impl std::fmt::Display for TranscriptionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranscriptionProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "whisper" => Ok(Self::Whisper),
            "openai" => Ok(Self::OpenAI),
            _ => Err(anyhow!("Invalid transcription provider: {}", s)),
        }
    }
}

/// Where inputs are read from and outputs are written to
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PathsConfig {
    /// Directory holding uploaded text files
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    /// Directory receiving audio, video and subtitle outputs
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Video looped under the narration
    #[serde(default = "default_base_video")]
    pub base_video: PathBuf,

    /// File name of the synthesized audio inside the output directory
    #[serde(default = "default_audio_file_name")]
    pub audio_file_name: String,

    /// File name of the composed video inside the output directory
    #[serde(default = "default_video_file_name")]
    pub video_file_name: String,

    /// File name of the subtitle track inside the output directory
    #[serde(default = "default_subtitle_file_name")]
    pub subtitle_file_name: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            base_video: default_base_video(),
            audio_file_name: default_audio_file_name(),
            video_file_name: default_video_file_name(),
            subtitle_file_name: default_subtitle_file_name(),
        }
    }
}

/// Speech synthesis settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpeechConfig {
    /// Engine to synthesize with
    #[serde(default)]
    pub engine: SpeechProvider,

    /// Executable path, empty for the engine's default binary name
    #[serde(default = "String::new")]
    pub command: String,

    /// Substring searched in voice names; derived from `language` when unset
    #[serde(default)]
    pub voice_marker: Option<String>,

    /// Speaking rate in words per minute (espeak only)
    #[serde(default)]
    pub rate: Option<u32>,

    /// Piper voice model files (.onnx)
    #[serde(default)]
    pub piper_models: Vec<PathBuf>,

    /// Apply the layered pitch-shift effect to the narration
    #[serde(default)]
    pub voice_effect: bool,

    /// Timeout seconds for one synthesis call
    #[serde(default = "default_speech_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            engine: SpeechProvider::default(),
            command: String::new(),
            voice_marker: None,
            rate: None,
            piper_models: Vec::new(),
            voice_effect: false,
            timeout_secs: default_speech_timeout_secs(),
        }
    }
}

impl SpeechConfig {
    /// Get the executable for the configured engine
    pub fn get_command(&self) -> String {
        if !self.command.is_empty() {
            return self.command.clone();
        }

        match self.engine {
            SpeechProvider::Espeak => "espeak-ng".to_string(),
            SpeechProvider::Piper => "piper".to_string(),
        }
    }
}

/// Transcription settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranscriptionConfig {
    /// Transcription backend to use
    #[serde(default)]
    pub provider: TranscriptionProvider,

    /// Model name ("base" for whisper, "whisper-1" for OpenAI)
    #[serde(default = "String::new")]
    pub model: String,

    /// whisper executable path
    #[serde(default = "default_whisper_command")]
    pub command: String,

    /// API key for the service
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Service endpoint URL
    #[serde(default = "default_openai_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_transcription_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            provider: TranscriptionProvider::default(),
            model: String::new(),
            command: default_whisper_command(),
            api_key: String::new(),
            endpoint: default_openai_endpoint(),
            timeout_secs: default_transcription_timeout_secs(),
        }
    }
}

impl TranscriptionConfig {
    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if !self.model.is_empty() {
            return self.model.clone();
        }

        match self.provider {
            TranscriptionProvider::Whisper => default_whisper_model(),
            TranscriptionProvider::OpenAI => default_openai_model(),
        }
    }
}

/// Configuration for subtitle generation
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SubtitleConfig {
    /// Multiplier applied to the even per-word share of a segment
    #[serde(default = "default_adjustment_factor")]
    pub adjustment_factor: f64,
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            adjustment_factor: default_adjustment_factor(),
        }
    }
}

/// Configuration for the ffmpeg based composer
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VideoConfig {
    /// ffmpeg video encoder
    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    /// ffmpeg audio encoder
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// ffmpeg executable
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: String,

    /// ffprobe executable
    #[serde(default = "default_ffprobe")]
    pub ffprobe_path: String,

    /// Timeout seconds for one encode
    #[serde(default = "default_encode_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            video_codec: default_video_codec(),
            audio_codec: default_audio_codec(),
            ffmpeg_path: default_ffmpeg(),
            ffprobe_path: default_ffprobe(),
            timeout_secs: default_encode_timeout_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_language() -> String {
    "es".to_string()
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("input")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_base_video() -> PathBuf {
    PathBuf::from("input/base_video.mp4")
}

fn default_audio_file_name() -> String {
    "output_audio.wav".to_string()
}

fn default_video_file_name() -> String {
    "output_video.mp4".to_string()
}

fn default_subtitle_file_name() -> String {
    "output_video.srt".to_string()
}

fn default_speech_timeout_secs() -> u64 {
    300
}

fn default_transcription_timeout_secs() -> u64 {
    900
}

fn default_encode_timeout_secs() -> u64 {
    1800
}

fn default_whisper_command() -> String {
    "whisper".to_string()
}

fn default_whisper_model() -> String {
    "base".to_string()
}

fn default_openai_model() -> String {
    "whisper-1".to_string()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_adjustment_factor() -> f64 {
    0.955
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let _language_name = crate::language_utils::get_language_name(&self.language)?;

        let factor = self.subtitle.adjustment_factor;
        if !factor.is_finite() || factor <= 0.0 {
            return Err(anyhow!("Subtitle adjustment factor must be a positive number, got {}", factor));
        }

        if self.speech.engine == SpeechProvider::Piper && self.speech.piper_models.is_empty() {
            return Err(anyhow!("At least one voice model is required for the Piper engine"));
        }

        if self.transcription.provider == TranscriptionProvider::OpenAI {
            if self.transcription.api_key.is_empty() {
                return Err(anyhow!("Transcription API key is required for OpenAI provider"));
            }
            Url::parse(&self.transcription.endpoint)
                .map_err(|e| anyhow!("Invalid transcription endpoint '{}': {}", self.transcription.endpoint, e))?;
        }

        if self.video.video_codec.trim().is_empty() || self.video.audio_codec.trim().is_empty() {
            return Err(anyhow!("Both a video and an audio codec must be configured"));
        }

        Ok(())
    }

    /// Voice marker configured explicitly, or derived from the language
    pub fn get_voice_marker(&self) -> Result<String> {
        match &self.speech.voice_marker {
            Some(marker) if !marker.trim().is_empty() => Ok(marker.trim().to_lowercase()),
            _ => crate::language_utils::voice_marker_for(&self.language),
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            language: default_language(),
            paths: PathsConfig::default(),
            speech: SpeechConfig::default(),
            transcription: TranscriptionConfig::default(),
            subtitle: SubtitleConfig::default(),
            video: VideoConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
