/*!
 * Speech synthesis engines.
 *
 * This module contains the engine seam and its implementations:
 * - espeak-ng: formant synthesizer with many installed voices
 * - Piper: neural synthesizer driven by local voice model files
 *
 * `SpeechSynthesizer` owns one engine, picks a voice for the narration
 * language and verifies the audio actually landed on disk.
 */

use async_trait::async_trait;
use log::{debug, info, warn};
use std::fmt::Debug;
use std::path::{Path, PathBuf};

use crate::app_config::{SpeechConfig, SpeechProvider};
use crate::errors::SpeechError;
use crate::process_runner::ProcessError;

pub mod espeak;
pub mod piper;

pub use espeak::EspeakEngine;
pub use piper::PiperEngine;

/// A voice offered by a speech engine
#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    /// Identifier passed back to the engine
    pub id: String,
    /// Human readable name, searched for the language marker
    pub name: String,
    /// Language tag reported by the engine, if any
    pub language: Option<String>,
}

/// Common trait for all speech engines
///
/// Engines are constructed once per process and shared by every request.
#[async_trait]
pub trait SpeechEngine: Send + Sync + Debug {
    /// Engine identifier used in logs and errors
    fn name(&self) -> &str;

    /// Voices available locally
    async fn list_voices(&self) -> Result<Vec<Voice>, SpeechError>;

    /// Render `text` to a WAV file at `output_path`.
    /// `None` selects the engine's default voice.
    async fn synthesize(&self, text: &str, voice: Option<&Voice>, output_path: &Path) -> Result<(), SpeechError>;
}

/// Create the engine named by the configuration
pub fn create_engine(config: &SpeechConfig) -> Box<dyn SpeechEngine> {
    match config.engine {
        SpeechProvider::Espeak => Box::new(EspeakEngine::new(config.get_command(), config.rate, config.timeout_secs)),
        SpeechProvider::Piper => Box::new(PiperEngine::new(
            config.get_command(),
            config.piper_models.clone(),
            config.timeout_secs,
        )),
    }
}

/// First voice whose name contains `marker`, compared case-insensitively
pub fn find_voice<'a>(voices: &'a [Voice], marker: &str) -> Option<&'a Voice> {
    let marker = marker.to_lowercase();
    voices.iter().find(|voice| voice.name.to_lowercase().contains(&marker))
}

/// Map a failed engine process to a speech error
pub(crate) fn engine_error(engine: &str, error: ProcessError) -> SpeechError {
    match error {
        ProcessError::Timeout { secs, .. } => SpeechError::Timeout(secs),
        other => SpeechError::EngineFailed {
            engine: engine.to_string(),
            message: other.to_string(),
        },
    }
}

/// Produces the narration audio for a request
#[derive(Debug)]
pub struct SpeechSynthesizer {
    engine: Box<dyn SpeechEngine>,
    voice: Option<Voice>,
    audio_path: PathBuf,
}

impl SpeechSynthesizer {
    /// Create a synthesizer writing to `audio_path` with the engine default voice
    pub fn new(engine: Box<dyn SpeechEngine>, audio_path: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            voice: None,
            audio_path: audio_path.into(),
        }
    }

    pub fn engine(&self) -> &dyn SpeechEngine {
        self.engine.as_ref()
    }

    pub fn audio_path(&self) -> &Path {
        &self.audio_path
    }

    /// Change where the next narration is written
    pub fn set_audio_path(&mut self, audio_path: impl Into<PathBuf>) {
        self.audio_path = audio_path.into();
    }

    pub fn selected_voice(&self) -> Option<&Voice> {
        self.voice.as_ref()
    }

    /// Select the first voice whose name contains `marker`.
    ///
    /// Not finding one is not fatal: the engine default voice stays in use
    /// and a warning is logged.
    pub async fn select_voice(&mut self, marker: &str) -> Option<&Voice> {
        let voices = match self.engine.list_voices().await {
            Ok(voices) => voices,
            Err(e) => {
                warn!("Could not list {} voices, using the default voice: {}", self.engine.name(), e);
                self.voice = None;
                return None;
            }
        };

        self.voice = find_voice(&voices, marker).cloned();
        match &self.voice {
            Some(voice) => debug!("Selected voice '{}' ({})", voice.name, voice.id),
            None => warn!(
                "No '{}' voice found among {} {} voices; make sure one is installed. Using the default voice.",
                marker,
                voices.len(),
                self.engine.name()
            ),
        }

        self.voice.as_ref()
    }

    /// Synthesize `text` to the configured audio path.
    ///
    /// Fails with `SpeechError::MissingAudioOutput` when the engine returns
    /// without leaving a file behind.
    pub async fn convert_to_speech(&self, text: &str) -> Result<PathBuf, SpeechError> {
        let path = &self.audio_path;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| SpeechError::EngineFailed {
                    engine: self.engine.name().to_string(),
                    message: format!("cannot create {}: {}", parent.display(), e),
                })?;
            }
        }

        // Stale output must not satisfy the check below
        if path.exists() {
            std::fs::remove_file(path).map_err(|e| SpeechError::EngineFailed {
                engine: self.engine.name().to_string(),
                message: format!("cannot replace {}: {}", path.display(), e),
            })?;
        }

        info!("Synthesizing {} characters with {}", text.chars().count(), self.engine.name());
        self.engine.synthesize(text, self.voice.as_ref(), path).await?;

        if !path.is_file() {
            return Err(SpeechError::MissingAudioOutput { path: path.clone() });
        }

        Ok(path.clone())
    }
}
