use async_trait::async_trait;
use log::{debug, info};
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::errors::TranscriptionError;
use crate::process_runner::{run_with_timeout, ProcessError};
use super::{parse_whisper_json, Transcriber, Transcript};

/// Local `whisper` command line tool
#[derive(Debug, Clone)]
pub struct WhisperCli {
    command: String,
    model: String,
    language: Option<String>,
    timeout_secs: u64,
}

impl WhisperCli {
    pub fn new(command: impl Into<String>, model: impl Into<String>, language: Option<String>, timeout_secs: u64) -> Self {
        Self {
            command: command.into(),
            model: model.into(),
            language,
            timeout_secs,
        }
    }

    /// JSON file whisper writes for `audio_path` into `output_dir`
    pub fn json_output_path(audio_path: &Path, output_dir: &Path) -> PathBuf {
        let stem = audio_path.file_stem().unwrap_or_default().to_string_lossy();
        output_dir.join(format!("{}.json", stem))
    }
}

#[async_trait]
impl Transcriber for WhisperCli {
    fn name(&self) -> &str {
        "whisper"
    }

    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript, TranscriptionError> {
        if !audio_path.is_file() {
            return Err(TranscriptionError::EngineFailed(format!(
                "audio file does not exist: {}",
                audio_path.display()
            )));
        }

        let output_dir = tempfile::tempdir()
            .map_err(|e| TranscriptionError::EngineFailed(format!("cannot create temp dir: {}", e)))?;

        let mut command = Command::new(&self.command);
        command
            .arg(audio_path)
            .args(["--model", &self.model])
            .args(["--output_format", "json"])
            .arg("--output_dir")
            .arg(output_dir.path())
            .args(["--verbose", "False"]);
        if let Some(language) = &self.language {
            command.args(["--language", language]);
        }

        info!("Transcribing {:?} with whisper model '{}'", audio_path, self.model);
        run_with_timeout(command, self.timeout_secs, None)
            .await
            .map_err(|e| match e {
                ProcessError::Timeout { secs, .. } => TranscriptionError::Timeout(secs),
                other => TranscriptionError::EngineFailed(other.to_string()),
            })?;

        let json_path = Self::json_output_path(audio_path, output_dir.path());
        let content = tokio::fs::read_to_string(&json_path).await.map_err(|e| {
            TranscriptionError::EngineFailed(format!("whisper wrote no output at {}: {}", json_path.display(), e))
        })?;

        let transcript = parse_whisper_json(&content)?;
        debug!("whisper returned {} segments", transcript.segments.len());
        Ok(transcript)
    }
}
