use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::errors::SpeechError;
use crate::process_runner::run_with_timeout;
use super::{engine_error, SpeechEngine, Voice};

/// Piper command line engine. Each configured `.onnx` model is one voice.
#[derive(Debug, Clone)]
pub struct PiperEngine {
    command: String,
    models: Vec<PathBuf>,
    timeout_secs: u64,
}

/// Subset of the `<model>.onnx.json` sidecar Piper ships with every voice
#[derive(Debug, Deserialize)]
struct ModelConfig {
    #[serde(default)]
    language: Option<ModelLanguage>,
}

#[derive(Debug, Deserialize)]
struct ModelLanguage {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    name_english: Option<String>,
}

impl PiperEngine {
    pub fn new(command: impl Into<String>, models: Vec<PathBuf>, timeout_secs: u64) -> Self {
        Self {
            command: command.into(),
            models,
            timeout_secs,
        }
    }

    /// Describe one model file, reading its sidecar config when present
    pub fn describe_model(model: &Path) -> Voice {
        let stem = model
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| model.display().to_string());

        let sidecar = PathBuf::from(format!("{}.json", model.display()));
        let language = std::fs::read_to_string(&sidecar)
            .ok()
            .and_then(|content| serde_json::from_str::<ModelConfig>(&content).ok())
            .and_then(|config| config.language);

        let (name, code) = match language {
            Some(ModelLanguage { code, name_english: Some(english) }) => (format!("{} ({})", english, stem), code),
            Some(ModelLanguage { code, name_english: None }) => (stem.clone(), code),
            None => {
                debug!("No readable sidecar config for Piper model {:?}", model);
                (stem.clone(), None)
            }
        };

        Voice {
            id: model.display().to_string(),
            name,
            language: code,
        }
    }
}

#[async_trait]
impl SpeechEngine for PiperEngine {
    fn name(&self) -> &str {
        "piper"
    }

    async fn list_voices(&self) -> Result<Vec<Voice>, SpeechError> {
        Ok(self.models.iter().map(|m| Self::describe_model(m)).collect())
    }

    async fn synthesize(&self, text: &str, voice: Option<&Voice>, output_path: &Path) -> Result<(), SpeechError> {
        // Piper has no built-in voice; the first model is the default
        let model = match voice {
            Some(voice) => voice.id.clone(),
            None => self
                .models
                .first()
                .map(|m| m.display().to_string())
                .ok_or_else(|| SpeechError::EngineFailed {
                    engine: self.name().to_string(),
                    message: "no voice model configured".to_string(),
                })?,
        };

        let mut command = Command::new(&self.command);
        command
            .args(["--model", &model])
            .arg("--output_file")
            .arg(output_path);

        run_with_timeout(command, self.timeout_secs, Some(text))
            .await
            .map_err(|e| engine_error(self.name(), e))?;

        Ok(())
    }
}
