use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;

use crate::errors::TranscriptionError;
use super::{parse_whisper_json, Transcriber, Transcript};

/// Client for an OpenAI-compatible transcription endpoint
#[derive(Debug, Clone)]
pub struct OpenAiTranscriber {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// Base URL, e.g. `https://api.openai.com/v1`
    endpoint: String,
    /// Model name, e.g. `whisper-1`
    model: String,
    /// Optional ISO 639-1 language hint
    language: Option<String>,
    /// Request timeout in seconds
    timeout_secs: u64,
}

impl OpenAiTranscriber {
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        language: Option<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: model.into(),
            language,
            timeout_secs,
        }
    }

    /// Full URL of the transcription route
    pub fn transcriptions_url(&self) -> String {
        format!("{}/audio/transcriptions", self.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    fn name(&self) -> &str {
        "openai"
    }

    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript, TranscriptionError> {
        let audio = tokio::fs::read(audio_path).await.map_err(|e| {
            TranscriptionError::RequestFailed(format!("cannot read {}: {}", audio_path.display(), e))
        })?;

        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.wav".to_string());
        let part = Part::bytes(audio)
            .file_name(file_name)
            .mime_str("audio/wav")
            .map_err(|e| TranscriptionError::RequestFailed(e.to_string()))?;

        let mut form = Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");
        if let Some(language) = &self.language {
            form = form.text("language", language.clone());
        }

        info!("Transcribing {:?} with {} model '{}'", audio_path, self.name(), self.model);
        let response = self.client
            .post(self.transcriptions_url())
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TranscriptionError::Timeout(self.timeout_secs)
                } else {
                    TranscriptionError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Transcription API error ({}): {}", status, error_text);
            return Err(TranscriptionError::ApiError {
                status_code: status.as_u16(),
                message: error_text,
            });
        }

        let body = response.text().await
            .map_err(|e| TranscriptionError::ParseError(e.to_string()))?;
        let transcript = parse_whisper_json(&body)?;
        debug!("Transcription API returned {} segments", transcript.segments.len());
        Ok(transcript)
    }
}
