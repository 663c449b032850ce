use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tokio::process::Command;

use crate::errors::SpeechError;
use crate::process_runner::run_with_timeout;
use super::{engine_error, SpeechEngine, Voice};

// Pty Language Age/Gender VoiceName File [Other Languages]
static VOICE_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+)\s+(\S+)\s+(\S+)\s+(\S+)\s+(\S+)").unwrap()
});

/// espeak-ng command line engine
#[derive(Debug, Clone)]
pub struct EspeakEngine {
    command: String,
    rate: Option<u32>,
    timeout_secs: u64,
}

impl EspeakEngine {
    pub fn new(command: impl Into<String>, rate: Option<u32>, timeout_secs: u64) -> Self {
        Self {
            command: command.into(),
            rate,
            timeout_secs,
        }
    }

    /// Parse the table printed by `espeak-ng --voices`
    pub fn parse_voice_list(output: &str) -> Vec<Voice> {
        output
            .lines()
            .filter_map(|line| VOICE_LINE_REGEX.captures(line))
            .map(|caps| Voice {
                id: caps[2].to_string(),
                name: caps[4].replace('_', " "),
                language: Some(caps[2].to_string()),
            })
            .collect()
    }
}

#[async_trait]
impl SpeechEngine for EspeakEngine {
    fn name(&self) -> &str {
        "espeak-ng"
    }

    async fn list_voices(&self) -> Result<Vec<Voice>, SpeechError> {
        let mut command = Command::new(&self.command);
        command.arg("--voices");

        let output = run_with_timeout(command, self.timeout_secs, None)
            .await
            .map_err(|e| engine_error(self.name(), e))?;

        Ok(Self::parse_voice_list(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn synthesize(&self, text: &str, voice: Option<&Voice>, output_path: &Path) -> Result<(), SpeechError> {
        let mut command = Command::new(&self.command);
        if let Some(voice) = voice {
            command.args(["-v", &voice.id]);
        }
        if let Some(rate) = self.rate {
            command.args(["-s", &rate.to_string()]);
        }
        command.arg("-w").arg(output_path).arg("--stdin");

        run_with_timeout(command, self.timeout_secs, Some(text))
            .await
            .map_err(|e| engine_error(self.name(), e))?;

        Ok(())
    }
}
