/*!
 * Layered pitch-shift voice effect.
 *
 * The narration is mixed with copies of itself shifted by a few semitones.
 * Each copy keeps the original duration: the sample rate is scaled to move
 * the pitch, resampled back, then time-stretched by the inverse ratio.
 */

use anyhow::{anyhow, Context, Result};
use log::info;
use serde_json::Value;
use std::path::Path;
use tokio::process::Command;

use crate::app_config::VideoConfig;
use crate::process_runner::run_with_timeout;

/// Semitone shifts layered over the original voice
pub const DEFAULT_PITCH_SHIFTS: [i32; 2] = [3, -2];

/// ffmpeg's atempo filter accepts 0.5..=2.0, which bounds one shift to an octave
const MAX_SHIFT_SEMITONES: i32 = 12;

#[derive(Debug, Clone)]
pub struct VoiceEffect {
    ffmpeg: String,
    ffprobe: String,
    timeout_secs: u64,
    pitch_shifts: Vec<i32>,
}

impl VoiceEffect {
    pub fn new(config: &VideoConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg_path.clone(),
            ffprobe: config.ffprobe_path.clone(),
            timeout_secs: config.timeout_secs,
            pitch_shifts: DEFAULT_PITCH_SHIFTS.to_vec(),
        }
    }

    pub fn with_pitch_shifts(mut self, pitch_shifts: Vec<i32>) -> Self {
        self.pitch_shifts = pitch_shifts;
        self
    }

    /// Frequency ratio for a shift in semitones
    pub fn pitch_ratio(semitones: i32) -> f64 {
        2f64.powf(semitones as f64 / 12.0)
    }

    /// ffmpeg filter graph mixing the original with each shifted copy
    pub fn build_filter_graph(sample_rate: u32, pitch_shifts: &[i32]) -> Result<String> {
        if let Some(shift) = pitch_shifts.iter().find(|s| s.abs() > MAX_SHIFT_SEMITONES) {
            return Err(anyhow!("Pitch shift of {} semitones is out of range", shift));
        }

        let inputs = pitch_shifts.len() + 1;
        let mut graph = format!("[0:a]asplit={}[orig]", inputs);
        for i in 0..pitch_shifts.len() {
            graph.push_str(&format!("[s{}]", i));
        }
        graph.push(';');

        for (i, shift) in pitch_shifts.iter().enumerate() {
            let ratio = Self::pitch_ratio(*shift);
            let shifted_rate = (sample_rate as f64 * ratio).round() as u64;
            graph.push_str(&format!(
                "[s{i}]asetrate={shifted_rate},aresample={sample_rate},atempo={tempo:.6}[p{i}];",
                i = i,
                shifted_rate = shifted_rate,
                sample_rate = sample_rate,
                tempo = 1.0 / ratio,
            ));
        }

        graph.push_str("[orig]");
        for i in 0..pitch_shifts.len() {
            graph.push_str(&format!("[p{}]", i));
        }
        graph.push_str(&format!("amix=inputs={}:duration=first:normalize=0[out]", inputs));

        Ok(graph)
    }

    /// Read the first audio stream's sample rate from ffprobe JSON output
    pub fn parse_sample_rate(json: &str) -> Option<u32> {
        let value: Value = serde_json::from_str(json).ok()?;
        let stream = value.get("streams")?.as_array()?.first()?;
        match stream.get("sample_rate")? {
            Value::String(s) => s.trim().parse().ok(),
            Value::Number(n) => n.as_u64().map(|n| n as u32),
            _ => None,
        }
    }

    async fn probe_sample_rate(&self, input: &Path) -> Result<u32> {
        let mut command = Command::new(&self.ffprobe);
        command
            .args(["-v", "quiet", "-print_format", "json", "-show_streams", "-select_streams", "a:0"])
            .arg(input);

        let output = run_with_timeout(command, self.timeout_secs, None)
            .await
            .with_context(|| format!("Failed to probe {:?}", input))?;

        Self::parse_sample_rate(&String::from_utf8_lossy(&output.stdout))
            .ok_or_else(|| anyhow!("No audio sample rate reported for {:?}", input))
    }

    /// Write the layered version of `input` to `output` as 16-bit WAV
    pub async fn apply(&self, input: &Path, output: &Path) -> Result<()> {
        if self.pitch_shifts.is_empty() {
            std::fs::copy(input, output)
                .with_context(|| format!("Failed to copy {:?} to {:?}", input, output))?;
            return Ok(());
        }

        let sample_rate = self.probe_sample_rate(input).await?;
        let graph = Self::build_filter_graph(sample_rate, &self.pitch_shifts)?;

        info!("Applying voice effect ({:?} semitones) to {:?}", self.pitch_shifts, input);
        let mut command = Command::new(&self.ffmpeg);
        command
            .args(["-y", "-i"])
            .arg(input)
            .args(["-filter_complex", &graph, "-map", "[out]", "-c:a", "pcm_s16le"])
            .arg(output);

        run_with_timeout(command, self.timeout_secs, None)
            .await
            .context("Voice effect rendering failed")?;

        Ok(())
    }
}
