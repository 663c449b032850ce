use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::Value;
use std::fmt::Debug;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::app_config::VideoConfig;
use crate::errors::CompositionError;
use crate::process_runner::{run_with_timeout, ProcessError};

// @module: Base video looping and narration muxing

/// How many copies of the base clip cover the narration
#[derive(Debug, Clone, PartialEq)]
pub struct LoopPlan {
    /// Number of times the clip is appended
    pub repetitions: usize,
    /// Duration of one clip in seconds
    pub clip_duration: f64,
    /// Final output duration in seconds, equal to the audio duration
    pub target_duration: f64,
}

impl LoopPlan {
    /// Duration of the concatenated clips before trimming
    pub fn covered_duration(&self) -> f64 {
        self.repetitions as f64 * self.clip_duration
    }
}

/// Upper bound on clip copies in one plan
pub const MAX_LOOP_REPETITIONS: usize = 100_000;

/// Append the clip until the accumulated duration reaches the audio duration.
///
/// Returns `None` when the clip duration is not a positive finite number,
/// the audio duration is not finite, or covering the audio would take more
/// than `MAX_LOOP_REPETITIONS` copies.
pub fn plan_loops(audio_duration: f64, clip_duration: f64) -> Option<LoopPlan> {
    if !clip_duration.is_finite() || clip_duration <= 0.0 || !audio_duration.is_finite() {
        return None;
    }

    if audio_duration / clip_duration > MAX_LOOP_REPETITIONS as f64 {
        warn!(
            "A {}s clip would need more than {} copies to cover {}s of audio",
            clip_duration, MAX_LOOP_REPETITIONS, audio_duration
        );
        return None;
    }

    let mut repetitions = 0;
    let mut current_duration = 0.0;
    while current_duration < audio_duration {
        repetitions += 1;
        current_duration += clip_duration;
    }

    Some(LoopPlan {
        repetitions,
        clip_duration,
        target_duration: audio_duration.max(0.0),
    })
}

/// Everything an encoder needs to produce the output video
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub base_video: PathBuf,
    pub audio: PathBuf,
    pub output: PathBuf,
    pub plan: LoopPlan,
    pub video_codec: String,
    pub audio_codec: String,
}

/// Media probing and encoding backend
#[async_trait]
pub trait MediaBackend: Send + Sync + Debug {
    /// Duration of a media file in seconds
    async fn probe_duration(&self, path: &Path) -> Result<f64, CompositionError>;

    /// Concatenate `plan.repetitions` copies of the base video, trim to
    /// `plan.target_duration`, attach the audio and encode to `output`
    async fn render(&self, job: &RenderJob) -> Result<(), CompositionError>;
}

/// ffmpeg/ffprobe command line backend
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg: String,
    ffprobe: String,
    timeout_secs: u64,
}

impl FfmpegBackend {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            timeout_secs,
        }
    }

    pub fn from_config(config: &VideoConfig) -> Self {
        Self::new(config.ffmpeg_path.clone(), config.ffprobe_path.clone(), config.timeout_secs)
    }

    /// Read `format.duration` from ffprobe JSON output
    pub fn parse_probe_duration(json: &str) -> Option<f64> {
        let value: Value = serde_json::from_str(json).ok()?;
        let duration = value.get("format")?.get("duration")?;

        // ffprobe prints numbers as strings
        match duration {
            Value::String(s) => s.trim().parse().ok(),
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// One concat demuxer line per repetition
    pub fn concat_list(clip: &Path, repetitions: usize) -> String {
        let escaped = clip.display().to_string().replace('\'', r"'\''");
        let mut list = String::new();
        for _ in 0..repetitions {
            list.push_str(&format!("file '{}'\n", escaped));
        }
        list
    }
}

#[async_trait]
impl MediaBackend for FfmpegBackend {
    async fn probe_duration(&self, path: &Path) -> Result<f64, CompositionError> {
        let mut command = Command::new(&self.ffprobe);
        command
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path);

        let output = run_with_timeout(command, self.timeout_secs, None)
            .await
            .map_err(|e| CompositionError::ProbeFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        Self::parse_probe_duration(&stdout).ok_or_else(|| CompositionError::ProbeFailed {
            path: path.to_path_buf(),
            message: "ffprobe reported no duration".to_string(),
        })
    }

    async fn render(&self, job: &RenderJob) -> Result<(), CompositionError> {
        let clip = std::fs::canonicalize(&job.base_video)
            .map_err(|e| CompositionError::EncodeFailed(format!("cannot resolve base video: {}", e)))?;

        let work_dir = tempfile::tempdir()
            .map_err(|e| CompositionError::EncodeFailed(format!("cannot create temp dir: {}", e)))?;
        let list_path = work_dir.path().join("clips.txt");
        {
            let file = File::create(&list_path)
                .map_err(|e| CompositionError::EncodeFailed(format!("cannot write concat list: {}", e)))?;
            let mut writer = BufWriter::new(file);
            writer
                .write_all(Self::concat_list(&clip, job.plan.repetitions).as_bytes())
                .and_then(|_| writer.flush())
                .map_err(|e| CompositionError::EncodeFailed(format!("cannot write concat list: {}", e)))?;
        }

        let mut command = Command::new(&self.ffmpeg);
        command
            .args(["-y", "-f", "concat", "-safe", "0", "-i"])
            .arg(&list_path)
            .arg("-i")
            .arg(&job.audio)
            .args(["-map", "0:v:0", "-map", "1:a:0"])
            .args(["-t", &format!("{:.3}", job.plan.target_duration)])
            .args(["-c:v", &job.video_codec, "-c:a", &job.audio_codec])
            .arg(&job.output);

        run_with_timeout(command, self.timeout_secs, None)
            .await
            .map_err(|e| match e {
                ProcessError::Timeout { secs, .. } => {
                    CompositionError::EncodeFailed(format!("ffmpeg timed out after {} seconds", secs))
                }
                other => CompositionError::EncodeFailed(other.to_string()),
            })?;

        Ok(())
    }
}

/// Result of a successful composition
#[derive(Debug, Clone)]
pub struct Composition {
    pub output: PathBuf,
    pub plan: LoopPlan,
}

/// Loops a base video under narration audio
#[derive(Debug)]
pub struct VideoComposer {
    backend: Box<dyn MediaBackend>,
    video_codec: String,
    audio_codec: String,
}

impl VideoComposer {
    pub fn new(backend: Box<dyn MediaBackend>, config: &VideoConfig) -> Self {
        Self {
            backend,
            video_codec: config.video_codec.clone(),
            audio_codec: config.audio_codec.clone(),
        }
    }

    pub fn backend(&self) -> &dyn MediaBackend {
        self.backend.as_ref()
    }

    /// Compose `output` from the looped `base_video` and `audio`.
    ///
    /// A missing base video or audio file is reported as a typed error
    /// before anything is written.
    pub async fn attach_audio_to_video(
        &self,
        audio: &Path,
        base_video: &Path,
        output: &Path,
    ) -> Result<Composition, CompositionError> {
        if !base_video.is_file() {
            warn!("The video file {:?} does not exist.", base_video);
            return Err(CompositionError::MissingVideo(base_video.to_path_buf()));
        }

        if !audio.is_file() {
            warn!("The audio file {:?} does not exist.", audio);
            return Err(CompositionError::MissingAudio(audio.to_path_buf()));
        }

        let audio_duration = self.backend.probe_duration(audio).await?;
        if !audio_duration.is_finite() || audio_duration <= 0.0 {
            return Err(CompositionError::InvalidDuration {
                path: audio.to_path_buf(),
                duration: audio_duration,
            });
        }

        let clip_duration = self.backend.probe_duration(base_video).await?;
        let plan = plan_loops(audio_duration, clip_duration).ok_or_else(|| CompositionError::InvalidDuration {
            path: base_video.to_path_buf(),
            duration: clip_duration,
        })?;

        info!(
            "Looping {:?} {} time(s) ({:.2}s clip) to cover {:.2}s of narration",
            base_video, plan.repetitions, plan.clip_duration, plan.target_duration
        );

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| CompositionError::EncodeFailed(format!("cannot create {}: {}", parent.display(), e)))?;
            }
        }
        if output.exists() {
            std::fs::remove_file(output)
                .map_err(|e| CompositionError::EncodeFailed(format!("cannot replace {}: {}", output.display(), e)))?;
        }

        let job = RenderJob {
            base_video: base_video.to_path_buf(),
            audio: audio.to_path_buf(),
            output: output.to_path_buf(),
            plan: plan.clone(),
            video_codec: self.video_codec.clone(),
            audio_codec: self.audio_codec.clone(),
        };
        self.backend.render(&job).await?;

        if !output.is_file() {
            return Err(CompositionError::EncodeFailed(format!(
                "encoder finished but {} was not created",
                output.display()
            )));
        }

        debug!("Composed video written to {:?}", output);
        Ok(Composition {
            output: output.to_path_buf(),
            plan,
        })
    }
}
