use anyhow::{anyhow, Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::file_utils::FileManager;
use crate::speech::{self, SpeechEngine, SpeechSynthesizer, Voice};
use crate::transcription::{self, Transcriber};
use crate::video_composer::{Composition, FfmpegBackend, MediaBackend, VideoComposer};
use crate::voice_effect::VoiceEffect;
use crate::word_timing::WordTimingEstimator;

// @module: Application controller for the narration pipeline

/// Files produced by one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Synthesized narration
    pub audio: PathBuf,
    /// Composed video
    pub video: PathBuf,
    /// Word-by-word subtitle track
    pub subtitles: PathBuf,
    /// Number of subtitle entries written
    pub subtitle_entries: usize,
    /// Copies of the base video used to cover the narration
    pub loop_repetitions: usize,
}

/// Outcome counts of a folder run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FolderSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Main application controller: text in, narrated video and subtitles out
#[derive(Debug)]
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Narration engine wrapper
    synthesizer: SpeechSynthesizer,
    // @field: Speech recognition backend
    transcriber: Box<dyn Transcriber>,
    // @field: Video looping and muxing
    composer: VideoComposer,
    // @field: Word timing heuristic
    estimator: WordTimingEstimator,
    // @field: Whether voice selection already ran
    voice_prepared: bool,
}

impl Controller {
    // @method: Create a controller with engines built from the configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let speech_engine = speech::create_engine(&config.speech);
        let transcriber = transcription::create_transcriber(&config.transcription, &config.language);
        let backend = Box::new(FfmpegBackend::from_config(&config.video));
        debug!(
            "Engines: speech {}, transcription {}",
            config.speech.engine.display_name(),
            config.transcription.provider.display_name()
        );

        Self::with_engines(config, speech_engine, transcriber, backend)
    }

    /// Create a controller around explicitly provided engines
    pub fn with_engines(
        config: Config,
        speech_engine: Box<dyn SpeechEngine>,
        transcriber: Box<dyn Transcriber>,
        media_backend: Box<dyn MediaBackend>,
    ) -> Result<Self> {
        let audio_path = config.paths.output_dir.join(&config.paths.audio_file_name);
        let composer = VideoComposer::new(media_backend, &config.video);
        let estimator = WordTimingEstimator::new(config.subtitle.adjustment_factor);

        Ok(Self {
            synthesizer: SpeechSynthesizer::new(speech_engine, audio_path),
            transcriber,
            composer,
            estimator,
            voice_prepared: false,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Voices offered by the speech engine
    pub async fn list_voices(&self) -> Result<Vec<Voice>> {
        Ok(self.synthesizer.engine().list_voices().await?)
    }

    /// Select the narration voice once per controller
    async fn prepare_voice(&mut self) -> Result<()> {
        if self.voice_prepared {
            return Ok(());
        }

        let marker = self.config.get_voice_marker()?;
        let engine_name = self.synthesizer.engine().name().to_string();
        if let Some(voice) = self.synthesizer.select_voice(&marker).await {
            info!("Voice: {} ({})", voice.name, engine_name);
        }
        self.voice_prepared = true;
        Ok(())
    }

    /// Output paths for a run writing into `output_dir`
    fn output_paths(&self, output_dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
        let paths = &self.config.paths;
        (
            output_dir.join(&paths.audio_file_name),
            output_dir.join(&paths.video_file_name),
            output_dir.join(&paths.subtitle_file_name),
        )
    }

    fn remove_stale_outputs(paths: &[&Path]) -> Result<()> {
        for path in paths {
            if path.is_file() {
                debug!("Removing stale output {:?}", path);
                std::fs::remove_file(path)
                    .with_context(|| format!("Failed to remove stale output: {:?}", path))?;
            }
        }
        Ok(())
    }

    fn stage_spinner(multi_progress: &MultiProgress) -> ProgressBar {
        let spinner = multi_progress.add(ProgressBar::new_spinner());
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    }

    /// Run the whole pipeline for one text file.
    ///
    /// Returns `Ok(None)` when there is nothing to do: the input is missing
    /// or empty, or outputs already exist and `force_overwrite` is off.
    pub async fn run(&mut self, input_file: &Path, output_dir: &Path, force_overwrite: bool) -> Result<Option<PipelineOutput>> {
        let multi_progress = MultiProgress::new();
        self.run_with_progress(input_file, output_dir, &multi_progress, force_overwrite).await
    }

    async fn run_with_progress(
        &mut self,
        input_file: &Path,
        output_dir: &Path,
        multi_progress: &MultiProgress,
        force_overwrite: bool,
    ) -> Result<Option<PipelineOutput>> {
        let start_time = Instant::now();
        let (audio_path, video_path, subtitle_path) = self.output_paths(output_dir);

        if !force_overwrite && (video_path.exists() || subtitle_path.exists()) {
            warn!("Skipping {:?}, outputs already exist in {:?} (use -f to force overwrite)", input_file, output_dir);
            return Ok(None);
        }

        let text = match FileManager::read_input_text(input_file)? {
            Some(text) => text,
            None => return Ok(None),
        };

        FileManager::ensure_dir(output_dir)?;
        // A failed run must not leave an earlier video or subtitle track behind
        Self::remove_stale_outputs(&[video_path.as_path(), subtitle_path.as_path()])?;
        self.prepare_voice().await?;

        let spinner = Self::stage_spinner(multi_progress);

        // Speech
        spinner.set_message("Synthesizing speech");
        self.synthesizer.set_audio_path(&audio_path);
        let audio = match self.synthesizer.convert_to_speech(&text).await {
            Ok(audio) => audio,
            Err(e) => {
                spinner.finish_and_clear();
                return Err(e).context("Speech synthesis failed");
            }
        };
        let synthesis_elapsed = start_time.elapsed();

        if self.config.speech.voice_effect {
            spinner.set_message("Applying voice effect");
            if let Err(e) = self.apply_voice_effect(&audio).await {
                spinner.finish_and_clear();
                return Err(e);
            }
        }

        // Video
        spinner.set_message("Composing video");
        let composition = match self.compose(&audio, &self.config.paths.base_video, &video_path).await {
            Ok(composition) => composition,
            Err(e) => {
                spinner.finish_and_clear();
                error!("No video was produced, subtitles are not generated: {}", e);
                return Err(e);
            }
        };

        // Subtitles
        spinner.set_message("Transcribing narration");
        let subtitle_entries = match self.generate_subtitles(&audio, &subtitle_path).await {
            Ok(count) => count,
            Err(e) => {
                spinner.finish_and_clear();
                return Err(e);
            }
        };
        spinner.finish_and_clear();

        let elapsed = start_time.elapsed();
        info!(
            "Narration complete in {}. Speech: {} - Video and subtitles: {}",
            Self::format_duration(elapsed),
            Self::format_duration(synthesis_elapsed),
            Self::format_duration(elapsed.saturating_sub(synthesis_elapsed))
        );

        Ok(Some(PipelineOutput {
            audio,
            video: composition.output,
            subtitles: subtitle_path,
            subtitle_entries,
            loop_repetitions: composition.plan.repetitions,
        }))
    }

    /// Replace the narration with its layered pitch-shifted version
    async fn apply_voice_effect(&self, audio: &Path) -> Result<()> {
        let layered = audio.with_extension("effect.wav");
        VoiceEffect::new(&self.config.video)
            .apply(audio, &layered)
            .await?;
        std::fs::rename(&layered, audio)
            .with_context(|| format!("Failed to replace {:?} with the processed audio", audio))?;
        Ok(())
    }

    /// Loop `base_video` under `audio` into `output`
    pub async fn compose(&self, audio: &Path, base_video: &Path, output: &Path) -> Result<Composition> {
        self.composer
            .attach_audio_to_video(audio, base_video, output)
            .await
            .context("Video composition failed")
    }

    /// Transcribe `audio` and write its word-by-word subtitles to `subtitle_path`
    pub async fn generate_subtitles(&self, audio: &Path, subtitle_path: &Path) -> Result<usize> {
        let transcript = self.transcriber
            .transcribe(audio)
            .await
            .with_context(|| format!("Transcription of {:?} failed", audio))?;

        if transcript.segments.is_empty() {
            warn!("No speech was recognized in {:?}; writing an empty subtitle file", audio);
        }

        let language = transcript.language.as_deref().unwrap_or(&self.config.language);
        let count = self.estimator.write_srt(
            &transcript.segments,
            audio.to_path_buf(),
            language,
            subtitle_path,
        )?;

        debug!("{} subtitle entries from {} segments", count, transcript.segments.len());
        Ok(count)
    }

    /// Process every `.txt` file under `input_dir`, each into its own
    /// subdirectory of `output_root`. Failures are logged and counted.
    pub async fn run_folder(&mut self, input_dir: &Path, output_root: &Path, force_overwrite: bool) -> Result<FolderSummary> {
        let start_time = Instant::now();

        if !FileManager::dir_exists(input_dir) {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let text_files = FileManager::find_files(input_dir, "txt")?;
        if text_files.is_empty() {
            return Err(anyhow!("No text files found in directory: {:?}", input_dir));
        }

        let multi_progress = MultiProgress::new();
        let folder_pb = multi_progress.add(ProgressBar::new(text_files.len() as u64));
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        folder_pb.set_style(template_result);

        let mut summary = FolderSummary::default();

        for text_file in &text_files {
            let stem = text_file
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            folder_pb.set_message(format!("Processing: {}", stem));

            let output_dir = output_root.join(&stem);
            match self.run_with_progress(text_file, &output_dir, &multi_progress, force_overwrite).await {
                Ok(Some(output)) => {
                    info!("{} -> {:?}", stem, output.video);
                    summary.processed += 1;
                }
                Ok(None) => summary.skipped += 1,
                Err(e) => {
                    error!("Error processing {:?}: {:#}", text_file, e);
                    summary.failed += 1;
                }
            }
            folder_pb.inc(1);
        }

        folder_pb.finish_and_clear();
        info!(
            "Processed {} file(s), skipped {}, failed {} in {}",
            summary.processed,
            summary.skipped,
            summary.failed,
            Self::format_duration(start_time.elapsed())
        );

        Ok(summary)
    }

    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
