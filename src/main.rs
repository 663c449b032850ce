// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use narravid::app_config::{self, Config, SpeechProvider};
use narravid::Controller;

/// CLI Wrapper for SpeechProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliSpeechEngine {
    Espeak,
    Piper,
}

impl From<CliSpeechEngine> for SpeechProvider {
    fn from(cli_engine: CliSpeechEngine) -> Self {
        match cli_engine {
            CliSpeechEngine::Espeak => SpeechProvider::Espeak,
            CliSpeechEngine::Piper => SpeechProvider::Piper,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

/// Options shared by every command that loads the configuration
#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    /// Narration language code (e.g., 'es', 'en', 'fr')
    #[arg(long, global = true)]
    language: Option<String>,

    /// Speech engine to use
    #[arg(short = 'e', long, value_enum, global = true)]
    engine: Option<CliSpeechEngine>,

    /// Substring of the voice name to narrate with
    #[arg(long, global = true)]
    voice: Option<String>,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Text file or directory of text files to narrate (defaults to the configured input directory)
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Output directory (defaults to the configured one)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Video looped under the narration
    #[arg(short, long)]
    base_video: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Fraction of the even per-word share each subtitle word is shown for
    #[arg(long)]
    adjustment_factor: Option<f64>,

    /// Layer pitch-shifted copies over the narration
    #[arg(long)]
    voice_effect: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Narrate a text file into a video with subtitles (default command)
    Run(RunArgs),

    /// Transcribe an audio file into word-by-word subtitles
    Subtitles {
        /// Narration audio to transcribe
        #[arg(value_name = "AUDIO")]
        audio: PathBuf,

        /// Subtitle file to write (defaults to the audio path with .srt)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fraction of the even per-word share each subtitle word is shown for
        #[arg(long)]
        adjustment_factor: Option<f64>,
    },

    /// Loop a video under an audio track
    Compose {
        /// Narration audio
        #[arg(value_name = "AUDIO")]
        audio: PathBuf,

        /// Base video to loop
        #[arg(value_name = "VIDEO")]
        video: PathBuf,

        /// Output video path
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// List the voices offered by the speech engine
    Voices,

    /// Generate shell completions for narravid
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// narravid - Narrated videos from text
///
/// Turns a text file into a narrated video with word-by-word subtitles.
#[derive(Parser, Debug)]
#[command(name = "narravid")]
#[command(version = "0.1.0")]
#[command(about = "Text to narrated video with word-level subtitles")]
#[command(long_about = "narravid synthesizes speech from a text file, loops a base video under it and
writes a word-by-word SRT subtitle track from a transcription of the narration.

EXAMPLES:
    narravid story.txt                          # Narrate using default config
    narravid -f story.txt                       # Force overwrite existing outputs
    narravid -b loop.mp4 -o out/ story.txt      # Pick base video and output directory
    narravid --language en story.txt            # Narrate in English
    narravid texts/                             # Narrate every .txt file in a directory
    narravid subtitles narration.wav -o out.srt # Subtitles only
    narravid compose narration.wav loop.mp4 video.mp4
    narravid voices                             # List engine voices
    narravid completions bash > narravid.bash   # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

REQUIREMENTS:
    espeak-ng or piper   - speech synthesis
    whisper              - local transcription (or an OpenAI API key)
    ffmpeg and ffprobe   - video composition")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    config: ConfigArgs,

    /// Text file or directory of text files to narrate
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Output directory (defaults to the configured one)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Video looped under the narration
    #[arg(short, long)]
    base_video: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Fraction of the even per-word share each subtitle word is shown for
    #[arg(long)]
    adjustment_factor: Option<f64>,

    /// Layer pitch-shifted copies over the narration
    #[arg(long)]
    voice_effect: bool,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger::new(level)))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji and ANSI color for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌ ", "1;31"),
            Level::Warn => ("🚧 ", "1;33"),
            Level::Info => (" ", "1;32"),
            Level::Debug => ("🔍 ", "1;36"),
            Level::Trace => ("📋 ", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (emoji, color) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {} {}\x1B[0m", color, now, emoji, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Start permissive, the effective level is set once the config is loaded
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();
    let config_args = cli.config.clone();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "narravid", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Run(args)) => run_narration(&config_args, args).await,
        Some(Commands::Subtitles { audio, output, adjustment_factor }) => {
            let mut config = load_config(&config_args)?;
            if let Some(factor) = adjustment_factor {
                config.subtitle.adjustment_factor = factor;
            }
            finalize_config(&config, &config_args)?;

            let output = output.unwrap_or_else(|| audio.with_extension("srt"));
            let controller = Controller::with_config(config)?;
            let count = controller.generate_subtitles(&audio, &output).await?;
            info!("Wrote {} subtitle entries to {:?}", count, output);
            Ok(())
        }
        Some(Commands::Compose { audio, video, output }) => {
            let config = load_config(&config_args)?;
            finalize_config(&config, &config_args)?;

            let controller = Controller::with_config(config)?;
            let composition = controller.compose(&audio, &video, &output).await?;
            info!(
                "Wrote {:?} ({} loop(s), {:.2}s)",
                composition.output, composition.plan.repetitions, composition.plan.target_duration
            );
            Ok(())
        }
        Some(Commands::Voices) => {
            let config = load_config(&config_args)?;
            finalize_config(&config, &config_args)?;

            let controller = Controller::with_config(config)?;
            let voices = controller.list_voices().await?;
            if voices.is_empty() {
                warn!("The speech engine reported no voices");
            }
            let mut stdout = std::io::stdout();
            for voice in voices {
                writeln!(
                    stdout,
                    "{:<24} {:<32} {}",
                    voice.id,
                    voice.name,
                    voice.language.as_deref().unwrap_or("-")
                )?;
            }
            Ok(())
        }
        None => {
            // Default behavior - use top-level args
            let run_args = RunArgs {
                input_path: cli.input_path,
                output_dir: cli.output_dir,
                base_video: cli.base_video,
                force_overwrite: cli.force_overwrite,
                adjustment_factor: cli.adjustment_factor,
                voice_effect: cli.voice_effect,
            };
            run_narration(&config_args, run_args).await
        }
    }
}

/// Load the configuration file, creating a default one when absent, and
/// apply the shared command line overrides
fn load_config(options: &ConfigArgs) -> Result<Config> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        log::set_max_level(level_filter(&cmd_log_level.clone().into()));
    }

    let config_path = &options.config_path;
    let mut config = if Path::new(config_path).exists() {
        let file = File::open(config_path)
            .context(format!("Failed to open config file: {}", config_path))?;

        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {}", config_path))?
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);

        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;

        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;

        config
    };

    if let Some(language) = &options.language {
        config.language = language.clone();
    }

    if let Some(engine) = &options.engine {
        config.speech.engine = engine.clone().into();
    }

    if let Some(voice) = &options.voice {
        config.speech.voice_marker = Some(voice.clone());
    }

    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    Ok(config)
}

/// Validate the configuration and apply its log level
fn finalize_config(config: &Config, options: &ConfigArgs) -> Result<()> {
    config.validate()
        .context("Configuration validation failed")?;

    // If log level was not set via command line, update it from config now
    if options.log_level.is_none() {
        log::set_max_level(level_filter(&config.log_level));
    }

    Ok(())
}

async fn run_narration(config_args: &ConfigArgs, options: RunArgs) -> Result<()> {
    let mut config = load_config(config_args)?;

    if let Some(base_video) = &options.base_video {
        config.paths.base_video = base_video.clone();
    }

    if let Some(output_dir) = &options.output_dir {
        config.paths.output_dir = output_dir.clone();
    }

    if let Some(factor) = options.adjustment_factor {
        config.subtitle.adjustment_factor = factor;
    }

    if options.voice_effect {
        config.speech.voice_effect = true;
    }

    finalize_config(&config, config_args)?;

    let output_dir = config.paths.output_dir.clone();
    let input_path = options.input_path.unwrap_or_else(|| config.paths.input_dir.clone());
    let mut controller = Controller::with_config(config)?;

    if input_path.is_file() {
        match controller.run(&input_path, &output_dir, options.force_overwrite).await? {
            Some(output) => {
                info!("Video: {:?}", output.video);
                info!("Subtitles: {:?} ({} words)", output.subtitles, output.subtitle_entries);
            }
            None => warn!("Nothing was generated for {:?}", input_path),
        }
    } else if input_path.is_dir() {
        let summary = controller
            .run_folder(&input_path, &output_dir, options.force_overwrite)
            .await?;
        if summary.failed > 0 {
            return Err(anyhow!("{} file(s) failed to narrate", summary.failed));
        }
    } else {
        return Err(anyhow!("Input path does not exist: {:?}", input_path));
    }

    Ok(())
}
