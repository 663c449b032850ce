/*!
 * Mock engine implementations for testing
 *
 * These stand in for espeak-ng, whisper and ffmpeg so the pipeline can be
 * exercised without any external tool installed. Each mock records the
 * calls it receives and returns predetermined results.
 */

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use narravid::errors::{CompositionError, SpeechError, TranscriptionError};
use narravid::speech::{SpeechEngine, Voice};
use narravid::transcription::{Transcriber, Transcript};
use narravid::video_composer::{MediaBackend, RenderJob};
use narravid::word_timing::TranscriptSegment;

/// A synthesis request seen by the mock speech engine
#[derive(Debug, Clone)]
pub struct SynthesisCall {
    pub text: String,
    pub voice_id: Option<String>,
    pub output_path: PathBuf,
}

/// Mock speech engine writing a small placeholder WAV
#[derive(Debug)]
pub struct MockSpeechEngine {
    voices: Vec<Voice>,
    /// Leave no file behind, like an engine failing silently
    write_output: bool,
    /// Fail listing voices
    fail_voice_listing: bool,
    calls: Arc<Mutex<Vec<SynthesisCall>>>,
}

impl MockSpeechEngine {
    pub fn new() -> Self {
        MockSpeechEngine {
            voices: vec![
                Voice {
                    id: "en".to_string(),
                    name: "English (Great Britain)".to_string(),
                    language: Some("en".to_string()),
                },
                Voice {
                    id: "es".to_string(),
                    name: "Spanish (Spain)".to_string(),
                    language: Some("es".to_string()),
                },
            ],
            write_output: true,
            fail_voice_listing: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_voices(mut self, voices: Vec<Voice>) -> Self {
        self.voices = voices;
        self
    }

    pub fn without_output(mut self) -> Self {
        self.write_output = false;
        self
    }

    pub fn failing_voice_listing(mut self) -> Self {
        self.fail_voice_listing = true;
        self
    }

    /// Shared handle on the recorded synthesis calls
    pub fn calls(&self) -> Arc<Mutex<Vec<SynthesisCall>>> {
        self.calls.clone()
    }
}

#[async_trait]
impl SpeechEngine for MockSpeechEngine {
    fn name(&self) -> &str {
        "mock-speech"
    }

    async fn list_voices(&self) -> Result<Vec<Voice>, SpeechError> {
        if self.fail_voice_listing {
            return Err(SpeechError::EngineFailed {
                engine: self.name().to_string(),
                message: "voice listing unavailable".to_string(),
            });
        }
        Ok(self.voices.clone())
    }

    async fn synthesize(&self, text: &str, voice: Option<&Voice>, output_path: &Path) -> Result<(), SpeechError> {
        self.calls.lock().unwrap().push(SynthesisCall {
            text: text.to_string(),
            voice_id: voice.map(|v| v.id.clone()),
            output_path: output_path.to_path_buf(),
        });

        if self.write_output {
            std::fs::write(output_path, b"RIFF....WAVEfmt ").map_err(|e| SpeechError::EngineFailed {
                engine: self.name().to_string(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }
}

/// Mock transcriber returning fixed segments
#[derive(Debug)]
pub struct MockTranscriber {
    segments: Vec<TranscriptSegment>,
    language: Option<String>,
    should_fail: bool,
    calls: Arc<Mutex<Vec<PathBuf>>>,
}

impl MockTranscriber {
    pub fn new(segments: Vec<TranscriptSegment>) -> Self {
        MockTranscriber {
            segments,
            language: Some("es".to_string()),
            should_fail: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Transcriber hearing "hola mundo" over the first two seconds
    pub fn hola_mundo() -> Self {
        Self::new(vec![TranscriptSegment::new("hola mundo", 0.0, 2.0)])
    }

    pub fn failing() -> Self {
        let mut transcriber = Self::new(Vec::new());
        transcriber.should_fail = true;
        transcriber
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<PathBuf>>> {
        self.calls.clone()
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    fn name(&self) -> &str {
        "mock-transcriber"
    }

    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript, TranscriptionError> {
        self.calls.lock().unwrap().push(audio_path.to_path_buf());

        if self.should_fail {
            return Err(TranscriptionError::EngineFailed("mock failure".to_string()));
        }

        Ok(Transcript {
            segments: self.segments.clone(),
            language: self.language.clone(),
        })
    }
}

/// Mock media backend: fixed durations per file extension, renders write a
/// placeholder output file
#[derive(Debug)]
pub struct MockMediaBackend {
    audio_duration: f64,
    video_duration: f64,
    jobs: Arc<Mutex<Vec<RenderJob>>>,
}

impl MockMediaBackend {
    pub fn new(audio_duration: f64, video_duration: f64) -> Self {
        MockMediaBackend {
            audio_duration,
            video_duration,
            jobs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared handle on the recorded render jobs
    pub fn jobs(&self) -> Arc<Mutex<Vec<RenderJob>>> {
        self.jobs.clone()
    }
}

#[async_trait]
impl MediaBackend for MockMediaBackend {
    async fn probe_duration(&self, path: &Path) -> Result<f64, CompositionError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("wav") => Ok(self.audio_duration),
            Some("mp4") => Ok(self.video_duration),
            _ => Err(CompositionError::ProbeFailed {
                path: path.to_path_buf(),
                message: "unknown media type".to_string(),
            }),
        }
    }

    async fn render(&self, job: &RenderJob) -> Result<(), CompositionError> {
        self.jobs.lock().unwrap().push(job.clone());
        std::fs::write(&job.output, b"mock video")
            .map_err(|e| CompositionError::EncodeFailed(e.to_string()))
    }
}
