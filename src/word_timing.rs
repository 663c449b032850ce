/*!
 * Word-level timing estimation.
 *
 * Speech recognizers report timestamps per segment, not per word. This module
 * spreads each segment's duration evenly over its words, shrunk by a constant
 * adjustment factor, and numbers the resulting entries across the whole
 * transcript.
 */

use anyhow::Result;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::subtitle_processor::{seconds_to_ms, SubtitleCollection, SubtitleEntry};

/// Default multiplier applied to the even per-word share of a segment (empirical)
pub const DEFAULT_ADJUSTMENT_FACTOR: f64 = 0.955;

/// A contiguous span of recognized speech
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Recognized text
    pub text: String,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
}

impl TranscriptSegment {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }

    /// Whitespace-delimited words, in order
    pub fn words(&self) -> Vec<&str> {
        self.text.split_whitespace().collect()
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// One word with its derived display interval
#[derive(Debug, Clone, PartialEq)]
pub struct WordTiming {
    /// 1-based sequence number, global across segments
    pub index: usize,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// The word itself
    pub word: String,
}

impl WordTiming {
    /// Convert to an SRT entry with millisecond timestamps
    pub fn to_subtitle_entry(&self) -> SubtitleEntry {
        SubtitleEntry::new(
            self.index,
            seconds_to_ms(self.start),
            seconds_to_ms(self.end),
            self.word.clone(),
        )
    }
}

/// Derives per-word timings from transcript segments
#[derive(Debug, Clone)]
pub struct WordTimingEstimator {
    adjustment_factor: f64,
}

impl Default for WordTimingEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_ADJUSTMENT_FACTOR)
    }
}

impl WordTimingEstimator {
    pub fn new(adjustment_factor: f64) -> Self {
        Self { adjustment_factor }
    }

    pub fn adjustment_factor(&self) -> f64 {
        self.adjustment_factor
    }

    /// Intervals for `word_count` words spread over `[start, end]`.
    ///
    /// Word `i` gets `[start + i*d, start + (i+1)*d)` with
    /// `d = (end - start) / word_count * adjustment_factor`. With a factor
    /// below one the last interval ends before `end`; that gap is kept.
    pub fn calculate_word_durations(&self, start: f64, end: f64, word_count: usize) -> Vec<(f64, f64)> {
        if word_count == 0 {
            return Vec::new();
        }

        let total_duration = end - start;
        let word_duration = (total_duration / word_count as f64) * self.adjustment_factor;

        (0..word_count)
            .map(|i| {
                let i = i as f64;
                (start + i * word_duration, start + (i + 1.0) * word_duration)
            })
            .collect()
    }

    /// Timings for one segment, numbered from `first_index`
    pub fn estimate_segment(&self, segment: &TranscriptSegment, first_index: usize) -> Vec<WordTiming> {
        let words = segment.words();
        let intervals = self.calculate_word_durations(segment.start, segment.end, words.len());

        words
            .into_iter()
            .zip(intervals)
            .enumerate()
            .map(|(offset, (word, (start, end)))| WordTiming {
                index: first_index + offset,
                start,
                end,
                word: word.to_string(),
            })
            .collect()
    }

    /// Timings for a whole transcript; indices run from 1 and never reset
    pub fn estimate(&self, segments: &[TranscriptSegment]) -> Vec<WordTiming> {
        let mut timings = Vec::new();

        for segment in segments {
            let next_index = timings.len() + 1;
            let segment_timings = self.estimate_segment(segment, next_index);
            if segment_timings.is_empty() {
                debug!("Segment [{:.3}, {:.3}] has no words, skipping", segment.start, segment.end);
            }
            timings.extend(segment_timings);
        }

        timings
    }

    /// Build the subtitle collection for a transcript
    pub fn to_subtitles(&self, segments: &[TranscriptSegment], source_file: PathBuf, language: &str) -> SubtitleCollection {
        let mut collection = SubtitleCollection::new(source_file, language.to_string());
        collection.entries = self
            .estimate(segments)
            .iter()
            .map(WordTiming::to_subtitle_entry)
            .collect();
        collection
    }

    /// Write the word-by-word SRT for a transcript, returning the entry count
    pub fn write_srt<P: AsRef<Path>>(
        &self,
        segments: &[TranscriptSegment],
        source_file: PathBuf,
        language: &str,
        output_path: P,
    ) -> Result<usize> {
        let collection = self.to_subtitles(segments, source_file, language);
        collection.write_to_srt(output_path)?;
        Ok(collection.entries.len())
    }
}
