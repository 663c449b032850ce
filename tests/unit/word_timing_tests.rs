/*!
 * Tests for word-level timing estimation
 */

use std::path::PathBuf;
use anyhow::Result;
use narravid::subtitle_processor::SubtitleCollection;
use narravid::word_timing::{TranscriptSegment, WordTimingEstimator, DEFAULT_ADJUSTMENT_FACTOR};
use crate::common;

const EPSILON: f64 = 1e-9;

/// Test the canonical two word example
#[test]
fn test_estimate_withHolaMundo_shouldMatchExpectedEntries() {
    let estimator = WordTimingEstimator::default();
    let segments = vec![TranscriptSegment::new("hola mundo", 0.0, 2.0)];

    let collection = estimator.to_subtitles(&segments, PathBuf::from("audio.wav"), "es");

    assert_eq!(collection.entries.len(), 2);

    let first = &collection.entries[0];
    assert_eq!(first.seq_num, 1);
    assert_eq!(first.format_start_time(), "00:00:00,000");
    assert_eq!(first.format_end_time(), "00:00:00,955");
    assert_eq!(first.text, "hola");

    let second = &collection.entries[1];
    assert_eq!(second.seq_num, 2);
    assert_eq!(second.format_start_time(), "00:00:00,955");
    assert_eq!(second.format_end_time(), "00:00:01,910");
    assert_eq!(second.text, "mundo");
}

/// Test that one entry is produced per word with the expected start times
#[test]
fn test_estimate_withFiveWords_shouldSpreadWordsEvenly() {
    let estimator = WordTimingEstimator::default();
    let segment = TranscriptSegment::new("uno dos tres cuatro cinco", 1.5, 4.0);

    let timings = estimator.estimate(&[segment.clone()]);

    assert_eq!(timings.len(), 5);
    let word_duration = segment.duration() / 5.0 * DEFAULT_ADJUSTMENT_FACTOR;
    for (i, timing) in timings.iter().enumerate() {
        let expected_start = 1.5 + i as f64 * word_duration;
        assert!((timing.start - expected_start).abs() < EPSILON, "word {} starts at {}", i, timing.start);
        assert!((timing.end - (expected_start + word_duration)).abs() < EPSILON);
    }

    // The last word ends before the segment does
    let last = timings.last().unwrap();
    assert!(last.end < segment.end);
}

/// Test that indices run across segment boundaries
#[test]
fn test_estimate_withMultipleSegments_shouldUseGlobalIndices() {
    let estimator = WordTimingEstimator::default();
    let segments = vec![
        TranscriptSegment::new("érase una vez", 0.0, 1.5),
        TranscriptSegment::new("un gato", 1.5, 2.5),
        TranscriptSegment::new("negro", 2.5, 3.0),
    ];

    let timings = estimator.estimate(&segments);

    let indices: Vec<usize> = timings.iter().map(|t| t.index).collect();
    assert_eq!(indices, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(timings[3].word, "un");
    assert!((timings[3].start - 1.5).abs() < EPSILON);
    assert_eq!(timings[5].word, "negro");
}

/// Test that a segment without words contributes nothing
#[test]
fn test_estimate_withEmptySegment_shouldSkipItWithoutBreakingIndices() {
    let estimator = WordTimingEstimator::default();
    let segments = vec![
        TranscriptSegment::new("hola", 0.0, 1.0),
        TranscriptSegment::new("   ", 1.0, 2.0),
        TranscriptSegment::new("adiós", 2.0, 3.0),
    ];

    let timings = estimator.estimate(&segments);

    assert_eq!(timings.len(), 2);
    assert_eq!(timings[1].index, 2);
    assert_eq!(timings[1].word, "adiós");
}

/// Test that a zero-duration segment yields zero-width entries
#[test]
fn test_estimate_withZeroDurationSegment_shouldProduceZeroWidthEntries() {
    let estimator = WordTimingEstimator::default();
    let segments = vec![TranscriptSegment::new("rápido ya", 5.0, 5.0)];

    let collection = estimator.to_subtitles(&segments, PathBuf::from("audio.wav"), "es");

    assert_eq!(collection.entries.len(), 2);
    for entry in &collection.entries {
        assert_eq!(entry.start_time_ms, 5000);
        assert_eq!(entry.end_time_ms, 5000);
    }
}

/// Test custom adjustment factors
#[test]
fn test_calculate_word_durations_withUnitFactor_shouldFillSegment() {
    let estimator = WordTimingEstimator::new(1.0);

    let intervals = estimator.calculate_word_durations(0.0, 3.0, 3);

    assert_eq!(intervals.len(), 3);
    assert!((intervals[2].1 - 3.0).abs() < EPSILON);
    assert_eq!(estimator.adjustment_factor(), 1.0);
}

/// Test that no words give no intervals
#[test]
fn test_calculate_word_durations_withZeroWords_shouldReturnEmpty() {
    let estimator = WordTimingEstimator::default();
    assert!(estimator.calculate_word_durations(0.0, 10.0, 0).is_empty());
}

/// Test writing and reading back the subtitle file
#[test]
fn test_write_srt_withSegments_shouldRoundTripThroughParser() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let srt_path = temp_dir.path().join("out").join("narration.srt");
    let estimator = WordTimingEstimator::default();
    let segments = vec![
        TranscriptSegment::new("hola mundo", 0.0, 2.0),
        TranscriptSegment::new("otra vez", 2.0, 3.0),
    ];

    let count = estimator.write_srt(&segments, PathBuf::from("audio.wav"), "es", &srt_path)?;
    assert_eq!(count, 4);

    let parsed = SubtitleCollection::parse_srt_file(&srt_path)?;
    let expected = estimator.to_subtitles(&segments, PathBuf::from("audio.wav"), "es");
    assert_eq!(parsed, expected.entries);

    let content = std::fs::read_to_string(&srt_path)?;
    assert!(content.starts_with("1\n00:00:00,000 --> 00:00:00,955\nhola\n\n"));

    Ok(())
}

/// Test that an empty transcript produces an empty file
#[test]
fn test_write_srt_withNoSegments_shouldWriteEmptyFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let srt_path = temp_dir.path().join("empty.srt");

    let count = WordTimingEstimator::default().write_srt(&[], PathBuf::from("audio.wav"), "es", &srt_path)?;

    assert_eq!(count, 0);
    assert!(srt_path.exists());
    assert_eq!(std::fs::read_to_string(&srt_path)?, "");

    Ok(())
}

/// Test that a rewrite replaces the previous content
#[test]
fn test_write_srt_withExistingFile_shouldOverwrite() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let srt_path = common::create_test_file(&temp_dir.path().to_path_buf(), "old.srt", "stale content")?;

    WordTimingEstimator::default().write_srt(
        &[TranscriptSegment::new("nuevo", 0.0, 1.0)],
        PathBuf::from("audio.wav"),
        "es",
        &srt_path,
    )?;

    let content = std::fs::read_to_string(&srt_path)?;
    assert!(!content.contains("stale"));
    assert!(content.contains("nuevo"));

    Ok(())
}
