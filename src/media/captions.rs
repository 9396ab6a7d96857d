//! Caption file loading.
//!
//! Each caption file holds one utterance:
//! `{ "transcript": "...", "words": [{ "word": "...", "start": 0.0, "end": 0.4 }] }`.
//! Word times are relative to the file; files are sequenced onto one timeline
//! in the order given.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::core::caption::{Speaker, WordSpan};
use crate::core::project::speaker_from_filename;
use crate::core::timeline::{Timeline, TimelineBuilder};

/// Error type for loading project inputs
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid caption JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Caption file has no transcript: {0}")]
    MissingTranscript(PathBuf),
    #[error("Image error in {path}: {message}")]
    Image { path: PathBuf, message: String },
    #[error("Font error in {path}: {message}")]
    Font { path: PathBuf, message: String },
}

#[derive(Debug, Deserialize)]
struct CaptionRecord {
    transcript: Option<String>,
    /// Kept untyped so one malformed word does not reject the file
    #[serde(default)]
    words: Value,
}

fn word_span(value: &Value) -> Option<WordSpan> {
    let word = value.get("word")?.as_str()?;
    let start = value.get("start")?.as_f64()?;
    let end = value.get("end")?.as_f64()?;
    Some(WordSpan::new(word, start, end))
}

/// One parsed caption file, times still relative to the file.
#[derive(Debug, Clone)]
pub struct CaptionFile {
    pub speaker: Speaker,
    pub transcript: String,
    pub words: Vec<WordSpan>,
}

/// Parse caption JSON text. Words with a missing or mistyped field are dropped.
pub fn parse_caption(text: &str, path: &Path) -> Result<CaptionFile, LoadError> {
    let record: CaptionRecord = serde_json::from_str(text).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let transcript = record
        .transcript
        .ok_or_else(|| LoadError::MissingTranscript(path.to_path_buf()))?;

    let words = record
        .words
        .as_array()
        .map(|words| words.iter().filter_map(word_span).collect())
        .unwrap_or_default();

    Ok(CaptionFile {
        speaker: speaker_from_filename(path),
        transcript,
        words,
    })
}

/// Read and parse one caption file.
pub fn load_caption_file(path: &Path) -> Result<CaptionFile, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_caption(&text, path)
}

/// Load and sequence caption files into a timeline.
/// Unreadable or malformed files are skipped with a warning.
#[tracing::instrument(skip(files), fields(count = files.len()))]
pub fn load_timeline(files: &[PathBuf]) -> Timeline {
    let mut builder = TimelineBuilder::new();
    for path in files {
        match load_caption_file(path) {
            Ok(caption) => {
                let entry = builder.push(caption.speaker, caption.words);
                tracing::debug!(
                    path = %path.display(),
                    start = entry.start_time,
                    end = entry.end_time,
                    words = entry.words.len(),
                    "caption loaded"
                );
            }
            Err(e) => tracing::warn!("Skipping caption file: {}", e),
        }
    }
    let timeline = builder.build();
    tracing::info!(
        entries = timeline.len(),
        duration = timeline.total_duration(),
        "caption timeline ready"
    );
    timeline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::timeline::{ENTRY_GAP, UNTIMED_WINDOW};

    #[test]
    fn test_parse_caption_words() {
        let json = r#"{
            "transcript": "hello there",
            "words": [
                {"word": "hello", "start": 0.1, "end": 0.4},
                {"word": "there", "start": 0.5, "end": 0.9},
                {"word": "dropped", "start": 1.0}
            ]
        }"#;
        let caption = parse_caption(json, Path::new("01_stewie.json")).unwrap();
        assert_eq!(caption.speaker, Speaker::B);
        assert_eq!(caption.transcript, "hello there");
        assert_eq!(caption.words.len(), 2);
        assert_eq!(caption.words[1].text, "there");
    }

    #[test]
    fn test_mistyped_word_drops_only_that_word() {
        let json = r#"{
            "transcript": "one two three",
            "words": [
                {"word": "one", "start": 0.0, "end": 0.3},
                {"word": "two", "start": "0.4", "end": 0.6},
                {"word": 3, "start": 0.7, "end": 0.9},
                "three",
                {"word": "three", "start": 1.0, "end": 1.2}
            ]
        }"#;
        let caption = parse_caption(json, Path::new("01_peter.json")).unwrap();
        let texts: Vec<_> = caption.words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, ["one", "three"]);
        assert_eq!(caption.words[1].start, 1.0);
    }

    #[test]
    fn test_non_array_words_means_untimed() {
        let caption =
            parse_caption(r#"{"transcript": "hm", "words": "none"}"#, Path::new("x.json")).unwrap();
        assert!(caption.words.is_empty());
    }

    #[test]
    fn test_missing_transcript_is_rejected() {
        let err = parse_caption(r#"{"words": []}"#, Path::new("x.json")).unwrap_err();
        assert!(matches!(err, LoadError::MissingTranscript(_)));
    }

    #[test]
    fn test_load_timeline_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("01_peter.json");
        let bad = dir.path().join("02_stewie.json");
        let untimed = dir.path().join("03_stewie.json");
        fs::write(
            &good,
            r#"{"transcript":"hi","words":[{"word":"hi","start":0.0,"end":1.0}]}"#,
        )
        .unwrap();
        fs::write(&bad, "not json").unwrap();
        fs::write(&untimed, r#"{"transcript":"..."}"#).unwrap();
        let missing = dir.path().join("04_peter.json");

        let timeline = load_timeline(&[good, bad, untimed, missing]);
        assert_eq!(timeline.len(), 2);

        let entries = timeline.entries();
        assert_eq!(entries[0].speaker, Speaker::A);
        assert_eq!(entries[1].speaker, Speaker::B);
        assert_eq!(entries[1].start_time, 1.0 + ENTRY_GAP);
        assert_eq!(entries[1].duration(), UNTIMED_WINDOW);
    }
}
