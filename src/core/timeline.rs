//! Caption timeline: ordered caption entries and time lookups.

use crate::core::caption::{CaptionEntry, Speaker, WordSpan};
use crate::core::time::Seconds;

/// Silence kept after the last caption ends.
pub const TRAILING_BUFFER: Seconds = 1.0;
/// Gap inserted after an entry with word timings.
pub const ENTRY_GAP: Seconds = 0.5;
/// Display window of an entry without word timings.
pub const UNTIMED_WINDOW: Seconds = 3.0;
/// Sequencing advance after an entry without word timings.
pub const UNTIMED_ADVANCE: Seconds = 3.5;
/// Duration used when there are no captions at all.
pub const EMPTY_DURATION: Seconds = 10.0;

/// Immutable sequence of caption entries in non-decreasing start order.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    entries: Vec<CaptionEntry>,
}

impl Timeline {
    /// Create a timeline from already-sequenced entries
    pub fn new(entries: Vec<CaptionEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CaptionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the first entry whose `[start_time, end_time]` contains `t`
    pub fn active_index(&self, t: Seconds) -> Option<usize> {
        self.entries.iter().position(|entry| entry.contains(t))
    }

    /// The first entry whose window contains `t`
    pub fn active_entry(&self, t: Seconds) -> Option<&CaptionEntry> {
        self.active_index(t).map(|i| &self.entries[i])
    }

    /// Latest caption end plus the trailing buffer.
    /// An empty timeline lasts `EMPTY_DURATION`.
    pub fn total_duration(&self) -> Seconds {
        if self.entries.is_empty() {
            return EMPTY_DURATION;
        }
        let last_end = self
            .entries
            .iter()
            .map(|entry| entry.end_time)
            .fold(f64::NEG_INFINITY, f64::max);
        last_end + TRAILING_BUFFER
    }
}

/// Word index to highlight within `entry` at time `t`.
///
/// A word whose window contains `t` wins. Otherwise the next word that has
/// not started yet is chosen, and once every word has passed the last word
/// stays selected.
pub fn active_word(entry: &CaptionEntry, t: Seconds) -> Option<usize> {
    if let Some(i) = entry.words.iter().position(|word| word.contains(t)) {
        return Some(i);
    }
    if let Some(i) = entry.words.iter().position(|word| word.start > t) {
        return Some(i);
    }
    if t >= entry.start_time && !entry.words.is_empty() {
        return Some(entry.words.len() - 1);
    }
    None
}

/// Sequences caption entries from per-file word timings.
///
/// Word times in each pushed file are relative to that file; the builder
/// shifts them by a running offset so entries never overlap.
#[derive(Debug, Default)]
pub struct TimelineBuilder {
    offset: Seconds,
    entries: Vec<CaptionEntry>,
}

impl TimelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current sequencing offset
    pub fn offset(&self) -> Seconds {
        self.offset
    }

    /// Append one entry built from file-relative word timings.
    pub fn push(&mut self, speaker: Speaker, words: Vec<WordSpan>) -> &CaptionEntry {
        let shifted: Vec<WordSpan> = words
            .into_iter()
            .map(|word| WordSpan {
                start: word.start + self.offset,
                end: word.end + self.offset,
                text: word.text,
            })
            .collect();

        let entry = match CaptionEntry::from_words(speaker, shifted) {
            Some(entry) => {
                self.offset = entry.end_time + ENTRY_GAP;
                entry
            }
            None => {
                let entry = CaptionEntry::untimed(speaker, self.offset, UNTIMED_WINDOW);
                self.offset += UNTIMED_ADVANCE;
                entry
            }
        };
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    pub fn build(self) -> Timeline {
        Timeline::new(self.entries)
    }
}
