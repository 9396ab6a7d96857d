//! Caption entries and word spans.

use crate::core::time::Seconds;

/// Upper bound on the byte length of a single word's text.
pub const MAX_WORD_BYTES: usize = 63;

/// Which of the two on-screen characters is speaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Speaker {
    /// Left-hand character
    A,
    /// Right-hand character
    B,
}

/// One word's timing window within a caption entry.
#[derive(Debug, Clone, PartialEq)]
pub struct WordSpan {
    pub text: String,
    pub start: Seconds,
    pub end: Seconds,
}

impl WordSpan {
    /// Create a word span. Text is truncated to `MAX_WORD_BYTES` on a char
    /// boundary and an inverted window is collapsed to its start.
    pub fn new(text: &str, start: Seconds, end: Seconds) -> Self {
        Self {
            text: truncate_on_char_boundary(text, MAX_WORD_BYTES).to_string(),
            start,
            end: end.max(start),
        }
    }

    /// Check if `t` falls inside `[start, end]`
    #[inline]
    pub fn contains(&self, t: Seconds) -> bool {
        t >= self.start && t <= self.end
    }
}

/// One spoken utterance with a time window and speaker.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionEntry {
    pub start_time: Seconds,
    pub end_time: Seconds,
    pub speaker: Speaker,
    pub words: Vec<WordSpan>,
}

impl CaptionEntry {
    /// Build an entry whose window is taken from its first and last word.
    /// Returns `None` when `words` is empty.
    pub fn from_words(speaker: Speaker, words: Vec<WordSpan>) -> Option<Self> {
        let start_time = words.first()?.start;
        let end_time = words.last()?.end;
        Some(Self {
            start_time,
            end_time,
            speaker,
            words,
        })
    }

    /// Entry with no word timings, shown for a fixed window.
    pub fn untimed(speaker: Speaker, start_time: Seconds, duration: Seconds) -> Self {
        Self {
            start_time,
            end_time: start_time + duration,
            speaker,
            words: Vec::new(),
        }
    }

    /// Check if `t` falls inside `[start_time, end_time]`
    #[inline]
    pub fn contains(&self, t: Seconds) -> bool {
        t >= self.start_time && t <= self.end_time
    }

    /// Duration in seconds
    pub fn duration(&self) -> Seconds {
        self.end_time - self.start_time
    }
}

fn truncate_on_char_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut cut = max_bytes;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    &text[..cut]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_window_from_words() {
        let entry = CaptionEntry::from_words(
            Speaker::A,
            vec![WordSpan::new("hello", 1.0, 1.4), WordSpan::new("there", 1.6, 2.2)],
        )
        .unwrap();
        assert_eq!(entry.start_time, 1.0);
        assert_eq!(entry.end_time, 2.2);
        assert!(entry.contains(2.2));
        assert!(!entry.contains(2.21));
    }

    #[test]
    fn test_empty_words_has_no_window() {
        assert!(CaptionEntry::from_words(Speaker::B, Vec::new()).is_none());
    }

    #[test]
    fn test_word_text_is_bounded() {
        let long = "é".repeat(40);
        let word = WordSpan::new(&long, 0.0, 1.0);
        assert!(word.text.len() <= MAX_WORD_BYTES);
        assert_eq!(word.text.len(), 62);
    }

    #[test]
    fn test_inverted_word_window_collapses() {
        let word = WordSpan::new("x", 2.0, 1.0);
        assert_eq!(word.start, 2.0);
        assert_eq!(word.end, 2.0);
    }
}
