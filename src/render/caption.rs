//! Which caption words are on screen and which one is highlighted.

use std::ops::Range;

use crate::core::caption::{CaptionEntry, WordSpan};
use crate::core::time::Seconds;

/// Words shown together on screen.
pub const DEFAULT_GROUP_SIZE: usize = 3;

/// Indices of the word group that contains `active`.
pub fn word_group(word_count: usize, active: usize, group_size: usize) -> Range<usize> {
    let group_size = group_size.max(1);
    if word_count == 0 {
        return 0..0;
    }
    let active = active.min(word_count - 1);
    let start = (active / group_size) * group_size;
    start..(start + group_size).min(word_count)
}

/// A word is highlighted only while it is being spoken.
#[inline]
pub fn is_highlighted(word: &WordSpan, t: Seconds) -> bool {
    word.contains(t)
}

/// Visible words of `entry` as `(word, highlighted)` pairs
pub fn visible_words(
    entry: &CaptionEntry,
    active: Option<usize>,
    t: Seconds,
    group_size: usize,
) -> Vec<(&WordSpan, bool)> {
    let range = word_group(entry.words.len(), active.unwrap_or(0), group_size);
    entry.words[range]
        .iter()
        .map(|word| (word, is_highlighted(word, t)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::caption::Speaker;

    #[test]
    fn test_word_group_boundaries() {
        assert_eq!(word_group(7, 0, 3), 0..3);
        assert_eq!(word_group(7, 2, 3), 0..3);
        assert_eq!(word_group(7, 3, 3), 3..6);
        assert_eq!(word_group(7, 6, 3), 6..7);
        assert_eq!(word_group(7, 40, 3), 6..7);
        assert_eq!(word_group(0, 0, 3), 0..0);
    }

    #[test]
    fn test_visible_words_highlight() {
        let entry = CaptionEntry::from_words(
            Speaker::A,
            vec![
                WordSpan::new("one", 0.0, 0.3),
                WordSpan::new("two", 0.4, 0.6),
                WordSpan::new("three", 0.7, 0.9),
                WordSpan::new("four", 1.0, 1.2),
            ],
        )
        .unwrap();

        let words = visible_words(&entry, Some(1), 0.5, DEFAULT_GROUP_SIZE);
        let flags: Vec<bool> = words.iter().map(|(_, lit)| *lit).collect();
        assert_eq!(flags, vec![false, true, false]);

        let words = visible_words(&entry, Some(3), 1.1, DEFAULT_GROUP_SIZE);
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].0.text, "four");
        assert!(words[0].1);
    }
}
