//! Dual character/byte addressing.
//!
//! Every position in a [`StyledText`](crate::StyledText) is expressed both as a count of
//! Unicode scalar values and as a count of UTF-8 bytes. The two always move together, so
//! callers can slice the underlying `str` without rescanning it.

use crate::run_array::RunArray;
use std::ops::{Add, Range, Sub};

/// A position in the text, in characters and in bytes (both 0-based).
///
/// Invariant: `byte_index >= char_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TextIndex {
    /// Number of characters before the position.
    pub char_index: usize,
    /// Number of UTF-8 bytes before the position.
    pub byte_index: usize,
}

impl TextIndex {
    /// The start of the text.
    pub const ZERO: TextIndex = TextIndex {
        char_index: 0,
        byte_index: 0,
    };

    /// Create a new position.
    pub fn new(char_index: usize, byte_index: usize) -> Self {
        debug_assert!(byte_index >= char_index);
        Self {
            char_index,
            byte_index,
        }
    }

    /// Distance from `earlier` to `self`.
    pub fn distance_from(self, earlier: TextIndex) -> TextCount {
        TextCount::new(
            self.char_index - earlier.char_index,
            self.byte_index - earlier.byte_index,
        )
    }
}

/// A length in characters and in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextCount {
    /// Number of characters.
    pub char_count: usize,
    /// Number of UTF-8 bytes.
    pub byte_count: usize,
}

impl TextCount {
    /// An empty count.
    pub const ZERO: TextCount = TextCount {
        char_count: 0,
        byte_count: 0,
    };

    /// Create a new count.
    pub fn new(char_count: usize, byte_count: usize) -> Self {
        debug_assert!(byte_count >= char_count);
        Self {
            char_count,
            byte_count,
        }
    }

    /// Count of a string slice.
    pub fn of(text: &str) -> Self {
        Self::new(text.chars().count(), text.len())
    }

    /// Returns `true` if the count is zero.
    pub fn is_empty(&self) -> bool {
        self.char_count == 0
    }
}

impl Add<TextCount> for TextIndex {
    type Output = TextIndex;

    fn add(self, rhs: TextCount) -> TextIndex {
        TextIndex::new(
            self.char_index + rhs.char_count,
            self.byte_index + rhs.byte_count,
        )
    }
}

impl Sub<TextCount> for TextIndex {
    type Output = TextIndex;

    fn sub(self, rhs: TextCount) -> TextIndex {
        TextIndex::new(
            self.char_index - rhs.char_count,
            self.byte_index - rhs.byte_count,
        )
    }
}

impl Add for TextCount {
    type Output = TextCount;

    fn add(self, rhs: TextCount) -> TextCount {
        TextCount::new(
            self.char_count + rhs.char_count,
            self.byte_count + rhs.byte_count,
        )
    }
}

/// A half-open span of text, in characters and in bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TextRange {
    /// Character span.
    pub chars: Range<usize>,
    /// Byte span.
    pub bytes: Range<usize>,
}

impl TextRange {
    /// A range starting at `first` covering `count`.
    pub fn new(first: TextIndex, count: TextCount) -> Self {
        Self {
            chars: first.char_index..first.char_index + count.char_count,
            bytes: first.byte_index..first.byte_index + count.byte_count,
        }
    }

    /// The range between two positions.
    pub fn from_indices(start: TextIndex, end: TextIndex) -> Self {
        debug_assert!(start <= end);
        Self {
            chars: start.char_index..end.char_index,
            bytes: start.byte_index..end.byte_index,
        }
    }

    /// An empty range at `index`.
    pub fn empty_at(index: TextIndex) -> Self {
        Self::new(index, TextCount::ZERO)
    }

    /// First position of the range.
    pub fn first(&self) -> TextIndex {
        TextIndex::new(self.chars.start, self.bytes.start)
    }

    /// Position just past the range.
    pub fn after_last(&self) -> TextIndex {
        TextIndex::new(self.chars.end, self.bytes.end)
    }

    /// Length of the range.
    pub fn count(&self) -> TextCount {
        TextCount::new(self.chars.len(), self.bytes.len())
    }

    /// Returns `true` if the range covers nothing.
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Returns `true` if character `index` lies inside the range.
    pub fn contains_char(&self, index: usize) -> bool {
        self.chars.contains(&index)
    }

    /// Smallest range covering both `self` and `other`.
    pub fn cover(&self, other: &TextRange) -> TextRange {
        TextRange {
            chars: self.chars.start.min(other.chars.start)..self.chars.end.max(other.chars.end),
            bytes: self.bytes.start.min(other.bytes.start)..self.bytes.end.max(other.bytes.end),
        }
    }
}

/// Incrementally maintained character-to-byte map.
///
/// Stores the UTF-8 width of each character as a run-length sequence, so ASCII text is a
/// single run and conversions cost O(runs).
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Utf8Widths {
    widths: RunArray<u8>,
}

impl Utf8Widths {
    pub(crate) fn for_text(text: &str) -> Self {
        Self {
            widths: text.chars().map(|c| c.len_utf8() as u8).collect(),
        }
    }

    pub(crate) fn char_count(&self) -> usize {
        self.widths.len()
    }

    /// Byte offset of character `char_index` (clamped to the end).
    pub(crate) fn char_to_byte(&self, char_index: usize) -> usize {
        let char_index = char_index.min(self.widths.len());
        self.widths
            .sum_of(0..char_index, |w| i64::from(*w))
            .map(|sum| sum as usize)
            .unwrap_or_default()
    }

    /// Index of the character containing `byte_index` (clamped to the end).
    pub(crate) fn byte_to_char(&self, byte_index: usize) -> usize {
        match self
            .widths
            .find_by_sum(byte_index as i64, 0, |w| i64::from(*w))
        {
            Ok((index, _)) => index,
            Err(_) => self.widths.len(),
        }
    }

    pub(crate) fn insert(&mut self, char_index: usize, text: &str) {
        let inserted = Self::for_text(text);
        let result = self.widths.insert_slice(char_index, &inserted.widths);
        debug_assert!(result.is_ok());
    }

    pub(crate) fn remove(&mut self, chars: Range<usize>) {
        let result = self.widths.remove_range(chars.start, chars.len());
        debug_assert!(result.is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_construction() {
        let r = TextRange::new(TextIndex::new(2, 3), TextCount::new(2, 5));
        assert_eq!(r.chars, 2..4);
        assert_eq!(r.bytes, 3..8);
        assert_eq!(r.after_last(), TextIndex::new(4, 8));
        assert_eq!(r.count(), TextCount::new(2, 5));
        assert!(!r.is_empty());
        assert!(TextRange::empty_at(TextIndex::new(1, 1)).is_empty());
    }

    #[test]
    fn test_utf8_widths_round_trip() {
        let text = "aé中🎉b";
        let map = Utf8Widths::for_text(text);
        assert_eq!(map.char_count(), 5);
        let expected: Vec<usize> = text
            .char_indices()
            .map(|(b, _)| b)
            .chain([text.len()])
            .collect();
        for (i, byte) in expected.iter().enumerate() {
            assert_eq!(map.char_to_byte(i), *byte);
            assert_eq!(map.byte_to_char(*byte), i);
        }
        // A byte in the middle of '中' maps to that character.
        assert_eq!(map.byte_to_char(4), 2);
    }

    #[test]
    fn test_utf8_widths_edit() {
        let mut map = Utf8Widths::for_text("abc");
        map.insert(1, "é");
        assert_eq!(map.char_to_byte(2), 3);
        map.remove(0..2);
        assert_eq!(map.char_count(), 2);
        assert_eq!(map.char_to_byte(2), 2);
    }
}
