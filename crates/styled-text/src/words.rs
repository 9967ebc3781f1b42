//! Word and paragraph boundaries.
//!
//! Positions passed to these queries name a character: `word_start(i)` finds the start of the
//! word containing (or preceding) character `i`. The `*_end` queries return the exclusive end.

use crate::buffer::StyledText;
use crate::text_index::{TextIndex, TextRange};

/// Columns a tab advances from `column` with stops every `tab_char_count` columns.
pub(crate) fn tab_advance(column: usize, tab_char_count: usize) -> usize {
    let n = tab_char_count.max(1);
    n - column % n
}

fn is_digit(c: char) -> bool {
    c.is_numeric()
}

fn letter_digit_switch(prev: char, c: char) -> bool {
    (prev.is_alphabetic() && is_digit(c)) || (is_digit(prev) && c.is_alphabetic())
}

impl StyledText {
    /// Start of the word containing character `index`. Whitespace and punctuation before a
    /// word belong to the word on their left.
    pub fn word_start(&self, index: TextIndex) -> TextIndex {
        if index.char_index == 0 || self.is_empty() {
            return TextIndex::ZERO;
        }
        let scan_from = (index.char_index + 1).min(self.char_count());
        let end_byte = self.index_at_char(scan_from).byte_index;

        let mut chars = self.text()[..end_byte].chars().rev().peekable();
        let mut skipped = 0;
        while chars.next_if(|c| !self.is_word_char(*c)).is_some() {
            skipped += 1;
        }
        while chars.next_if(|c| self.is_word_char(*c)).is_some() {
            skipped += 1;
        }
        self.index_at_char(scan_from - skipped)
    }

    /// Exclusive end of the word containing character `index`, skipping any non-word
    /// characters first.
    pub fn word_end(&self, index: TextIndex) -> TextIndex {
        if index.char_index + 1 >= self.char_count() {
            return self.beyond_end();
        }
        let mut chars = self.text()[index.byte_index..].chars().peekable();
        let mut end = index.char_index;
        while chars.next_if(|c| !self.is_word_char(*c)).is_some() {
            end += 1;
        }
        while chars.next_if(|c| self.is_word_char(*c)).is_some() {
            end += 1;
        }
        self.index_at_char(end)
    }

    /// Start of the camel-case or alphanumeric segment containing character `index`.
    ///
    /// `fooBar` splits into `foo`/`Bar`, `HTMLParser` into `HTML`/`Parser` and `abc123`
    /// into `abc`/`123`.
    pub fn partial_word_start(&self, index: TextIndex) -> TextIndex {
        let len = self.char_count();
        if len == 0 {
            return TextIndex::ZERO;
        }
        let mut i = index.char_index.min(len - 1);
        let end_byte = self.index_at_char(i + 1).byte_index;
        let mut chars = self.text()[..end_byte].chars().rev();
        let Some(mut prev) = chars.next() else {
            return TextIndex::ZERO;
        };

        while i > 0 && !prev.is_alphanumeric() {
            i -= 1;
            match chars.next() {
                Some(c) => prev = c,
                None => break,
            }
        }

        let mut found_lower = prev.is_lowercase();
        for c in chars {
            found_lower |= c.is_lowercase();
            if !c.is_alphanumeric()
                || (prev.is_uppercase() && c.is_lowercase())
                || (prev.is_uppercase() && c.is_uppercase() && found_lower)
                || letter_digit_switch(prev, c)
            {
                break;
            }
            prev = c;
            i -= 1;
        }
        self.index_at_char(i)
    }

    /// Exclusive end of the camel-case or alphanumeric segment containing character `index`.
    pub fn partial_word_end(&self, index: TextIndex) -> TextIndex {
        let len = self.char_count();
        if index.char_index >= len {
            return self.beyond_end();
        }
        let mut i = index.char_index;
        let mut chars = self.text()[index.byte_index..].chars().peekable();
        let Some(mut prev) = chars.next() else {
            return self.beyond_end();
        };

        while !prev.is_alphanumeric() {
            match chars.next() {
                Some(c) => {
                    i += 1;
                    prev = c;
                }
                None => return self.beyond_end(),
            }
        }

        while let Some(c) = chars.next() {
            let next = chars.peek().copied();
            if !c.is_alphanumeric()
                || (prev.is_lowercase() && c.is_uppercase())
                || letter_digit_switch(prev, c)
                || (prev.is_uppercase() && c.is_uppercase() && next.is_some_and(char::is_lowercase))
            {
                break;
            }
            prev = c;
            i += 1;
        }
        self.index_at_char(i + 1)
    }

    /// Start of the paragraph (line) containing character `index`.
    pub fn paragraph_start(&self, index: TextIndex) -> TextIndex {
        let index = self.index_at_char(index.char_index);
        match self.text()[..index.byte_index].rfind('\n') {
            Some(newline) => self.byte_index_to_text_index(newline + 1),
            None => TextIndex::ZERO,
        }
    }

    /// Exclusive end of the paragraph containing character `index`, including its newline.
    pub fn paragraph_end(&self, index: TextIndex) -> TextIndex {
        let index = self.index_at_char(index.char_index);
        match self.text()[index.byte_index..].find('\n') {
            Some(offset) => self.byte_index_to_text_index(index.byte_index + offset + 1),
            None => self.beyond_end(),
        }
    }

    /// Returns `true` if `range` is exactly one or more word characters with no word
    /// characters touching it on either side.
    pub fn is_entire_word(&self, range: &TextRange) -> bool {
        if range.is_empty() || self.check_range(range).is_err() {
            return false;
        }
        let text = self.text();
        let before = text[..range.bytes.start].chars().next_back();
        let after = text[range.bytes.end..].chars().next();
        !before.is_some_and(|c| self.is_word_char(c))
            && !after.is_some_and(|c| self.is_word_char(c))
            && text[range.bytes.clone()].chars().all(|c| self.is_word_char(c))
    }

    /// 0-based display column of `index` on the line starting at `line_start`, expanding
    /// tabs to the reflow tab stops.
    pub fn column_for_char(&self, line_start: TextIndex, index: TextIndex) -> usize {
        if index.char_index >= self.char_count() && self.ends_with_newline() {
            return 0;
        }
        let start = line_start.byte_index.min(self.byte_count());
        let end = self.index_at_char(index.char_index).byte_index.max(start);
        let tab_char_count = self.config.reflow.tab_char_count;
        self.text()[start..end].chars().fold(0, |column, c| {
            if c == '\t' {
                column + tab_advance(column, tab_char_count)
            } else {
                column + 1
            }
        })
    }
}
