//! Shifting whole lines left and right by tab stops.

use crate::buffer::{EditKind, StyledText};
use crate::error::TextError;
use crate::run_array::RunArray;
use crate::style::Style;
use crate::text_index::TextRange;

/// What the sufficiency pass learned about one line's indentation.
struct IndentCheck {
    sufficient: bool,
    /// Spaces before the first tab stop, or `None` for whitespace-only lines.
    leading_spaces: Option<usize>,
}

/// Number of leading spaces, at most `width`.
fn count_spaces(bytes: &[u8], width: usize) -> usize {
    bytes.iter().take(width).take_while(|&&b| b == b' ').count()
}

/// Whether `line` starts with `tab_count` tabs, accepting `width` spaces for a tab and fewer
/// spaces in front of one.
fn check_indent(line: &str, tab_count: usize, width: usize) -> IndentCheck {
    let bytes = line.as_bytes();
    let mut pos = 0;
    let mut leading_spaces = None;
    for shift in 0..tab_count {
        let spaces = count_spaces(&bytes[pos..], width);
        pos += spaces;
        if pos == bytes.len() {
            break;
        }
        if shift == 0 && bytes[pos] != b'\n' {
            leading_spaces = Some(spaces);
        }
        if spaces >= width {
            continue;
        }
        match bytes[pos] {
            b'\t' => pos += 1,
            b'\n' => break,
            _ => {
                return IndentCheck {
                    sufficient: false,
                    leading_spaces,
                };
            }
        }
    }
    IndentCheck {
        sufficient: true,
        leading_spaces,
    }
}

/// Bytes to strip from the front of `line`. Only single-byte characters are removed, so this
/// is also the character count.
fn removable_indent(line: &str, tab_count: usize, width: usize, spaces_only: bool) -> usize {
    let bytes = line.as_bytes();
    let mut pos = 0;
    for _ in 0..tab_count {
        let spaces = count_spaces(&bytes[pos..], width);
        pos += spaces;
        if pos == bytes.len() || spaces_only {
            break;
        }
        if spaces >= width {
            continue;
        }
        if bytes[pos] != b'\t' {
            break;
        }
        pos += 1;
    }
    pos
}

impl StyledText {
    /// Lines covered by `range`, or the line holding the caret when `range` is empty.
    fn tab_shift_span(&self, range: &TextRange) -> Option<TextRange> {
        if self.is_empty() {
            return None;
        }
        let start = self.paragraph_start(range.first());
        let last = if range.is_empty() {
            range.first()
        } else {
            self.index_at_char(range.chars.end - 1)
        };
        let end = self.paragraph_end(last);
        (end.char_index > start.char_index).then(|| TextRange::from_indices(start, end))
    }

    /// Insert `tab_count` tabs at the start of every non-empty line touched by `range`.
    ///
    /// With `tab_to_spaces` set each tab becomes `tab_char_count` spaces. The inserted
    /// whitespace takes the style of the line's first character. Returns the range of the
    /// shifted lines, or `None` if nothing changed.
    pub fn indent(&mut self, range: &TextRange, tab_count: usize) -> Result<Option<TextRange>, TextError> {
        self.ensure_idle()?;
        self.check_range(range)?;
        let prefix = if self.config.tab_to_spaces {
            " ".repeat(tab_count * self.config.reflow.tab_char_count)
        } else {
            "\t".repeat(tab_count)
        };
        if prefix.is_empty() {
            return Ok(None);
        }
        let Some(span) = self.tab_shift_span(range) else {
            return Ok(None);
        };

        let (text, styles) = self.copy(&span)?;
        let mut shifted = String::with_capacity(text.len() + prefix.len());
        let mut shifted_styles = RunArray::<Style>::new();
        let mut offset = 0;
        let mut lines = 0;
        for line in text.split_inclusive('\n') {
            let count = line.chars().count();
            if !line.starts_with('\n')
                && let Some(style) = styles.get(offset)
            {
                shifted.push_str(&prefix);
                shifted_styles.push(style.clone(), prefix.len());
                lines += 1;
            }
            shifted.push_str(line);
            shifted_styles.append(&styles.slice(offset, count)?);
            offset += count;
        }
        if lines == 0 {
            return Ok(None);
        }

        tracing::debug!(lines, tab_count, "indent");
        self.paste_as(EditKind::TabShift, &span, &shifted, Some(&shifted_styles))
            .map(Some)
    }

    /// Remove `tab_count` tabs from the start of every non-empty line touched by `range`.
    ///
    /// `tab_char_count` spaces count as one tab, and fewer spaces in front of a tab are
    /// absorbed with it. Unless `force` is set, every line must carry enough indentation or
    /// nothing happens. A single-tab outdent where every line starts with at least a few
    /// spaces removes that common run of spaces instead.
    pub fn outdent(
        &mut self,
        range: &TextRange,
        tab_count: usize,
        force: bool,
    ) -> Result<Option<TextRange>, TextError> {
        self.ensure_idle()?;
        self.check_range(range)?;
        if tab_count == 0 {
            return Ok(None);
        }
        let Some(span) = self.tab_shift_span(range) else {
            return Ok(None);
        };
        let tab_width = self.config.reflow.tab_char_count.max(1);
        let (text, styles) = self.copy(&span)?;

        let mut sufficient = true;
        let mut common_spaces: Option<usize> = None;
        for line in text.split_inclusive('\n').filter(|line| !line.starts_with('\n')) {
            let check = check_indent(line, tab_count, tab_width);
            sufficient &= check.sufficient;
            if let Some(spaces) = check.leading_spaces {
                common_spaces = Some(common_spaces.map_or(spaces, |common| common.min(spaces)));
            }
        }

        let (width, spaces_only) = match common_spaces {
            Some(spaces) if !sufficient && spaces > 0 && tab_count == 1 => (spaces, true),
            _ if sufficient || force => (tab_width, false),
            _ => {
                tracing::debug!(tab_count, "not enough indentation to outdent");
                return Ok(None);
            }
        };

        let mut shifted = String::with_capacity(text.len());
        let mut shifted_styles = RunArray::<Style>::new();
        let mut offset = 0;
        let mut removed = 0;
        for line in text.split_inclusive('\n') {
            let count = line.chars().count();
            let strip = if line.starts_with('\n') {
                0
            } else {
                removable_indent(line, tab_count, width, spaces_only)
            };
            shifted.push_str(&line[strip..]);
            shifted_styles.append(&styles.slice(offset + strip, count - strip)?);
            offset += count;
            removed += strip;
        }
        if removed == 0 {
            return Ok(None);
        }

        tracing::debug!(removed, tab_count, force, "outdent");
        self.paste_as(EditKind::TabShift, &span, &shifted, Some(&shifted_styles))
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_index::TextIndex;

    fn whole(text: &StyledText) -> TextRange {
        text.select_all()
    }

    #[test]
    fn test_indent_skips_empty_lines() {
        let mut text = StyledText::from_text("one\n\ntwo\n");
        let range = whole(&text);
        let shifted = text.indent(&range, 1).unwrap().unwrap();
        assert_eq!(text.text(), "\tone\n\n\ttwo\n");
        assert_eq!(shifted.chars, 0..11);
        assert_eq!(text.undo_kind(), Some(EditKind::TabShift));
    }

    #[test]
    fn test_indent_with_spaces() {
        let mut text = StyledText::from_text("a\nb");
        text.set_tab_to_spaces(true);
        let caret = TextRange::empty_at(text.char_index_to_text_index(2));
        text.indent(&caret, 1).unwrap();
        assert_eq!(text.text(), "a\n        b");
    }

    #[test]
    fn test_indent_takes_line_style() {
        let bold = Style::default().with_bold(true);
        let mut text = StyledText::from_text("ab");
        text.set_style(&whole(&text), &bold).unwrap();
        text.indent(&whole(&text), 2).unwrap();
        assert_eq!(text.text(), "\t\tab");
        assert_eq!(text.styles().run_count(), 1);
        assert_eq!(text.style_at(0), Some(&bold));
    }

    #[test]
    fn test_outdent_accepts_spaces_for_tabs() {
        let mut text = StyledText::from_text("\tone\n        two\n  \tthree\n");
        text.outdent(&whole(&text), 1, false).unwrap().unwrap();
        assert_eq!(text.text(), "one\ntwo\nthree\n");
    }

    #[test]
    fn test_outdent_requires_enough_whitespace() {
        let mut text = StyledText::from_text("\tone\ntwo\n");
        assert_eq!(text.outdent(&whole(&text), 1, false).unwrap(), None);
        assert_eq!(text.text(), "\tone\ntwo\n");

        text.outdent(&whole(&text), 1, true).unwrap().unwrap();
        assert_eq!(text.text(), "one\ntwo\n");
    }

    #[test]
    fn test_outdent_removes_common_spaces() {
        let mut text = StyledText::from_text("   one\n  two\n");
        text.outdent(&whole(&text), 1, false).unwrap().unwrap();
        assert_eq!(text.text(), " one\ntwo\n");
    }

    #[test]
    fn test_tab_shift_undo() {
        let mut text = StyledText::from_text("x\ny");
        text.indent(&whole(&text), 1).unwrap();
        text.outdent(&whole(&text), 1, false).unwrap();
        assert_eq!(text.text(), "x\ny");
        text.undo().unwrap();
        assert_eq!(text.text(), "\tx\n\ty");
        text.undo().unwrap();
        assert_eq!(text.text(), "x\ny");
        assert_eq!(text.indent(&TextRange::empty_at(TextIndex::ZERO), 0).unwrap(), None);
    }
}
