//! Incremental line layout.
//!
//! [`LineLayout`] splits a [`StyledText`] into visual lines and keeps per-line geometry
//! (height and baseline) as a run-length sequence. After an edit only the lines touching
//! the changed range are re-broken: scanning stops as soon as a freshly computed line start
//! lies the same distance from the end of the text as an old one, and every later line start
//! is shifted instead of recomputed.
//!
//! ```rust
//! use styled_text::{LayoutConfig, LineLayout, MonospaceMetrics, StyledText, TextIndex, Style};
//!
//! let mut text = StyledText::from_text("abc\ndef");
//! text.set_event_queue_enabled(true);
//! let mut layout = LineLayout::for_text(MonospaceMetrics::default(), LayoutConfig::default(), &text);
//! assert_eq!(layout.line_count(), 2);
//!
//! text.insert_text(TextIndex::new(1, 1), "X", &Style::default()).unwrap();
//! layout.sync(&mut text).unwrap();
//! assert_eq!(layout.line_start(1).unwrap().char_index, 5);
//! ```

use crate::buffer::StyledText;
use crate::config::DEFAULT_TAB_CHAR_COUNT;
use crate::error::TextError;
use crate::events::{TextChange, TextEvent};
use crate::metrics::{FontMetrics, VerticalMetrics};
use crate::run_array::RunArray;
use crate::text_index::{TextIndex, TextRange};
use serde::{Deserialize, Serialize};
use std::iter::Peekable;
use std::str::Chars;

/// Where lines break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakMode {
    /// Only at newlines: one visual line per paragraph.
    #[default]
    Newline,
    /// Word wrap at the given pixel width.
    Width(i32),
}

/// Layout settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Line breaking rule.
    pub break_mode: BreakMode,
    /// Tab stops every this many space widths of the default style.
    pub tab_char_count: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            break_mode: BreakMode::Newline,
            tab_char_count: DEFAULT_TAB_CHAR_COUNT,
        }
    }
}

/// Height and baseline of one visual line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineGeometry {
    /// Line height: the largest ascent plus the largest descent on the line.
    pub height: i32,
    /// Distance from the top of the line to its baseline.
    pub ascent: i32,
}

impl From<VerticalMetrics> for LineGeometry {
    fn from(vertical: VerticalMetrics) -> Self {
        Self {
            height: vertical.height(),
            ascent: vertical.ascent,
        }
    }
}

/// Line break whitespace. Only ASCII whitespace separates words.
fn is_break_space(c: char) -> bool {
    c.is_ascii_whitespace()
}

/// Start of the run of non-break characters ending at `char_index`.
fn word_start_before(text: &StyledText, char_index: usize) -> usize {
    let at = text.char_index_to_text_index(char_index);
    let head = text.text().get(..at.byte_index).unwrap_or_default();
    let word_len = head.chars().rev().take_while(|c| !is_break_space(*c)).count();
    char_index - word_len
}

/// Position and pen offset while walking a line.
struct Scan<'t> {
    chars: Peekable<Chars<'t>>,
    at: TextIndex,
    x: i32,
}

impl<'t> Scan<'t> {
    fn new(text: &'t StyledText, start: TextIndex) -> Self {
        let rest = text.text().get(start.byte_index..).unwrap_or_default();
        Self {
            chars: rest.chars().peekable(),
            at: start,
            x: 0,
        }
    }

    fn step(&mut self, c: char, dx: i32) {
        self.at = TextIndex::new(self.at.char_index + 1, self.at.byte_index + c.len_utf8());
        self.x += dx;
    }
}

/// Visual line boundaries and geometry for a [`StyledText`].
#[derive(Debug, Clone)]
pub struct LineLayout<M> {
    metrics: M,
    config: LayoutConfig,
    /// Sorted, starts with [`TextIndex::ZERO`], never empty.
    line_starts: Vec<TextIndex>,
    /// One element per line.
    geometry: RunArray<LineGeometry>,
    /// End of the text when the layout was last brought up to date.
    text_end: TextIndex,
    /// Widest line seen since the last rebuild.
    max_line_width: i32,
}

impl<M: FontMetrics> LineLayout<M> {
    /// An empty layout. Call [`rebuild`](Self::rebuild) before querying it for a text.
    pub fn new(metrics: M, config: LayoutConfig) -> Self {
        Self {
            metrics,
            config,
            line_starts: vec![TextIndex::ZERO],
            geometry: RunArray::with_value(LineGeometry::default(), 1),
            text_end: TextIndex::ZERO,
            max_line_width: 0,
        }
    }

    /// A layout of `text`.
    pub fn for_text(metrics: M, config: LayoutConfig, text: &StyledText) -> Self {
        let mut layout = Self::new(metrics, config);
        layout.rebuild(text);
        layout
    }

    /// The font metrics in use.
    pub fn metrics(&self) -> &M {
        &self.metrics
    }

    /// Current settings.
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Change the settings and lay out `text` again if they differ.
    pub fn set_config(&mut self, config: LayoutConfig, text: &StyledText) {
        if self.config != config {
            self.config = config;
            self.rebuild(text);
        }
    }

    /// Change the break mode and lay out `text` again if it differs.
    pub fn set_break_mode(&mut self, break_mode: BreakMode, text: &StyledText) {
        self.set_config(
            LayoutConfig {
                break_mode,
                ..self.config
            },
            text,
        );
    }

    // ---- updating ------------------------------------------------------------------------

    /// Lay out the whole of `text` from scratch.
    pub fn rebuild(&mut self, text: &StyledText) {
        let _span = tracing::debug_span!("layout_rebuild", chars = text.char_count()).entered();
        self.line_starts.clear();
        self.line_starts.push(TextIndex::ZERO);
        self.geometry.clear();
        self.max_line_width = 0;
        self.text_end = text.beyond_end();

        let len = text.char_count();
        if len == 0 {
            let geometry = self.empty_geometry(text);
            self.geometry.push(geometry, 1);
            return;
        }

        let tab_stop = self.tab_stop(text);
        let mut start = TextIndex::ZERO;
        loop {
            let (end, width) = self.break_line(text, start, tab_stop);
            self.max_line_width = self.max_line_width.max(width);
            let geometry = self.line_geometry(text, start.char_index, end.char_index);
            self.geometry.push(geometry, 1);
            if end.char_index >= len {
                break;
            }
            self.line_starts.push(end);
            start = end;
        }
        tracing::debug!(lines = self.line_starts.len(), "laid out text");
    }

    /// Bring the layout up to date after `event`, which `text` has already applied.
    ///
    /// Events must be fed in order, each against the text as it stood right after that
    /// edit. A layout that finds itself out of step with the text is rebuilt.
    pub fn apply_event(&mut self, text: &StyledText, event: &TextEvent) -> Result<(), TextError> {
        match event {
            TextEvent::TextSet | TextEvent::DefaultStyleChanged => {
                self.rebuild(text);
                Ok(())
            }
            TextEvent::TextChanged(change) => self.apply_change(text, change),
            TextEvent::UndoFinished { .. } | TextEvent::WillBeBusy => Ok(()),
        }
    }

    /// Drain the queued events of `text` and apply them.
    ///
    /// The text's event queue must be enabled with
    /// [`set_event_queue_enabled`](StyledText::set_event_queue_enabled). Several queued
    /// edits are laid out from scratch since only the final text is still available.
    pub fn sync(&mut self, text: &mut StyledText) -> Result<(), TextError> {
        let events = text.take_events();
        let edits = events
            .iter()
            .filter(|event| !matches!(event, TextEvent::UndoFinished { .. } | TextEvent::WillBeBusy))
            .count();
        if edits > 1 {
            self.rebuild(text);
            return Ok(());
        }
        for event in &events {
            self.apply_event(text, event)?;
        }
        Ok(())
    }

    fn apply_change(&mut self, text: &StyledText, change: &TextChange) -> Result<(), TextError> {
        let len = text.char_count();
        let prev_len = self.text_end.char_index;
        if len == 0 || prev_len.checked_add_signed(change.char_delta) != Some(len) {
            if len > 0 {
                tracing::debug!(prev_len, len, "layout out of step with text");
            }
            self.rebuild(text);
            return Ok(());
        }

        let recalc = &change.recalc_range.chars;
        let start_char = recalc.start.min(len - 1);
        let mut line = match self.config.break_mode {
            BreakMode::Newline => self.line_for_char(start_char),
            // A wrapped line ends where the word after it overflows, so every line from the
            // one before the edited word's start may break differently.
            BreakMode::Width(_) => self
                .line_for_char(word_start_before(text, recalc.start.min(len)))
                .saturating_sub(1),
        };
        let first_line = line;
        let mut first = self.line_starts[line];
        let min_count = recalc.len().max(1) + start_char.saturating_sub(first.char_index);

        let tab_stop = self.tab_stop(text);
        let mut total = 0;
        loop {
            let (end, width) = self.break_line(text, first, tab_stop);
            self.max_line_width = self.max_line_width.max(width);
            total += end.char_index - first.char_index;
            let geometry = self.line_geometry(text, first.char_index, end.char_index);
            self.geometry.set(line, geometry)?;

            // Old starts are measured from the old end, new ones from the new end.
            let remaining = len - end.char_index;
            let old_distance = |layout: &Self, index: usize| {
                prev_len.saturating_sub(layout.line_starts[index].char_index)
            };

            while line + 1 < self.line_starts.len() && old_distance(self, line + 1) > remaining {
                self.remove_line(line + 1)?;
            }
            if end.char_index >= len {
                break;
            }
            if total >= min_count
                && line + 1 < self.line_starts.len()
                && old_distance(self, line + 1) == remaining
            {
                self.shift_starts(line + 1, end);
                break;
            }

            line += 1;
            first = end;
            self.line_starts.insert(line, end);
            self.geometry.insert(line, LineGeometry::default(), 1)?;
            // The old start just behind is the one we inserted.
            if line + 1 < self.line_starts.len() && old_distance(self, line + 1) == remaining {
                self.remove_line(line + 1)?;
            }
        }

        self.text_end = text.beyond_end();
        debug_assert_eq!(self.geometry.len(), self.line_starts.len());
        tracing::trace!(
            first_line,
            last_line = line,
            lines = self.line_starts.len(),
            "relaid lines"
        );
        Ok(())
    }

    fn remove_line(&mut self, line: usize) -> Result<(), TextError> {
        self.line_starts.remove(line);
        self.geometry.remove_range(line, 1)?;
        Ok(())
    }

    /// Move the starts from `line` on so that `line` starts at `new_start`.
    fn shift_starts(&mut self, line: usize, new_start: TextIndex) {
        let old = self.line_starts[line];
        if old == new_start {
            return;
        }
        let char_delta = new_start.char_index as isize - old.char_index as isize;
        let byte_delta = new_start.byte_index as isize - old.byte_index as isize;
        for start in &mut self.line_starts[line..] {
            *start = TextIndex::new(
                start.char_index.saturating_add_signed(char_delta),
                start.byte_index.saturating_add_signed(byte_delta),
            );
        }
    }

    // ---- measuring -----------------------------------------------------------------------

    /// Pixel distance between tab stops.
    fn tab_stop(&self, text: &StyledText) -> i32 {
        let space = self.metrics.char_width(text.default_style(), ' ');
        (space * self.config.tab_char_count as i32).max(1)
    }

    /// Advance of character `c` at `char_index` when the pen is at `x`.
    fn advance(&self, text: &StyledText, tab_stop: i32, char_index: usize, c: char, x: i32) -> i32 {
        if c == '\t' {
            return tab_stop - x.rem_euclid(tab_stop);
        }
        let style = text
            .style_at(char_index)
            .unwrap_or_else(|| text.default_style());
        self.metrics.char_width(style, c)
    }

    /// End (exclusive) and width of the line starting at `start`.
    fn break_line(&self, text: &StyledText, start: TextIndex, tab_stop: i32) -> (TextIndex, i32) {
        match self.config.break_mode {
            BreakMode::Newline => self.break_at_newline(text, start, tab_stop),
            BreakMode::Width(width) => self.break_at_width(text, start, width, tab_stop),
        }
    }

    fn break_at_newline(&self, text: &StyledText, start: TextIndex, tab_stop: i32) -> (TextIndex, i32) {
        let mut scan = Scan::new(text, start);
        while let Some(c) = scan.chars.next() {
            let dx = self.advance(text, tab_stop, scan.at.char_index, c, scan.x);
            scan.step(c, dx);
            if c == '\n' {
                break;
            }
        }
        (scan.at, scan.x)
    }

    fn break_at_width(
        &self,
        text: &StyledText,
        start: TextIndex,
        width: i32,
        tab_stop: i32,
    ) -> (TextIndex, i32) {
        let mut scan = Scan::new(text, start);
        let mut end_of_line = self.take_whitespace(text, &mut scan, width, tab_stop);
        while !end_of_line && scan.chars.peek().is_some() {
            let word_start = (scan.at, scan.x);
            while let Some(c) = scan.chars.next_if(|c| !is_break_space(*c)) {
                let dx = self.advance(text, tab_stop, scan.at.char_index, c, scan.x);
                scan.step(c, dx);
            }
            if scan.x > width {
                if word_start.0 != start {
                    return word_start;
                }
                return self.split_word(text, start, width, tab_stop);
            }
            end_of_line = self.take_whitespace(text, &mut scan, width, tab_stop);
        }
        (scan.at, scan.x)
    }

    /// Consume whitespace, which may hang past the margin. Returns `true` if the line ends:
    /// after a newline, or after a tab that crossed the margin.
    fn take_whitespace(&self, text: &StyledText, scan: &mut Scan<'_>, width: i32, tab_stop: i32) -> bool {
        while let Some(c) = scan.chars.next_if(|c| is_break_space(*c)) {
            let dx = self.advance(text, tab_stop, scan.at.char_index, c, scan.x);
            scan.step(c, dx);
            if c == '\n' || (c == '\t' && scan.x > width) {
                return true;
            }
        }
        false
    }

    /// As much of an over-long word as fits, but at least one character.
    fn split_word(&self, text: &StyledText, start: TextIndex, width: i32, tab_stop: i32) -> (TextIndex, i32) {
        let mut scan = Scan::new(text, start);
        while let Some(&c) = scan.chars.peek() {
            let dx = self.advance(text, tab_stop, scan.at.char_index, c, scan.x);
            if scan.at != start && scan.x + dx > width {
                break;
            }
            scan.chars.next();
            scan.step(c, dx);
        }
        (scan.at, scan.x)
    }

    fn empty_geometry(&self, text: &StyledText) -> LineGeometry {
        self.metrics
            .vertical(&text.calc_insertion_style(TextIndex::ZERO))
            .into()
    }

    /// Geometry of the characters `start..end`, one metrics lookup per style run.
    fn line_geometry(&self, text: &StyledText, start: usize, end: usize) -> LineGeometry {
        if start >= end {
            return self.empty_geometry(text);
        }
        let styles = text.styles();
        let (mut ascent, mut descent) = (0, 0);
        let mut i = start;
        while i < end {
            let (Some(style), Some(run)) = (styles.get(i), styles.run_range_at(i)) else {
                break;
            };
            let vertical = self.metrics.vertical(style);
            ascent = ascent.max(vertical.ascent);
            descent = descent.max(vertical.descent);
            i = run.end;
        }
        LineGeometry {
            height: ascent + descent,
            ascent,
        }
    }

    // ---- queries -------------------------------------------------------------------------

    /// Number of visual lines. Always at least one.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Start of every line.
    pub fn line_starts(&self) -> &[TextIndex] {
        &self.line_starts
    }

    /// Geometry of every line.
    pub fn geometry(&self) -> &RunArray<LineGeometry> {
        &self.geometry
    }

    /// Line containing character `char_index`. Indices past the end map to the last line.
    pub fn line_for_char(&self, char_index: usize) -> usize {
        self.line_starts
            .partition_point(|start| start.char_index <= char_index)
            .saturating_sub(1)
    }

    /// First character of `line`.
    pub fn line_start(&self, line: usize) -> Option<TextIndex> {
        self.line_starts.get(line).copied()
    }

    /// Exclusive end of `line`, including its newline.
    pub fn line_end(&self, line: usize) -> Option<TextIndex> {
        if line + 1 < self.line_starts.len() {
            Some(self.line_starts[line + 1])
        } else if line < self.line_starts.len() {
            Some(self.text_end)
        } else {
            None
        }
    }

    /// Characters on `line`.
    pub fn line_range(&self, line: usize) -> Option<TextRange> {
        Some(TextRange::from_indices(self.line_start(line)?, self.line_end(line)?))
    }

    /// Height of `line`.
    pub fn line_height(&self, line: usize) -> Option<i32> {
        self.geometry.get(line).map(|geometry| geometry.height)
    }

    /// Baseline offset of `line` from its top.
    pub fn line_ascent(&self, line: usize) -> Option<i32> {
        self.geometry.get(line).map(|geometry| geometry.ascent)
    }

    /// Top of `line`, with line 0 at 0.
    pub fn line_top(&self, line: usize) -> Option<i64> {
        if line >= self.line_starts.len() {
            return None;
        }
        self.geometry
            .sum_of(0..line, |geometry| i64::from(geometry.height))
            .ok()
    }

    /// Bottom of `line`, which is the top of the next one.
    pub fn line_bottom(&self, line: usize) -> Option<i64> {
        Some(self.line_top(line)? + i64::from(self.line_height(line)?))
    }

    /// Height of all lines together.
    pub fn total_height(&self) -> i64 {
        self.geometry
            .sum_of(0..self.geometry.len(), |geometry| i64::from(geometry.height))
            .unwrap_or_default()
    }

    /// Line at vertical offset `y`. Offsets above the first line map to line 0, offsets
    /// below the last line to the last line.
    pub fn line_for_y(&self, y: i64) -> usize {
        match self
            .geometry
            .find_by_sum(y, 0, |geometry| i64::from(geometry.height))
        {
            Ok((line, _)) | Err((line, _)) => line,
        }
    }

    /// Width needed to show every line: the break width, or the widest line when breaking
    /// only at newlines.
    pub fn content_width(&self) -> i32 {
        match self.config.break_mode {
            BreakMode::Width(width) => width,
            BreakMode::Newline => self.max_line_width,
        }
    }

    /// 0-based display column of `char_index` on its line, with tabs expanded to the text's
    /// reflow tab stops.
    pub fn column_for_char(&self, text: &StyledText, char_index: usize) -> usize {
        let line = self.line_for_char(char_index);
        let start = self.line_start(line).unwrap_or(TextIndex::ZERO);
        text.column_for_char(start, text.char_index_to_text_index(char_index))
    }

    /// Pixel offset of the left edge of `char_index` from the start of its line.
    pub fn char_left(&self, text: &StyledText, char_index: usize) -> i32 {
        let line = self.line_for_char(char_index);
        let Some(start) = self.line_start(line) else {
            return 0;
        };
        let tab_stop = self.tab_stop(text);
        let count = char_index.min(text.char_count()).saturating_sub(start.char_index);
        let mut scan = Scan::new(text, start);
        for _ in 0..count {
            let Some(c) = scan.chars.next() else {
                break;
            };
            let dx = self.advance(text, tab_stop, scan.at.char_index, c, scan.x);
            scan.step(c, dx);
        }
        scan.x
    }

    /// Pixel offset of the right edge of `char_index` from the start of its line.
    pub fn char_right(&self, text: &StyledText, char_index: usize) -> i32 {
        let left = self.char_left(text, char_index);
        match text.char_at(char_index) {
            Some(c) => left + self.advance(text, self.tab_stop(text), char_index, c, left),
            None => left,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MonospaceMetrics;
    use crate::style::Style;

    fn starts(layout: &LineLayout<MonospaceMetrics>) -> Vec<usize> {
        layout.line_starts().iter().map(|s| s.char_index).collect()
    }

    fn wrapped(width: i32) -> LayoutConfig {
        LayoutConfig {
            break_mode: BreakMode::Width(width),
            tab_char_count: 4,
        }
    }

    fn lay_out(text: &StyledText, config: LayoutConfig) -> LineLayout<MonospaceMetrics> {
        LineLayout::for_text(MonospaceMetrics::default(), config, text)
    }

    #[test]
    fn test_newline_mode() {
        let text = StyledText::from_text("abc\ndef");
        let layout = lay_out(&text, LayoutConfig::default());
        assert_eq!(starts(&layout), vec![0, 4]);
        assert_eq!(layout.line_range(0).unwrap().chars, 0..4);
        assert_eq!(layout.line_range(1).unwrap().chars, 4..7);
        assert_eq!(layout.line_for_char(3), 0);
        assert_eq!(layout.line_for_char(4), 1);
        assert_eq!(layout.line_for_char(99), 1);
        assert_eq!(layout.content_width(), 3);
    }

    #[test]
    fn test_trailing_newline_has_no_empty_line() {
        let text = StyledText::from_text("abc\n");
        let layout = lay_out(&text, LayoutConfig::default());
        assert_eq!(layout.line_count(), 1);
        assert_eq!(layout.line_end(0).unwrap().char_index, 4);
        assert_eq!(layout.line_end(1), None);
    }

    #[test]
    fn test_empty_text_has_one_line() {
        let text = StyledText::new();
        let layout = lay_out(&text, LayoutConfig::default());
        assert_eq!(layout.line_count(), 1);
        assert_eq!(layout.line_height(0), Some(12));
        assert_eq!(layout.line_range(0).unwrap().chars, 0..0);
    }

    #[test]
    fn test_word_wrap_hangs_spaces() {
        let text = StyledText::from_text("hello world foo");
        let layout = lay_out(&text, wrapped(11));
        assert_eq!(starts(&layout), vec![0, 12]);
    }

    #[test]
    fn test_long_word_is_split() {
        let text = StyledText::from_text("abcdefghij");
        let layout = lay_out(&text, wrapped(4));
        assert_eq!(starts(&layout), vec![0, 4, 8]);

        let narrow = lay_out(&text, wrapped(0));
        assert_eq!(narrow.line_count(), 10);
    }

    #[test]
    fn test_tab_past_margin_ends_line() {
        let text = StyledText::from_text("abcde\tf");
        let layout = lay_out(&text, wrapped(6));
        assert_eq!(starts(&layout), vec![0, 6]);

        let fits = StyledText::from_text("ab\tcd");
        assert_eq!(lay_out(&fits, wrapped(6)).line_count(), 1);
    }

    #[test]
    fn test_geometry_uses_tallest_run() {
        let mut text = StyledText::from_text("ab\ncd\nef");
        let big = Style::new("Mono", 20);
        let range = text.char_range(4..5).unwrap();
        text.set_style(&range, &big).unwrap();
        let layout = lay_out(&text, LayoutConfig::default());

        assert_eq!(layout.line_height(0), Some(12));
        assert_eq!(layout.line_height(1), Some(25));
        assert_eq!(layout.line_ascent(1), Some(20));
        assert_eq!(layout.geometry().run_count(), 3);
        assert_eq!(layout.line_top(1), Some(12));
        assert_eq!(layout.line_bottom(1), Some(37));
        assert_eq!(layout.total_height(), 49);

        assert_eq!(layout.line_for_y(-5), 0);
        assert_eq!(layout.line_for_y(11), 0);
        assert_eq!(layout.line_for_y(12), 1);
        assert_eq!(layout.line_for_y(40), 2);
        assert_eq!(layout.line_for_y(1000), 2);
    }

    #[test]
    fn test_incremental_insert_and_undo() {
        let mut text = StyledText::from_text("abc\ndef");
        text.set_event_queue_enabled(true);
        let mut layout = lay_out(&text, LayoutConfig::default());

        text.insert_text(TextIndex::new(1, 1), "X", &Style::default())
            .unwrap();
        layout.sync(&mut text).unwrap();
        assert_eq!(starts(&layout), vec![0, 5]);
        assert_eq!(layout.line_start(1), Some(TextIndex::new(5, 5)));

        text.undo().unwrap();
        layout.sync(&mut text).unwrap();
        assert_eq!(starts(&layout), vec![0, 4]);
    }

    #[test]
    fn test_incremental_split_and_join() {
        let mut text = StyledText::from_text("one two\nthree");
        text.set_event_queue_enabled(true);
        let mut layout = lay_out(&text, LayoutConfig::default());

        text.insert_text(TextIndex::new(3, 3), "\n", &Style::default())
            .unwrap();
        layout.sync(&mut text).unwrap();
        assert_eq!(starts(&layout), vec![0, 4, 9]);

        let newline = text.char_range(8..9).unwrap();
        text.delete_text(&newline).unwrap();
        layout.sync(&mut text).unwrap();
        assert_eq!(starts(&layout), vec![0, 4]);
        assert_eq!(layout.line_end(1).unwrap().char_index, 13);
    }

    #[test]
    fn test_incremental_wrap_rebreaks_following_lines() {
        let mut text = StyledText::from_text("aaaa bbbb cccc");
        text.set_event_queue_enabled(true);
        let mut layout = lay_out(&text, wrapped(6));
        assert_eq!(starts(&layout), vec![0, 5, 10]);

        let range = text.char_range(5..9).unwrap();
        text.delete_text(&range).unwrap();
        layout.sync(&mut text).unwrap();
        assert_eq!(text.text(), "aaaa  cccc");
        assert_eq!(starts(&layout), vec![0, 6]);
        assert_eq!(starts(&layout), starts(&lay_out(&text, wrapped(6))));
    }

    #[test]
    fn test_space_splitting_wrapped_word_rebreaks_line_above() {
        let mut text = StyledText::from_text("\naaé\n a中é中");
        text.set_event_queue_enabled(true);
        let mut layout = lay_out(&text, wrapped(5));
        assert_eq!(starts(&layout), vec![0, 1, 5, 6, 9]);

        let at = text.char_index_to_text_index(9);
        text.insert_text(at, " ", &Style::default()).unwrap();
        layout.sync(&mut text).unwrap();
        assert_eq!(text.text(), "\naaé\n a中é 中");
        assert_eq!(starts(&layout), vec![0, 1, 5, 10]);
        assert_eq!(starts(&layout), starts(&lay_out(&text, wrapped(5))));
    }

    #[test]
    fn test_missed_events_rebuild() {
        let mut text = StyledText::from_text("abc\ndef");
        let mut layout = lay_out(&text, LayoutConfig::default());
        text.insert_text(TextIndex::ZERO, "x\ny\n", &Style::default())
            .unwrap();
        text.insert_text(TextIndex::ZERO, "z", &Style::default())
            .unwrap();
        let change = TextChange::new(text.char_range(0..1).unwrap(), 1, 1, false);
        layout
            .apply_event(&text, &TextEvent::TextChanged(change))
            .unwrap();
        assert_eq!(starts(&layout), vec![0, 3, 5, 9]);
    }

    #[test]
    fn test_char_offsets_expand_tabs() {
        let text = StyledText::from_text("a\tb\nxy");
        let layout = LineLayout::for_text(MonospaceMetrics::new(2), wrapped(100), &text);
        assert_eq!(layout.char_left(&text, 0), 0);
        assert_eq!(layout.char_right(&text, 0), 2);
        assert_eq!(layout.char_left(&text, 2), 8);
        assert_eq!(layout.char_left(&text, 5), 2);
        assert_eq!(layout.char_right(&text, 6), 4);
        assert_eq!(layout.column_for_char(&text, 2), 8);
    }
}
