//! Font metrics used by the layout engine.
//!
//! The buffer never measures text itself. [`LineLayout`](crate::LineLayout) asks a
//! [`FontMetrics`] implementation for advance widths and line extents, so a GUI can plug in
//! real font data while tests and terminal front ends use [`MonospaceMetrics`].

use crate::style::Style;
use unicode_width::UnicodeWidthChar;

/// Vertical extent of a font above and below the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VerticalMetrics {
    /// Distance from the top of the line to the baseline.
    pub ascent: i32,
    /// Distance from the baseline to the bottom of the line.
    pub descent: i32,
}

impl VerticalMetrics {
    /// Total line height.
    pub fn height(&self) -> i32 {
        self.ascent + self.descent
    }
}

/// Measures text drawn in a [`Style`].
///
/// Tabs are never passed to [`char_width`](Self::char_width): the layout engine expands them
/// to tab stops itself.
pub trait FontMetrics {
    /// Advance width of `c`.
    fn char_width(&self, style: &Style, c: char) -> i32;

    /// Advance width of `text`, which contains no tabs.
    fn string_width(&self, style: &Style, text: &str) -> i32 {
        text.chars().map(|c| self.char_width(style, c)).sum()
    }

    /// Ascent and descent of lines drawn in `style`.
    fn vertical(&self, style: &Style) -> VerticalMetrics;
}

impl<M: FontMetrics + ?Sized> FontMetrics for &M {
    fn char_width(&self, style: &Style, c: char) -> i32 {
        (**self).char_width(style, c)
    }

    fn string_width(&self, style: &Style, text: &str) -> i32 {
        (**self).string_width(style, text)
    }

    fn vertical(&self, style: &Style) -> VerticalMetrics {
        (**self).vertical(style)
    }
}

/// Fixed-cell metrics: every character is one or two cells wide per UAX #11.
///
/// Line extents follow the style's point size: the ascent is the size and the descent a
/// quarter of it (at least one unit). Bold and italic do not change widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonospaceMetrics {
    /// Width of one cell.
    pub cell_width: i32,
}

impl MonospaceMetrics {
    /// Metrics with the given cell width.
    pub fn new(cell_width: i32) -> Self {
        Self { cell_width }
    }

    /// Number of cells `c` occupies. Newlines take no space; other control characters take
    /// one cell.
    pub fn cells(c: char) -> i32 {
        match c {
            '\n' => 0,
            c => UnicodeWidthChar::width(c).unwrap_or(1) as i32,
        }
    }
}

impl Default for MonospaceMetrics {
    fn default() -> Self {
        Self::new(1)
    }
}

impl FontMetrics for MonospaceMetrics {
    fn char_width(&self, _style: &Style, c: char) -> i32 {
        Self::cells(c) * self.cell_width
    }

    fn vertical(&self, style: &Style) -> VerticalMetrics {
        let size = i32::from(style.size);
        VerticalMetrics {
            ascent: size,
            descent: (size / 4).max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_widths() {
        let metrics = MonospaceMetrics::new(7);
        let style = Style::default();
        assert_eq!(metrics.char_width(&style, 'a'), 7);
        assert_eq!(metrics.char_width(&style, '你'), 14);
        assert_eq!(metrics.char_width(&style, '\n'), 0);
        assert_eq!(metrics.string_width(&style, "a你b"), 28);
    }

    #[test]
    fn test_vertical_follows_size() {
        let metrics = MonospaceMetrics::default();
        let vertical = metrics.vertical(&Style::new("Mono", 12));
        assert_eq!(vertical, VerticalMetrics { ascent: 12, descent: 3 });
        assert_eq!(vertical.height(), 15);
        assert_eq!(metrics.vertical(&Style::new("Mono", 2)).descent, 1);
    }
}
