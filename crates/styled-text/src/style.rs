//! Character styles.
//!
//! A [`Style`] is the per-character attribute value stored in the buffer's run-length overlay.
//! It is plain data: comparing two styles decides whether neighbouring runs merge.

use serde::{Deserialize, Serialize};

/// Default font name for new buffers.
pub const DEFAULT_FONT_NAME: &str = "Monospace";
/// Default font size (points).
pub const DEFAULT_FONT_SIZE: u16 = 10;

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Black.
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    /// Create a color from its channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Font and decoration attributes applied to a character.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Style {
    /// Font family name.
    pub font: String,
    /// Font size in points.
    pub size: u16,
    /// Bold weight.
    pub bold: bool,
    /// Italic slant.
    pub italic: bool,
    /// Number of underlines (0 = none).
    pub underline: u8,
    /// Strike-through.
    pub strike: bool,
    /// Foreground color.
    pub color: Color,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            font: DEFAULT_FONT_NAME.to_string(),
            size: DEFAULT_FONT_SIZE,
            bold: false,
            italic: false,
            underline: 0,
            strike: false,
            color: Color::BLACK,
        }
    }
}

impl Style {
    /// Create a plain style for the given font.
    pub fn new(font: impl Into<String>, size: u16) -> Self {
        Self {
            font: font.into(),
            size,
            ..Self::default()
        }
    }

    /// Builder: set bold.
    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    /// Builder: set italic.
    pub fn with_italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    /// Builder: set the underline count.
    pub fn with_underline(mut self, underline: u8) -> Self {
        self.underline = underline;
        self
    }

    /// Builder: set strike-through.
    pub fn with_strike(mut self, strike: bool) -> Self {
        self.strike = strike;
        self
    }

    /// Builder: set the color.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// The same font and color without bold, italic, underline or strike.
    pub fn plain(&self) -> Style {
        Style {
            font: self.font.clone(),
            size: self.size,
            color: self.color,
            ..Style::default()
        }
    }

    /// Style for whitespace placed between two differently styled words: it keeps the
    /// underline and strike only if both neighbours have them.
    pub fn between(&self, next: &Style) -> Style {
        let mut style = self.clone();
        style.underline = self.underline.min(next.underline);
        style.strike = self.strike && next.strike;
        style
    }
}
