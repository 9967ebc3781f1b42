//! Plain text import and export.
//!
//! [`StyledText`] stores LF (`'\n'`) newlines only. Text read from a stream is normalized on
//! load and the dominant convention is reported so it can be restored when saving.

use crate::buffer::StyledText;
use crate::error::TextError;
use std::io::{Read, Write};

/// The newline convention of a plain text file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlainTextFormat {
    /// LF (`'\n'`).
    #[default]
    Unix,
    /// CR (`'\r'`).
    Mac,
    /// CRLF (`"\r\n"`).
    Dos,
}

impl PlainTextFormat {
    /// Detect the dominant newline convention of `text`.
    ///
    /// Counts CRLF pairs, lone CRs and lone LFs; ties prefer Unix, then DOS.
    pub fn detect(text: &str) -> Self {
        let (mut dos, mut mac, mut unix) = (0usize, 0usize, 0usize);
        let mut bytes = text.bytes().peekable();
        while let Some(b) = bytes.next() {
            match b {
                b'\r' if bytes.next_if_eq(&b'\n').is_some() => dos += 1,
                b'\r' => mac += 1,
                b'\n' => unix += 1,
                _ => {}
            }
        }

        if unix >= dos && unix >= mac {
            Self::Unix
        } else if dos >= mac {
            Self::Dos
        } else {
            Self::Mac
        }
    }

    /// The newline sequence of this convention.
    pub fn newline(self) -> &'static str {
        match self {
            Self::Unix => "\n",
            Self::Mac => "\r",
            Self::Dos => "\r\n",
        }
    }

    /// Convert an LF-normalized text to this convention.
    pub fn apply_to_text(self, text: &str) -> String {
        match self {
            Self::Unix => text.to_string(),
            other => text.replace('\n', other.newline()),
        }
    }
}

impl StyledText {
    /// Replace the text with the contents of `reader`, clearing the undo history.
    ///
    /// Invalid UTF-8 is replaced with U+FFFD. Newlines are normalized to LF and illegal
    /// characters handled per the configured policy. Returns the convention the input used.
    pub fn read_plain_text<R: Read>(&mut self, mut reader: R) -> Result<PlainTextFormat, TextError> {
        self.ensure_idle()?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let text = String::from_utf8_lossy(&bytes);
        let format = PlainTextFormat::detect(&text);
        tracing::debug!(bytes = bytes.len(), ?format, "read plain text");
        self.set_text(&text, None)?;
        Ok(format)
    }

    /// Write the text to `writer` using the `format` newline convention.
    pub fn write_plain_text<W: Write>(&self, mut writer: W, format: PlainTextFormat) -> Result<(), TextError> {
        match format {
            PlainTextFormat::Unix => writer.write_all(self.text().as_bytes())?,
            other => {
                for (i, line) in self.text().split('\n').enumerate() {
                    if i > 0 {
                        writer.write_all(other.newline().as_bytes())?;
                    }
                    writer.write_all(line.as_bytes())?;
                }
            }
        }
        writer.flush()?;
        Ok(())
    }
}
