//! Private serialization format for styled text.
//!
//! The format keeps text and styles together so that a copy/paste or save/load round trip
//! reproduces both exactly:
//!
//! ```text
//! <version> <char count> <byte count>\n
//! <byte count bytes of UTF-8 text>\n
//! [[<run length>, <style>], ...]\n
//! ```
//!
//! The style runs are one line of JSON. Readers reject versions newer than
//! [`PRIVATE_FORMAT_VERSION`].

use crate::buffer::StyledText;
use crate::error::{PersistError, TextError};
use crate::run_array::RunArray;
use crate::style::Style;
use crate::text_index::TextRange;
use serde::Deserialize;
use std::io::{BufRead, BufReader, Read, Write};

/// Newest version of the private format.
pub const PRIVATE_FORMAT_VERSION: u32 = 1;

/// Longest header line accepted, newline included.
const MAX_HEADER_LEN: u64 = 64;

fn corrupt(message: impl Into<String>) -> PersistError {
    PersistError::Corrupt(message.into())
}

/// Write `text` with its per-character `styles`.
pub fn encode_private<W: Write>(mut writer: W, text: &str, styles: &RunArray<Style>) -> Result<(), PersistError> {
    let char_count = text.chars().count();
    if styles.len() != char_count {
        return Err(corrupt(format!(
            "{} styles for {char_count} characters",
            styles.len()
        )));
    }

    writeln!(writer, "{PRIVATE_FORMAT_VERSION} {char_count} {}", text.len())?;
    writer.write_all(text.as_bytes())?;
    writer.write_all(b"\n")?;
    let runs: Vec<(usize, &Style)> = styles.runs().collect();
    serde_json::to_writer(&mut writer, &runs)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Read text and styles written by [`encode_private`].
pub fn decode_private<R: Read>(reader: R) -> Result<(String, RunArray<Style>), PersistError> {
    let mut reader = BufReader::new(reader);

    let mut header = String::new();
    (&mut reader).take(MAX_HEADER_LEN).read_line(&mut header)?;
    if !header.ends_with('\n') {
        return Err(corrupt("missing or overlong header"));
    }
    let mut fields = header.split_ascii_whitespace();
    let mut field = |name: &str| -> Result<usize, PersistError> {
        fields
            .next()
            .and_then(|value| value.parse().ok())
            .ok_or_else(|| corrupt(format!("missing or invalid {name} in header")))
    };
    let version = field("version")?;
    if version > PRIVATE_FORMAT_VERSION as usize {
        return Err(PersistError::UnsupportedVersion {
            found: u32::try_from(version).unwrap_or(u32::MAX),
            supported: PRIVATE_FORMAT_VERSION,
        });
    }
    let char_count = field("character count")?;
    let byte_count = field("byte count")?;

    if char_count > byte_count {
        return Err(corrupt(format!(
            "{char_count} characters cannot fit in {byte_count} bytes"
        )));
    }

    let mut bytes = Vec::new();
    (&mut reader).take(byte_count as u64).read_to_end(&mut bytes)?;
    if bytes.len() != byte_count {
        return Err(corrupt(format!("text shorter than {byte_count} bytes")));
    }
    let text = String::from_utf8(bytes).map_err(|_| corrupt("text is not valid UTF-8"))?;
    if text.chars().count() != char_count {
        return Err(corrupt(format!(
            "expected {char_count} characters, found {}",
            text.chars().count()
        )));
    }

    let mut separator = [0u8; 1];
    reader
        .read_exact(&mut separator)
        .map_err(|_| corrupt("missing style runs"))?;
    if separator != *b"\n" {
        return Err(corrupt("text is longer than its byte count"));
    }

    let mut runs_reader = serde_json::Deserializer::from_reader(&mut reader);
    let runs = Vec::<(usize, Style)>::deserialize(&mut runs_reader)?;
    let styles = RunArray::from_runs(runs);
    if styles.len() != char_count {
        return Err(corrupt(format!(
            "style runs cover {} characters, text has {char_count}",
            styles.len()
        )));
    }

    tracing::debug!(version, chars = char_count, runs = styles.run_count(), "decoded styled text");
    Ok((text, styles))
}

impl StyledText {
    /// Write the whole text and its styles in the private format.
    pub fn write_private_format<W: Write>(&self, writer: W) -> Result<(), TextError> {
        encode_private(writer, self.text(), self.styles())?;
        Ok(())
    }

    /// Write `range` and its styles in the private format, as for the clipboard.
    pub fn write_private_range<W: Write>(&self, writer: W, range: &TextRange) -> Result<(), TextError> {
        let (text, styles) = self.copy(range)?;
        encode_private(writer, &text, &styles)?;
        Ok(())
    }

    /// Replace the text with private format data, clearing the undo history.
    ///
    /// Nothing changes if the data fails to decode. Returns `false` if the decoded text had
    /// to be cleaned.
    pub fn read_private_format<R: Read>(&mut self, reader: R) -> Result<bool, TextError> {
        self.ensure_idle()?;
        let (text, styles) = decode_private(reader)?;
        self.set_text(&text, Some(&styles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(text: &str, styles: &RunArray<Style>) -> Vec<u8> {
        let mut out = Vec::new();
        encode_private(&mut out, text, styles).unwrap();
        out
    }

    #[test]
    fn test_layout_of_stream() {
        let styles = RunArray::with_value(Style::default(), 2);
        let out = String::from_utf8(encoded("né", &styles)).unwrap();
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("1 2 3"));
        assert_eq!(lines.next(), Some("né"));
        assert!(lines.next().unwrap().starts_with("[[2,{"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_text_may_contain_newlines() {
        let mut styles = RunArray::with_value(Style::default(), 3);
        styles.set(2, Style::default().with_bold(true)).unwrap();
        let (text, decoded) = decode_private(encoded("a\n\n", &styles).as_slice()).unwrap();
        assert_eq!(text, "a\n\n");
        assert_eq!(decoded, styles);
    }

    #[test]
    fn test_newer_version_is_rejected() {
        let err = decode_private("2 0 0\n\n[]\n".as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            PersistError::UnsupportedVersion { found: 2, supported: 1 }
        ));
    }

    #[test]
    fn test_corrupt_streams() {
        let inputs: [&[u8]; 6] = [
            b"",
            b"1 x 0\n\n[]\n",
            b"1 3 3\nab",
            b"1 2 2\nabc\n[]\n",
            b"1 3 3\nabc\n[[2,{}]]\n",
            b"1 1 1\n\xff\n[]\n",
        ];
        for input in inputs {
            assert!(decode_private(input).is_err(), "{input:?}");
        }
    }

    #[test]
    fn test_oversized_counts_are_rejected() {
        let err = decode_private("1 0 18446744073709551615\n\n[]\n".as_bytes()).unwrap_err();
        assert!(matches!(err, PersistError::Corrupt(_)));

        let err = decode_private("1 4 4000000000\nabcd\n[[4,{}]]\n".as_bytes()).unwrap_err();
        assert!(matches!(err, PersistError::Corrupt(_)));

        let err = decode_private("1 9 3\nabc\n[]\n".as_bytes()).unwrap_err();
        assert!(matches!(err, PersistError::Corrupt(_)));
    }

    #[test]
    fn test_header_length_is_bounded() {
        let long = format!("1 0 0{}\n\n[]\n", " ".repeat(200));
        let err = decode_private(long.as_bytes()).unwrap_err();
        assert!(matches!(err, PersistError::Corrupt(_)));

        let endless = std::io::repeat(b'7');
        assert!(decode_private(endless).is_err());
    }

    #[test]
    fn test_read_replaces_buffer() {
        let mut source = StyledText::from_text("keep");
        let range = source.char_range(1..3).unwrap();
        source.set_style(&range, &Style::default().with_italic(true)).unwrap();
        let mut out = Vec::new();
        source.write_private_range(&mut out, &range).unwrap();

        let mut target = StyledText::from_text("old");
        assert!(target.read_private_format(out.as_slice()).unwrap());
        assert_eq!(target.text(), "ee");
        assert!(target.style_at(0).unwrap().italic);
        assert!(!target.can_undo());

        assert!(target.read_private_format("9 0 0\n".as_bytes()).is_err());
        assert_eq!(target.text(), "ee");
    }
}
