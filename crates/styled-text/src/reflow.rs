//! Paragraph reflow ("clean right margin").
//!
//! A paragraph is a run of non-blank lines that share a line prefix (indentation, quote
//! marks, comment leaders). Reflow re-packs the words of a paragraph greedily into lines of at
//! most [`ReflowConfig::line_width`](crate::ReflowConfig::line_width) columns, writing the
//! first line's prefix on the first line and the derived "rest" prefix on every following
//! line.
//!
//! Prefixes are recognised by the default pattern `[ \t]*` plus the configured
//! [`ReflowRule`]s. Each rule pairs a pattern for the first line with a pattern for
//! continuation lines and a replacement that turns the former into the latter, e.g. a
//! bullet `"  * "` on the first line becomes `"    "` on the rest.

use crate::buffer::{BUSY_THRESHOLD, EditKind, StyledText};
use crate::error::TextError;
use crate::run_array::RunArray;
use crate::style::Style;
use crate::text_index::{TextCount, TextIndex, TextRange};
use crate::words::tab_advance;
use regex::Regex;

/// A compiled prefix rule.
#[derive(Debug, Clone)]
pub struct ReflowRule {
    first: Regex,
    rest: Regex,
    rest_line: Regex,
    replace: String,
}

impl ReflowRule {
    /// Compile a rule. The patterns are anchored at the start of the line.
    pub fn new(first: &str, rest: &str, replace: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            first: Regex::new(&format!("^(?:{first})"))?,
            rest: Regex::new(&format!("^(?:{rest})"))?,
            rest_line: Regex::new(&format!("^(?:{rest})$"))?,
            replace: replace.to_string(),
        })
    }

    /// Prefix for continuation lines, derived from the first line's prefix.
    pub fn rest_prefix(&self, first_prefix: &str) -> String {
        self.first
            .replace(first_prefix, self.replace.as_str())
            .into_owned()
    }
}

/// Result of a reflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflowOutcome {
    /// The reformatted text.
    pub range: TextRange,
    /// Where the caret should go.
    pub caret: TextIndex,
}

/// The lines selected for reflow (byte offsets).
#[derive(Debug)]
struct Paragraph {
    start: usize,
    /// First byte after the first line's prefix.
    text_start: usize,
    /// End of the last line, before its newline.
    end: usize,
    first_prefix: String,
    rest_prefix: String,
    rule: Option<usize>,
}

/// Where `append_word` placed its output (character offsets).
struct Placed {
    spacing: Option<usize>,
    word: usize,
}

/// Reflowed text under construction.
#[derive(Default)]
struct Reflowed {
    text: String,
    styles: RunArray<Style>,
    /// Columns used on the current line; 0 means the next word starts a new line.
    width: usize,
    /// Caret offset in characters.
    caret: Option<usize>,
}

impl Reflowed {
    #[allow(clippy::too_many_arguments)]
    fn append_word(
        &mut self,
        spacing: &str,
        spacing_width: usize,
        word: &str,
        word_styles: &RunArray<Style>,
        prefix: &str,
        prefix_width: usize,
        line_width: usize,
    ) -> Placed {
        let word_width = word_styles.len();
        let new_width = self.width + spacing_width + word_width;

        if self.width == 0 || new_width > line_width {
            let prefix_style = word_styles.first().map(Style::plain).unwrap_or_default();
            if !self.text.is_empty() {
                self.text.push('\n');
                self.styles.push(prefix_style.clone(), 1);
            }
            self.text.push_str(prefix);
            self.styles.push(prefix_style, prefix.chars().count());

            let word_at = self.styles.len();
            self.text.push_str(word);
            self.styles.append(word_styles);
            self.width = prefix_width + word_width;
            return Placed {
                spacing: None,
                word: word_at,
            };
        }

        let space_at = self.styles.len();
        let space_style = match (self.styles.last(), word_styles.first()) {
            (Some(prev), Some(next)) => prev.between(next),
            (Some(prev), None) => prev.clone(),
            (None, next) => next.cloned().unwrap_or_default(),
        };
        self.text.push_str(spacing);
        self.styles.push(space_style, spacing.chars().count());

        let word_at = self.styles.len();
        self.text.push_str(word);
        self.styles.append(word_styles);
        self.width = if new_width < line_width { new_width } else { 0 };
        Placed {
            spacing: Some(space_at),
            word: word_at,
        }
    }
}

fn prefix_width(prefix: &str, tab_char_count: usize) -> usize {
    prefix.chars().fold(0, |column, c| {
        if c == '\t' {
            column + tab_advance(column, tab_char_count)
        } else {
            column + 1
        }
    })
}

fn is_sentence_end(c: Option<char>) -> bool {
    matches!(c, Some('.' | '?' | '!'))
}

/// Spacing between a word ending `before` and `word`: two spaces after a sentence unless
/// `word` starts in lower case.
fn join_spacing(before: &str, word: &str) -> &'static str {
    let mut tail = before.chars().rev();
    let c1 = tail.next();
    let c2 = tail.next();
    let sentence_end = is_sentence_end(c1) || (is_sentence_end(c2) && c1 == Some('"'));
    let lower_next = word.chars().next().is_some_and(char::is_lowercase);
    if sentence_end && !lower_next { "  " } else { " " }
}

/// Byte length of the longest common prefix, on a character boundary.
fn common_prefix(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, x), y)| x != y)
        .map_or(a.len().min(b.len()), |((at, _), _)| at)
}

/// Byte length of the longest common suffix no longer than `max`.
fn common_suffix(a: &str, b: &str, max: usize) -> usize {
    let mut len = 0;
    for (x, y) in a.chars().rev().zip(b.chars().rev()) {
        if x != y || len + x.len_utf8() > max {
            break;
        }
        len += x.len_utf8();
    }
    len
}

impl StyledText {
    fn line_end_byte(&self, line_start: usize) -> usize {
        self.text()[line_start..]
            .find('\n')
            .map_or(self.byte_count(), |offset| line_start + offset)
    }

    /// Length of the prefix at the start of `line` and the rule that produced it.
    ///
    /// When `rule` is set its continuation pattern is tried first and wins outright.
    /// Otherwise the longest match among the rules' first-line patterns and `[ \t]*` is used,
    /// the default winning ties.
    fn match_prefix(&self, line: &str, rule: Option<usize>) -> (usize, Option<usize>) {
        if let Some(m) = rule
            .and_then(|index| self.reflow_rules.get(index))
            .and_then(|r| r.rest.find(line))
        {
            return (m.end(), rule);
        }

        let mut best: Option<(usize, usize)> = None;
        for (index, r) in self.reflow_rules.iter().enumerate() {
            if let Some(m) = r.first.find(line)
                && best.is_none_or(|(len, _)| m.end() > len)
            {
                best = Some((m.end(), index));
            }
        }

        let default_len = line.len() - line.trim_start_matches([' ', '\t']).len();
        match best {
            Some((len, index)) if len > default_len => (len, Some(index)),
            _ => (default_len, None),
        }
    }

    fn line_matches_rest(&self, line: &str) -> bool {
        self.reflow_rules.iter().any(|r| r.rest_line.is_match(line))
    }

    fn build_rest_prefix(&self, first_prefix: &str, rule: Option<usize>) -> String {
        match rule.and_then(|index| self.reflow_rules.get(index)) {
            Some(r) => r.rest_prefix(first_prefix),
            None => first_prefix.to_string(),
        }
    }

    /// Lines to reflow around byte `at`, or `None` if its line is blank.
    fn find_paragraph(&self, at: usize, coerce: bool) -> Option<Paragraph> {
        let text = self.text();
        let len = text.len();
        let line_start = text[..at].rfind('\n').map_or(0, |i| i + 1);
        let line_end = self.line_end_byte(line_start);
        let line = &text[line_start..line_end];
        if line.is_empty() {
            return None;
        }
        let (plen, _) = self.match_prefix(line, None);
        if plen >= line.len() || self.line_matches_rest(line) {
            return None;
        }

        // Extend backward over non-blank lines that could have produced the next prefix.
        let mut start = line_start;
        let mut next_prefix = line[..plen].to_string();
        while start > 0 {
            let prev_end = start - 1;
            let prev_start = text[..prev_end].rfind('\n').map_or(0, |i| i + 1);
            let prev = &text[prev_start..prev_end];
            if prev.is_empty() {
                break;
            }
            let (plen, rule) = self.match_prefix(prev, None);
            if plen >= prev.len()
                || self.line_matches_rest(prev)
                || (!coerce && self.build_rest_prefix(&prev[..plen], rule) != next_prefix)
            {
                break;
            }
            start = prev_start;
            next_prefix = prev[..plen].to_string();
        }

        let first_line = &text[start..self.line_end_byte(start)];
        let (plen, rule) = self.match_prefix(first_line, None);
        let first_prefix = first_line[..plen].to_string();
        let rest_prefix = self.build_rest_prefix(&first_prefix, rule);

        // Extend forward while the continuation prefix holds.
        let mut end = line_end;
        while end + 1 < len {
            let next_start = end + 1;
            let next_end = self.line_end_byte(next_start);
            let next = &text[next_start..next_end];
            if next.is_empty() {
                break;
            }
            let (plen, _) = self.match_prefix(next, rule);
            if plen >= next.len() || (!coerce && next[..plen] != rest_prefix) {
                break;
            }
            end = next_end;
        }

        Some(Paragraph {
            start,
            text_start: start + plen,
            end,
            first_prefix,
            rest_prefix,
            rule,
        })
    }

    /// Re-pack the words of `para`, tracking the caret at byte `caret` if given.
    fn reflow_paragraph(&self, para: &Paragraph, caret: Option<usize>) -> Result<Reflowed, TextError> {
        let text = self.text();
        let bytes = text.as_bytes();
        let tab_char_count = self.config.reflow.tab_char_count;
        let line_width = self.config.reflow.line_width;
        let first_width = prefix_width(&para.first_prefix, tab_char_count);
        let rest_width = prefix_width(&para.rest_prefix, tab_char_count);

        let mut out = Reflowed::default();
        let mut spacing = String::new();
        let mut pos = para.text_start;
        let mut require_space = false;

        loop {
            let lead = pos;
            let mut spacing_width = 0;
            let mut crossed_line = false;
            spacing.clear();

            while pos < para.end {
                match bytes[pos] {
                    b' ' => {
                        spacing.push(' ');
                        spacing_width += 1;
                    }
                    b'\t' => {
                        spacing.push('\t');
                        spacing_width += tab_advance(out.width + spacing_width, tab_char_count);
                    }
                    b'\n' => {
                        spacing.clear();
                        spacing_width = 0;
                        crossed_line = true;
                        let next_start = pos + 1;
                        let next_end = self.line_end_byte(next_start).min(para.end);
                        let (plen, _) = self.match_prefix(&text[next_start..next_end], para.rule);
                        pos = next_start + plen;
                        continue;
                    }
                    _ => break,
                }
                pos += 1;
            }
            if pos >= para.end {
                break;
            }

            let word_start = pos;
            while pos < para.end && !matches!(bytes[pos], b' ' | b'\t' | b'\n') {
                pos += 1;
            }
            let word = &text[word_start..pos];
            let word_range = self.byte_range_to_text_range(word_start..pos);
            let word_styles = self
                .styles()
                .slice(word_range.chars.start, word_range.chars.len())?;

            // Spacing that overflows the line is replaced by the join spacing.
            if require_space
                && (spacing_width == 0 || out.width + spacing_width + word_styles.len() > line_width)
            {
                let join = join_spacing(&out.text, word);
                spacing.clear();
                spacing.push_str(join);
                spacing_width = join.len();
            }
            require_space = true;

            let (prefix, prefix_width) = if out.text.is_empty() {
                (para.first_prefix.as_str(), first_width)
            } else {
                (para.rest_prefix.as_str(), rest_width)
            };
            let placed = out.append_word(
                &spacing,
                spacing_width,
                word,
                &word_styles,
                prefix,
                prefix_width,
                line_width,
            );

            if let Some(caret) = caret
                && out.caret.is_none()
            {
                if (word_start..=pos).contains(&caret) {
                    out.caret = Some(placed.word + text[word_start..caret].chars().count());
                } else if (lead..word_start).contains(&caret) {
                    out.caret = Some(match placed.spacing {
                        Some(space_at) if !crossed_line => {
                            let offset = text[lead..caret].chars().count();
                            space_at + offset.min(spacing.chars().count())
                        }
                        _ => placed.word,
                    });
                }
            }
        }

        Ok(out)
    }

    /// Replace bytes `start..end` with `new_text`, trimming unchanged text at both ends
    /// unless `coerce`. Returns `false` if nothing was recorded.
    fn commit_reflow(
        &mut self,
        start: usize,
        end: usize,
        new_text: &str,
        new_styles: &RunArray<Style>,
        coerce: bool,
    ) -> Result<bool, TextError> {
        let old = &self.text()[start..end];
        let (head, tail) = if coerce {
            (0, 0)
        } else {
            if old == new_text {
                return Ok(false);
            }
            let head = common_prefix(old, new_text);
            let tail = common_suffix(old, new_text, old.len().min(new_text.len()) - head);
            (head, tail)
        };

        let old_range = self.byte_range_to_text_range(start + head..end - tail);
        let middle = &new_text[head..new_text.len() - tail];
        let skip = new_text[..head].chars().count();
        let styles = new_styles.slice(skip, middle.chars().count())?;
        tracing::debug!(
            replaced = old_range.chars.len(),
            inserted = styles.len(),
            coerce,
            "reflowed paragraph"
        );
        self.paste_as(EditKind::Reflow, &old_range, middle, Some(&styles))?;
        Ok(true)
    }

    /// Reflow the paragraph containing `caret`, or every paragraph touched by a non-empty
    /// `selection`.
    ///
    /// Without `coerce`, a paragraph ends where the line prefix changes, and lines that
    /// already fit are left alone; `None` is returned if nothing changed. With `coerce`, the
    /// paragraph runs to the next blank line and is rebuilt with the first line's prefixes.
    pub fn clean_right_margin(
        &mut self,
        caret: TextIndex,
        selection: Option<&TextRange>,
        coerce: bool,
    ) -> Result<Option<ReflowOutcome>, TextError> {
        self.ensure_idle()?;
        self.check_index(caret)?;
        if let Some(selection) = selection {
            self.check_range(selection)?;
            if !selection.is_empty() {
                return self.reflow_selection(selection, coerce);
            }
        }

        let _span = tracing::debug_span!("clean_right_margin", caret = caret.char_index, coerce).entered();
        if self.is_empty() || (caret == self.beyond_end() && self.ends_with_newline()) {
            return Ok(None);
        }
        let Some(para) = self.find_paragraph(caret.byte_index, coerce) else {
            return Ok(None);
        };

        let reflowed = self.reflow_paragraph(&para, Some(caret.byte_index))?;
        let first = self.byte_index_to_text_index(para.start);
        let new_caret = if caret.byte_index < para.text_start {
            caret.char_index
        } else {
            first.char_index + reflowed.caret.unwrap_or(reflowed.styles.len())
        };
        if !self.commit_reflow(para.start, para.end, &reflowed.text, &reflowed.styles, coerce)? {
            return Ok(None);
        }

        let range = TextRange::new(
            first,
            TextCount::new(reflowed.styles.len(), reflowed.text.len()),
        );
        Ok(Some(ReflowOutcome {
            range,
            caret: self.char_index_to_text_index(new_caret),
        }))
    }

    fn reflow_selection(&mut self, selection: &TextRange, coerce: bool) -> Result<Option<ReflowOutcome>, TextError> {
        let _span = tracing::debug_span!("clean_right_margin_selection", chars = selection.chars.len(), coerce).entered();
        if selection.bytes.len() > BUSY_THRESHOLD {
            self.broadcast_busy();
        }

        let start = self.paragraph_start(selection.first()).byte_index;
        let last = self.char_index_to_text_index(selection.chars.end - 1);
        let limit = self.paragraph_end(last).byte_index;

        let mut text = String::new();
        let mut styles = RunArray::new();
        let mut region: Option<usize> = None;
        let mut copied = start;
        let mut pos = start;
        while pos < limit {
            let line_end = self.line_end_byte(pos);
            match self.find_paragraph(pos, coerce) {
                Some(para) if region.is_none() || para.start >= copied => {
                    if region.is_none() {
                        region = Some(para.start);
                        copied = para.start;
                    }
                    let between = self.byte_range_to_text_range(copied..para.start);
                    text.push_str(&self.text()[between.bytes.clone()]);
                    styles.append(&self.styles().slice(between.chars.start, between.chars.len())?);

                    let reflowed = self.reflow_paragraph(&para, None)?;
                    text.push_str(&reflowed.text);
                    styles.append(&reflowed.styles);
                    copied = para.end;
                    pos = para.end + 1;
                }
                _ => pos = line_end + 1,
            }
        }

        let Some(region_start) = region else {
            return Ok(None);
        };
        if !self.commit_reflow(region_start, copied, &text, &styles, coerce)? {
            return Ok(None);
        }
        let first = self.byte_index_to_text_index(region_start);
        let range = TextRange::new(first, TextCount::new(styles.len(), text.len()));
        Ok(Some(ReflowOutcome {
            caret: range.after_last(),
            range,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ReflowConfig, ReflowRuleConfig, TextConfig};

    fn buffer(line_width: usize, text: &str) -> StyledText {
        buffer_with_rules(line_width, Vec::new(), text)
    }

    fn buffer_with_rules(line_width: usize, rules: Vec<ReflowRuleConfig>, text: &str) -> StyledText {
        let config = TextConfig {
            reflow: ReflowConfig {
                line_width,
                rules,
                ..ReflowConfig::default()
            },
            ..TextConfig::default()
        };
        let mut buffer = StyledText::with_config(config).unwrap();
        buffer.set_text(text, None).unwrap();
        buffer
    }

    fn quote_rule() -> ReflowRuleConfig {
        ReflowRuleConfig {
            first: "[ \t]*>[ \t>]*".to_string(),
            rest: "[ \t]*>[ \t>]*".to_string(),
            replace: "$0".to_string(),
        }
    }

    #[test]
    fn test_wraps_long_line() {
        let mut text = buffer(10, "aaa bbb ccc ddd\n");
        let outcome = text
            .clean_right_margin(TextIndex::ZERO, None, false)
            .unwrap()
            .unwrap();
        assert_eq!(text.text(), "aaa bbb\nccc ddd\n");
        assert_eq!(outcome.range.chars, 0..15);
        assert_eq!(text.undo_kind(), Some(EditKind::Reflow));
    }

    #[test]
    fn test_reflow_is_idempotent() {
        let mut text = buffer(10, "aaa bbb ccc ddd eee\n");
        text.clean_right_margin(TextIndex::ZERO, None, false).unwrap();
        let once = text.text().to_string();
        assert!(
            text.clean_right_margin(TextIndex::ZERO, None, false)
                .unwrap()
                .is_none()
        );
        assert_eq!(text.text(), once);
    }

    #[test]
    fn test_wide_spacing_is_measured_as_a_join() {
        let mut text = buffer(5, "  aa a  a aa . . ");
        text.clean_right_margin(TextIndex::ZERO, None, false).unwrap();
        assert_eq!(text.text(), "  aa\n  a a\n  aa\n  . .");
        assert!(
            text.clean_right_margin(TextIndex::ZERO, None, false)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_joins_short_lines_with_sentence_spacing() {
        let mut text = buffer(30, "one\ntwo three.\nFour\n");
        text.clean_right_margin(TextIndex::ZERO, None, false).unwrap();
        assert_eq!(text.text(), "one two three.  Four\n");
    }

    #[test]
    fn test_caret_keeps_offset_in_word() {
        let mut text = buffer(30, "End.\nNext");
        let caret = text.char_index_to_text_index(6);
        let outcome = text.clean_right_margin(caret, None, false).unwrap().unwrap();
        assert_eq!(text.text(), "End.  Next");
        assert_eq!(outcome.caret.char_index, 7);
    }

    #[test]
    fn test_quote_prefix_is_repeated() {
        let mut text = buffer_with_rules(10, vec![quote_rule()], "> aaa bbb ccc\n> ddd\n");
        text.clean_right_margin(TextIndex::ZERO, None, false).unwrap();
        assert_eq!(text.text(), "> aaa bbb\n> ccc ddd\n");
    }

    #[test]
    fn test_prefix_change_ends_paragraph_unless_coerced() {
        let mut text = buffer_with_rules(30, vec![quote_rule()], "> a\nb\n");
        assert!(
            text.clean_right_margin(TextIndex::ZERO, None, false)
                .unwrap()
                .is_none()
        );
        text.clean_right_margin(TextIndex::ZERO, None, true).unwrap();
        assert_eq!(text.text(), "> a b\n");
    }

    #[test]
    fn test_blank_line_is_not_a_paragraph() {
        let mut text = buffer(10, "abc\n   \ndef\n");
        let caret = text.char_index_to_text_index(5);
        assert!(text.clean_right_margin(caret, None, true).unwrap().is_none());
        assert!(
            text.clean_right_margin(text.beyond_end(), None, false)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_selection_reflows_each_paragraph_in_one_step() {
        let mut text = buffer(8, "aaa bbb ccc\n\nddd eee fff\n");
        let all = text.select_all();
        let outcome = text
            .clean_right_margin(TextIndex::ZERO, Some(&all), false)
            .unwrap()
            .unwrap();
        assert_eq!(text.text(), "aaa bbb\nccc\n\nddd eee\nfff\n");
        assert_eq!(outcome.caret, outcome.range.after_last());

        text.undo().unwrap();
        assert_eq!(text.text(), "aaa bbb ccc\n\nddd eee fff\n");
    }

    #[test]
    fn test_prefix_style_is_plain() {
        let mut text = buffer(6, "  aa bb");
        let bold = Style::default().with_bold(true);
        let all = text.select_all();
        text.set_style(&all, &bold).unwrap();
        text.clean_right_margin(TextIndex::ZERO, None, false).unwrap();
        assert_eq!(text.text(), "  aa\n  bb");
        assert_eq!(text.style_at(5), Some(&Style::default()));
        assert_eq!(text.style_at(7), Some(&bold));
    }

    #[test]
    fn test_rule_rest_prefix() {
        let rule = ReflowRule::new(r"[ \t]*\*[ \t]+", r"[ \t]+", "  ").unwrap();
        assert_eq!(rule.rest_prefix("* "), "  ");
    }
}
