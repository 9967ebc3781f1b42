//! Search and replace.
//!
//! Queries are compiled once into a [`SearchPattern`] (a plain query is escaped and compiled
//! into a regex) and then run against the buffer. Matches are reported as [`TextRange`]s, so
//! they carry both character and byte offsets.
//!
//! - forward/backward search with optional wrap-around
//! - optional entire-word matching using the buffer's word predicate
//! - replacement with `$1`/`${name}` interpolation and case preservation
//! - replace-all within a range as a single undo step
//! - style search over the run overlay

use crate::buffer::{EditKind, StyledText};
use crate::error::TextError;
use crate::run_array::RunArray;
use crate::style::Style;
use crate::text_index::{TextCount, TextIndex, TextRange};
use regex::{Regex, RegexBuilder};

/// Options that control how a query is compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// If `true`, performs a case-sensitive search.
    pub case_sensitive: bool,
    /// If `true`, treats the query as a regex pattern.
    pub regex: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            regex: false,
        }
    }
}

/// Options that control how a match is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaceOptions {
    /// Expand `$1`, `${name}` and `$$` in the replacement.
    pub interpolate: bool,
    /// Re-case the replacement to mirror the matched text.
    pub preserve_case: bool,
}

/// A compiled query.
#[derive(Debug, Clone)]
pub struct SearchPattern {
    regex: Regex,
    options: SearchOptions,
}

impl SearchPattern {
    /// Compile `query`.
    pub fn new(query: &str, options: SearchOptions) -> Result<Self, TextError> {
        Ok(Self {
            regex: compile_search_regex(query, options)?,
            options,
        })
    }

    /// The options the pattern was compiled with.
    pub fn options(&self) -> SearchOptions {
        self.options
    }

    /// The compiled regex.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

fn compile_search_regex(query: &str, options: SearchOptions) -> Result<Regex, regex::Error> {
    let pattern = if options.regex {
        query.to_string()
    } else {
        regex::escape(query)
    };

    RegexBuilder::new(&pattern)
        .case_insensitive(!options.case_sensitive)
        .multi_line(true)
        .build()
}

/// A search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatch {
    /// The matched text.
    pub range: TextRange,
    /// `true` if the search wrapped around the end (or start) of the text.
    pub wrapped: bool,
}

fn recase(c: char, like: char, out: &mut String) {
    if like.is_lowercase() && c.is_uppercase() {
        out.extend(c.to_lowercase());
    } else if like.is_uppercase() && c.is_lowercase() {
        out.extend(c.to_uppercase());
    } else {
        out.push(c);
    }
}

/// Adjust the case of `dest` to mirror `source`.
///
/// Equal lengths copy the case character by character. Otherwise, if every letter in
/// `source` has the same case, all of `dest` is coerced to it; then the first character of
/// `dest` takes the case of the first character of `source`.
pub fn match_case(source: &str, dest: &str) -> String {
    let source_len = source.chars().count();
    let dest_len = dest.chars().count();
    let (Some(source_first), true) = (source.chars().next(), dest_len > 0) else {
        return dest.to_string();
    };

    if source_len == dest_len {
        let mut out = String::with_capacity(dest.len());
        for (like, c) in source.chars().zip(dest.chars()) {
            recase(c, like, &mut out);
        }
        return out;
    }

    let coerced = if dest_len > 1 {
        let has_lower = source.chars().any(char::is_lowercase);
        let has_upper = source.chars().any(char::is_uppercase);
        match (has_lower, has_upper) {
            (true, false) => dest.to_lowercase(),
            (false, true) => dest.to_uppercase(),
            _ => dest.to_string(),
        }
    } else {
        dest.to_string()
    };

    let mut chars = coerced.chars();
    let mut out = String::with_capacity(coerced.len());
    if let Some(first) = chars.next() {
        recase(first, source_first, &mut out);
    }
    out.push_str(chars.as_str());
    out
}

fn next_boundary(text: &str, byte: usize) -> usize {
    text[byte..]
        .chars()
        .next()
        .map_or(text.len(), |c| byte + c.len_utf8())
}

impl StyledText {
    /// First acceptable match starting in `from..limit` (bytes).
    fn first_match_between(
        &self,
        regex: &Regex,
        from: usize,
        limit: usize,
        entire_word: bool,
    ) -> Option<TextRange> {
        let text = self.text();
        let mut pos = from;
        while pos <= text.len() {
            let m = regex.find_at(text, pos)?;
            if m.start() >= limit {
                return None;
            }
            if m.is_empty() {
                if m.end() >= text.len() {
                    return None;
                }
                pos = next_boundary(text, m.end());
                continue;
            }
            let range = self.byte_range_to_text_range(m.range());
            if entire_word && !self.is_entire_word(&range) {
                pos = next_boundary(text, m.start());
                continue;
            }
            return Some(range);
        }
        None
    }

    /// Last acceptable match satisfying `accept(start, end)` (bytes).
    ///
    /// Every start position is tried, so a match overlapping an earlier one is still found.
    fn last_match_where(
        &self,
        regex: &Regex,
        entire_word: bool,
        accept: impl Fn(usize, usize) -> bool,
    ) -> Option<TextRange> {
        let text = self.text();
        let mut last = None;
        let mut pos = 0;
        while let Some(m) = regex.find_at(text, pos) {
            if !m.is_empty() && accept(m.start(), m.end()) {
                let range = self.byte_range_to_text_range(m.range());
                if !entire_word || self.is_entire_word(&range) {
                    last = Some(range);
                }
            }
            if m.start() >= text.len() {
                break;
            }
            pos = next_boundary(text, m.start());
        }
        last
    }

    /// Find the next match at or after `start`.
    ///
    /// With `wrap`, a failed search restarts at the beginning of the text and stops before
    /// reaching `start` again.
    pub fn search_forward(
        &self,
        start: TextIndex,
        pattern: &SearchPattern,
        entire_word: bool,
        wrap: bool,
    ) -> Option<TextMatch> {
        let start = self.char_index_to_text_index(start.char_index).byte_index;
        let len = self.byte_count();
        if let Some(range) = self.first_match_between(&pattern.regex, start, len + 1, entire_word) {
            return Some(TextMatch {
                range,
                wrapped: false,
            });
        }
        if wrap && start > 0 {
            let range = self.first_match_between(&pattern.regex, 0, start, entire_word)?;
            tracing::trace!(start, "forward search wrapped");
            return Some(TextMatch {
                range,
                wrapped: true,
            });
        }
        None
    }

    /// Find the last match ending at or before `start`.
    ///
    /// With `wrap`, a failed search restarts at the end of the text and stops before reaching
    /// `start` again.
    pub fn search_backward(
        &self,
        start: TextIndex,
        pattern: &SearchPattern,
        entire_word: bool,
        wrap: bool,
    ) -> Option<TextMatch> {
        let start = self.char_index_to_text_index(start.char_index).byte_index;
        if let Some(range) = self.last_match_where(&pattern.regex, entire_word, |_, end| end <= start) {
            return Some(TextMatch {
                range,
                wrapped: false,
            });
        }
        if wrap && start < self.byte_count() {
            let range = self.last_match_where(&pattern.regex, entire_word, |first, _| first >= start)?;
            tracing::trace!(start, "backward search wrapped");
            return Some(TextMatch {
                range,
                wrapped: true,
            });
        }
        None
    }

    fn replacement_for(
        &self,
        caps: &regex::Captures<'_>,
        replacement: &str,
        options: ReplaceOptions,
    ) -> String {
        let mut text = String::new();
        if options.interpolate {
            caps.expand(replacement, &mut text);
        } else {
            text.push_str(replacement);
        }
        if options.preserve_case {
            let matched = caps.get(0).map_or("", |m| m.as_str());
            text = match_case(matched, &text);
        }
        text
    }

    /// Replace the text of `found` and return the length of the replacement.
    ///
    /// Fails with [`TextError::StaleMatch`] if the pattern no longer matches exactly that
    /// range.
    pub fn replace_match(
        &mut self,
        found: &TextMatch,
        pattern: &SearchPattern,
        replacement: &str,
        options: ReplaceOptions,
    ) -> Result<TextCount, TextError> {
        self.ensure_idle()?;
        self.check_range(&found.range)?;
        let stale = TextError::StaleMatch {
            start: found.range.bytes.start,
            end: found.range.bytes.end,
        };

        let new_text = {
            let caps = pattern
                .regex
                .captures_at(self.text(), found.range.bytes.start)
                .ok_or(stale)?;
            let whole = caps.get(0).map(|m| m.range());
            if whole != Some(found.range.bytes.clone()) {
                return Err(TextError::StaleMatch {
                    start: found.range.bytes.start,
                    end: found.range.bytes.end,
                });
            }
            self.replacement_for(&caps, replacement, options)
        };

        let placed = self.paste(&found.range, &new_text, None)?;
        Ok(placed.count())
    }

    /// Replace every match inside `range` as one undo step.
    ///
    /// Replacements take the insertion style at the start of their match. Returns the range
    /// of the rewritten text, or `None` if nothing matched.
    pub fn replace_all_in_range(
        &mut self,
        range: &TextRange,
        pattern: &SearchPattern,
        entire_word: bool,
        replacement: &str,
        options: ReplaceOptions,
    ) -> Result<Option<TextRange>, TextError> {
        self.ensure_idle()?;
        self.check_range(range)?;
        let _span = tracing::debug_span!("replace_all", chars = range.chars.len()).entered();

        let text = self.text();
        let mut out = String::with_capacity(range.bytes.len());
        let mut styles: RunArray<Style> = RunArray::new();
        let mut copied_to = range.first();
        let mut count = 0usize;

        // Matched against the whole text so anchors and word boundaries see the context.
        let mut pos = range.bytes.start;
        while let Some(caps) = pattern.regex.captures_at(text, pos) {
            let Some(whole) = caps.get(0) else {
                break;
            };
            if whole.start() >= range.bytes.end {
                break;
            }
            let found = self.byte_range_to_text_range(whole.range());
            if whole.is_empty()
                || whole.end() > range.bytes.end
                || (entire_word && !self.is_entire_word(&found))
            {
                pos = next_boundary(text, whole.start());
                continue;
            }

            let kept = TextRange::from_indices(copied_to, found.first());
            out.push_str(&text[kept.bytes.clone()]);
            styles.append(&self.styles().slice(kept.chars.start, kept.chars.len())?);

            let new_text = self.replacement_for(&caps, replacement, options);
            let style = self.calc_insertion_style(found.first());
            styles.push(style, new_text.chars().count());
            out.push_str(&new_text);

            copied_to = found.after_last();
            count += 1;
            pos = whole.end();
        }

        if count == 0 {
            return Ok(None);
        }
        let tail = TextRange::from_indices(copied_to, range.after_last());
        out.push_str(&text[tail.bytes.clone()]);
        styles.append(&self.styles().slice(tail.chars.start, tail.chars.len())?);

        tracing::debug!(count, "replaced all matches");
        let placed = self.paste_as(EditKind::ReplaceAll, range, &out, Some(&styles))?;
        Ok(Some(placed))
    }

    /// Style runs as character ranges with their styles.
    fn style_runs(&self) -> impl Iterator<Item = (std::ops::Range<usize>, &Style)> + '_ {
        self.styles().runs().scan(0usize, |first, (len, style)| {
            let range = *first..*first + len;
            *first += len;
            Some((range, style))
        })
    }

    /// Find the first style run at or after `start` whose style satisfies `predicate`.
    pub fn search_style_forward(
        &self,
        start: TextIndex,
        predicate: impl Fn(&Style) -> bool,
        wrap: bool,
    ) -> Option<TextMatch> {
        let start = start.char_index;
        let hit = self
            .style_runs()
            .filter(|(run, style)| run.end > start && predicate(style))
            .map(|(run, _)| run.start.max(start)..run.end)
            .next();
        let (chars, wrapped) = match hit {
            Some(chars) => (chars, false),
            None if wrap && start > 0 => {
                let chars = self
                    .style_runs()
                    .take_while(|(run, _)| run.start < start)
                    .find(|(_, style)| predicate(style))
                    .map(|(run, _)| run)?;
                (chars, true)
            }
            None => return None,
        };
        let range = self.char_range(chars).ok()?;
        Some(TextMatch { range, wrapped })
    }

    /// Find the last style run ending at or before `start` whose style satisfies
    /// `predicate`. A run containing `start` is clipped to end there.
    pub fn search_style_backward(
        &self,
        start: TextIndex,
        predicate: impl Fn(&Style) -> bool,
        wrap: bool,
    ) -> Option<TextMatch> {
        let start = start.char_index;
        let hit = self
            .style_runs()
            .filter(|(run, style)| run.start < start && predicate(style))
            .map(|(run, _)| run.start..run.end.min(start))
            .last();
        let (chars, wrapped) = match hit {
            Some(chars) => (chars, false),
            None if wrap && start < self.char_count() => {
                let chars = self
                    .style_runs()
                    .filter(|(run, style)| run.end > start && predicate(style))
                    .map(|(run, _)| run)
                    .last()?;
                (chars, true)
            }
            None => return None,
        };
        let range = self.char_range(chars).ok()?;
        Some(TextMatch { range, wrapped })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(query: &str) -> SearchPattern {
        SearchPattern::new(query, SearchOptions::default()).unwrap()
    }

    #[test]
    fn test_forward_and_wrap() {
        let text = StyledText::from_text("one two one two");
        let pattern = literal("one");
        let start = text.char_index_to_text_index(1);

        let hit = text.search_forward(start, &pattern, false, false).unwrap();
        assert_eq!(hit.range.chars, 8..11);
        assert!(!hit.wrapped);

        let start = text.char_index_to_text_index(9);
        assert!(text.search_forward(start, &pattern, false, false).is_none());
        let hit = text.search_forward(start, &pattern, false, true).unwrap();
        assert_eq!(hit.range.chars, 0..3);
        assert!(hit.wrapped);
    }

    #[test]
    fn test_backward_and_wrap() {
        let text = StyledText::from_text("ab ab ab");
        let pattern = literal("ab");
        let hit = text
            .search_backward(text.char_index_to_text_index(5), &pattern, false, false)
            .unwrap();
        assert_eq!(hit.range.chars, 3..5);

        let hit = text
            .search_backward(text.char_index_to_text_index(1), &pattern, false, true)
            .unwrap();
        assert_eq!(hit.range.chars, 6..8);
        assert!(hit.wrapped);
    }

    #[test]
    fn test_backward_finds_overlapping_match() {
        let text = StyledText::from_text("aaa");
        let pattern = literal("aa");
        let hit = text
            .search_backward(text.beyond_end(), &pattern, false, false)
            .unwrap();
        assert_eq!(hit.range.chars, 1..3);

        let hit = text
            .search_backward(text.char_index_to_text_index(2), &pattern, false, false)
            .unwrap();
        assert_eq!(hit.range.chars, 0..2);
    }

    #[test]
    fn test_entire_word_and_case() {
        let text = StyledText::from_text("Cat concat CAT");
        let pattern = SearchPattern::new(
            "cat",
            SearchOptions {
                case_sensitive: false,
                regex: false,
            },
        )
        .unwrap();
        let hit = text
            .search_forward(text.char_index_to_text_index(1), &pattern, true, false)
            .unwrap();
        assert_eq!(hit.range.chars, 11..14);
    }

    #[test]
    fn test_match_case() {
        assert_eq!(match_case("hello", "WORLD"), "world");
        assert_eq!(match_case("HELLO", "planet"), "PLANET");
        assert_eq!(match_case("Hello", "goodbye"), "Goodbye");
        assert_eq!(match_case("hEllo", "Xy"), "xy");
        assert_eq!(match_case("", "abc"), "abc");
    }

    #[test]
    fn test_replace_match_interpolates() {
        let mut text = StyledText::from_text("x = foo(1);");
        let pattern = SearchPattern::new(
            r"(\w+)\((\d)\)",
            SearchOptions {
                case_sensitive: true,
                regex: true,
            },
        )
        .unwrap();
        let hit = text
            .search_forward(TextIndex::ZERO, &pattern, false, false)
            .unwrap();
        let count = text
            .replace_match(
                &hit,
                &pattern,
                "$2.$1()",
                ReplaceOptions {
                    interpolate: true,
                    preserve_case: false,
                },
            )
            .unwrap();
        assert_eq!(text.text(), "x = 1.foo();");
        assert_eq!(count.char_count, 7);

        // The old match no longer lines up with the text.
        let err = text
            .replace_match(&hit, &pattern, "z", ReplaceOptions::default())
            .unwrap_err();
        assert!(matches!(err, TextError::StaleMatch { .. }));
    }

    #[test]
    fn test_replace_all_is_one_undo_step() {
        let mut text = StyledText::from_text("a cat, a Cat, concat");
        let pattern = SearchPattern::new(
            "cat",
            SearchOptions {
                case_sensitive: false,
                regex: false,
            },
        )
        .unwrap();
        let all = text.select_all();
        let options = ReplaceOptions {
            interpolate: false,
            preserve_case: true,
        };
        let placed = text
            .replace_all_in_range(&all, &pattern, true, "dog", options)
            .unwrap()
            .unwrap();
        assert_eq!(text.text(), "a dog, a Dog, concat");
        assert_eq!(placed.chars, 0..20);
        assert_eq!(text.undo_kind(), Some(EditKind::ReplaceAll));

        text.undo().unwrap();
        assert_eq!(text.text(), "a cat, a Cat, concat");

        let none = literal("zebra");
        let all = text.select_all();
        assert_eq!(
            text.replace_all_in_range(&all, &none, false, "x", ReplaceOptions::default())
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_replace_all_sees_text_around_range() {
        let mut text = StyledText::from_text("cab ab\nab");
        let pattern = SearchPattern::new(
            r"\bab|^ab",
            SearchOptions {
                case_sensitive: true,
                regex: true,
            },
        )
        .unwrap();
        let inner = text.char_range(1..3).unwrap();
        assert_eq!(
            text.replace_all_in_range(&inner, &pattern, false, "ZZ", ReplaceOptions::default())
                .unwrap(),
            None
        );
        assert_eq!(text.text(), "cab ab\nab");

        // A match running past the end of the range is left alone.
        let partial = text.char_range(4..8).unwrap();
        let placed = text
            .replace_all_in_range(&partial, &pattern, false, "ZZ", ReplaceOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(text.text(), "cab ZZ\nab");
        assert_eq!(placed.chars, 4..8);
    }

    #[test]
    fn test_style_search() {
        let mut text = StyledText::from_text("plain bold plain bold");
        let bold = Style::default().with_bold(true);
        text.set_style(&text.char_range(6..10).unwrap(), &bold).unwrap();
        text.set_style(&text.char_range(17..21).unwrap(), &bold).unwrap();

        let is_bold = |style: &Style| style.bold;
        let hit = text
            .search_style_forward(text.char_index_to_text_index(11), is_bold, false)
            .unwrap();
        assert_eq!(hit.range.chars, 17..21);

        let hit = text
            .search_style_backward(text.char_index_to_text_index(15), is_bold, false)
            .unwrap();
        assert_eq!(hit.range.chars, 6..10);

        let hit = text
            .search_style_backward(text.char_index_to_text_index(3), is_bold, true)
            .unwrap();
        assert!(hit.wrapped);
        assert_eq!(hit.range.chars, 17..21);
    }
}
