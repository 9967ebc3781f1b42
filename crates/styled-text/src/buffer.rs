//! The styled text buffer.
//!
//! [`StyledText`] owns a UTF-8 string, a run-length style overlay with one element per
//! character, and a character-to-byte map kept in step with both. Every edit goes through a
//! single replace primitive that records an undo command and broadcasts a [`TextEvent`].
//!
//! Word, search, reflow, indentation and persistence operations live in their own modules as
//! further `impl StyledText` blocks.

use crate::config::{IllegalCharPolicy, ReflowConfig, TextConfig};
use crate::error::{ConfigError, TextError, UndoError};
use crate::events::{EventHub, StyleAdjuster, TextChange, TextEvent};
use crate::reflow::ReflowRule;
use crate::run_array::RunArray;
use crate::style::Style;
use crate::text_index::{TextCount, TextIndex, TextRange, Utf8Widths};
use crate::undo::{Trimmed, UndoMode, UndoRedoChain, UndoState};

/// Texts larger than this announce [`TextEvent::WillBeBusy`] before being replaced.
pub(crate) const BUSY_THRESHOLD: usize = 1 << 20;

/// Predicate deciding which characters belong to words.
pub type WordPredicate = Box<dyn Fn(char) -> bool>;

/// The default word predicate: letters, digits and underscore.
pub fn default_is_word_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// Returns `true` for control characters the buffer never stores.
///
/// Tab, newline, carriage return (converted to newline) and form feed are allowed.
pub fn is_illegal_char(c: char) -> bool {
    matches!(c, '\0'..='\x08' | '\x0B' | '\x0E'..='\x1F' | '\x7F')
}

/// What kind of edit an undo command reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditKind {
    /// Text was inserted.
    Insert,
    /// Text was deleted.
    Delete,
    /// A range was replaced.
    Paste,
    /// Characters were typed.
    Typing,
    /// Text was moved.
    Move,
    /// Styles were changed.
    Style,
    /// Lines were indented or outdented.
    TabShift,
    /// Paragraphs were reflowed.
    Reflow,
    /// Every match in a range was replaced.
    ReplaceAll,
}

/// Result of an insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertOutcome {
    /// Range occupied by the inserted text.
    pub range: TextRange,
    /// `true` if newlines were normalized or illegal characters stripped.
    pub cleaned: bool,
}

/// Text, styles and the byte map, always the same length.
#[derive(Debug, Clone, Default)]
pub(crate) struct Content {
    pub(crate) text: String,
    pub(crate) styles: RunArray<Style>,
    pub(crate) widths: Utf8Widths,
}

impl Content {
    fn new(text: String, styles: RunArray<Style>) -> Self {
        let widths = Utf8Widths::for_text(&text);
        debug_assert_eq!(widths.char_count(), styles.len());
        Self {
            text,
            styles,
            widths,
        }
    }

    fn check_range(&self, range: &TextRange) -> Result<(), TextError> {
        let len = self.styles.len();
        let invalid = TextError::InvalidRange {
            start: range.chars.start,
            end: range.chars.end,
            len,
        };
        if range.chars.start > range.chars.end || range.chars.end > len {
            return Err(invalid);
        }
        if self.widths.char_to_byte(range.chars.start) != range.bytes.start
            || self.widths.char_to_byte(range.chars.end) != range.bytes.end
        {
            return Err(invalid);
        }
        Ok(())
    }

    /// Replace `range` with `text`/`styles`, returning what was removed.
    fn replace(
        &mut self,
        range: &TextRange,
        text: &str,
        styles: &RunArray<Style>,
    ) -> Result<(String, RunArray<Style>), TextError> {
        self.check_range(range)?;
        let removed_styles = self.styles.slice(range.chars.start, range.chars.len())?;
        self.styles
            .remove_range(range.chars.start, range.chars.len())?;
        self.styles.insert_slice(range.chars.start, styles)?;

        let removed_text = self.text[range.bytes.clone()].to_string();
        self.text.replace_range(range.bytes.clone(), text);
        self.widths.remove(range.chars.clone());
        self.widths.insert(range.chars.start, text);

        debug_assert_eq!(self.styles.len(), self.widths.char_count());
        Ok((removed_text, removed_styles))
    }

    /// Overwrite the styles of `range`, returning the previous ones.
    fn restyle(
        &mut self,
        range: &TextRange,
        styles: &RunArray<Style>,
    ) -> Result<RunArray<Style>, TextError> {
        self.check_range(range)?;
        let old = self.styles.slice(range.chars.start, range.chars.len())?;
        self.styles
            .remove_range(range.chars.start, range.chars.len())?;
        self.styles.insert_slice(range.chars.start, styles)?;
        Ok(old)
    }

    fn index_at_char(&self, char_index: usize) -> TextIndex {
        let char_index = char_index.min(self.styles.len());
        TextIndex::new(char_index, self.widths.char_to_byte(char_index))
    }
}

/// A reversible edit. Applying a command returns its inverse.
#[derive(Debug, Clone)]
pub(crate) enum UndoCommand {
    /// Replace the `count` characters at `at` with `text`.
    Replace {
        kind: EditKind,
        at: TextIndex,
        count: TextCount,
        text: String,
        styles: RunArray<Style>,
    },
    /// Put `styles` back on `range`.
    Restyle {
        range: TextRange,
        styles: RunArray<Style>,
    },
    /// Move `count` characters from `from` to `to`; `to` is measured after the removal.
    Move {
        from: TextIndex,
        to: TextIndex,
        count: TextCount,
    },
}

/// Changes made by applying an [`UndoCommand`].
struct Applied {
    change: TextChange,
    range: TextRange,
}

impl UndoCommand {
    fn kind(&self) -> EditKind {
        match self {
            UndoCommand::Replace { kind, .. } => *kind,
            UndoCommand::Restyle { .. } => EditKind::Style,
            UndoCommand::Move { .. } => EditKind::Move,
        }
    }

    fn apply(self, content: &mut Content) -> Result<(UndoCommand, Applied), (UndoCommand, TextError)> {
        match self {
            UndoCommand::Replace {
                kind,
                at,
                count,
                text,
                styles,
            } => {
                let range = TextRange::new(at, count);
                let (old_text, old_styles) = match content.replace(&range, &text, &styles) {
                    Ok(removed) => removed,
                    Err(err) => {
                        let command = UndoCommand::Replace {
                            kind,
                            at,
                            count,
                            text,
                            styles,
                        };
                        return Err((command, err));
                    }
                };
                let inserted = TextCount::new(styles.len(), text.len());
                let new_range = TextRange::new(at, inserted);
                let change = TextChange::new(
                    new_range.clone(),
                    inserted.char_count as isize - count.char_count as isize,
                    inserted.byte_count as isize - count.byte_count as isize,
                    !count.is_empty(),
                );
                let inverse = UndoCommand::Replace {
                    kind,
                    at,
                    count: inserted,
                    text: old_text,
                    styles: old_styles,
                };
                Ok((
                    inverse,
                    Applied {
                        change,
                        range: new_range,
                    },
                ))
            }
            UndoCommand::Restyle { range, styles } => match content.restyle(&range, &styles) {
                Ok(old) => {
                    let change = TextChange::new(range.clone(), 0, 0, false);
                    Ok((
                        UndoCommand::Restyle {
                            range: range.clone(),
                            styles: old,
                        },
                        Applied {
                            change,
                            range,
                        },
                    ))
                }
                Err(err) => Err((UndoCommand::Restyle { range, styles }, err)),
            },
            UndoCommand::Move { from, to, count } => {
                let source = TextRange::new(from, count);
                let moved = match content.check_range(&source).and_then(|_| {
                    let text = content.text[source.bytes.clone()].to_string();
                    let styles = content.styles.slice(from.char_index, count.char_count)?;
                    content.replace(&source, "", &RunArray::new())?;
                    Ok((text, styles))
                }) {
                    Ok(moved) => moved,
                    Err(err) => return Err((UndoCommand::Move { from, to, count }, err)),
                };
                let dest = TextRange::empty_at(to);
                if let Err(err) = content.replace(&dest, &moved.0, &moved.1) {
                    // Put the removed text back so the buffer is unchanged.
                    let restored = content.replace(&TextRange::empty_at(from), &moved.0, &moved.1);
                    debug_assert!(restored.is_ok());
                    return Err((UndoCommand::Move { from, to, count }, err));
                }

                // Everything between the old and new places shifted, with no net change in
                // length.
                let placed = TextRange::new(to, count);
                let (low, high) = if to.char_index >= from.char_index {
                    (from, to + count)
                } else {
                    (to, from + count)
                };
                let mut change = TextChange::new(placed.clone(), 0, 0, true);
                change.recalc_range = TextRange::from_indices(low, high);
                change.redraw_range = change.recalc_range.clone();
                Ok((
                    UndoCommand::Move {
                        from: to,
                        to: from,
                        count,
                    },
                    Applied {
                        change,
                        range: placed,
                    },
                ))
            }
        }
    }
}

/// Text with cleaned newlines and control characters.
#[derive(Debug, Default)]
pub(crate) struct Cleaned {
    pub(crate) text: String,
    pub(crate) styles: RunArray<Style>,
    pub(crate) changed: bool,
}

fn illegal_count(text: &str) -> usize {
    text.chars().filter(|c| is_illegal_char(*c)).count()
}

/// Convert `\r\n` and `\r` to `\n` and drop illegal characters along with their styles.
pub(crate) fn normalize_input(text: &str, styles: &RunArray<Style>) -> Cleaned {
    debug_assert_eq!(text.chars().count(), styles.len());
    if !text.contains('\r') && illegal_count(text) == 0 {
        return Cleaned {
            text: text.to_string(),
            styles: styles.clone(),
            changed: false,
        };
    }

    let mut out = String::with_capacity(text.len());
    let mut out_styles = RunArray::new();
    let mut chars = text.chars().zip(styles.iter()).peekable();
    while let Some((c, style)) = chars.next() {
        match c {
            '\r' => {
                if matches!(chars.peek(), Some(('\n', _))) {
                    continue;
                }
                out.push('\n');
                out_styles.push(style.clone(), 1);
            }
            c if is_illegal_char(c) => {}
            c => {
                out.push(c);
                out_styles.push(style.clone(), 1);
            }
        }
    }
    Cleaned {
        text: out,
        styles: out_styles,
        changed: true,
    }
}

/// A styled, undoable text buffer.
pub struct StyledText {
    pub(crate) content: Content,
    default_style: Style,
    undo: UndoRedoChain<UndoCommand>,
    last_trim: Trimmed,
    pub(crate) config: TextConfig,
    pub(crate) reflow_rules: Vec<ReflowRule>,
    is_word_char: WordPredicate,
    adjuster: Option<Box<dyn StyleAdjuster>>,
    events: EventHub,
}

impl std::fmt::Debug for StyledText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StyledText")
            .field("chars", &self.char_count())
            .field("bytes", &self.byte_count())
            .field("style_runs", &self.content.styles.run_count())
            .field("undo", &self.undo.undo_count())
            .field("redo", &self.undo.redo_count())
            .field("events", &self.events)
            .finish()
    }
}

impl Default for StyledText {
    fn default() -> Self {
        Self::build(TextConfig::default(), Vec::new())
    }
}

impl StyledText {
    /// Create an empty buffer with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with `config`.
    pub fn with_config(config: TextConfig) -> Result<Self, ConfigError> {
        let rules = config.reflow.compile_rules()?;
        Ok(Self::build(config, rules))
    }

    /// Create a buffer holding `text` in the default style. Illegal characters are stripped.
    pub fn from_text(text: &str) -> Self {
        let mut buffer = Self::new();
        let styles = RunArray::with_value(buffer.default_style.clone(), text.chars().count());
        let cleaned = normalize_input(text, &styles);
        buffer.content = Content::new(cleaned.text, cleaned.styles);
        buffer
    }

    fn build(config: TextConfig, reflow_rules: Vec<ReflowRule>) -> Self {
        Self {
            content: Content::default(),
            default_style: Style::default(),
            undo: UndoRedoChain::with_mode(config.undo),
            last_trim: Trimmed::default(),
            config,
            reflow_rules,
            is_word_char: Box::new(default_is_word_char),
            adjuster: None,
            events: EventHub::default(),
        }
    }

    // ---- configuration -------------------------------------------------------------------

    /// Current configuration.
    pub fn config(&self) -> &TextConfig {
        &self.config
    }

    /// Replace the reflow settings, compiling the new rules.
    pub fn set_reflow_config(&mut self, reflow: ReflowConfig) -> Result<(), ConfigError> {
        self.reflow_rules = reflow.compile_rules()?;
        self.config.reflow = reflow;
        Ok(())
    }

    /// Set how illegal control characters are handled.
    pub fn set_illegal_char_policy(&mut self, policy: IllegalCharPolicy) {
        self.config.illegal_chars = policy;
    }

    /// Indent with spaces instead of tabs.
    pub fn set_tab_to_spaces(&mut self, tab_to_spaces: bool) {
        self.config.tab_to_spaces = tab_to_spaces;
    }

    /// Replace the predicate deciding which characters form words.
    pub fn set_word_predicate(&mut self, predicate: impl Fn(char) -> bool + 'static) {
        self.is_word_char = Box::new(predicate);
    }

    /// Returns `true` if `c` is a word character.
    pub fn is_word_char(&self, c: char) -> bool {
        (self.is_word_char)(c)
    }

    // ---- queries -------------------------------------------------------------------------

    /// The whole text.
    pub fn text(&self) -> &str {
        &self.content.text
    }

    /// The style overlay, one element per character.
    pub fn styles(&self) -> &RunArray<Style> {
        &self.content.styles
    }

    /// Number of characters.
    pub fn char_count(&self) -> usize {
        self.content.styles.len()
    }

    /// Number of UTF-8 bytes.
    pub fn byte_count(&self) -> usize {
        self.content.text.len()
    }

    /// Returns `true` if the buffer holds no text.
    pub fn is_empty(&self) -> bool {
        self.content.text.is_empty()
    }

    /// Returns `true` if the last character is a newline.
    pub fn ends_with_newline(&self) -> bool {
        self.content.text.ends_with('\n')
    }

    /// Position just past the last character.
    pub fn beyond_end(&self) -> TextIndex {
        TextIndex::new(self.char_count(), self.byte_count())
    }

    /// Range covering the whole text.
    pub fn select_all(&self) -> TextRange {
        TextRange::from_indices(TextIndex::ZERO, self.beyond_end())
    }

    /// Text position of character `char_index`, clamped to the end.
    pub fn char_index_to_text_index(&self, char_index: usize) -> TextIndex {
        self.content.index_at_char(char_index)
    }

    /// Text position of the character containing byte `byte_index`, clamped to the end.
    pub fn byte_index_to_text_index(&self, byte_index: usize) -> TextIndex {
        if byte_index >= self.byte_count() {
            return self.beyond_end();
        }
        let char_index = self.content.widths.byte_to_char(byte_index);
        self.content.index_at_char(char_index)
    }

    /// Range covering characters `chars`.
    pub fn char_range(&self, chars: std::ops::Range<usize>) -> Result<TextRange, TextError> {
        let len = self.char_count();
        if chars.start > chars.end || chars.end > len {
            return Err(TextError::InvalidRange {
                start: chars.start,
                end: chars.end,
                len,
            });
        }
        Ok(TextRange::from_indices(
            self.content.index_at_char(chars.start),
            self.content.index_at_char(chars.end),
        ))
    }

    /// Move `index` by `char_delta` characters, clamped to the text.
    pub fn adjust_text_index(&self, index: TextIndex, char_delta: isize) -> TextIndex {
        let target = index.char_index.saturating_add_signed(char_delta);
        self.content.index_at_char(target)
    }

    /// Character at `char_index`.
    pub fn char_at(&self, char_index: usize) -> Option<char> {
        if char_index >= self.char_count() {
            return None;
        }
        let byte = self.content.widths.char_to_byte(char_index);
        self.content.text[byte..].chars().next()
    }

    /// The text of `range`.
    pub fn substring(&self, range: &TextRange) -> Result<&str, TextError> {
        self.content.check_range(range)?;
        Ok(&self.content.text[range.bytes.clone()])
    }

    /// Copy the text and styles of `range`.
    pub fn copy(&self, range: &TextRange) -> Result<(String, RunArray<Style>), TextError> {
        self.content.check_range(range)?;
        let styles = self
            .content
            .styles
            .slice(range.chars.start, range.chars.len())?;
        Ok((self.content.text[range.bytes.clone()].to_string(), styles))
    }

    pub(crate) fn check_index(&self, index: TextIndex) -> Result<(), TextError> {
        let len = self.char_count();
        if index.char_index > len {
            return Err(TextError::IndexOutOfRange {
                index: index.char_index,
                len,
            });
        }
        if self.content.widths.char_to_byte(index.char_index) != index.byte_index {
            return Err(TextError::InvalidRange {
                start: index.char_index,
                end: index.char_index,
                len,
            });
        }
        Ok(())
    }

    pub(crate) fn check_range(&self, range: &TextRange) -> Result<(), TextError> {
        self.content.check_range(range)
    }

    // ---- styles --------------------------------------------------------------------------

    /// Style of character `char_index`.
    pub fn style_at(&self, char_index: usize) -> Option<&Style> {
        self.content.styles.get(char_index)
    }

    /// Style used for text inserted into an empty buffer.
    pub fn default_style(&self) -> &Style {
        &self.default_style
    }

    /// Change the default style.
    pub fn set_default_style(&mut self, style: Style) {
        if style != self.default_style {
            self.default_style = style;
            self.events.broadcast(TextEvent::DefaultStyleChanged);
        }
    }

    /// Style that text typed at `index` should take.
    ///
    /// The previous character's style wins unless it is a newline, in which case the next
    /// character's style is used. An empty buffer yields the default style.
    pub fn calc_insertion_style(&self, index: TextIndex) -> Style {
        let at = index.char_index;
        if at > 0 && self.char_at(at - 1).is_some_and(|c| c != '\n') {
            if let Some(style) = self.style_at(at - 1) {
                return style.clone();
            }
        }
        if let Some(style) = self.style_at(at) {
            return style.clone();
        }
        if at > 0 {
            if let Some(style) = self.style_at(at - 1) {
                return style.clone();
            }
        }
        self.default_style.clone()
    }

    /// Apply `style` to `range`.
    pub fn set_style(&mut self, range: &TextRange, style: &Style) -> Result<(), TextError> {
        let styles = RunArray::with_value(style.clone(), range.chars.len());
        self.set_styles(range, &styles)
    }

    /// Apply `styles`, one element per character, to `range`.
    pub fn set_styles(&mut self, range: &TextRange, styles: &RunArray<Style>) -> Result<(), TextError> {
        self.ensure_idle()?;
        self.check_range(range)?;
        check_style_length(styles, range.chars.len())?;
        if range.is_empty() {
            return Ok(());
        }

        let old = self.content.restyle(range, styles)?;
        if old == *styles {
            return Ok(());
        }
        self.record(UndoCommand::Restyle {
            range: range.clone(),
            styles: old,
        })?;
        self.broadcast_change(TextChange::new(range.clone(), 0, 0, false));
        Ok(())
    }

    // ---- editing -------------------------------------------------------------------------

    /// Replace the whole text and clear the undo history.
    ///
    /// `styles` defaults to the default style. Returns `false` if the text had to be
    /// cleaned.
    pub fn set_text(&mut self, text: &str, styles: Option<&RunArray<Style>>) -> Result<bool, TextError> {
        self.ensure_idle()?;
        let styles = self.styles_for(text, styles, &self.default_style)?;
        let cleaned = self.clean(text, &styles)?;

        let _span = tracing::debug_span!("set_text", bytes = cleaned.text.len()).entered();
        if cleaned.text.len() > BUSY_THRESHOLD {
            self.broadcast_busy();
        }
        self.content = Content::new(cleaned.text, cleaned.styles);
        self.undo.clear();
        self.last_trim = Trimmed::default();
        self.events.broadcast(TextEvent::TextSet);
        Ok(!cleaned.changed)
    }

    /// Insert `text` in `style` at `index`.
    pub fn insert_text(&mut self, index: TextIndex, text: &str, style: &Style) -> Result<InsertOutcome, TextError> {
        let styles = RunArray::with_value(style.clone(), text.chars().count());
        self.insert_styled_text(index, text, &styles)
    }

    /// Insert `text` with per-character `styles` at `index`.
    pub fn insert_styled_text(
        &mut self,
        index: TextIndex,
        text: &str,
        styles: &RunArray<Style>,
    ) -> Result<InsertOutcome, TextError> {
        self.ensure_idle()?;
        self.check_index(index)?;
        check_style_length(styles, text.chars().count())?;
        let cleaned = self.clean(text, styles)?;
        if cleaned.text.is_empty() {
            return Ok(InsertOutcome {
                range: TextRange::empty_at(index),
                cleaned: cleaned.changed,
            });
        }

        let range = self.replace_recorded(
            EditKind::Insert,
            &TextRange::empty_at(index),
            &cleaned.text,
            &cleaned.styles,
        )?;
        Ok(InsertOutcome {
            range,
            cleaned: cleaned.changed,
        })
    }

    /// Delete `range`.
    pub fn delete_text(&mut self, range: &TextRange) -> Result<(), TextError> {
        self.ensure_idle()?;
        self.check_range(range)?;
        if range.is_empty() {
            return Ok(());
        }
        self.replace_recorded(EditKind::Delete, range, "", &RunArray::new())?;
        Ok(())
    }

    /// Replace `range` with `text`. Without `styles` the text takes the insertion style at
    /// the start of the range. Returns the range of the new text.
    pub fn paste(
        &mut self,
        range: &TextRange,
        text: &str,
        styles: Option<&RunArray<Style>>,
    ) -> Result<TextRange, TextError> {
        self.paste_as(EditKind::Paste, range, text, styles)
    }

    pub(crate) fn paste_as(
        &mut self,
        kind: EditKind,
        range: &TextRange,
        text: &str,
        styles: Option<&RunArray<Style>>,
    ) -> Result<TextRange, TextError> {
        self.ensure_idle()?;
        self.check_range(range)?;
        let fallback = self.calc_insertion_style(range.first());
        let styles = self.styles_for(text, styles, &fallback)?;
        let cleaned = self.clean(text, &styles)?;
        if range.is_empty() && cleaned.text.is_empty() {
            return Ok(range.clone());
        }
        self.replace_recorded(kind, range, &cleaned.text, &cleaned.styles)
    }

    /// Move (or copy) `source` to `dest`, both measured before the edit.
    ///
    /// Returns the range of the text at its new place, or `None` if nothing happened: the
    /// source was empty, or a move targeted a position inside (or at an edge of) the source.
    pub fn move_text(
        &mut self,
        source: &TextRange,
        dest: TextIndex,
        copy: bool,
    ) -> Result<Option<TextRange>, TextError> {
        self.ensure_idle()?;
        self.check_range(source)?;
        self.check_index(dest)?;
        if source.is_empty()
            || (!copy && source.chars.start <= dest.char_index && dest.char_index <= source.chars.end)
        {
            return Ok(None);
        }

        let (text, styles) = self.copy(source)?;
        if copy {
            let placed = self.replace_recorded(EditKind::Paste, &TextRange::empty_at(dest), &text, &styles)?;
            return Ok(Some(placed));
        }

        let count = source.count();
        let to = if dest.char_index > source.chars.start {
            dest - count
        } else {
            dest
        };
        let command = UndoCommand::Move {
            from: source.first(),
            to,
            count,
        };
        let (inverse, applied) = command.apply(&mut self.content).map_err(|(_, err)| err)?;
        self.record(inverse)?;
        tracing::debug!(
            from = source.chars.start,
            to = to.char_index,
            chars = count.char_count,
            "moved text"
        );
        self.broadcast_change(applied.change);
        Ok(Some(applied.range))
    }

    /// Type `ch` over `range`.
    ///
    /// Consecutive typing at the end of the previous typed text extends the same undo
    /// command until [`deactivate_current_undo`](Self::deactivate_current_undo) is called or
    /// another edit intervenes.
    pub fn insert_character(&mut self, range: &TextRange, ch: char, style: &Style) -> Result<TextRange, TextError> {
        self.ensure_idle()?;
        self.check_range(range)?;
        let mut buf = [0u8; 4];
        let typed = ch.encode_utf8(&mut buf);
        let cleaned = self.clean(typed, &RunArray::with_value(style.clone(), 1))?;
        if cleaned.text.is_empty() {
            return Ok(TextRange::empty_at(range.first()));
        }

        let extends_typing = range.is_empty()
            && matches!(
                self.undo.last_mut(),
                Some(UndoCommand::Replace { kind: EditKind::Typing, at, count, .. })
                    if *at + *count == range.first()
            );
        if !extends_typing {
            let placed = self.replace_recorded(EditKind::Typing, range, &cleaned.text, &cleaned.styles)?;
            self.undo.activate_last();
            return Ok(placed);
        }

        self.content.replace(range, &cleaned.text, &cleaned.styles)?;
        let inserted = TextCount::new(cleaned.styles.len(), cleaned.text.len());
        if let Some(UndoCommand::Replace { count, .. }) = self.undo.last_mut() {
            *count = *count + inserted;
        }
        let placed = TextRange::new(range.first(), inserted);
        self.broadcast_change(TextChange::new(
            placed.clone(),
            inserted.char_count as isize,
            inserted.byte_count as isize,
            false,
        ));
        Ok(placed)
    }

    /// Close the current typing command so the next keystroke starts a new one.
    pub fn deactivate_current_undo(&mut self) {
        self.undo.deactivate();
    }

    // ---- undo ----------------------------------------------------------------------------

    /// Undo the most recent edit. Returns the range it left behind.
    pub fn undo(&mut self) -> Result<Option<TextRange>, TextError> {
        let command = self.undo.begin_undo()?;
        self.apply_history(command)
    }

    /// Redo the most recently undone edit. Returns the range it left behind.
    pub fn redo(&mut self) -> Result<Option<TextRange>, TextError> {
        let command = self.undo.begin_redo()?;
        self.apply_history(command)
    }

    fn apply_history(&mut self, command: Option<UndoCommand>) -> Result<Option<TextRange>, TextError> {
        let Some(command) = command else {
            return Ok(None);
        };
        let kind = command.kind();
        match command.apply(&mut self.content) {
            Ok((inverse, applied)) => {
                let direction = self.undo.state();
                self.undo.finish(inverse)?;
                tracing::debug!(?kind, ?direction, "applied history step");
                self.broadcast_change(applied.change);
                self.events.broadcast(TextEvent::UndoFinished {
                    range: applied.range.clone(),
                });
                Ok(Some(applied.range))
            }
            Err((command, err)) => {
                self.undo.cancel(command)?;
                Err(err)
            }
        }
    }

    /// Returns `true` if [`undo`](Self::undo) would do something.
    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    /// Returns `true` if [`redo`](Self::redo) would do something.
    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    /// Kind of the edit [`undo`](Self::undo) would revert.
    pub fn undo_kind(&self) -> Option<EditKind> {
        self.undo.peek_undo().map(UndoCommand::kind)
    }

    /// Kind of the edit [`redo`](Self::redo) would re-apply.
    pub fn redo_kind(&self) -> Option<EditKind> {
        self.undo.peek_redo().map(UndoCommand::kind)
    }

    /// Current undo state.
    pub fn undo_state(&self) -> UndoState {
        self.undo.state()
    }

    /// Current undo mode.
    pub fn undo_mode(&self) -> UndoMode {
        self.undo.mode()
    }

    /// Change the undo depth policy.
    pub fn set_undo_mode(&mut self, mode: UndoMode) -> Trimmed {
        self.config.undo = mode;
        self.last_trim = self.undo.set_mode(mode);
        self.last_trim
    }

    /// What the most recent history trim dropped.
    pub fn last_history_trim(&self) -> Trimmed {
        self.last_trim
    }

    /// Forget every undo command.
    pub fn clear_undo(&mut self) {
        self.undo.clear();
    }

    /// Mark the current state as saved.
    pub fn set_last_save_location(&mut self) {
        self.undo.set_last_save_location();
    }

    /// Forget the saved state.
    pub fn clear_last_save_location(&mut self) {
        self.undo.clear_last_save_location();
    }

    /// Returns `true` if undo/redo has returned the text to the saved state.
    pub fn is_at_last_save_location(&self) -> bool {
        self.undo.is_at_last_save_location()
    }

    // ---- events --------------------------------------------------------------------------

    /// Register a callback invoked for every event.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&TextEvent) + 'static,
    {
        self.events.subscribe(Box::new(callback));
    }

    /// Enable or disable the event queue drained by [`take_events`](Self::take_events).
    pub fn set_event_queue_enabled(&mut self, enabled: bool) {
        self.events.set_queue_enabled(enabled);
    }

    /// Drain queued events.
    pub fn take_events(&mut self) -> Vec<TextEvent> {
        self.events.take()
    }

    /// Install (or remove) a hook that restyles text after each edit.
    pub fn set_style_adjuster(&mut self, adjuster: Option<Box<dyn StyleAdjuster>>) {
        self.adjuster = adjuster;
    }

    // ---- internals -----------------------------------------------------------------------

    pub(crate) fn ensure_idle(&self) -> Result<(), TextError> {
        match self.undo.state() {
            UndoState::Idle => Ok(()),
            state => Err(UndoError::Reentrant(state).into()),
        }
    }

    pub(crate) fn index_at_char(&self, char_index: usize) -> TextIndex {
        self.content.index_at_char(char_index)
    }

    /// Range for a span of bytes that starts and ends on character boundaries.
    pub(crate) fn byte_range_to_text_range(&self, bytes: std::ops::Range<usize>) -> TextRange {
        TextRange::from_indices(
            self.byte_index_to_text_index(bytes.start),
            self.byte_index_to_text_index(bytes.end),
        )
    }

    fn styles_for(
        &self,
        text: &str,
        styles: Option<&RunArray<Style>>,
        fallback: &Style,
    ) -> Result<RunArray<Style>, TextError> {
        let chars = text.chars().count();
        match styles {
            Some(styles) => {
                check_style_length(styles, chars)?;
                Ok(styles.clone())
            }
            None => Ok(RunArray::with_value(fallback.clone(), chars)),
        }
    }

    pub(crate) fn clean(&self, text: &str, styles: &RunArray<Style>) -> Result<Cleaned, TextError> {
        if self.config.illegal_chars == IllegalCharPolicy::Reject {
            let count = illegal_count(text);
            if count > 0 {
                return Err(TextError::IllegalCharacters { count });
            }
        }
        let cleaned = normalize_input(text, styles);
        if cleaned.changed {
            tracing::trace!(
                before = text.len(),
                after = cleaned.text.len(),
                "cleaned inserted text"
            );
        }
        Ok(cleaned)
    }

    /// Replace `range`, record the inverse and broadcast the change.
    pub(crate) fn replace_recorded(
        &mut self,
        kind: EditKind,
        range: &TextRange,
        text: &str,
        styles: &RunArray<Style>,
    ) -> Result<TextRange, TextError> {
        let (old_text, old_styles) = self.content.replace(range, text, styles)?;
        let inserted = TextCount::new(styles.len(), text.len());
        let placed = TextRange::new(range.first(), inserted);
        self.record(UndoCommand::Replace {
            kind,
            at: range.first(),
            count: inserted,
            text: old_text,
            styles: old_styles,
        })?;
        tracing::trace!(
            ?kind,
            at = range.chars.start,
            removed = range.chars.len(),
            inserted = inserted.char_count,
            "edit"
        );

        let removed = range.count();
        self.broadcast_change(TextChange::new(
            placed.clone(),
            inserted.char_count as isize - removed.char_count as isize,
            inserted.byte_count as isize - removed.byte_count as isize,
            !range.is_empty(),
        ));
        Ok(placed)
    }

    fn record(&mut self, command: UndoCommand) -> Result<(), TextError> {
        self.last_trim = self.undo.record(command)?;
        Ok(())
    }

    pub(crate) fn broadcast_busy(&mut self) {
        self.events.broadcast(TextEvent::WillBeBusy);
    }

    fn broadcast_change(&mut self, mut change: TextChange) {
        if let Some(adjuster) = &mut self.adjuster {
            adjuster.adjust(&self.content.text, &mut self.content.styles, &mut change);
            debug_assert_eq!(self.content.styles.len(), self.content.widths.char_count());
        }
        self.events.broadcast(TextEvent::TextChanged(change));
    }
}

fn check_style_length(styles: &RunArray<Style>, chars: usize) -> Result<(), TextError> {
    if styles.len() != chars {
        return Err(TextError::StyleLength {
            styles: styles.len(),
            chars,
        });
    }
    Ok(())
}
