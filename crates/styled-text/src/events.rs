//! Change notifications.
//!
//! The buffer reports every mutation as a [`TextEvent`]. Consumers either register a callback
//! with [`StyledText::subscribe`](crate::StyledText::subscribe), or enable the event queue and
//! drain it with [`StyledText::take_events`](crate::StyledText::take_events). The queue is the
//! natural fit for views such as [`LineLayout`](crate::LineLayout) that need to read the buffer
//! while handling the event.

use crate::run_array::RunArray;
use crate::style::Style;
use crate::text_index::TextRange;

/// Details of an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChange {
    /// Range occupied by the new text after the edit (empty for a pure deletion).
    pub range: TextRange,
    /// Range whose styles may have changed and whose layout must be recalculated. Always
    /// contains `range`.
    pub recalc_range: TextRange,
    /// Range that must be redrawn. Always contains `recalc_range`.
    pub redraw_range: TextRange,
    /// Change in character count.
    pub char_delta: isize,
    /// Change in byte count.
    pub byte_delta: isize,
    /// `true` if text was removed at `range.first()`.
    pub deletion: bool,
}

impl TextChange {
    pub(crate) fn new(range: TextRange, char_delta: isize, byte_delta: isize, deletion: bool) -> Self {
        Self {
            recalc_range: range.clone(),
            redraw_range: range.clone(),
            range,
            char_delta,
            byte_delta,
            deletion,
        }
    }
}

/// A change notification emitted by [`StyledText`](crate::StyledText).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextEvent {
    /// The whole text was replaced.
    TextSet,
    /// Part of the text changed.
    TextChanged(TextChange),
    /// The default style changed.
    DefaultStyleChanged,
    /// An undo or redo step finished; `range` is the text it left behind.
    UndoFinished {
        /// Range affected by the step.
        range: TextRange,
    },
    /// A long operation is about to start.
    WillBeBusy,
}

/// Callback invoked for every [`TextEvent`].
pub type TextEventCallback = Box<dyn FnMut(&TextEvent)>;

/// Hook run before a [`TextChange`] is broadcast.
///
/// Implementations may restyle text (for example syntax coloring) and widen the recalc and
/// redraw ranges accordingly. `styles` covers the whole text; restyling must keep its length.
pub trait StyleAdjuster {
    /// Adjust styles for the edit described by `change`.
    fn adjust(&mut self, text: &str, styles: &mut RunArray<Style>, change: &mut TextChange);
}

/// Registered callbacks plus the optional event queue.
#[derive(Default)]
pub(crate) struct EventHub {
    callbacks: Vec<TextEventCallback>,
    queue: Option<Vec<TextEvent>>,
}

impl EventHub {
    pub(crate) fn subscribe(&mut self, callback: TextEventCallback) {
        self.callbacks.push(callback);
    }

    pub(crate) fn set_queue_enabled(&mut self, enabled: bool) {
        match (enabled, self.queue.is_some()) {
            (true, false) => self.queue = Some(Vec::new()),
            (false, true) => self.queue = None,
            _ => {}
        }
    }

    pub(crate) fn take(&mut self) -> Vec<TextEvent> {
        self.queue.as_mut().map(std::mem::take).unwrap_or_default()
    }

    pub(crate) fn broadcast(&mut self, event: TextEvent) {
        for callback in &mut self.callbacks {
            callback(&event);
        }
        if let Some(queue) = &mut self.queue {
            queue.push(event);
        }
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("callbacks", &self.callbacks.len())
            .field("queued", &self.queue.as_ref().map(Vec::len))
            .finish()
    }
}
