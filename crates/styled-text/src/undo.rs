//! Undo/redo history.
//!
//! [`UndoRedoChain`] is an ordered list of reversible commands split by a cursor
//! (`first_redo`): commands before it can be undone, commands from it onwards have been
//! undone and can be redone.
//!
//! The chain is generic over the command type and never applies commands itself. Undo and
//! redo hand the command to a closure (or to the caller, through [`begin_undo`] /
//! [`finish`]) together with exclusive access to whatever the command edits. The closure
//! returns the *inverse* command, which takes the original's slot, so a command that has been
//! undone is stored as the command that redoes it.
//!
//! ```rust
//! use styled_text::UndoRedoChain;
//!
//! // Commands here are "add n" on an integer; the inverse of +n is -n.
//! let mut value = 0i32;
//! let mut chain: UndoRedoChain<i32> = UndoRedoChain::new(10);
//!
//! value += 5;
//! chain.record(5).unwrap();
//!
//! chain.undo_with(|n| { value -= n; (-n, ()) }).unwrap();
//! assert_eq!(value, 0);
//! chain.redo_with(|n| { value -= n; (-n, ()) }).unwrap();
//! assert_eq!(value, 5);
//! ```
//!
//! [`begin_undo`]: UndoRedoChain::begin_undo
//! [`finish`]: UndoRedoChain::finish

use crate::error::UndoError;
use serde::{Deserialize, Serialize};

/// Default maximum number of commands kept by a multi-level history.
pub const DEFAULT_UNDO_DEPTH: usize = 100;

/// What the chain is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UndoState {
    /// Accepting new commands.
    #[default]
    Idle,
    /// An undo is being applied.
    Undoing,
    /// A redo is being applied.
    Redoing,
}

/// History depth policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum UndoMode {
    /// Keep only the most recent command; undoing twice re-applies it.
    Single,
    /// Keep up to `depth` commands.
    Multi {
        /// Maximum number of commands.
        depth: usize,
    },
}

impl Default for UndoMode {
    fn default() -> Self {
        Self::Multi {
            depth: DEFAULT_UNDO_DEPTH,
        }
    }
}

impl UndoMode {
    fn max_len(self) -> usize {
        match self {
            Self::Single => 1,
            Self::Multi { depth } => depth.max(1),
        }
    }
}

/// What a trim of the oldest commands removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Trimmed {
    /// Number of commands dropped from the front of the history.
    pub dropped: usize,
    /// `true` if the trim reached the redo partition and the whole history was discarded.
    pub history_discarded: bool,
}

/// An ordered history of reversible commands.
#[derive(Debug, Clone)]
pub struct UndoRedoChain<C> {
    commands: Vec<C>,
    /// Number of commands that can be undone; `commands[first_redo..]` can be redone.
    first_redo: usize,
    mode: UndoMode,
    /// Value of `first_redo` at the last save, if still reachable.
    last_save: Option<usize>,
    state: UndoState,
    /// Slot of the command handed out by `begin_undo`/`begin_redo`.
    applying_slot: usize,
    /// The most recent command may still absorb further typing.
    active: bool,
}

impl<C> UndoRedoChain<C> {
    /// Create a multi-level history holding up to `depth` commands.
    pub fn new(depth: usize) -> Self {
        Self::with_mode(UndoMode::Multi { depth })
    }

    /// Create a history with the given mode.
    pub fn with_mode(mode: UndoMode) -> Self {
        Self {
            commands: Vec::new(),
            first_redo: 0,
            mode,
            last_save: Some(0),
            state: UndoState::Idle,
            applying_slot: 0,
            active: false,
        }
    }

    /// Current mode.
    pub fn mode(&self) -> UndoMode {
        self.mode
    }

    /// Change the mode, trimming the history if it is now too long.
    pub fn set_mode(&mut self, mode: UndoMode) -> Trimmed {
        self.mode = mode;
        self.trim()
    }

    /// Switch to multi-level mode holding at most `depth` commands.
    pub fn set_max_depth(&mut self, depth: usize) -> Trimmed {
        self.set_mode(UndoMode::Multi { depth })
    }

    /// Current state.
    pub fn state(&self) -> UndoState {
        self.state
    }

    /// Total number of stored commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if no commands are stored.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of commands that can be undone.
    pub fn undo_count(&self) -> usize {
        self.first_redo
    }

    /// Number of commands that can be redone.
    pub fn redo_count(&self) -> usize {
        self.commands.len() - self.first_redo
    }

    /// Returns `true` if [`undo_with`](Self::undo_with) would apply a command.
    pub fn can_undo(&self) -> bool {
        self.first_redo > 0 || (self.mode == UndoMode::Single && !self.commands.is_empty())
    }

    /// Returns `true` if [`redo_with`](Self::redo_with) would apply a command.
    pub fn can_redo(&self) -> bool {
        self.first_redo < self.commands.len()
    }

    /// Append a command, destroying the redo branch.
    ///
    /// A last-save marker inside the destroyed branch is cleared. If the history grows past
    /// its maximum the oldest commands are dropped; the returned [`Trimmed`] reports how many.
    pub fn record(&mut self, command: C) -> Result<Trimmed, UndoError> {
        self.ensure_idle()?;

        if self.first_redo < self.commands.len() {
            if self.last_save.is_some_and(|mark| mark > self.first_redo) {
                self.last_save = None;
            }
            self.commands.truncate(self.first_redo);
        }

        self.commands.push(command);
        self.first_redo += 1;
        self.active = false;
        tracing::trace!(undo_count = self.first_redo, "recorded undo command");
        Ok(self.trim())
    }

    /// Take the command to undo and switch to [`UndoState::Undoing`].
    ///
    /// Returns `Ok(None)` if there is nothing to undo. The caller must apply the command and
    /// hand its inverse back through [`finish`](Self::finish).
    pub fn begin_undo(&mut self) -> Result<Option<C>, UndoError> {
        self.ensure_idle()?;
        if self.first_redo == 0 {
            if self.mode == UndoMode::Single && !self.commands.is_empty() {
                return self.begin_redo();
            }
            return Ok(None);
        }

        self.applying_slot = self.first_redo - 1;
        self.state = UndoState::Undoing;
        self.active = false;
        Ok(Some(self.commands.remove(self.applying_slot)))
    }

    /// Take the command to redo and switch to [`UndoState::Redoing`].
    pub fn begin_redo(&mut self) -> Result<Option<C>, UndoError> {
        self.ensure_idle()?;
        if self.first_redo >= self.commands.len() {
            return Ok(None);
        }

        self.applying_slot = self.first_redo;
        self.state = UndoState::Redoing;
        self.active = false;
        Ok(Some(self.commands.remove(self.applying_slot)))
    }

    /// Store the inverse of the command handed out by `begin_undo`/`begin_redo`, move the
    /// cursor past it, and return to [`UndoState::Idle`].
    pub fn finish(&mut self, inverse: C) -> Result<(), UndoError> {
        match self.state {
            UndoState::Idle => return Err(UndoError::NotApplying),
            UndoState::Undoing => {
                self.commands.insert(self.applying_slot, inverse);
                self.first_redo -= 1;
            }
            UndoState::Redoing => {
                self.commands.insert(self.applying_slot, inverse);
                self.first_redo += 1;
            }
        }
        self.state = UndoState::Idle;
        Ok(())
    }

    /// Put back the command handed out by `begin_undo`/`begin_redo` without moving the
    /// cursor. Used when the command could not be applied.
    pub fn cancel(&mut self, command: C) -> Result<(), UndoError> {
        if self.state == UndoState::Idle {
            return Err(UndoError::NotApplying);
        }
        self.commands.insert(self.applying_slot, command);
        self.state = UndoState::Idle;
        Ok(())
    }

    /// The command the next undo would apply.
    pub fn peek_undo(&self) -> Option<&C> {
        match self.first_redo {
            0 if self.mode == UndoMode::Single => self.commands.first(),
            0 => None,
            n => self.commands.get(n - 1),
        }
    }

    /// The command the next redo would apply.
    pub fn peek_redo(&self) -> Option<&C> {
        self.commands.get(self.first_redo)
    }

    /// Undo one command. `apply` receives the command and returns its inverse plus a result.
    pub fn undo_with<R>(&mut self, apply: impl FnOnce(C) -> (C, R)) -> Result<Option<R>, UndoError> {
        let Some(command) = self.begin_undo()? else {
            return Ok(None);
        };
        let (inverse, out) = apply(command);
        self.finish(inverse)?;
        Ok(Some(out))
    }

    /// Redo one command. `apply` receives the command and returns its inverse plus a result.
    pub fn redo_with<R>(&mut self, apply: impl FnOnce(C) -> (C, R)) -> Result<Option<R>, UndoError> {
        let Some(command) = self.begin_redo()? else {
            return Ok(None);
        };
        let (inverse, out) = apply(command);
        self.finish(inverse)?;
        Ok(Some(out))
    }

    /// Drop every command.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.first_redo = 0;
        self.last_save = None;
        self.active = false;
    }

    /// Remember the current position as the saved state.
    pub fn set_last_save_location(&mut self) {
        self.last_save = Some(self.first_redo);
    }

    /// Forget the saved position.
    pub fn clear_last_save_location(&mut self) {
        self.last_save = None;
    }

    /// Returns `true` if the history is exactly at the saved position.
    pub fn is_at_last_save_location(&self) -> bool {
        self.last_save == Some(self.first_redo)
    }

    /// Allow the most recent command to absorb further edits (see [`last_mut`](Self::last_mut)).
    pub fn activate_last(&mut self) {
        self.active = self.first_redo > 0 && self.first_redo == self.commands.len();
    }

    /// Stop the most recent command from absorbing further edits.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Returns `true` if the most recent command is still open for coalescing.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Mutable access to the most recent command while it is active and the saved position
    /// does not point at it.
    pub fn last_mut(&mut self) -> Option<&mut C> {
        if !self.active || self.state != UndoState::Idle || self.is_at_last_save_location() {
            return None;
        }
        self.commands.last_mut()
    }

    fn ensure_idle(&self) -> Result<(), UndoError> {
        match self.state {
            UndoState::Idle => Ok(()),
            state => Err(UndoError::Reentrant(state)),
        }
    }

    fn trim(&mut self) -> Trimmed {
        let mut trimmed = Trimmed::default();
        let max_len = self.mode.max_len();

        while self.commands.len() > max_len {
            self.commands.remove(0);
            trimmed.dropped += 1;

            if self.first_redo == 0 {
                // The dropped command belonged to the redo partition.
                self.commands.clear();
                self.last_save = None;
                self.active = false;
                trimmed.history_discarded = true;
                break;
            }

            self.first_redo -= 1;
            self.last_save = match self.last_save {
                Some(0) | None => None,
                Some(mark) => Some(mark - 1),
            };
        }

        if trimmed.dropped > 0 {
            tracing::debug!(
                dropped = trimmed.dropped,
                history_discarded = trimmed.history_discarded,
                "trimmed undo history"
            );
        }
        trimmed
    }
}

impl<C> Default for UndoRedoChain<C> {
    fn default() -> Self {
        Self::with_mode(UndoMode::default())
    }
}
