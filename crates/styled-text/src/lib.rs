#![warn(missing_docs)]
//! Styled Text - Headless Styled Text Editing Core
//!
//! # Overview
//!
//! `styled-text` is the text model behind a styled text editor: a UTF-8 buffer whose
//! characters each carry a [`Style`], an undo/redo history, paragraph reflow and an
//! incremental visual line layout. It does not draw anything; font measurement is delegated
//! to a [`FontMetrics`] implementation supplied by the front end.
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Line Layout (line starts + geometry)       │  ← Visual Lines
//! ├─────────────────────────────────────────────┤
//! │  Search / Reflow / Indent / Persistence     │  ← Buffer Operations
//! ├─────────────────────────────────────────────┤
//! │  StyledText (text + styles + byte map)      │  ← Editing API + Events
//! ├──────────────────────┬──────────────────────┤
//! │  Undo/Redo Chain     │  RunArray            │  ← History / Run Storage
//! └──────────────────────┴──────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use styled_text::{Style, StyledText, TextIndex};
//!
//! let mut text = StyledText::from_text("hello world");
//! let bold = Style::default().with_bold(true);
//!
//! // Style a word; neighbouring runs with equal styles merge automatically.
//! let word = text.char_range(6..11).unwrap();
//! text.set_style(&word, &bold).unwrap();
//! assert_eq!(text.styles().run_count(), 2);
//!
//! // Every edit is undoable.
//! text.insert_text(TextIndex::ZERO, ">> ", &Style::default()).unwrap();
//! assert_eq!(text.text(), ">> hello world");
//! text.undo().unwrap();
//! assert_eq!(text.text(), "hello world");
//! ```
//!
//! # Positions
//!
//! Positions are 0-based and ranges half-open. A [`TextIndex`] names the same place in
//! characters (Unicode scalar values) and UTF-8 bytes, so slicing the text never needs a
//! scan. Use [`StyledText::char_range`] or [`StyledText::char_index_to_text_index`] to build
//! them.
//!
//! # Module Description
//!
//! - [`run_array`] - Run-length encoded sequences
//! - [`text_index`] - Dual character/byte positions and ranges
//! - [`buffer`] - The styled text buffer and its edit primitive
//! - [`undo`] - Undo/redo history
//! - [`words`] - Word and paragraph boundaries
//! - [`search`] - Regex search and replace
//! - [`reflow`] - Paragraph reflow with quote prefixes
//! - [`indent`] - Shifting lines by tab stops
//! - [`layout`] - Incremental line layout
//! - [`persist`] / [`line_ending`] - Reading and writing text

pub mod buffer;
pub mod config;
pub mod error;
pub mod events;
pub mod indent;
pub mod layout;
pub mod line_ending;
pub mod metrics;
pub mod persist;
pub mod reflow;
pub mod run_array;
pub mod search;
pub mod style;
pub mod text_index;
pub mod undo;
pub mod words;

pub use buffer::{EditKind, InsertOutcome, StyledText, WordPredicate, default_is_word_char};
pub use config::{IllegalCharPolicy, ReflowConfig, ReflowRuleConfig, TextConfig};
pub use error::{ConfigError, PersistError, TextError, UndoError};
pub use events::{StyleAdjuster, TextChange, TextEvent, TextEventCallback};
pub use layout::{BreakMode, LayoutConfig, LineGeometry, LineLayout};
pub use line_ending::PlainTextFormat;
pub use metrics::{FontMetrics, MonospaceMetrics, VerticalMetrics};
pub use persist::{PRIVATE_FORMAT_VERSION, decode_private, encode_private};
pub use reflow::{ReflowOutcome, ReflowRule};
pub use run_array::{Run, RunArray, RunArrayError};
pub use search::{ReplaceOptions, SearchOptions, SearchPattern, TextMatch, match_case};
pub use style::{Color, Style};
pub use text_index::{TextCount, TextIndex, TextRange};
pub use undo::{Trimmed, UndoMode, UndoRedoChain, UndoState};
