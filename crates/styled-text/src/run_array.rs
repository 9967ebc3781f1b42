//! Run-length encoded sequences.
//!
//! A [`RunArray`] stores a logical sequence of values as `(length, value)` runs. Adjacent runs
//! never carry equal values: every mutation re-merges the runs it touches, so the run list is
//! always the shortest possible encoding of the sequence.
//!
//! Besides element access, the container supports weighted prefix scans
//! ([`RunArray::sum_of`] / [`RunArray::find_by_sum`]) that run in O(runs) instead of
//! O(elements). The layout engine uses them to map pixel coordinates to line indices.
//!
//! # Example
//!
//! ```rust
//! use styled_text::RunArray;
//!
//! let mut runs = RunArray::with_value("bold", 3);
//! runs.set(1, "plain").unwrap();
//! assert_eq!(runs.run_count(), 3);
//!
//! runs.set(1, "bold").unwrap();
//! assert_eq!(runs.run_count(), 1);
//! assert_eq!(runs.len(), 3);
//! ```

use std::cell::Cell;
use std::ops::Range;
use thiserror::Error;

/// Errors returned by [`RunArray`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunArrayError {
    #[error("index {index} out of range for run array of length {len}")]
    /// A single element index was outside the sequence.
    IndexOutOfRange {
        /// Offending index.
        index: usize,
        /// Element count at the time of the call.
        len: usize,
    },
    #[error("range {start}..{end} out of range for run array of length {len}")]
    /// A range extended past the end of the sequence.
    RangeOutOfRange {
        /// Range start.
        start: usize,
        /// Range end (exclusive).
        end: usize,
        /// Element count at the time of the call.
        len: usize,
    },
}

/// A maximal span of identical values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run<V> {
    /// Number of elements in the run (always > 0 inside a [`RunArray`]).
    pub len: usize,
    /// Value shared by every element of the run.
    pub value: V,
}

/// Last located run, used to speed up sequential access.
#[derive(Debug, Clone, Copy, Default)]
struct RunCursor {
    run: usize,
    first: usize,
}

/// An ordered sequence stored as runs of equal values.
#[derive(Debug, Clone)]
pub struct RunArray<V> {
    runs: Vec<Run<V>>,
    len: usize,
    cursor: Cell<RunCursor>,
}

impl<V> Default for RunArray<V> {
    fn default() -> Self {
        Self {
            runs: Vec::new(),
            len: 0,
            cursor: Cell::new(RunCursor::default()),
        }
    }
}

impl<V: PartialEq> PartialEq for RunArray<V> {
    fn eq(&self, other: &Self) -> bool {
        self.runs == other.runs
    }
}

impl<V: Eq> Eq for RunArray<V> {}

impl<V: Clone + PartialEq> RunArray<V> {
    /// Create an empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sequence of `count` copies of `value`.
    pub fn with_value(value: V, count: usize) -> Self {
        let mut runs = Self::new();
        runs.push(value, count);
        runs
    }

    /// Build a sequence from `(length, value)` pairs, merging equal neighbours and skipping
    /// empty runs.
    pub fn from_runs<I>(runs: I) -> Self
    where
        I: IntoIterator<Item = (usize, V)>,
    {
        let mut out = Self::new();
        for (len, value) in runs {
            out.push(value, len);
        }
        out
    }

    /// Number of logical elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the sequence holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of runs.
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Iterate over `(length, value)` runs in order.
    pub fn runs(&self) -> impl Iterator<Item = (usize, &V)> + '_ {
        self.runs.iter().map(|run| (run.len, &run.value))
    }

    /// Iterate over every logical element.
    pub fn iter(&self) -> impl Iterator<Item = &V> + '_ {
        self.runs
            .iter()
            .flat_map(|run| std::iter::repeat_n(&run.value, run.len))
    }

    /// Value of the first element.
    pub fn first(&self) -> Option<&V> {
        self.runs.first().map(|run| &run.value)
    }

    /// Value of the last element.
    pub fn last(&self) -> Option<&V> {
        self.runs.last().map(|run| &run.value)
    }

    /// Value at `index`, or `None` if the index is out of range.
    pub fn get(&self, index: usize) -> Option<&V> {
        if index >= self.len {
            return None;
        }
        let (run, _) = self.locate(index);
        Some(&self.runs[run].value)
    }

    /// Element range covered by the run containing `index`.
    pub fn run_range_at(&self, index: usize) -> Option<Range<usize>> {
        if index >= self.len {
            return None;
        }
        let (run, first) = self.locate(index);
        Some(first..first + self.runs[run].len)
    }

    /// Append `count` copies of `value` at the end.
    pub fn push(&mut self, value: V, count: usize) {
        if count == 0 {
            return;
        }
        match self.runs.last_mut() {
            Some(last) if last.value == value => last.len += count,
            _ => self.runs.push(Run { len: count, value }),
        }
        self.len += count;
        self.debug_check();
    }

    /// Append every element of `other` at the end.
    pub fn append(&mut self, other: &RunArray<V>) {
        for run in &other.runs {
            self.push(run.value.clone(), run.len);
        }
    }

    /// Assign `value` to the element at `index`, splitting and re-merging runs as needed.
    pub fn set(&mut self, index: usize, value: V) -> Result<(), RunArrayError> {
        if index >= self.len {
            return Err(RunArrayError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }
        self.set_range(index, 1, value)
    }

    /// Assign `value` to `count` elements starting at `index`.
    pub fn set_range(&mut self, index: usize, count: usize, value: V) -> Result<(), RunArrayError> {
        self.check_range(index, count)?;
        if count == 0 {
            return Ok(());
        }

        let start = self.split_at(index);
        let end = self.split_at(index + count);
        self.runs.splice(start..end, [Run { len: count, value }]);
        self.merge_with_previous(start + 1);
        self.merge_with_previous(start);
        self.reset_cursor();
        self.debug_check();
        Ok(())
    }

    /// Insert `count` copies of `value` before `index` (`index == len()` appends).
    ///
    /// The neighbouring run is extended when its value equals `value`; otherwise a new run is
    /// created.
    pub fn insert(&mut self, index: usize, value: V, count: usize) -> Result<(), RunArrayError> {
        if index > self.len {
            return Err(RunArrayError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }
        if count == 0 {
            return Ok(());
        }
        if index == self.len {
            self.push(value, count);
            return Ok(());
        }

        let (run, first) = self.locate(index);
        if first == index {
            if run > 0 && self.runs[run - 1].value == value {
                self.runs[run - 1].len += count;
            } else if self.runs[run].value == value {
                self.runs[run].len += count;
            } else {
                self.runs.insert(run, Run { len: count, value });
            }
        } else if self.runs[run].value == value {
            self.runs[run].len += count;
        } else {
            let at = self.split_at(index);
            self.runs.insert(at, Run { len: count, value });
        }

        self.len += count;
        self.reset_cursor();
        self.debug_check();
        Ok(())
    }

    /// Insert a copy of every element of `other` before `index`.
    pub fn insert_slice(&mut self, index: usize, other: &RunArray<V>) -> Result<(), RunArrayError> {
        if index > self.len {
            return Err(RunArrayError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }
        let mut at = index;
        for run in &other.runs {
            self.insert(at, run.value.clone(), run.len)?;
            at += run.len;
        }
        Ok(())
    }

    /// Remove `count` elements starting at `first`.
    pub fn remove_range(&mut self, first: usize, count: usize) -> Result<(), RunArrayError> {
        self.check_range(first, count)?;
        if count == 0 {
            return Ok(());
        }

        let start = self.split_at(first);
        let end = self.split_at(first + count);
        self.runs.drain(start..end);
        self.len -= count;
        self.merge_with_previous(start);
        self.reset_cursor();
        self.debug_check();
        Ok(())
    }

    /// Remove every element.
    pub fn clear(&mut self) {
        self.runs.clear();
        self.len = 0;
        self.reset_cursor();
    }

    /// Copy `count` elements starting at `first` into a new sequence.
    pub fn slice(&self, first: usize, count: usize) -> Result<RunArray<V>, RunArrayError> {
        self.check_range(first, count)?;
        let mut out = RunArray::new();
        if count == 0 {
            return Ok(out);
        }

        let end = first + count;
        let (mut run, mut run_first) = self.locate(first);
        while run_first < end {
            let Run { len, value } = &self.runs[run];
            let lo = run_first.max(first);
            let hi = (run_first + len).min(end);
            out.push(value.clone(), hi - lo);
            run_first += len;
            run += 1;
        }
        Ok(out)
    }

    /// Weighted sum over `range`: each element contributes `weight(value)`.
    pub fn sum_of<F>(&self, range: Range<usize>, weight: F) -> Result<i64, RunArrayError>
    where
        F: Fn(&V) -> i64,
    {
        if range.start > range.end || range.end > self.len {
            return Err(RunArrayError::RangeOutOfRange {
                start: range.start,
                end: range.end,
                len: self.len,
            });
        }
        if range.is_empty() {
            return Ok(0);
        }

        let mut sum = 0i64;
        let (mut run, mut run_first) = self.locate(range.start);
        while run_first < range.end {
            let Run { len, value } = &self.runs[run];
            let lo = run_first.max(range.start);
            let hi = (run_first + len).min(range.end);
            sum += (hi - lo) as i64 * weight(value);
            run_first += len;
            run += 1;
        }
        Ok(sum)
    }

    /// Find the element at which the running weighted sum, starting from `start`, passes
    /// `target`.
    ///
    /// Returns `Ok((index, sum_before))` for the first index `i >= start` such that
    /// `sum_before <= target < sum_before + weight(i)`, where `sum_before` is the weighted sum
    /// of `start..i`. Elements of weight zero never match, so when several zero-weight runs
    /// sit at the target the first positive-weight element after them is returned.
    ///
    /// If `target` is negative or reaches past the total, returns `Err((index, sum_before))`
    /// for the nearest end (`start` or the last element).
    ///
    /// Weights must be non-negative.
    pub fn find_by_sum<F>(
        &self,
        target: i64,
        start: usize,
        weight: F,
    ) -> Result<(usize, i64), (usize, i64)>
    where
        F: Fn(&V) -> i64,
    {
        if self.len == 0 {
            return Err((0, 0));
        }
        let start = start.min(self.len - 1);
        if target < 0 {
            return Err((start, 0));
        }

        let mut sum = 0i64;
        let (mut run, mut run_first) = self.locate(start);
        let mut offset = start - run_first;
        let mut last_weight = 0i64;
        while run < self.runs.len() {
            let Run { len, value } = &self.runs[run];
            let w = weight(value);
            debug_assert!(w >= 0, "find_by_sum requires non-negative weights");
            let available = len - offset;
            if w > 0 {
                let span = available as i64 * w;
                if target < sum + span {
                    let skipped = (target - sum) / w;
                    let index = run_first + offset + skipped as usize;
                    return Ok((index, sum + skipped * w));
                }
                sum += span;
            }
            last_weight = w;
            run_first += len;
            offset = 0;
            run += 1;
        }

        Err((self.len - 1, sum - last_weight))
    }

    /// Returns `true` if the run list satisfies its structural invariants: no empty runs, no
    /// equal neighbours, and run lengths summing to [`len`](Self::len).
    pub fn is_well_formed(&self) -> bool {
        let sum: usize = self.runs.iter().map(|run| run.len).sum();
        sum == self.len
            && self.runs.iter().all(|run| run.len > 0)
            && self.runs.windows(2).all(|pair| pair[0].value != pair[1].value)
    }

    fn check_range(&self, first: usize, count: usize) -> Result<(), RunArrayError> {
        match first.checked_add(count) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(RunArrayError::RangeOutOfRange {
                start: first,
                end: first.saturating_add(count),
                len: self.len,
            }),
        }
    }

    /// Returns `(run index, index of the run's first element)` for an element index.
    fn locate(&self, index: usize) -> (usize, usize) {
        debug_assert!(index < self.len);
        let mut cursor = self.cursor.get();
        if cursor.run >= self.runs.len() || index < cursor.first / 2 {
            cursor = RunCursor::default();
        }

        while index < cursor.first {
            cursor.run -= 1;
            cursor.first -= self.runs[cursor.run].len;
        }
        while index >= cursor.first + self.runs[cursor.run].len {
            cursor.first += self.runs[cursor.run].len;
            cursor.run += 1;
        }

        self.cursor.set(cursor);
        (cursor.run, cursor.first)
    }

    /// Make sure a run boundary exists at element `index` and return the run that starts
    /// there (`run_count()` when `index == len()`). May leave equal neighbours behind.
    fn split_at(&mut self, index: usize) -> usize {
        if index >= self.len {
            return self.runs.len();
        }
        let (run, first) = self.locate(index);
        if first == index {
            return run;
        }

        let head = index - first;
        let tail = Run {
            len: self.runs[run].len - head,
            value: self.runs[run].value.clone(),
        };
        self.runs[run].len = head;
        self.runs.insert(run + 1, tail);
        self.reset_cursor();
        run + 1
    }

    fn merge_with_previous(&mut self, run: usize) {
        if run == 0 || run >= self.runs.len() {
            return;
        }
        if self.runs[run - 1].value == self.runs[run].value {
            let merged = self.runs.remove(run);
            self.runs[run - 1].len += merged.len;
        }
    }

    fn reset_cursor(&self) {
        self.cursor.set(RunCursor::default());
    }

    fn debug_check(&self) {
        debug_assert!(self.is_well_formed(), "run array invariants violated");
    }
}

impl<V: Clone + PartialEq> FromIterator<V> for RunArray<V> {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        let mut out = RunArray::new();
        for value in iter {
            out.push(value, 1);
        }
        out
    }
}
