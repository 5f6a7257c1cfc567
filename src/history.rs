use egui::{Color32, Pos2};
use std::num::NonZeroU32;

use crate::trace::{Segment, Trace};
use crate::{AnnotatorError, Result};

/// Pointer value meaning "nothing visible"
pub const NO_TRACE: isize = -1;

/// Host-side pointer value meaning "discard all history"
pub const RESET_SENTINEL: isize = -2;

/// A decoded host write to the history pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexRequest {
    Reset,
    Position(isize),
}

impl From<isize> for IndexRequest {
    fn from(value: isize) -> Self {
        if value == RESET_SENTINEL {
            IndexRequest::Reset
        } else {
            IndexRequest::Position(value)
        }
    }
}

/// What the rendering path has to do after a pointer write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// Requested value equals the current pointer; nothing to do
    Unchanged,
    /// Pointer moved within bounds; redraw up to the given index
    Replay(isize),
    /// History was discarded
    Reset,
    /// Requested value lies outside the history; the host may fetch more
    OutOfRange(isize),
}

/// Ordered stroke history plus the undo/redo pointer.
///
/// Invariant: `index` is always within `[-1, len - 1]`.
#[derive(Debug, Clone)]
pub struct TraceStore {
    traces: Vec<Trace>,
    index: isize,
}

impl Default for TraceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceStore {
    /// Creates an empty store with nothing visible
    pub fn new() -> Self {
        Self {
            traces: Vec::new(),
            index: NO_TRACE,
        }
    }

    /// Install a previously recorded history
    pub fn from_parts(traces: Vec<Trace>, index: isize) -> Result<Self> {
        let last = traces.len() as isize - 1;
        if index < NO_TRACE || index > last {
            return Err(AnnotatorError::InvalidIndex { index, last });
        }
        Ok(Self { traces, index })
    }

    pub fn index(&self) -> isize {
        self.index
    }

    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Index of the last trace in the list, `-1` when empty
    pub fn last_index(&self) -> isize {
        self.traces.len() as isize - 1
    }

    /// The trace the pointer currently designates
    pub fn active_trace(&self) -> Option<&Trace> {
        usize::try_from(self.index).ok().and_then(|i| self.traces.get(i))
    }

    /// Start a new trace, dropping any redo tail first. Returns the new index.
    pub fn begin_trace(&mut self, color: Color32, thickness: NonZeroU32, start: Pos2) -> isize {
        let keep = (self.index + 1) as usize;
        if keep < self.traces.len() {
            log::debug!("Discarding {} redo trace(s)", self.traces.len() - keep);
            self.traces.truncate(keep);
        }
        self.traces.push(Trace::new(color, thickness, start));
        self.index = self.last_index();
        self.index
    }

    /// Append a segment to the trace at the current index
    pub fn append_segment(&mut self, from: Pos2, to: Pos2) -> Result<()> {
        let slot = usize::try_from(self.index).map_err(|_| AnnotatorError::NoActiveTrace)?;
        let trace = self.traces.get_mut(slot).ok_or(AnnotatorError::NoActiveTrace)?;
        trace.push_segment(Segment::new(from, to));
        Ok(())
    }

    /// Apply a raw pointer value, decoding the reset sentinel
    pub fn set_index(&mut self, requested: isize) -> IndexOutcome {
        self.apply(IndexRequest::from(requested))
    }

    /// Validated pointer mutation shared by host writes and internal navigation
    pub fn apply(&mut self, request: IndexRequest) -> IndexOutcome {
        match request {
            IndexRequest::Reset => {
                self.clear();
                IndexOutcome::Reset
            }
            IndexRequest::Position(requested) if requested == self.index => IndexOutcome::Unchanged,
            IndexRequest::Position(requested) if (NO_TRACE..=self.last_index()).contains(&requested) => {
                self.index = requested;
                IndexOutcome::Replay(requested)
            }
            IndexRequest::Position(requested) => IndexOutcome::OutOfRange(requested),
        }
    }

    pub fn can_undo(&self) -> bool {
        self.index > NO_TRACE
    }

    pub fn can_redo(&self) -> bool {
        self.index < self.last_index()
    }

    /// Drop every trace and hide everything
    pub fn clear(&mut self) {
        self.traces.clear();
        self.index = NO_TRACE;
    }
}
