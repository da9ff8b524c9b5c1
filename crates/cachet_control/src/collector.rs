//! Per-request hint collection.

use crate::error::{CacheControlError, CacheControlResult};
use crate::hint::{CacheHint, Hint};
use cachet_runtime::{DisplayPath, PathSegment};
use parking_lot::Mutex;
use std::fmt;

/// Lifecycle state of a [`HintCollector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    NotStarted,
    Collecting,
    Closed,
    Finalized,
}

impl fmt::Display for CollectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotStarted => "not started",
            Self::Collecting => "collecting",
            Self::Closed => "closed",
            Self::Finalized => "finalized",
        })
    }
}

#[derive(Debug)]
struct Inner {
    state: CollectorState,
    hints: Vec<Hint>,
    leaves: usize,
    leaves_with_max_age: usize,
}

/// Accumulates the hints recorded while one request executes.
///
/// Records are accepted only between [`start`](Self::start) and
/// [`close`](Self::close). Sibling fields may record from different tasks.
#[derive(Debug)]
pub struct HintCollector {
    inner: Mutex<Inner>,
}

impl Default for HintCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl HintCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: CollectorState::NotStarted,
                hints: Vec::new(),
                leaves: 0,
                leaves_with_max_age: 0,
            }),
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> CollectorState {
        self.inner.lock().state
    }

    /// Opens the collector for records.
    pub fn start(&self) -> CacheControlResult<()> {
        self.transition(&[CollectorState::NotStarted], CollectorState::Collecting)
    }

    /// Records the effective hint of one resolved field.
    ///
    /// A `None` hint appends nothing but still counts toward
    /// [`all_leaves_had_max_age`](Self::all_leaves_had_max_age) when `leaf` is set.
    pub fn record(
        &self,
        path: Vec<PathSegment>,
        hint: Option<CacheHint>,
        leaf: bool,
    ) -> CacheControlResult<()> {
        let mut inner = self.inner.lock();
        if inner.state != CollectorState::Collecting {
            return Err(CacheControlError::CollectorNotCollecting {
                path: DisplayPath(&path).to_string(),
                state: inner.state,
            });
        }

        if leaf {
            inner.leaves += 1;
            if hint.is_some_and(|hint| hint.max_age.is_some()) {
                inner.leaves_with_max_age += 1;
            }
        }
        if let Some(hint) = hint.filter(|hint| !hint.is_empty()) {
            inner.hints.push(Hint::new(path, hint));
        }
        Ok(())
    }

    /// Stops accepting records. A collector that never started may be closed
    /// directly.
    pub fn close(&self) -> CacheControlResult<()> {
        self.transition(
            &[CollectorState::NotStarted, CollectorState::Collecting],
            CollectorState::Closed,
        )
    }

    /// Marks the collected hints as consumed and returns them.
    pub fn finalize(&self) -> CacheControlResult<Vec<Hint>> {
        let mut inner = self.inner.lock();
        if inner.state != CollectorState::Closed {
            return Err(CacheControlError::InvalidTransition {
                from: inner.state,
                to: CollectorState::Finalized,
            });
        }
        inner.state = CollectorState::Finalized;
        Ok(inner.hints.clone())
    }

    /// Returns a copy of the hints recorded so far.
    pub fn snapshot(&self) -> Vec<Hint> {
        self.inner.lock().hints.clone()
    }

    /// Returns the number of recorded hints.
    pub fn len(&self) -> usize {
        self.inner.lock().hints.len()
    }

    /// Returns true if no hint was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if every resolved leaf field carried a `maxAge`.
    /// Vacuously true when no leaf resolved.
    pub fn all_leaves_had_max_age(&self) -> bool {
        let inner = self.inner.lock();
        inner.leaves == inner.leaves_with_max_age
    }

    fn transition(
        &self,
        allowed: &[CollectorState],
        to: CollectorState,
    ) -> CacheControlResult<()> {
        let mut inner = self.inner.lock();
        if !allowed.contains(&inner.state) {
            return Err(CacheControlError::InvalidTransition {
                from: inner.state,
                to,
            });
        }
        inner.state = to;
        Ok(())
    }
}
