//! Mock line source for testing

use crate::core::source::{FaultKind, LineSource, Poll};
use crate::core::types::RawLine;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Scripted line source
///
/// Replays queued polls in order and reports [`Poll::EndOfStream`] once the
/// script is exhausted. Clones share the queue, so a test can keep feeding a
/// source that has already been handed to a session.
#[derive(Clone, Default)]
pub struct MockLineSource {
    inner: Arc<Mutex<VecDeque<Poll>>>,
}

impl MockLineSource {
    /// Create a new, empty mock source
    pub fn new() -> Self {
        Self::default()
    }

    /// Source preloaded with `(text, host_arrival_us)` lines
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        let source = Self::new();
        for (text, at) in lines {
            source.push_line(text, at);
        }
        source
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Poll>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a line
    pub fn push_line(&self, text: impl Into<String>, host_arrival_us: i64) {
        self.push(Poll::Line(RawLine::new(text, host_arrival_us)));
    }

    /// Queue a transport fault
    pub fn push_fault(&self, kind: FaultKind) {
        self.push(Poll::Fault(kind));
    }

    /// Queue an arbitrary poll result
    pub fn push(&self, poll: Poll) {
        self.lock().push_back(poll);
    }

    /// Polls not yet consumed
    pub fn remaining(&self) -> usize {
        self.lock().len()
    }
}

impl LineSource for MockLineSource {
    fn next_line(&mut self) -> Poll {
        self.lock().pop_front().unwrap_or(Poll::EndOfStream)
    }
}
