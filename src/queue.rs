//! Mutex-guarded FIFO of pending submissions.
//!
//! Intake handlers push on one side; the single worker pulls on the other.
//! `pull` is non-blocking (the worker owns its own idle pacing), and
//! `snapshot` hands introspection endpoints a copy so readers never hold
//! the queue lock across serialization.

use std::collections::VecDeque;
use std::sync::Mutex;

/// FIFO submission queue.
///
/// Ordering is exactly insertion order; concurrent inserts are serialized
/// by the internal mutex and nothing beyond that is guaranteed.
#[derive(Debug)]
pub struct SubmissionQueue<T> {
    inner: Mutex<VecDeque<T>>,
}

impl<T: Clone> SubmissionQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    pub fn insert(&self, item: T) {
        self.inner.lock().unwrap().push_back(item);
    }

    /// Removes and returns the oldest item, if any.
    pub fn pull(&self) -> Option<T> {
        self.inner.lock().unwrap().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    /// Copy of the queued items, oldest first.
    pub fn snapshot(&self) -> Vec<T> {
        self.inner.lock().unwrap().iter().cloned().collect()
    }
}

impl<T: Clone> Default for SubmissionQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
