use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

use mithril_http::CompleteResponse;

struct Inner {
    items: VecDeque<CompleteResponse>,
    closed: bool,
}

/// Bounded-in-spirit (spec.md doesn't mandate a capacity, just closability),
/// closable FIFO handing completed HTTP responses from the request manager
/// to worker threads. Mirrors the original's `DocumentQueue`: a mutex+CV
/// queue where `pop` blocks until data arrives or the queue closes.
pub struct DocumentQueue {
    inner: Mutex<Inner>,
    cv: Condvar,
}

impl Default for DocumentQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentQueue {
    pub fn new() -> Self {
        DocumentQueue { inner: Mutex::new(Inner { items: VecDeque::new(), closed: false }), cv: Condvar::new() }
    }

    /// Marks the queue closed; every blocked and future `pop` drains
    /// remaining items, then returns `None` once empty. Idempotent.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if !inner.closed {
            inner.closed = true;
            self.cv.notify_all();
        }
    }

    pub fn push(&self, response: CompleteResponse) {
        let mut inner = self.inner.lock();
        inner.items.push_back(response);
        self.cv.notify_one();
    }

    pub fn push_all(&self, responses: impl IntoIterator<Item = CompleteResponse>) {
        let mut inner = self.inner.lock();
        let mut any = false;
        for r in responses {
            inner.items.push_back(r);
            any = true;
        }
        if any {
            self.cv.notify_all();
        }
    }

    /// Blocks until an item is available or the queue is closed and
    /// drained, in which case it returns `None`.
    pub fn pop(&self) -> Option<CompleteResponse> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(item) = inner.items.pop_front() {
                return Some(item);
            }
            if inner.closed {
                return None;
            }
            self.cv.wait(&mut inner);
        }
    }
}
