use std::collections::HashSet;
use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

const MIN_URL_LENGTH: usize = 10;
const MAX_URL_LENGTH: usize = 2048;

/// Whether `url` is syntactically crawlable per spec.md §4.4/§6: 10-2048
/// bytes, every byte strictly within `(0x20, 0x7E]`.
fn is_valid_url(url: &str) -> bool {
    if url.len() < MIN_URL_LENGTH || url.len() > MAX_URL_LENGTH {
        return false;
    }
    url.bytes().all(|b| b > 0x20 && b <= 0x7E)
}

struct Inner {
    urls: VecDeque<String>,
    seen: HashSet<String>,
}

/// Thread-safe pending-URL queue with seen-set deduplication, per spec.md
/// §4.4. Producers `put`; consumers `get_urls`, optionally blocking until
/// at least one URL is available.
pub struct UrlFrontier {
    inner: Mutex<Inner>,
    cv: Condvar,
}

impl Default for UrlFrontier {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlFrontier {
    pub fn new() -> Self {
        UrlFrontier { inner: Mutex::new(Inner { urls: VecDeque::new(), seen: HashSet::new() }), cv: Condvar::new() }
    }

    /// Whether the frontier currently has no pending URLs.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().urls.is_empty()
    }

    /// Normalizes and enqueues `url`, rejecting it if invalid or already
    /// seen. Returns whether it was actually enqueued.
    pub fn put(&self, url: String) -> bool {
        if !is_valid_url(&url) {
            return false;
        }
        let mut inner = self.inner.lock();
        if !inner.seen.insert(url.clone()) {
            return false;
        }
        inner.urls.push_back(url);
        self.cv.notify_one();
        true
    }

    /// Enqueues every valid, unseen URL in `urls`. Returns the count
    /// actually enqueued.
    pub fn put_urls(&self, urls: impl IntoIterator<Item = String>) -> usize {
        let mut inner = self.inner.lock();
        let mut n = 0;
        for url in urls {
            if !is_valid_url(&url) {
                continue;
            }
            if inner.seen.insert(url.clone()) {
                inner.urls.push_back(url);
                n += 1;
            }
        }
        if n > 0 {
            self.cv.notify_all();
        }
        n
    }

    /// Dequeues up to `max` URLs. If `at_least_one` is set and the
    /// frontier is currently empty, blocks until at least one URL is
    /// available.
    pub fn get_urls(&self, max: usize, at_least_one: bool) -> Vec<String> {
        if max == 0 {
            return Vec::new();
        }
        let mut inner = self.inner.lock();
        if at_least_one {
            while inner.urls.is_empty() {
                self.cv.wait(&mut inner);
            }
        } else if inner.urls.is_empty() {
            return Vec::new();
        }

        let n = max.min(inner.urls.len());
        inner.urls.drain(..n).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_too_short_url() {
        let f = UrlFrontier::new();
        assert!(!f.put("short".to_string()));
    }

    #[test]
    fn rejects_control_characters() {
        let f = UrlFrontier::new();
        assert!(!f.put("http://example.com/\x01".to_string()));
    }

    #[test]
    fn deduplicates_repeated_put() {
        let f = UrlFrontier::new();
        assert!(f.put("http://example.test/b".to_string()));
        assert!(!f.put("http://example.test/b".to_string()));
        assert_eq!(f.get_urls(10, false), vec!["http://example.test/b".to_string()]);
    }

    #[test]
    fn get_urls_respects_max() {
        let f = UrlFrontier::new();
        f.put_urls(["http://a.test/1".into(), "http://a.test/2".into(), "http://a.test/3".into()]);
        let batch = f.get_urls(2, false);
        assert_eq!(batch.len(), 2);
        assert_eq!(f.get_urls(10, false).len(), 1);
    }
}
