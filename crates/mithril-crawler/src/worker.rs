use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::document::{DocId, Document};
use crate::frontier::UrlFrontier;
use crate::html;
use crate::link::make_absolute_link;
use crate::queue::DocumentQueue;
use crate::store::DocumentWriter;

/// Pops completed HTTP responses, extracts their content, assigns a stable
/// [`DocId`], writes the resulting [`Document`] to the shared store, and
/// feeds newly discovered links back into the frontier. One instance runs
/// per worker thread; all share the same queue, frontier, writer, and ID
/// counter, mirroring the original crawler's worker pool.
pub struct Worker {
    queue: Arc<DocumentQueue>,
    frontier: Arc<UrlFrontier>,
    writer: Arc<Mutex<DocumentWriter>>,
    next_id: Arc<AtomicU32>,
}

impl Worker {
    pub fn new(
        queue: Arc<DocumentQueue>,
        frontier: Arc<UrlFrontier>,
        writer: Arc<Mutex<DocumentWriter>>,
        next_id: Arc<AtomicU32>,
    ) -> Self {
        Worker { queue, frontier, writer, next_id }
    }

    /// Runs until the document queue closes and drains.
    pub fn run(&self) {
        while let Some(response) = self.queue.pop() {
            self.handle(response);
        }
    }

    fn handle(&self, response: mithril_http::CompleteResponse) {
        let url = response.request.url().clone();

        if response.header.status != 200 {
            tracing::debug!(url = %url, status = response.header.status, "skipping non-200 response");
            return;
        }

        let body = String::from_utf8_lossy(&response.body);
        let page = html::extract(&body);

        let mut forward_links = Vec::with_capacity(page.links.len());
        let mut discovered = Vec::with_capacity(page.links.len());
        for href in &page.links {
            if let Some(absolute) = make_absolute_link(&url, page.base.as_deref(), href) {
                discovered.push(absolute.clone());
                forward_links.push(absolute);
            }
        }
        self.frontier.put_urls(discovered);

        let id: DocId = self.next_id.fetch_add(1, Ordering::Relaxed);
        let doc = Document {
            id,
            url: mithril_url::canonicalize_url(&url),
            title: page.title,
            description: page.description,
            words: page.words,
            forward_links,
        };

        if let Err(error) = self.writer.lock().write(&doc) {
            tracing::error!(%error, doc_id = id, "failed to write document");
        }
    }
}
