use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use mithril_robots::RobotRulesCache;

use crate::error::CrawlError;
use crate::frontier::UrlFrontier;
use crate::queue::DocumentQueue;
use crate::request_manager::{RequestManager, RequestManagerConfig};
use crate::store::DocumentWriter;
use crate::worker::Worker;

/// Top-level crawl settings.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub seed_urls: Vec<String>,
    pub worker_threads: usize,
    pub document_store_path: String,
    pub request: RequestManagerConfig,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        CrawlerConfig {
            seed_urls: Vec::new(),
            worker_threads: 8,
            document_store_path: "documents.gz".to_string(),
            request: RequestManagerConfig::default(),
        }
    }
}

/// Owns the frontier, document queue, robots cache, and document store, and
/// spawns one request-manager thread plus a pool of worker threads. The
/// request manager closes the document queue when the crawl winds down,
/// which drains the workers in turn. Mirrors the original crawler's
/// `Coordinator`.
pub fn run(config: CrawlerConfig, shutdown: Arc<AtomicBool>) -> Result<(), CrawlError> {
    let frontier = Arc::new(UrlFrontier::new());
    let queue = Arc::new(DocumentQueue::new());
    let robots = Arc::new(RobotRulesCache::new()?);
    let writer = Arc::new(Mutex::new(DocumentWriter::create(&config.document_store_path)?));
    let next_id = Arc::new(AtomicU32::new(0));

    let seeded = frontier.put_urls(config.seed_urls.clone());
    tracing::info!(seeded, "crawl seeded");

    let mut request_manager = RequestManager::new(robots.clone(), frontier.clone(), queue.clone(), config.request.clone())?;

    let rm_handle = thread::Builder::new()
        .name("mithril-request-manager".to_string())
        .spawn(move || request_manager.run(&shutdown))
        .expect("failed to spawn request manager thread");

    let worker_handles: Vec<_> = (0..config.worker_threads)
        .map(|i| {
            let worker = Worker::new(queue.clone(), frontier.clone(), writer.clone(), next_id.clone());
            thread::Builder::new()
                .name(format!("mithril-worker-{i}"))
                .spawn(move || worker.run())
                .expect("failed to spawn crawler worker thread")
        })
        .collect();

    for handle in worker_handles {
        let _ = handle.join();
    }
    let _ = rm_handle.join();

    match Arc::try_unwrap(writer) {
        Ok(writer) => writer.into_inner().finish()?,
        Err(_) => tracing::warn!("document writer still shared after worker shutdown; store left unflushed"),
    }

    Ok(())
}
