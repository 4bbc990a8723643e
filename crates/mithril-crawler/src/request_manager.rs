use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mithril_http::{Method, Request, RequestExecutor, RequestOptions};
use mithril_robots::RobotRulesCache;
use mithril_url::{CanonicalHost, Url};

use crate::error::CrawlError;
use crate::frontier::UrlFrontier;
use crate::queue::DocumentQueue;

/// Policy applied to every request the crawler issues.
#[derive(Debug, Clone)]
pub struct RequestManagerConfig {
    pub max_in_flight: usize,
    pub timeout: Duration,
    pub follow_redirects: u32,
    pub max_response_size: usize,
    pub allowed_mime_types: Vec<String>,
    pub allowed_content_languages: Vec<String>,
}

impl Default for RequestManagerConfig {
    fn default() -> Self {
        RequestManagerConfig {
            max_in_flight: 200,
            timeout: Duration::from_secs(10),
            follow_redirects: 5,
            max_response_size: 10 * 1024 * 1024,
            allowed_mime_types: vec!["text/html".to_string()],
            allowed_content_languages: Vec::new(),
        }
    }
}

/// Drains the URL frontier into outbound HTTP requests, consulting the
/// robots cache before each fetch, and hands completed responses to the
/// document queue for the worker pool. Runs on its own thread; one instance
/// per crawl per spec.md §4.2/§9 ("a single coordinator thread owns the
/// non-blocking I/O loop").
pub struct RequestManager {
    executor: RequestExecutor,
    robots: Arc<RobotRulesCache>,
    frontier: Arc<UrlFrontier>,
    queue: Arc<DocumentQueue>,
    config: RequestManagerConfig,
    waiting_on_robots: HashMap<CanonicalHost, Vec<Url>>,
}

impl RequestManager {
    pub fn new(
        robots: Arc<RobotRulesCache>,
        frontier: Arc<UrlFrontier>,
        queue: Arc<DocumentQueue>,
        config: RequestManagerConfig,
    ) -> Result<Self, CrawlError> {
        Ok(RequestManager {
            executor: RequestExecutor::new()?,
            robots,
            frontier,
            queue,
            config,
            waiting_on_robots: HashMap::new(),
        })
    }

    /// Drives the crawl loop until `shutdown` is set and every in-flight and
    /// robots-pending request has drained, then closes the document queue so
    /// workers wind down.
    pub fn run(&mut self, shutdown: &AtomicBool) {
        loop {
            self.refill();
            self.robots.process_pending_requests();
            self.retry_waiting();

            if let Err(error) = self.executor.process_connections() {
                tracing::warn!(%error, "request executor poll failed");
            }

            let ready = self.executor.ready_responses();
            if !ready.is_empty() {
                self.queue.push_all(ready);
            }
            for failure in self.executor.failed_requests() {
                tracing::debug!(url = %failure.request.url(), error = %failure.error, "request failed");
            }

            let drained = self.executor.in_flight_requests() == 0
                && self.waiting_on_robots.is_empty()
                && self.robots.pending_requests() == 0;
            if shutdown.load(Ordering::Relaxed) && drained {
                break;
            }
        }
        self.queue.close();
    }

    fn refill(&mut self) {
        while self.executor.in_flight_requests() < self.config.max_in_flight {
            let urls = self.frontier.get_urls(self.config.max_in_flight, false);
            if urls.is_empty() {
                break;
            }
            for raw in urls {
                let Ok(url) = mithril_url::parse_url(&raw) else { continue };
                self.dispatch(url);
            }
        }
    }

    fn dispatch(&mut self, url: Url) {
        let host = mithril_url::canonicalize_host(&url);
        match self.robots.get_or_fetch(&host) {
            Some(rules) => {
                if rules.allowed(&url.path) {
                    self.start_request(url);
                }
            }
            None => {
                self.waiting_on_robots.entry(host).or_default().push(url);
            }
        }
    }

    fn retry_waiting(&mut self) {
        let hosts: Vec<CanonicalHost> = self.waiting_on_robots.keys().cloned().collect();
        for host in hosts {
            if let Some(rules) = self.robots.get_or_fetch(&host) {
                if let Some(urls) = self.waiting_on_robots.remove(&host) {
                    for url in urls {
                        if rules.allowed(&url.path) {
                            self.start_request(url);
                        }
                    }
                }
            }
        }
    }

    fn start_request(&mut self, url: Url) {
        let options = RequestOptions {
            follow_redirects: self.config.follow_redirects,
            timeout: self.config.timeout,
            max_response_size: self.config.max_response_size,
            allowed_mime_types: self.config.allowed_mime_types.clone(),
            allowed_content_languages: self.config.allowed_content_languages.clone(),
        };
        self.executor.add(Request::new(Method::Get, url, options));
    }
}
