use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use mithril_http::{Method, Request, RequestExecutor, RequestOptions};
use mithril_url::{CanonicalHost, Url};
use parking_lot::Mutex;

use crate::rules::RobotRules;

/// TTL applied to both successful and failed `robots.txt` fetches.
pub const CACHE_TTL: Duration = Duration::from_secs(4 * 60 * 60);
/// Maximum number of `robots.txt` fetches this cache will have in flight
/// at once.
const MAX_IN_FLIGHT: usize = 100;
/// Redirects a `robots.txt` fetch itself is allowed to follow.
const MAX_ROBOTS_REDIRECTS: u32 = 5;

const USER_AGENT: &str = "mithril-crawler";

enum Entry {
    /// A fetch is in flight; no rules available yet.
    Fetching,
    /// Rules resolved (successfully parsed, or degraded to allow/disallow
    /// all per status code), valid until `expires_at`.
    Valid { rules: Arc<RobotRules>, expires_at: Instant },
    /// The fetch itself failed (connection error, timeout); no rules were
    /// ever obtained. Treated the same as disallow-all by callers but kept
    /// distinct so a future fetch is retried once the TTL lapses rather
    /// than assumed identical to a successful disallow-all parse.
    Invalid { expires_at: Instant },
}

/// Per-host cache of parsed `robots.txt` rulesets, with TTL expiry and
/// bounded in-flight fetch tracking. Owns its own [`RequestExecutor`], per
/// spec.md §4.2 ("The cache owns its own RequestExecutor").
pub struct RobotRulesCache {
    cache: Mutex<HashMap<String, Entry>>,
    executor: Mutex<RequestExecutor>,
}

impl RobotRulesCache {
    pub fn new() -> Result<Self, mithril_http::Error> {
        Ok(RobotRulesCache { cache: Mutex::new(HashMap::new()), executor: Mutex::new(RequestExecutor::new()?) })
    }

    /// Returns the cached ruleset for `host`, or `None` if it isn't cached
    /// yet (in which case a fetch is enqueued, capacity permitting).
    pub fn get_or_fetch(&self, host: &CanonicalHost) -> Option<Arc<RobotRules>> {
        let key = host.url.clone();
        let mut cache = self.cache.lock();

        match cache.get(&key) {
            None => {
                cache.insert(key.clone(), Entry::Fetching);
                drop(cache);
                self.maybe_fetch(host);
                None
            }
            Some(Entry::Fetching) => None,
            Some(Entry::Valid { rules, expires_at }) => {
                if Instant::now() >= *expires_at {
                    let rules = rules.clone();
                    cache.insert(key.clone(), Entry::Fetching);
                    drop(cache);
                    self.maybe_fetch(host);
                    Some(rules)
                } else {
                    Some(rules.clone())
                }
            }
            Some(Entry::Invalid { expires_at }) => {
                if Instant::now() >= *expires_at {
                    cache.insert(key.clone(), Entry::Fetching);
                    drop(cache);
                    self.maybe_fetch(host);
                }
                None
            }
        }
    }

    fn maybe_fetch(&self, host: &CanonicalHost) {
        let mut executor = self.executor.lock();
        if executor.in_flight_requests() >= MAX_IN_FLIGHT {
            return;
        }
        let robots_url = Url {
            url: format!("{}/robots.txt", host.url),
            scheme: host.scheme.clone(),
            host: host.host.clone(),
            port: host.port.clone(),
            path: "/robots.txt".to_string(),
        };
        let options = RequestOptions { follow_redirects: MAX_ROBOTS_REDIRECTS, ..Default::default() };
        executor.add(Request::new(Method::Get, robots_url, options));
    }

    /// Number of `robots.txt` fetches currently in flight.
    pub fn pending_requests(&self) -> usize {
        self.executor.lock().in_flight_requests()
    }

    /// Drives the owned executor and resolves any completed/failed
    /// `robots.txt` fetches into cache entries.
    pub fn process_pending_requests(&self) {
        let (ready, failed) = {
            let mut executor = self.executor.lock();
            if executor.in_flight_requests() == 0 {
                return;
            }
            if executor.process_connections().is_err() {
                return;
            }
            (executor.ready_responses(), executor.failed_requests())
        };

        let mut cache = self.cache.lock();
        for resp in ready {
            let host = mithril_url::canonicalize_host(resp.request.url());
            let rules = match resp.header.status {
                200 => {
                    let is_text = resp.header.content_type().is_some_and(|ct| ct.starts_with("text/plain"));
                    if is_text {
                        let body = String::from_utf8_lossy(&resp.body);
                        RobotRules::from_robots_txt(&body, USER_AGENT)
                    } else {
                        RobotRules::allow_all()
                    }
                }
                404 => RobotRules::allow_all(),
                401 | 403 => RobotRules::disallow_all(),
                _ => RobotRules::disallow_all(),
            };
            cache.insert(host.url, Entry::Valid { rules: Arc::new(rules), expires_at: Instant::now() + CACHE_TTL });
        }
        for failure in failed {
            tracing::warn!(url = %failure.request.url(), error = %failure.error, "robots.txt fetch failed");
            let host = mithril_url::canonicalize_host(failure.request.url());
            cache.insert(host.url, Entry::Invalid { expires_at: Instant::now() + CACHE_TTL });
        }
    }
}
