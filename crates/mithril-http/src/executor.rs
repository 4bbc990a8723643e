use std::collections::HashMap;
use std::net::ToSocketAddrs;
use std::time::Duration;

use mio::net::TcpStream;
use mio::{Events, Interest, Poll, Token};

use crate::connection::{Connection, Progress};
use crate::error::{Error, RequestError};
use crate::request::Request;
use crate::response::{CompleteResponse, FailedRequest};

/// How long a single `ProcessConnections` poll waits for readiness before
/// returning to let the caller check timeouts, even with no events.
const POLL_TIMEOUT: Duration = Duration::from_millis(250);

struct Entry {
    conn: Connection,
}

/// Drives many non-blocking HTTP/1.1 connections through one `mio`
/// readiness multiplexer on a single thread. See `spec.md` §4.3.
pub struct RequestExecutor {
    poll: Poll,
    events: Events,
    connections: HashMap<Token, Entry>,
    next_token: usize,
    ready: Vec<CompleteResponse>,
    failed: Vec<FailedRequest>,
}

impl RequestExecutor {
    pub fn new() -> Result<Self, Error> {
        let poll = Poll::new().map_err(Error::Poll)?;
        Ok(RequestExecutor {
            poll,
            events: Events::with_capacity(128),
            connections: HashMap::new(),
            next_token: 0,
            ready: Vec::new(),
            failed: Vec::new(),
        })
    }

    /// Number of connections currently pending or in-flight. Used by
    /// callers (notably [`mithril_robots`]'s cache) to cap concurrent
    /// fetches.
    pub fn in_flight_requests(&self) -> usize {
        self.connections.len()
    }

    /// Resolves the request's host, opens a non-blocking socket, writes
    /// the serialized request, and registers it for readiness
    /// notifications. DNS resolution is a blocking call, matching the
    /// original executor's use of `getaddrinfo` before the non-blocking
    /// loop begins.
    pub fn add(&mut self, request: Request) {
        self.add_redirected(request, 0);
    }

    fn add_redirected(&mut self, request: Request, redirects: u32) {
        let url = request.url();
        let port: u16 = if url.port.is_empty() {
            if url.scheme == "https" { 443 } else { 80 }
        } else {
            url.port.parse().unwrap_or(80)
        };

        let addr = match (url.host.as_str(), port).to_socket_addrs() {
            Ok(mut addrs) => match addrs.next() {
                Some(a) => a,
                None => {
                    tracing::debug!(host = %request.url().host, "dns resolution returned no addresses");
                    self.failed.push(FailedRequest { request, error: RequestError::ConnectionError });
                    return;
                }
            },
            Err(error) => {
                tracing::debug!(host = %request.url().host, %error, "dns resolution failed");
                self.failed.push(FailedRequest { request, error: RequestError::ConnectionError });
                return;
            }
        };

        let stream = match TcpStream::connect(addr) {
            Ok(s) => s,
            Err(_) => {
                self.failed.push(FailedRequest { request, error: RequestError::ConnectionError });
                return;
            }
        };

        let token = Token(self.next_token);
        self.next_token += 1;

        let mut conn = Connection::new(stream, request, redirects);
        if self
            .poll
            .registry()
            .register(conn.socket_mut(), token, Interest::READABLE | Interest::WRITABLE)
            .is_err()
        {
            self.failed.push(FailedRequest { request: conn.into_request(), error: RequestError::ConnectionError });
            return;
        }
        let _ = &mut conn;
        self.connections.insert(token, Entry { conn });
    }

    /// Blocks (bounded by [`POLL_TIMEOUT`]) on the readiness multiplexer,
    /// advances every ready connection's state machine, moves completed
    /// exchanges to the ready queue and terminal failures to the failed
    /// queue, then checks per-request timeouts.
    pub fn process_connections(&mut self) -> Result<(), Error> {
        self.poll.poll(&mut self.events, Some(POLL_TIMEOUT)).map_err(Error::Wait)?;

        let mut finished = Vec::new();
        for event in self.events.iter() {
            let token = event.token();
            if let Some(entry) = self.connections.get_mut(&token) {
                match entry.conn.advance() {
                    Progress::Pending => {}
                    Progress::Done(resp) => finished.push((token, FinishedKind::Done(resp))),
                    Progress::Redirect(location) => finished.push((token, FinishedKind::Redirect(location))),
                    Progress::Failed(err) => finished.push((token, FinishedKind::Failed(err))),
                }
            }
        }

        for (token, kind) in finished {
            let Some(entry) = self.connections.remove(&token) else { continue };
            let _ = self.poll.registry().deregister(entry.conn.socket_ref());
            match kind {
                FinishedKind::Done(resp) => self.ready.push(resp),
                FinishedKind::Failed(err) => self.failed.push(FailedRequest { request: entry.conn.into_request(), error: err }),
                FinishedKind::Redirect(location) => self.follow_redirect(entry.conn, location),
            }
        }

        self.check_request_timeouts();
        Ok(())
    }

    fn follow_redirect(&mut self, conn: Connection, location: String) {
        let redirects = conn.redirects;
        let request = conn.into_request();
        let options = request.options().clone();

        if options.follow_redirects == 0 || redirects >= options.follow_redirects {
            self.failed.push(FailedRequest { request, error: RequestError::TooManyRedirects });
            return;
        }

        let resolved = resolve_redirect(request.url(), &location);
        let new_url = match mithril_url::parse_url(&resolved) {
            Ok(u) => u,
            Err(_) => {
                self.failed.push(FailedRequest { request, error: RequestError::RedirectError });
                return;
            }
        };

        let redirected = request.with_url(new_url);
        self.add_redirected(redirected, redirects + 1);
    }

    /// Drains requests whose per-request `start_time` + `timeout` has
    /// elapsed (refreshed on each redirect, since `add_redirected` resets
    /// `started_at`).
    fn check_request_timeouts(&mut self) {
        let mut timed_out = Vec::new();
        for (token, entry) in self.connections.iter() {
            let timeout = entry.conn.request.options().timeout;
            if timeout.is_zero() {
                continue;
            }
            if entry.conn.started_at.elapsed() >= timeout {
                timed_out.push(*token);
            }
        }
        for token in timed_out {
            if let Some(entry) = self.connections.remove(&token) {
                let _ = self.poll.registry().deregister(entry.conn.socket_ref());
                self.failed.push(FailedRequest { request: entry.conn.into_request(), error: RequestError::TimedOut });
            }
        }
    }

    /// Drains and returns every response completed since the last call.
    pub fn ready_responses(&mut self) -> Vec<CompleteResponse> {
        std::mem::take(&mut self.ready)
    }

    /// Drains and returns every request that failed since the last call.
    pub fn failed_requests(&mut self) -> Vec<FailedRequest> {
        std::mem::take(&mut self.failed)
    }
}

enum FinishedKind {
    Done(CompleteResponse),
    Redirect(String),
    Failed(RequestError),
}

/// Resolves a `Location` header value against the URL that produced it:
/// absolute locations are used as-is; `//host/path` is scheme-relative;
/// `/path` is root-relative; anything else is resolved against the
/// current path's directory.
fn resolve_redirect(current: &mithril_url::Url, location: &str) -> String {
    if location.starts_with("http://") || location.starts_with("https://") {
        return location.to_string();
    }
    if let Some(rest) = location.strip_prefix("//") {
        return format!("{}://{}", current.scheme, rest);
    }
    if location.starts_with('/') {
        let port = if current.port.is_empty() { String::new() } else { format!(":{}", current.port) };
        return format!("{}://{}{}{}", current.scheme, current.host, port, location);
    }
    let base_dir = match current.path.rfind('/') {
        Some(idx) => &current.path[..=idx],
        None => "/",
    };
    let port = if current.port.is_empty() { String::new() } else { format!(":{}", current.port) };
    format!("{}://{}{}{}{}", current.scheme, current.host, port, base_dir, location)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> mithril_url::Url {
        mithril_url::parse_url(s).unwrap()
    }

    #[test]
    fn resolves_absolute_redirect() {
        assert_eq!(resolve_redirect(&url("http://a.com/x"), "http://b.com/y"), "http://b.com/y");
    }

    #[test]
    fn resolves_root_relative_redirect() {
        assert_eq!(resolve_redirect(&url("http://a.com/x/y"), "/z"), "http://a.com/z");
    }

    #[test]
    fn resolves_protocol_relative_redirect() {
        assert_eq!(resolve_redirect(&url("https://a.com/x"), "//b.com/y"), "https://b.com/y");
    }

    #[test]
    fn resolves_relative_redirect_against_current_directory() {
        assert_eq!(resolve_redirect(&url("http://a.com/dir/x"), "y"), "http://a.com/dir/y");
    }
}
