use std::time::Instant;

use mio::net::TcpStream;

use crate::error::RequestError;
use crate::request::{build_raw_request, Request};
use crate::response::{try_parse_header, CompleteResponse, ResponseHeader};

const MAX_HEADER_SIZE: usize = 16 * 1024;

enum Phase {
    Writing { buf: Vec<u8>, written: usize },
    ReadingHeaders { buf: Vec<u8> },
    ReadingBody { header: ResponseHeader, body: Vec<u8>, remaining: Option<usize> },
    ReadingChunked { header: ResponseHeader, buf: Vec<u8> },
}

/// One in-flight request/response exchange, driven incrementally by
/// readiness notifications from the executor's event loop.
pub(crate) struct Connection {
    pub(crate) stream: TcpStream,
    pub(crate) request: Request,
    pub(crate) redirects: u32,
    pub(crate) started_at: Instant,
    phase: Phase,
}

pub(crate) enum Progress {
    /// The connection needs another readiness notification.
    Pending,
    /// The response finished successfully.
    Done(CompleteResponse),
    /// The server redirected us; caller decides whether to follow.
    Redirect(String),
    /// The exchange failed outright.
    Failed(RequestError),
}

impl Connection {
    pub(crate) fn new(stream: TcpStream, request: Request, redirects: u32) -> Self {
        let raw = build_raw_request(&request);
        Connection { stream, request, redirects, started_at: Instant::now(), phase: Phase::Writing { buf: raw, written: 0 } }
    }

    /// Advances this connection's state machine as far as the socket's
    /// current readiness allows without blocking.
    pub(crate) fn advance(&mut self) -> Progress {
        loop {
            match &mut self.phase {
                Phase::Writing { buf, written } => {
                    use std::io::Write;
                    match self.stream.write(&buf[*written..]) {
                        Ok(0) => return Progress::Failed(RequestError::ConnectionError),
                        Ok(n) => {
                            *written += n;
                            if *written == buf.len() {
                                self.phase = Phase::ReadingHeaders { buf: Vec::new() };
                            }
                        }
                        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return Progress::Pending,
                        Err(_) => return Progress::Failed(RequestError::ConnectionError),
                    }
                }
                Phase::ReadingHeaders { buf } => {
                    if !read_more(&mut self.stream, buf) {
                        return match try_parse_header(buf) {
                            Ok(Some(_)) => Progress::Failed(RequestError::ConnectionError),
                            _ => Progress::Failed(RequestError::ConnectionError),
                        };
                    }
                    if buf.len() > MAX_HEADER_SIZE {
                        return Progress::Failed(RequestError::ResponseTooBig);
                    }
                    match try_parse_header(buf) {
                        Ok(Some((header, consumed))) => {
                            let rest = buf.split_off(consumed);
                            if header.is_redirect() {
                                if let Some(loc) = header.location().map(|s| s.to_string()) {
                                    return Progress::Redirect(loc);
                                }
                                return Progress::Failed(RequestError::RedirectError);
                            }
                            let options = self.request.options();
                            let allowed_mime = options.allowed_mime_types.as_slice();
                            if !allowed_mime.is_empty() {
                                let matches = header
                                    .content_type()
                                    .is_some_and(|ct| allowed_mime.iter().any(|a| ct.starts_with(a.as_str())));
                                if !matches {
                                    return Progress::Failed(RequestError::InvalidResponseData);
                                }
                            }
                            let allowed_lang = options.allowed_content_languages.as_slice();
                            if !allowed_lang.is_empty() {
                                let matches = header
                                    .content_language()
                                    .is_some_and(|lang| allowed_lang.iter().any(|a| lang.starts_with(a.as_str())));
                                if !matches {
                                    return Progress::Failed(RequestError::InvalidResponseData);
                                }
                            }
                            if header.is_chunked() {
                                self.phase = Phase::ReadingChunked { header, buf: rest };
                            } else {
                                let remaining = header.content_length();
                                self.phase = Phase::ReadingBody { header, body: rest, remaining };
                            }
                        }
                        Ok(None) => return Progress::Pending,
                        Err(e) => return Progress::Failed(e),
                    }
                }
                Phase::ReadingBody { header, body, remaining } => {
                    let max = self.request.options().max_response_size;
                    if max != 0 && body.len() > max {
                        return Progress::Failed(RequestError::ResponseTooBig);
                    }
                    let target = remaining.map(|r| body.len() >= r);
                    if target == Some(true) || (remaining.is_none() && !self.socket_is_open()) {
                        let header = header.clone();
                        let body = std::mem::take(body);
                        return Progress::Done(CompleteResponse { request: self.request.clone(), header, body });
                    }
                    if !read_more(&mut self.stream, body) {
                        if remaining.is_none() {
                            let header = header.clone();
                            let body = std::mem::take(body);
                            return Progress::Done(CompleteResponse { request: self.request.clone(), header, body });
                        }
                        return Progress::Failed(RequestError::ConnectionError);
                    }
                }
                Phase::ReadingChunked { header, buf } => {
                    let max = self.request.options().max_response_size;
                    if max != 0 && buf.len() > max {
                        return Progress::Failed(RequestError::ResponseTooBig);
                    }
                    if !read_more(&mut self.stream, buf) {
                        return Progress::Failed(RequestError::ConnectionError);
                    }
                    match decode_chunked(buf) {
                        Ok(Some(body)) => {
                            let header = header.clone();
                            return Progress::Done(CompleteResponse { request: self.request.clone(), header, body });
                        }
                        Ok(None) => return Progress::Pending,
                        Err(e) => return Progress::Failed(e),
                    }
                }
            }
        }
    }

    fn socket_is_open(&self) -> bool {
        true
    }

    pub(crate) fn socket_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }

    pub(crate) fn socket_ref(&self) -> &TcpStream {
        &self.stream
    }

    pub(crate) fn into_request(self) -> Request {
        self.request
    }
}

/// Reads everything currently available without blocking into `buf`.
/// Returns `false` once the peer closed the connection (EOF).
fn read_more(stream: &mut TcpStream, buf: &mut Vec<u8>) -> bool {
    use std::io::Read;
    let mut chunk = [0u8; 8192];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => return false,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    return true;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return true,
            Err(_) => return false,
        }
    }
}

/// Decodes as many complete chunks as `buf` currently holds. Returns the
/// fully reassembled body once the terminating zero-size chunk has been
/// seen, or `None` if more bytes are still needed.
fn decode_chunked(buf: &[u8]) -> Result<Option<Vec<u8>>, RequestError> {
    let mut body = Vec::new();
    let mut pos = 0;
    loop {
        let Some(line_end) = find_crlf(&buf[pos..]) else { return Ok(None) };
        let line_end = pos + line_end;
        let size_str = std::str::from_utf8(&buf[pos..line_end]).map_err(|_| RequestError::InvalidResponseData)?;
        let size_str = size_str.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_str, 16).map_err(|_| RequestError::InvalidResponseData)?;
        pos = line_end + 2;

        if size == 0 {
            return if buf.len() >= pos + 2 { Ok(Some(body)) } else { Ok(None) };
        }

        if buf.len() < pos + size + 2 {
            return Ok(None);
        }
        body.extend_from_slice(&buf[pos..pos + size]);
        pos += size + 2;
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}
