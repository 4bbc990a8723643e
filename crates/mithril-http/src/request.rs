use mithril_url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
        }
    }
}

/// Per-request policy knobs. A zero value (or empty list) disables the
/// corresponding check, per spec.md §4.3.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub follow_redirects: u32,
    pub timeout: std::time::Duration,
    pub max_response_size: usize,
    pub allowed_mime_types: Vec<String>,
    pub allowed_content_languages: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    options: RequestOptions,
}

impl Request {
    pub fn new(method: Method, url: Url, options: RequestOptions) -> Self {
        Request { method, url, options }
    }

    pub fn get(url: Url, options: RequestOptions) -> Self {
        Request { method: Method::Get, url, options }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    /// Re-targets this request at a new URL, used when following a redirect.
    pub fn with_url(&self, url: Url) -> Self {
        Request { method: self.method, url, options: self.options.clone() }
    }
}

/// Builds the raw HTTP/1.1 request line + headers to write to the wire.
pub fn build_raw_request(req: &Request) -> Vec<u8> {
    let url = req.url();
    let path = if url.path.is_empty() { "/" } else { url.path.as_str() };
    let mut raw = format!(
        "{} {} HTTP/1.1\r\nHost: {}\r\nUser-Agent: mithril-crawler/1.0\r\nAccept: */*\r\nAccept-Encoding: identity\r\nConnection: close\r\n",
        req.method().as_str(),
        path,
        url.host,
    );
    raw.push_str("\r\n");
    raw.into_bytes()
}
