/// A parsed HTTP response header plus the body bytes read so far.
#[derive(Debug, Clone)]
pub struct ResponseHeader {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl ResponseHeader {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn content_language(&self) -> Option<&str> {
        self.header("content-language")
    }

    pub fn content_length(&self) -> Option<usize> {
        self.header("content-length").and_then(|v| v.trim().parse().ok())
    }

    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }

    pub fn is_chunked(&self) -> bool {
        self.header("transfer-encoding").is_some_and(|v| v.eq_ignore_ascii_case("chunked"))
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }
}

use crate::request::Request;

/// A fully received HTTP response.
#[derive(Debug, Clone)]
pub struct CompleteResponse {
    pub request: Request,
    pub header: ResponseHeader,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct FailedRequest {
    pub request: Request,
    pub error: crate::error::RequestError,
}

/// Parses the header block of an HTTP/1.1 response using `httparse`.
/// Returns `Some((header, header_len))` once the full header block (up to
/// the blank line) has been received; `None` means more bytes are needed.
pub fn try_parse_header(buf: &[u8]) -> Result<Option<(ResponseHeader, usize)>, crate::error::RequestError> {
    let mut headers = [httparse::EMPTY_HEADER; 64];
    let mut res = httparse::Response::new(&mut headers);
    match res.parse(buf) {
        Ok(httparse::Status::Complete(header_len)) => {
            let status = res.code.ok_or(crate::error::RequestError::InvalidResponseData)?;
            let headers = res
                .headers
                .iter()
                .map(|h| (h.name.to_string(), String::from_utf8_lossy(h.value).into_owned()))
                .collect();
            Ok(Some((ResponseHeader { status, headers }, header_len)))
        }
        Ok(httparse::Status::Partial) => Ok(None),
        Err(_) => Err(crate::error::RequestError::InvalidResponseData),
    }
}
