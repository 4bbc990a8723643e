use thiserror::Error;

/// Why a request failed to complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    ConnectionError,
    InvalidResponseData,
    RedirectError,
    TooManyRedirects,
    TimedOut,
    ResponseTooBig,
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RequestError::ConnectionError => "connection error",
            RequestError::InvalidResponseData => "invalid response data",
            RequestError::RedirectError => "invalid redirect",
            RequestError::TooManyRedirects => "too many redirects",
            RequestError::TimedOut => "timed out",
            RequestError::ResponseTooBig => "response too big",
        };
        f.write_str(s)
    }
}

/// Internal/fatal errors surfaced by the executor itself, distinct from
/// per-request failures which are reported via [`crate::FailedRequest`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to create poll instance: {0}")]
    Poll(#[source] std::io::Error),
    #[error("failed to register connection: {0}")]
    Register(#[source] std::io::Error),
    #[error("poll wait failed: {0}")]
    Wait(#[source] std::io::Error),
}
