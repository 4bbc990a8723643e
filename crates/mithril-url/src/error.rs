use thiserror::Error;

/// Reasons a candidate string fails to parse as an [`Url`](crate::Url).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing or invalid scheme")]
    MissingScheme,
    #[error("unsupported scheme `{0}`, only http and https are accepted")]
    UnsupportedScheme(String),
    #[error("missing authority component (expected `//` after the scheme)")]
    MissingAuthority,
    #[error("IPv6 literal hosts are not supported")]
    Ipv6NotSupported,
    #[error("empty host")]
    EmptyHost,
    #[error("invalid host `{0}`")]
    InvalidHost(String),
    #[error("empty port")]
    EmptyPort,
    #[error("non-numeric port `{0}`")]
    NonNumericPort(String),
    #[error("port `{0}` out of range")]
    PortOutOfRange(String),
}
