//! A non-blocking HTTP/1.1 client driven by a single readiness-multiplexed
//! event loop (`mio`), the way `RequestExecutor` drives many concurrent
//! connections on one thread without handing control to an async runtime.
//!
//! The executor is intentionally single-threaded and cooperative: one
//! caller owns it, calls [`RequestExecutor::process_connections`] in a
//! loop, and drains [`RequestExecutor::ready_responses`] /
//! [`RequestExecutor::failed_requests`] between iterations.

mod connection;
mod error;
mod executor;
mod request;
mod response;

pub use error::{Error, RequestError};
pub use executor::RequestExecutor;
pub use request::{Method, Request, RequestOptions};
pub use response::{CompleteResponse, FailedRequest, ResponseHeader};
