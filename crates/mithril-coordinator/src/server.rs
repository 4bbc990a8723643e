//! The worker side of the shard RPC: a TCP listener that answers one
//! query per connection against a local [`QueryManager`], the server
//! counterpart to [`crate::coordinator::QueryCoordinator`]'s client.
//! Grounded on `examples/original_source/query/src/network.cpp`'s
//! `create_server_sockfd` (bind + listen, `SO_REUSEADDR`, OS-chosen port
//! when `0` is passed) re-expressed over `std::net::TcpListener` — a
//! thread-per-connection model rather than the original's loop over a
//! single accepted `connectionfd`, since `QueryManager` itself is already
//! `Send + Sync` and safely shared across connections.

use std::io::BufReader;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;

use crate::error::CoordinatorError;
use crate::manager::QueryManager;
use crate::rpc;

/// Binds `addr` (`"host:port"`, port `0` lets the OS choose) and serves
/// shard RPC connections against `manager` until the process exits. Each
/// connection is one request/response pair, matching spec.md §6's
/// request-then-response framing (no keep-alive, no pipelining).
pub fn serve(addr: &str, manager: Arc<QueryManager>) -> Result<(), CoordinatorError> {
    let listener = TcpListener::bind(addr).map_err(|source| CoordinatorError::Io { what: addr.to_string(), source })?;
    tracing::info!(addr = %listener.local_addr().map(|a| a.to_string()).unwrap_or_default(), "shard RPC listening");

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let manager = Arc::clone(&manager);
                std::thread::spawn(move || {
                    if let Err(err) = handle_connection(stream, &manager) {
                        tracing::warn!(error = %err, "shard RPC connection failed");
                    }
                });
            }
            Err(err) => tracing::warn!(error = %err, "failed to accept shard RPC connection"),
        }
    }
    Ok(())
}

fn handle_connection(mut stream: TcpStream, manager: &QueryManager) -> Result<(), CoordinatorError> {
    let query = {
        let mut reader = BufReader::new(&mut stream);
        rpc::read_request(&mut reader).map_err(|source| CoordinatorError::Io { what: "shard RPC request".to_string(), source })?
    };
    let hits = manager.answer_query(&query);
    rpc::write_response(&mut stream, &hits)
}
