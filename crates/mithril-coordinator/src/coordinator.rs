//! `QueryCoordinator`: fans a query out across per-host query managers
//! over TCP and merges their shard-local top-K lists into a single global
//! top-K, per spec.md §4.10. Grounded on
//! `examples/original_source/query/src/QueryCoordinator.{h,cpp}`'s config
//! file format (a header line, then one `ip port` line per shard) and
//! `network.cpp`'s raw-socket client/`handle_worker_response`'s
//! one-thread-per-shard fan-out; `QueryCoordinator.cpp`'s own
//! `send_query_to_workers` only prints results, this rewrites that stage
//! into an actual k-way score merge.

use std::io::BufReader;
use std::net::TcpStream;
use std::path::Path;
use std::time::Duration;

use crate::error::CoordinatorError;
use crate::rpc::{self, ShardHit};

const GLOBAL_TOP_K: usize = 50;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardAddress {
    pub host: String,
    pub port: u16,
}

/// Cross-host query fan-out over a static list of shard addresses.
pub struct QueryCoordinator {
    shards: Vec<ShardAddress>,
}

impl QueryCoordinator {
    pub fn new(shards: Vec<ShardAddress>) -> Self {
        QueryCoordinator { shards }
    }

    /// Parses a shard config file: the first line is a header (skipped,
    /// per `QueryCoordinator`'s constructor), every following non-empty
    /// line is `<ip> <port>`.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, CoordinatorError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| CoordinatorError::Io { what: path.display().to_string(), source })?;

        let mut lines = contents.lines();
        lines.next(); // header

        let mut shards = Vec::new();
        for line in lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let (Some(host), Some(port_str)) = (parts.next(), parts.next()) else {
                return Err(CoordinatorError::InvalidConfig { path: path.display().to_string(), reason: format!("malformed shard line: {line:?}") });
            };
            let port: u16 = port_str.parse().map_err(|_| CoordinatorError::InvalidConfig { path: path.display().to_string(), reason: format!("invalid port: {port_str:?}") })?;
            shards.push(ShardAddress { host: host.to_string(), port });
        }

        if shards.is_empty() {
            return Err(CoordinatorError::InvalidConfig { path: path.display().to_string(), reason: "no shard addresses found".to_string() });
        }

        Ok(QueryCoordinator { shards })
    }

    /// Sends `query` to every shard on its own thread, then merges all
    /// responses into a single global top-K sorted by descending score
    /// then ascending doc id (spec.md §5's ordering guarantee and §8 test
    /// 5: cross-shard scores are never summed, only sorted).
    pub fn answer_query(&self, query: &str) -> Vec<ShardHit> {
        let handles: Vec<_> = self
            .shards
            .iter()
            .cloned()
            .map(|shard| {
                let query = query.to_string();
                std::thread::spawn(move || query_shard(&shard, &query))
            })
            .collect();

        let mut merged = Vec::new();
        for handle in handles {
            match handle.join() {
                Ok(Ok(hits)) => merged.extend(hits),
                Ok(Err(err)) => tracing::warn!(error = %err, "shard query failed"),
                Err(_) => tracing::warn!("shard query thread panicked"),
            }
        }

        merged.sort_by(|a, b| b.score.cmp(&a.score).then(a.doc_id.cmp(&b.doc_id)));
        merged.truncate(GLOBAL_TOP_K);
        merged
    }
}

fn query_shard(shard: &ShardAddress, query: &str) -> Result<Vec<ShardHit>, CoordinatorError> {
    let addr = format!("{}:{}", shard.host, shard.port);
    let addrs: Vec<_> = std::net::ToSocketAddrs::to_socket_addrs(&addr)
        .map_err(|source| CoordinatorError::Io { what: addr.clone(), source })?
        .collect();
    let socket_addr = addrs.first().ok_or_else(|| CoordinatorError::InvalidConfig { path: addr.clone(), reason: "could not resolve shard address".to_string() })?;

    let mut stream = TcpStream::connect_timeout(socket_addr, CONNECT_TIMEOUT).map_err(|source| CoordinatorError::Io { what: addr.clone(), source })?;
    rpc::write_request(&mut stream, query).map_err(|source| CoordinatorError::Io { what: addr.clone(), source })?;

    let mut reader = BufReader::new(stream);
    rpc::read_response(&mut reader)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_shard_config_file() {
        let dir = std::env::temp_dir().join(format!("mithril-coordinator-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("shards.conf");
        std::fs::write(&path, "host port\n10.0.0.1 9001\n10.0.0.2 9002\n\n").unwrap();

        let coordinator = QueryCoordinator::from_config_file(&path).unwrap();
        assert_eq!(coordinator.shards, vec![ShardAddress { host: "10.0.0.1".to_string(), port: 9001 }, ShardAddress { host: "10.0.0.2".to_string(), port: 9002 }]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn rejects_empty_config() {
        let dir = std::env::temp_dir().join(format!("mithril-coordinator-config-empty-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("shards.conf");
        std::fs::write(&path, "header\n").unwrap();
        assert!(QueryCoordinator::from_config_file(&path).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn merges_by_shard_local_score_without_summing() {
        let shard_a = vec![ShardHit { doc_id: 7, score: 900, url: "http://a/".to_string(), title_words: vec![] }, ShardHit { doc_id: 3, score: 500, url: "http://c/".to_string(), title_words: vec![] }];
        let shard_b = vec![ShardHit { doc_id: 12, score: 800, url: "http://b/".to_string(), title_words: vec![] }, ShardHit { doc_id: 3, score: 400, url: "http://c2/".to_string(), title_words: vec![] }];

        let mut merged: Vec<ShardHit> = shard_a.into_iter().chain(shard_b).collect();
        merged.sort_by(|a, b| b.score.cmp(&a.score).then(a.doc_id.cmp(&b.doc_id)));

        let doc_ids: Vec<u32> = merged.iter().map(|h| h.doc_id).collect();
        assert_eq!(doc_ids, vec![7, 12, 3, 3]);
        assert_eq!(merged[2].score, 500);
    }
}
