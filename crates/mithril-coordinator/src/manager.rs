//! `QueryManager`: serves queries against every shard on one host, per
//! spec.md §4.9 and §5's "Query (single host)" concurrency model. Grounded
//! on `examples/original_source/query/src/QueryManager.{h,cpp}`'s
//! mutex + two-condvar broadcast rendezvous (`worker_cv_`/`main_cv_`,
//! `query_available_[k]` flags, `worker_completion_count_`), re-expressed
//! with `parking_lot` in place of `std::condition_variable` the way
//! `mithril-crawler`'s frontier/queue already do.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};

use mithril_index::IndexReader;
use mithril_query::{collect_terms, compile, parse_query};
use mithril_rank::{Ranker, RankerWeights};

use crate::error::CoordinatorError;
use crate::rpc::ShardHit;

const LOCAL_TOP_K: usize = 50;

/// Shared rendezvous state `AnswerQuery` and every worker thread
/// coordinate through, mirroring `QueryManager`'s own fields one for one.
struct Shared {
    current_query: Mutex<Option<String>>,
    query_available: Mutex<Vec<bool>>,
    worker_completion_count: Mutex<usize>,
    marginal_results: Mutex<Vec<Vec<ShardHit>>>,
    worker_cv: Condvar,
    main_cv: Condvar,
    stop: AtomicBool,
}

/// One worker thread per shard, each owning a dedicated [`IndexReader`] +
/// [`Ranker`] pair (spec.md §4.9: "one index shard per worker thread on
/// one host").
pub struct QueryManager {
    shared: Arc<Shared>,
    threads: Vec<JoinHandle<()>>,
}

impl QueryManager {
    /// Spawns one worker thread per entry in `shard_dirs`, each opening
    /// its own [`IndexReader`] over that directory. `weights` is shared
    /// across every shard's [`Ranker`].
    pub fn new(shard_dirs: Vec<PathBuf>, weights: RankerWeights) -> Result<Self, CoordinatorError> {
        let num_workers = shard_dirs.len();
        let shared = Arc::new(Shared {
            current_query: Mutex::new(None),
            query_available: Mutex::new(vec![false; num_workers]),
            worker_completion_count: Mutex::new(0),
            marginal_results: Mutex::new(vec![Vec::new(); num_workers]),
            worker_cv: Condvar::new(),
            main_cv: Condvar::new(),
            stop: AtomicBool::new(false),
        });

        let mut threads = Vec::with_capacity(num_workers);
        for (worker_id, dir) in shard_dirs.into_iter().enumerate() {
            let reader = IndexReader::open(&dir)?;
            let ranker = Ranker::new(&reader, weights, None);
            let shared = Arc::clone(&shared);
            threads.push(std::thread::spawn(move || worker_loop(worker_id, reader, ranker, shared)));
        }

        Ok(QueryManager { shared, threads })
    }

    /// `AnswerQuery`: broadcasts `query` to every worker, waits for all to
    /// finish, and merges their local top-50 lists sorted by descending
    /// score (spec.md §4.9).
    pub fn answer_query(&self, query: &str) -> Vec<ShardHit> {
        let num_workers = self.threads.len();
        {
            *self.shared.current_query.lock() = Some(query.to_string());
            *self.shared.worker_completion_count.lock() = 0;
            for result in self.shared.marginal_results.lock().iter_mut() {
                result.clear();
            }
            let mut flags = self.shared.query_available.lock();
            flags.iter_mut().for_each(|f| *f = true);
            self.shared.worker_cv.notify_all();
        }

        {
            let mut completed = self.shared.worker_completion_count.lock();
            while *completed < num_workers {
                self.shared.main_cv.wait(&mut completed);
            }
        }

        let mut merged: Vec<ShardHit> = self.shared.marginal_results.lock().iter().flatten().cloned().collect();
        merged.sort_by(|a, b| b.score.cmp(&a.score).then(a.doc_id.cmp(&b.doc_id)));
        merged.truncate(LOCAL_TOP_K);
        merged
    }
}

impl Drop for QueryManager {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::SeqCst);
        self.shared.worker_cv.notify_all();
        for thread in self.threads.drain(..) {
            let _ = thread.join();
        }
    }
}

fn worker_loop(worker_id: usize, reader: IndexReader, ranker: Ranker, shared: Arc<Shared>) {
    loop {
        let query_text = {
            let mut flags = shared.query_available.lock();
            loop {
                if shared.stop.load(Ordering::SeqCst) {
                    return;
                }
                if flags[worker_id] {
                    break;
                }
                shared.worker_cv.wait(&mut flags);
            }
            shared.current_query.lock().clone()
        };

        let Some(query_text) = query_text else { continue };
        let result = evaluate(&reader, &ranker, &query_text);

        {
            shared.marginal_results.lock()[worker_id] = result;
            let mut completed = shared.worker_completion_count.lock();
            *completed += 1;
            if *completed == shared.query_available.lock().len() {
                shared.main_cv.notify_one();
            }
        }
        shared.query_available.lock()[worker_id] = false;
    }
}

/// Parses `query_text`, compiles it to an ISR over `reader`, walks every
/// matching document, ranks it, and keeps the local top-50 (spec.md
/// §4.9's per-shard worker contract). A parse error yields an empty
/// result rather than propagating (spec.md §4.11: "item dropped").
fn evaluate(reader: &IndexReader, ranker: &Ranker, query_text: &str) -> Vec<ShardHit> {
    let node = match parse_query(query_text) {
        Ok(node) => node,
        Err(err) => {
            tracing::warn!(query = query_text, error = %err, "failed to parse query");
            return Vec::new();
        }
    };
    let terms = collect_terms(&node);
    let mut isr = compile(&node, reader);

    let mut hits = Vec::new();
    while isr.has_next() {
        let Some(doc_id) = isr.current_doc() else { break };
        if let Some(score) = ranker.score(reader, &terms, doc_id) {
            if let Some(record) = reader.documents().get(doc_id) {
                let title_words: Vec<String> = record.title.split_whitespace().map(str::to_string).collect();
                hits.push(ShardHit { doc_id, score, url: record.url, title_words });
            }
        }
        isr.next_doc();
    }

    hits.sort_by(|a, b| b.score.cmp(&a.score).then(a.doc_id.cmp(&b.doc_id)));
    hits.truncate(LOCAL_TOP_K);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use mithril_crawler::Document;
    use mithril_index::{IndexBuilder, IndexBuilderConfig};

    fn build_shard(name: &str, docs: &[Document]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mithril-coordinator-manager-test-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut builder = IndexBuilder::new(IndexBuilderConfig { output_dir: dir.clone(), ..Default::default() });
        for d in docs {
            builder.add_document(d).unwrap();
        }
        builder.finalize().unwrap();
        dir
    }

    #[test]
    fn answers_query_across_shards() {
        let shard_a = build_shard("a", &[Document { id: 0, url: "http://a.test/cat".to_string(), title: vec!["cat".to_string()], description: vec![], words: vec!["cat".to_string(), "dog".to_string()], forward_links: vec![] }]);
        let shard_b = build_shard("b", &[Document { id: 1, url: "http://b.test/other".to_string(), title: vec![], description: vec![], words: vec!["other".to_string()], forward_links: vec![] }]);

        let manager = QueryManager::new(vec![shard_a.clone(), shard_b.clone()], RankerWeights::default()).unwrap();
        let hits = manager.answer_query("cat");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, 0);

        drop(manager);
        std::fs::remove_dir_all(&shard_a).ok();
        std::fs::remove_dir_all(&shard_b).ok();
    }

    #[test]
    fn unparseable_query_returns_no_hits() {
        let shard = build_shard("bad", &[Document { id: 0, url: "http://a.test/".to_string(), title: vec![], description: vec![], words: vec!["a".to_string()], forward_links: vec![] }]);
        let manager = QueryManager::new(vec![shard.clone()], RankerWeights::default()).unwrap();
        assert!(manager.answer_query("((").is_empty());
        drop(manager);
        std::fs::remove_dir_all(&shard).ok();
    }
}
