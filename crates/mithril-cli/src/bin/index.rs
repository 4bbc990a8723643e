//! `mithril-index`: builds the on-disk inverted index from a crawler
//! document store, per spec.md §4.5/§4.6.

use anyhow::Context;
use clap::Parser;

use mithril_crawler::DocumentReader;
use mithril_index::{IndexBuilder, IndexBuilderConfig};

#[derive(Parser)]
#[command(author, version, about = "Builds an inverted index from a crawled document store")]
struct Cli {
    /// Gzipped document store written by `mithril-crawl`.
    #[arg(long)]
    documents: std::path::PathBuf,

    /// Directory the finished index is written to.
    #[arg(long, default_value = "index")]
    output: std::path::PathBuf,

    /// In-memory bytes per posting block before it's flushed to disk.
    #[arg(long, default_value_t = mithril_index::DEFAULT_BLOCK_SIZE_BYTES)]
    block_size_bytes: usize,

    /// Skip building the phrase-query position index.
    #[arg(long)]
    no_positions: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let reader = DocumentReader::open(&cli.documents).with_context(|| format!("opening document store {}", cli.documents.display()))?;

    let config = IndexBuilderConfig { output_dir: cli.output.clone(), block_size_bytes: cli.block_size_bytes, build_positions: !cli.no_positions };
    let mut builder = IndexBuilder::new(config);

    let mut count = 0u64;
    for doc in reader {
        let doc = doc.context("reading document record")?;
        builder.add_document(&doc).context("indexing document")?;
        count += 1;
        if count % 10_000 == 0 {
            tracing::info!(count, "indexed documents");
        }
    }

    let paths = builder.finalize().context("finalizing index")?;
    tracing::info!(documents = count, dir = %paths.dir.display(), "index build complete");
    Ok(())
}
