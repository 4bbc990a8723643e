//! `mithril-worker`: serves shard RPC queries against a set of local index
//! shards, per spec.md §4.9. This is the process `mithril-coordinator`'s
//! client half connects to.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use mithril_coordinator::{serve, QueryManager};
use mithril_rank::RankerWeights;

#[derive(Parser)]
#[command(author, version, about = "Serves shard RPC queries against one or more local index shards")]
struct Cli {
    /// Index shard directories served by this worker, one thread each.
    #[arg(long = "shard", required = true)]
    shards: Vec<PathBuf>,

    /// Address to bind the shard RPC listener on.
    #[arg(long, default_value = "0.0.0.0:9000")]
    listen: String,

    /// TOML file overriding the default dynamic ranker weights.
    #[arg(long)]
    weights: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let weights = match &cli.weights {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading ranker weights file {}", path.display()))?;
            toml::from_str::<RankerWeights>(&text).with_context(|| format!("parsing ranker weights file {}", path.display()))?
        }
        None => RankerWeights::default(),
    };

    let manager = Arc::new(QueryManager::new(cli.shards, weights).context("opening index shards")?);
    serve(&cli.listen, manager).context("shard RPC server failed")?;
    Ok(())
}
