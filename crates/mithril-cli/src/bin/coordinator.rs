//! `mithril-coordinator`: the cross-host query front end, per spec.md
//! §4.10. Reads a shard config file and either answers one query given on
//! the command line or serves an interactive read-eval-print loop over
//! stdin.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use mithril_coordinator::QueryCoordinator;

#[derive(Parser)]
#[command(author, version, about = "Fans a query out across shard workers and merges the results")]
struct Cli {
    /// Shard config file: a header line, then one `<host> <port>` line per shard.
    #[arg(long)]
    shards: PathBuf,

    /// Run a single query and exit instead of reading from stdin.
    #[arg(long)]
    query: Option<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let coordinator = QueryCoordinator::from_config_file(&cli.shards).with_context(|| format!("reading shard config {}", cli.shards.display()))?;

    if let Some(query) = cli.query {
        print_hits(&coordinator.answer_query(&query));
        return Ok(());
    }

    let stdin = io::stdin();
    print!("> ");
    io::stdout().flush().ok();
    for line in stdin.lock().lines() {
        let line = line.context("reading query from stdin")?;
        let query = line.trim();
        if !query.is_empty() {
            print_hits(&coordinator.answer_query(query));
        }
        print!("> ");
        io::stdout().flush().ok();
    }
    Ok(())
}

fn print_hits(hits: &[mithril_coordinator::ShardHit]) {
    if hits.is_empty() {
        println!("(no results)");
        return;
    }
    for (rank, hit) in hits.iter().enumerate() {
        println!("{:>3}. [{:>5}] {}", rank + 1, hit.score, hit.url);
    }
}
