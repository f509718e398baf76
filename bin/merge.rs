use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use trawler::{index, IndexConfig};

#[derive(Parser)]
#[command(name = "trawler-merge")]
#[command(about = "K-way merge sorted runs into the final compressed index", long_about = None)]
struct Args {
    /// Number of run files produced by trawler-build
    num_runs: u32,

    /// Directory for the final index files
    #[arg(long, env = "TRAWLER_INDEX_DIR", default_value = "index")]
    index_dir: PathBuf,

    /// Directory holding the sorted runs
    #[arg(long, env = "TRAWLER_RUNS_DIR", default_value = "partial")]
    runs_dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let config = IndexConfig::new(args.index_dir, args.runs_dir);

    info!("Starting trawler-merge v{}", trawler::VERSION);

    let summary = index::merge(args.num_runs, &config)?;
    info!(
        terms = summary.total_terms,
        blocks = summary.total_blocks,
        postings = summary.total_postings,
        "merge complete"
    );
    Ok(())
}
