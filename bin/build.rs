use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::info;

use trawler::{IndexBuilder, IndexConfig, TokenizerConfig};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AnalyzerKind {
    Basic,
    Enriched,
}

#[derive(Parser)]
#[command(name = "trawler-build")]
#[command(about = "Ingest a TSV corpus into sorted posting runs", long_about = None)]
struct Args {
    /// Corpus file of `external_id <TAB> passage_text` lines
    corpus: PathBuf,

    /// Directory for the final index files
    #[arg(long, env = "TRAWLER_INDEX_DIR", default_value = "index")]
    index_dir: PathBuf,

    /// Directory for intermediate sorted runs
    #[arg(long, env = "TRAWLER_RUNS_DIR", default_value = "partial")]
    runs_dir: PathBuf,

    /// Analyzer variant; queries must use the same one
    #[arg(long, value_enum, default_value_t = AnalyzerKind::Enriched)]
    analyzer: AnalyzerKind,

    /// Posting-buffer spill threshold
    #[arg(long, default_value_t = trawler::config::DEFAULT_MAX_BUFFER_POSTINGS)]
    max_buffer_postings: usize,

    /// Optional file of external ids to restrict ingest to
    #[arg(long)]
    subset: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let tokenizer = match args.analyzer {
        AnalyzerKind::Basic => TokenizerConfig::basic(),
        AnalyzerKind::Enriched => TokenizerConfig::enriched(),
    };
    let config = IndexConfig::new(args.index_dir, args.runs_dir)
        .with_tokenizer(tokenizer)
        .with_max_buffer_postings(args.max_buffer_postings);

    info!("Starting trawler-build v{}", trawler::VERSION);

    let mut builder = IndexBuilder::new(config)?;
    if let Some(subset) = &args.subset {
        builder.load_subset(subset)?;
    }
    builder.ingest_corpus(&args.corpus)?;
    let summary = builder.finish()?;

    info!(
        documents = summary.total_documents,
        runs = summary.total_runs,
        skipped = summary.skipped_lines,
        "build complete; run trawler-merge next"
    );
    Ok(())
}
