use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::collections::HashSet;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use trawler::api::{serve, AppState};
use trawler::search::{self, snippet, DenseStore, QueryMode, Searcher};
use trawler::{Index, Tokenizer, TokenizerConfig};

const REPL_RESULTS: usize = 10;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AnalyzerKind {
    Basic,
    Enriched,
}

#[derive(Parser)]
#[command(name = "trawler-search")]
#[command(about = "Query a built index: batch file, interactive REPL, or HTTP server", long_about = None)]
struct Args {
    /// Batch query file of `query_id <TAB> query_text` lines; omit for the
    /// REPL
    queries: Option<PathBuf>,

    /// Run the HTTP server instead, optionally on a specific port
    #[arg(long, value_name = "PORT", num_args = 0..=1, default_missing_value = "8080")]
    server: Option<u16>,

    /// Directory holding the index files
    #[arg(long, env = "TRAWLER_INDEX_DIR", default_value = "index")]
    index_dir: PathBuf,

    /// Analyzer variant; must match the one the index was built with
    #[arg(long, value_enum, default_value_t = AnalyzerKind::Enriched)]
    analyzer: AnalyzerKind,

    /// Batch output file; defaults to `<queries-stem>_results.txt`
    #[arg(long)]
    output: Option<PathBuf>,

    /// Directory of dense embedding tables; enables hybrid batch mode
    #[arg(long, requires = "dense_variant")]
    dense_dir: Option<PathBuf>,

    /// Embedding-table variant name, e.g. `base`
    #[arg(long, requires = "dense_dir")]
    dense_variant: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let tokenizer_config = match args.analyzer {
        AnalyzerKind::Basic => TokenizerConfig::basic(),
        AnalyzerKind::Enriched => TokenizerConfig::enriched(),
    };
    let tokenizer = Tokenizer::new(&tokenizer_config);
    let index = Index::open(&args.index_dir)?;

    if let Some(port) = args.server {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        return Ok(runtime.block_on(serve(AppState { index, tokenizer }, port))?);
    }

    match &args.queries {
        Some(queries) => run_batch_mode(&args, &index, &tokenizer, queries),
        None => run_repl(&index, &tokenizer),
    }
}

fn run_batch_mode(
    args: &Args,
    index: &Index,
    tokenizer: &Tokenizer,
    queries: &PathBuf,
) -> Result<()> {
    match (&args.dense_dir, &args.dense_variant) {
        (Some(dense_dir), Some(variant)) => {
            let dense = DenseStore::open(dense_dir, variant)?;
            let run_tag = format!("hybrid_{}", variant);
            let output = args
                .output
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("{}_results.txt", run_tag)));
            let count =
                search::run_hybrid_batch(index, tokenizer, &dense, queries, &output, &run_tag)?;
            info!(queries = count, "hybrid batch done");
        }
        _ => {
            let output = args.output.clone().unwrap_or_else(|| {
                let stem = queries
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "queries".to_string());
                PathBuf::from(format!("{}_results.txt", stem))
            });
            let count = search::run_batch(index, tokenizer, queries, &output)?;
            info!(queries = count, "batch done");
        }
    }
    Ok(())
}

fn run_repl(index: &Index, tokenizer: &Tokenizer) -> Result<()> {
    let searcher = Searcher::new(index);
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    println!("Search engine ready. Type 'quit' to exit.");
    println!("Prefix queries with 'AND:' for conjunctive, 'OR:' for disjunctive (default).\n");

    loop {
        print!("Query> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }

        let (mode, query) = if let Some(rest) = line.strip_prefix("AND:") {
            (QueryMode::And, rest)
        } else if let Some(rest) = line.strip_prefix("OR:") {
            (QueryMode::Or, rest)
        } else {
            (QueryMode::Or, line)
        };

        let terms = tokenizer.tokenize(query);
        if terms.is_empty() {
            continue;
        }

        let start = Instant::now();
        let scored = searcher.search(&terms, mode)?;
        let term_set: HashSet<String> = terms.iter().cloned().collect();

        let shown = scored.len().min(REPL_RESULTS);
        let mut rendered = Vec::with_capacity(shown);
        for hit in &scored[..shown] {
            let text = index.fetch_document(hit.doc_id)?;
            rendered.push(snippet::generate(&text, &term_set, snippet::ansi_mark));
        }
        let elapsed_ms = start.elapsed().as_secs_f64() * 1_000.0;

        println!("\nTop {} results:", shown);
        for (i, hit) in scored[..shown].iter().enumerate() {
            println!("{}. DocID: {} (score: {})", i + 1, hit.doc_id, hit.score);
            println!("Snippet: {}", rendered[i]);
        }
        println!("--------------------------------------------------");
        println!("Total found: {} documents", scored.len());
        println!("Search time: {:.3} ms\n", elapsed_ms);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }
}
