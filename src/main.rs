use clap::Parser;
use krates::bench::{self, BenchConfig, CorpusSpec};
use krates::cache::SOLVER_VERSION;
use krates::solver::DEFAULT_MAX_NODES;
use std::path::PathBuf;

fn parse_corpus_spec(s: &str) -> Result<CorpusSpec, String> {
    let Some((label, path)) = s.split_once(':') else {
        return Err(format!("expected <label>:<path>, got '{}'", s));
    };
    if label.is_empty() || path.is_empty() {
        return Err(format!("expected <label>:<path>, got '{}'", s));
    }
    Ok(CorpusSpec {
        label: label.to_string(),
        path: PathBuf::from(path),
    })
}

#[derive(Parser)]
#[command(name = "krates")]
#[command(about = "Batch Sokoban solver with a persistent solution cache", long_about = None)]
struct Args {
    /// Corpus to benchmark, as <label>:<path> (repeatable)
    #[arg(long = "corpus", value_parser = parse_corpus_spec)]
    corpus: Vec<CorpusSpec>,

    /// Solution cache file
    #[arg(long, default_value = "./solution-cache.json")]
    cache: PathBuf,

    /// Optional lite projection (digest -> move string, solved only)
    #[arg(long)]
    lite: Option<PathBuf>,

    /// Solver node budget per puzzle
    #[arg(long, default_value_t = DEFAULT_MAX_NODES)]
    max_nodes: u64,

    /// Solver version tag; change it to invalidate cached results
    #[arg(long, default_value = SOLVER_VERSION)]
    version: String,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = BenchConfig {
        corpora: args.corpus,
        cache_path: args.cache,
        lite_path: args.lite,
        max_nodes: args.max_nodes,
        version: args.version,
    };

    if let Err(err) = bench::run(&config) {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
