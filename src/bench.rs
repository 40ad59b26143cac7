use crate::cache::{CacheEntry, SolutionCache, now_secs};
use crate::level::{Corpus, Level, LevelError};
use crate::solver;
use std::path::PathBuf;
use std::time::Instant;

/// A corpus registration: display label plus puzzle file path.
#[derive(Debug, Clone)]
pub struct CorpusSpec {
    pub label: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub corpora: Vec<CorpusSpec>,
    pub cache_path: PathBuf,
    pub lite_path: Option<PathBuf>,
    pub max_nodes: u64,
    pub version: String,
}

/// Aggregated counters for one corpus or a whole run.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct BenchStats {
    pub total: usize,
    pub solved: usize,
    pub hit_limit: usize,
    pub unsolvable: usize,
    /// Puzzles that failed to parse.
    pub rejected: usize,
    pub cache_hits: usize,
    pub nodes: u64,
    pub time_ms: f64,
    pub solution_moves: u64,
}

impl BenchStats {
    fn record(&mut self, entry: &CacheEntry, from_cache: bool) {
        self.total += 1;
        if entry.solved {
            self.solved += 1;
            self.solution_moves += entry.move_count as u64;
        } else if entry.hit_limit {
            self.hit_limit += 1;
        } else {
            self.unsolvable += 1;
        }
        if from_cache {
            self.cache_hits += 1;
        }
        self.nodes += entry.nodes_explored;
        self.time_ms += entry.time_ms;
    }

    fn merge(&mut self, other: &BenchStats) {
        self.total += other.total;
        self.solved += other.solved;
        self.hit_limit += other.hit_limit;
        self.unsolvable += other.unsolvable;
        self.rejected += other.rejected;
        self.cache_hits += other.cache_hits;
        self.nodes += other.nodes;
        self.time_ms += other.time_ms;
        self.solution_moves += other.solution_moves;
    }

    pub fn avg_nodes(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.nodes as f64 / self.total as f64
        }
    }

    pub fn avg_time_ms(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.time_ms / self.total as f64
        }
    }

    pub fn avg_solution_len(&self) -> f64 {
        if self.solved == 0 {
            0.0
        } else {
            self.solution_moves as f64 / self.solved as f64
        }
    }

    pub fn cache_hit_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total as f64
        }
    }
}

/// Walk one corpus: consult the cache by digest, solve misses, store new
/// entries. Parse failures were already collected during corpus loading;
/// they are logged here with their origin tag and skipped.
pub fn run_corpus(corpus: &Corpus, cache: &mut SolutionCache, config: &BenchConfig) -> BenchStats {
    let mut stats = BenchStats::default();

    for (number, err) in &corpus.rejected {
        log::warn!("skipping {}#{}: {}", corpus.label, number, err);
        stats.rejected += 1;
    }

    for level in &corpus.levels {
        let digest = level.digest();
        if let Some(entry) = cache.lookup(&digest, &config.version) {
            stats.record(entry, true);
        } else {
            let entry = solve_entry(level, config);
            stats.record(&entry, false);
            cache.insert(digest, entry);
        }
    }

    stats
}

fn solve_entry(level: &Level, config: &BenchConfig) -> CacheEntry {
    let start = Instant::now();
    let outcome = solver::solve(level, config.max_nodes);
    let time_ms = start.elapsed().as_secs_f64() * 1000.0;

    log::debug!(
        "{}: solved={} moves={} nodes={} time_ms={:.2}",
        level.origin,
        outcome.solvable,
        outcome.move_count,
        outcome.nodes_explored,
        time_ms
    );

    CacheEntry {
        source_label: level.origin.source.clone(),
        solution: outcome.move_string(),
        solved: outcome.solvable,
        hit_limit: outcome.hit_limit,
        nodes_explored: outcome.nodes_explored,
        time_ms,
        move_count: outcome.move_count,
        cached_at: now_secs(),
        solver_version: config.version.clone(),
    }
}

/// Drive the full benchmark: load the cache once, walk every corpus in
/// order, write the cache (and lite projection) back once at the end.
///
/// Only corpus I/O errors propagate; cache write failures are reported and
/// swallowed because the computed results are already in hand.
pub fn run(config: &BenchConfig) -> Result<BenchStats, LevelError> {
    let mut cache = SolutionCache::load(&config.cache_path);
    let mut overall = BenchStats::default();

    for spec in &config.corpora {
        let corpus = Corpus::from_file(&spec.label, &spec.path)?;
        let stats = run_corpus(&corpus, &mut cache, config);
        print_stats(&spec.label, &stats);
        overall.merge(&stats);
    }

    println!("---");
    print_stats("overall", &overall);

    if let Err(err) = cache.save(&config.cache_path) {
        eprintln!(
            "failed to save cache {}: {}",
            config.cache_path.display(),
            err
        );
    }
    if let Some(lite_path) = &config.lite_path {
        if let Err(err) = cache.save_lite(lite_path) {
            eprintln!("failed to save lite cache {}: {}", lite_path.display(), err);
        }
    }

    Ok(overall)
}

fn print_stats(label: &str, stats: &BenchStats) {
    println!(
        "{:<12}  total: {:<5}  solved: {:<5}  limit: {:<5}  unsolvable: {:<5}  \
         hit_rate: {:<5.2}  avg_nodes: {:<9.0}  avg_ms: {:<8.2}  avg_len: {:.1}",
        label,
        stats.total,
        stats.solved,
        stats.hit_limit,
        stats.unsolvable,
        stats.cache_hit_rate(),
        stats.avg_nodes(),
        stats.avg_time_ms(),
        stats.avg_solution_len(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SOLVER_VERSION;

    fn test_config() -> BenchConfig {
        BenchConfig {
            corpora: vec![],
            cache_path: PathBuf::from("unused.json"),
            lite_path: None,
            max_nodes: 10_000,
            version: SOLVER_VERSION.to_string(),
        }
    }

    const CORPUS: &str = "\
; 1

#####
#@$.#
#####

; 2

####
#@*#
####

; 3

#####
#$  #
#  .#
#@  #
#####
";

    #[test]
    fn test_run_corpus_populates_cache() {
        let corpus = Corpus::from_text("mini", CORPUS);
        let mut cache = SolutionCache::new();
        let config = test_config();

        let stats = run_corpus(&corpus, &mut cache, &config);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.solved, 2);
        assert_eq!(stats.unsolvable, 1);
        assert_eq!(stats.hit_limit, 0);
        assert_eq!(stats.cache_hits, 0);
        assert_eq!(stats.solution_moves, 1);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_second_pass_hits_cache() {
        let corpus = Corpus::from_text("mini", CORPUS);
        let mut cache = SolutionCache::new();
        let config = test_config();

        run_corpus(&corpus, &mut cache, &config);
        let second = run_corpus(&corpus, &mut cache, &config);

        assert_eq!(second.total, 3);
        assert_eq!(second.cache_hits, 3);
        assert_eq!(second.solved, 2);
        assert!((second.cache_hit_rate() - 1.0).abs() < f64::EPSILON);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_version_change_invalidates_hits() {
        let corpus = Corpus::from_text("mini", CORPUS);
        let mut cache = SolutionCache::new();
        let config = test_config();

        run_corpus(&corpus, &mut cache, &config);

        let mut bumped = test_config();
        bumped.version = "different-version".to_string();
        let rerun = run_corpus(&corpus, &mut cache, &bumped);

        assert_eq!(rerun.cache_hits, 0);
        // New results overwrote the stale entries under the same digests.
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_budget_hits_are_cached_as_unsolved() {
        let corpus = Corpus::from_text(
            "hard",
            "; 1\n##########\n#@ $   . #\n# $   .  #\n#  $   . #\n##########\n",
        );
        let mut cache = SolutionCache::new();
        let mut config = test_config();
        config.max_nodes = 5;

        let stats = run_corpus(&corpus, &mut cache, &config);
        assert_eq!(stats.hit_limit, 1);
        assert_eq!(stats.solved, 0);

        // The limit outcome is memoized: same version skips the retry.
        let again = run_corpus(&corpus, &mut cache, &config);
        assert_eq!(again.cache_hits, 1);
        assert_eq!(again.hit_limit, 1);
    }

    #[test]
    fn test_rejected_puzzles_are_counted_not_fatal() {
        let corpus = Corpus::from_text("mixed", "; 1\n#####\n#@$.#\n#####\n; 2\n####\n#  #\n####\n");
        let mut cache = SolutionCache::new();
        let config = test_config();

        let stats = run_corpus(&corpus, &mut cache, &config);
        assert_eq!(stats.total, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.solved, 1);
    }

    #[test]
    fn test_stats_averages() {
        let mut stats = BenchStats::default();
        assert_eq!(stats.avg_nodes(), 0.0);
        assert_eq!(stats.cache_hit_rate(), 0.0);

        stats.total = 4;
        stats.solved = 2;
        stats.nodes = 100;
        stats.time_ms = 8.0;
        stats.solution_moves = 30;
        stats.cache_hits = 1;

        assert_eq!(stats.avg_nodes(), 25.0);
        assert_eq!(stats.avg_time_ms(), 2.0);
        assert_eq!(stats.avg_solution_len(), 15.0);
        assert_eq!(stats.cache_hit_rate(), 0.25);
    }

    #[test]
    fn test_merge() {
        let mut a = BenchStats {
            total: 2,
            solved: 1,
            hit_limit: 1,
            unsolvable: 0,
            rejected: 0,
            cache_hits: 1,
            nodes: 10,
            time_ms: 1.0,
            solution_moves: 4,
        };
        let b = BenchStats {
            total: 3,
            solved: 2,
            hit_limit: 0,
            unsolvable: 1,
            rejected: 1,
            cache_hits: 0,
            nodes: 20,
            time_ms: 2.0,
            solution_moves: 6,
        };
        a.merge(&b);
        assert_eq!(a.total, 5);
        assert_eq!(a.solved, 3);
        assert_eq!(a.unsolvable, 1);
        assert_eq!(a.rejected, 1);
        assert_eq!(a.nodes, 30);
        assert_eq!(a.solution_moves, 10);
    }
}
