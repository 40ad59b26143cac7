//! Sokoban puzzle solving as a library: a push-level A* solver with deadlock
//! pruning, a reverse-scramble level generator, a content-addressed solution
//! cache, and a batch benchmark driver.

pub mod bench;
pub mod bits;
pub mod cache;
pub mod deadlock;
pub mod generator;
pub mod level;
pub mod pqueue;
pub mod reach;
pub mod solver;
pub mod zobrist;

pub use cache::{CacheEntry, SOLVER_VERSION, SolutionCache};
pub use deadlock::{DeadlockOracle, is_deadlocked};
pub use generator::{GeneratedPuzzle, Generator, GeneratorConfig};
pub use level::{Corpus, Direction, Level, LevelError, Origin, Pos, Tile};
pub use reach::{ReachableArea, reachable, reachable_from};
pub use solver::{
    BATCH_SIZE, CancelToken, DEFAULT_MAX_NODES, SolveOutcome, SolverTask, TaskStatus, solve,
    solve_cooperative,
};
