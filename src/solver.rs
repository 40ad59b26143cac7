use crate::bits::Bitgrid;
use crate::deadlock::{self, DeadlockOracle};
use crate::level::{ALL_DIRECTIONS, Direction, Level, Pos, Tile};
use crate::pqueue::{BucketQueue, MAX_PRIORITY};
use crate::reach;
use crate::zobrist::Zobrist;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Default node budget for a single solve.
pub const DEFAULT_MAX_NODES: u64 = 150_000;

/// Expansions per cooperative batch.
pub const BATCH_SIZE: u64 = 1000;

const NO_PARENT: u32 = u32::MAX;

/// Result of a single solve.
///
/// `hit_limit` separates "ran out of budget (inconclusive)" from "frontier
/// drained (proven unsolvable)".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveOutcome {
    pub solvable: bool,
    pub moves: Option<Vec<Direction>>,
    pub move_count: u32,
    pub nodes_explored: u64,
    pub hit_limit: bool,
}

impl SolveOutcome {
    fn solved(moves: Vec<Direction>, nodes_explored: u64) -> Self {
        let move_count = moves.len() as u32;
        SolveOutcome {
            solvable: true,
            moves: Some(moves),
            move_count,
            nodes_explored,
            hit_limit: false,
        }
    }

    fn unsolvable(nodes_explored: u64) -> Self {
        SolveOutcome {
            solvable: false,
            moves: None,
            move_count: 0,
            nodes_explored,
            hit_limit: false,
        }
    }

    fn cutoff(nodes_explored: u64) -> Self {
        SolveOutcome {
            solvable: false,
            moves: None,
            move_count: 0,
            nodes_explored,
            hit_limit: true,
        }
    }

    /// Solution in `[udlr]*` form; None when unsolved. An empty string means
    /// solvable in zero moves.
    pub fn move_string(&self) -> Option<String> {
        self.moves
            .as_ref()
            .map(|moves| moves.iter().map(|dir| dir.to_char()).collect())
    }
}

/// Shared cancellation flag for cooperative solves. Cancelling is idempotent.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Search node. Nodes live in an append-only arena for the duration of one
/// solve; parents are arena indices, so path reconstruction never needs
/// shared ownership.
struct Node {
    boxes: Vec<Pos>,
    player: Pos,
    parent: u32,
    /// Walk moves to the push position, then the push itself.
    segment: Vec<Direction>,
    g: u32,
    key: u64,
}

pub enum TaskStatus {
    Running,
    Finished(SolveOutcome),
}

/// An in-flight solve that can be driven in batches.
///
/// State space is push-level: (canonical player cell, sorted box set). The
/// frontier is ordered by f = g + h with h = summed Manhattan distance to the
/// nearest goal, which is admissible and consistent for walk+push move
/// counting, so the first goal pop is move-optimal.
pub struct SolverTask<'a> {
    level: &'a Level,
    oracle: DeadlockOracle,
    zobrist: Zobrist,
    arena: Vec<Node>,
    open: BucketQueue<u32>,
    best_g: HashMap<u64, u32>,
    closed: HashSet<u64>,
    nodes_explored: u64,
    max_nodes: u64,
    /// Some f value fell outside the frontier's priority range; a drained
    /// frontier is then inconclusive rather than proven unsolvable.
    overflowed: bool,
    finished: Option<SolveOutcome>,
}

impl<'a> SolverTask<'a> {
    pub fn new(level: &'a Level, max_nodes: u64) -> Self {
        let oracle = DeadlockOracle::new(level);
        let mut task = SolverTask {
            level,
            oracle,
            zobrist: Zobrist::new(),
            arena: Vec::new(),
            open: BucketQueue::new(),
            best_g: HashMap::new(),
            closed: HashSet::new(),
            nodes_explored: 0,
            max_nodes,
            overflowed: false,
            finished: None,
        };
        task.finished = task.precheck();
        task
    }

    /// Decide trivial boards before any expansion.
    fn precheck(&mut self) -> Option<SolveOutcome> {
        let boxes = self.level.boxes();

        if self.is_won(boxes) {
            return Some(SolveOutcome::solved(Vec::new(), 0));
        }
        // Boxes can never share a goal.
        if boxes.len() > self.level.goals().len() {
            return Some(SolveOutcome::unsolvable(0));
        }
        if boxes
            .iter()
            .any(|&pos| self.level.tile(pos) != Tile::Goal && self.oracle.is_dead(pos))
        {
            return Some(SolveOutcome::unsolvable(0));
        }
        let grid = Bitgrid::from_positions(boxes);
        if deadlock::has_freeze(self.level, &grid, boxes) {
            return Some(SolveOutcome::unsolvable(0));
        }

        // Seed the root.
        let area = reach::reachable(self.level, &grid, self.level.player());
        let boxes = boxes.to_vec();
        let key = self.zobrist.state_key(&boxes, area.canonical);
        let f = self.heuristic(&boxes) as usize;
        if f >= MAX_PRIORITY {
            return Some(SolveOutcome::cutoff(0));
        }
        self.best_g.insert(key, 0);
        self.arena.push(Node {
            boxes,
            player: self.level.player(),
            parent: NO_PARENT,
            segment: Vec::new(),
            g: 0,
            key,
        });
        self.open.push(f, 0);
        None
    }

    pub fn nodes_explored(&self) -> u64 {
        self.nodes_explored
    }

    /// Outcome shape for an externally abandoned solve; same as a budget hit.
    pub fn cancelled(&self) -> SolveOutcome {
        SolveOutcome::cutoff(self.nodes_explored)
    }

    /// Run up to `batch` expansions. Returns `Finished` with the final
    /// outcome once the search resolves; repeated calls after that return
    /// the same outcome.
    pub fn run_batch(&mut self, batch: u64) -> TaskStatus {
        if let Some(outcome) = &self.finished {
            return TaskStatus::Finished(outcome.clone());
        }

        let target = self.nodes_explored + batch;
        let outcome = loop {
            if self.nodes_explored >= self.max_nodes {
                break SolveOutcome::cutoff(self.nodes_explored);
            }
            let Some(idx) = self.open.pop_min() else {
                break if self.overflowed {
                    SolveOutcome::cutoff(self.nodes_explored)
                } else {
                    SolveOutcome::unsolvable(self.nodes_explored)
                };
            };

            let key = self.arena[idx as usize].key;
            if !self.closed.insert(key) {
                // Stale duplicate left behind by a better path.
                continue;
            }
            self.nodes_explored += 1;

            if self.is_won(&self.arena[idx as usize].boxes) {
                break SolveOutcome::solved(self.reconstruct(idx), self.nodes_explored);
            }
            self.expand(idx);

            if self.nodes_explored >= target {
                return TaskStatus::Running;
            }
        };

        self.finished = Some(outcome.clone());
        TaskStatus::Finished(outcome)
    }

    fn is_won(&self, boxes: &[Pos]) -> bool {
        boxes.iter().all(|&pos| self.level.tile(pos) == Tile::Goal)
    }

    fn heuristic(&self, boxes: &[Pos]) -> u32 {
        let goals = self.level.goals();
        boxes
            .iter()
            .map(|&b| {
                goals
                    .iter()
                    .map(|&g| {
                        (b.0 as i16 - g.0 as i16).unsigned_abs() as u32
                            + (b.1 as i16 - g.1 as i16).unsigned_abs() as u32
                    })
                    .min()
                    .unwrap_or(0)
            })
            .sum()
    }

    fn expand(&mut self, idx: u32) {
        let boxes = self.arena[idx as usize].boxes.clone();
        let player = self.arena[idx as usize].player;
        let g = self.arena[idx as usize].g;

        let grid = Bitgrid::from_positions(&boxes);
        let area = reach::reachable(self.level, &grid, player);

        for (i, &box_pos) in boxes.iter().enumerate() {
            for dir in ALL_DIRECTIONS {
                let Some(push_to) = self.level.step(box_pos, dir) else {
                    continue;
                };
                let Some(push_from) = self.level.step(box_pos, dir.reverse()) else {
                    continue;
                };
                if !area.cells.get(push_from) {
                    continue;
                }
                if self.level.is_wall(push_to) || grid.get(push_to) {
                    continue;
                }
                if self.oracle.is_dead(push_to) {
                    continue;
                }

                let mut new_grid = grid;
                new_grid.unset(box_pos);
                new_grid.set(push_to);
                if deadlock::freeze_after_push(self.level, &new_grid, push_to) {
                    continue;
                }

                let mut new_boxes = boxes.clone();
                new_boxes[i] = push_to;
                new_boxes.sort();

                // The player ends up where the box was.
                let new_area = reach::reachable(self.level, &new_grid, box_pos);
                let key = self.zobrist.state_key(&new_boxes, new_area.canonical);
                if self.closed.contains(&key) {
                    continue;
                }

                // Walk over the pre-push board; guaranteed to exist because
                // push_from is in the reachable area.
                let walk = reach::walk_path(self.level, &grid, player, push_from).unwrap();
                let new_g = g + walk.len() as u32 + 1;

                match self.best_g.get(&key) {
                    Some(&seen) if seen <= new_g => continue,
                    _ => {}
                }
                self.best_g.insert(key, new_g);

                let f = (new_g + self.heuristic(&new_boxes)) as usize;
                if f >= MAX_PRIORITY {
                    self.overflowed = true;
                    continue;
                }

                let mut segment = walk;
                segment.push(dir);
                self.arena.push(Node {
                    boxes: new_boxes,
                    player: box_pos,
                    parent: idx,
                    segment,
                    g: new_g,
                    key,
                });
                self.open.push(f, (self.arena.len() - 1) as u32);
            }
        }
    }

    /// Splice the per-edge move segments along the parent chain.
    fn reconstruct(&self, idx: u32) -> Vec<Direction> {
        let mut chain = Vec::new();
        let mut cursor = idx as usize;
        loop {
            let node = &self.arena[cursor];
            if node.parent == NO_PARENT {
                break;
            }
            chain.push(cursor);
            cursor = node.parent as usize;
        }

        let mut moves = Vec::new();
        for &node_idx in chain.iter().rev() {
            moves.extend_from_slice(&self.arena[node_idx].segment);
        }
        moves
    }
}

/// Solve a level to completion within the node budget.
pub fn solve(level: &Level, max_nodes: u64) -> SolveOutcome {
    let mut task = SolverTask::new(level, max_nodes);
    loop {
        if let TaskStatus::Finished(outcome) = task.run_batch(BATCH_SIZE) {
            return outcome;
        }
    }
}

/// Same search as [`solve`], yielding at every batch boundary to honor the
/// cancellation token. A cancelled solve reports the same shape as a budget
/// hit, with the node count at the moment of the check.
pub fn solve_cooperative(level: &Level, max_nodes: u64, cancel: &CancelToken) -> SolveOutcome {
    let mut task = SolverTask::new(level, max_nodes);
    loop {
        if cancel.is_cancelled() {
            return task.cancelled();
        }
        if let TaskStatus::Finished(outcome) = task.run_batch(BATCH_SIZE) {
            return outcome;
        }
    }
}
