use crate::bits::Bitgrid;
use crate::level::{ALL_DIRECTIONS, Direction, Level, MAX_SIZE, Origin, Pos, Tile};
use crate::reach;
use crate::solver;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

/// Knobs for puzzle generation. The defaults produce small puzzles in the
/// 5..=50 optimal-move band.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub width: u8,
    pub height: u8,
    pub box_count: usize,
    /// Accepted band of optimal move counts, inclusive.
    pub min_moves: u32,
    pub max_moves: u32,
    /// Number of scramble pulls, sampled uniformly per attempt.
    pub scramble_min: u32,
    pub scramble_max: u32,
    pub max_attempts: u32,
    pub solver_budget: u64,
    /// Fixed seed for reproducible output; None draws one from the global
    /// RNG.
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            width: 10,
            height: 10,
            box_count: 3,
            min_moves: 5,
            max_moves: 50,
            scramble_min: 15,
            scramble_max: 60,
            max_attempts: 1000,
            solver_budget: 50_000,
            seed: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedPuzzle {
    pub level: Level,
    /// Solver-verified optimal move count; always Some when
    /// `used_fallback` is false.
    pub optimal_moves: Option<u32>,
    pub attempts: u32,
    pub used_fallback: bool,
}

/// Emitted when every attempt misses the acceptance band. One push, always
/// solvable.
const FALLBACK: &str = "\
########
#      #
# .$@  #
#      #
########";

/// Builds solvable puzzles by scrambling a solved position with random
/// pulls and validating the result with the solver. Every accepted puzzle is
/// solvable by construction; the solver call pins down the optimal move
/// count and filters out trivial and over-hard scrambles.
pub struct Generator {
    config: GeneratorConfig,
    rng: ChaCha8Rng,
    emitted: HashSet<String>,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        Generator {
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            emitted: HashSet::new(),
        }
    }

    pub fn generate(&mut self) -> GeneratedPuzzle {
        for attempt in 1..=self.config.max_attempts {
            let Some(mut level) = self.scramble_attempt(attempt) else {
                continue;
            };

            let outcome = solver::solve(&level, self.config.solver_budget);
            if !outcome.solvable {
                continue;
            }
            if outcome.move_count < self.config.min_moves
                || outcome.move_count > self.config.max_moves
            {
                continue;
            }
            if !self.emitted.insert(level.digest()) {
                // Already produced this exact board.
                continue;
            }

            level.meta.iterations = Some(attempt);
            level.meta.optimal_moves = Some(outcome.move_count);
            return GeneratedPuzzle {
                level,
                optimal_moves: Some(outcome.move_count),
                attempts: attempt,
                used_fallback: false,
            };
        }

        self.fallback()
    }

    /// One carve-place-scramble round. None when the maze came out too
    /// cramped for the configured box count.
    fn scramble_attempt(&mut self, attempt: u32) -> Option<Level> {
        let width = self.config.width;
        let height = self.config.height;
        let mut tiles = carve_maze(width, height, &mut self.rng);

        let mut floor: Vec<Pos> = Vec::new();
        for y in 0..height {
            for x in 0..width {
                if tiles[y as usize][x as usize] == Tile::Floor {
                    floor.push(Pos(x, y));
                }
            }
        }
        if floor.len() < self.config.box_count + 1 {
            return None;
        }

        let goals: Vec<Pos> = floor
            .choose_multiple(&mut self.rng, self.config.box_count)
            .copied()
            .collect();
        for &goal in &goals {
            tiles[goal.1 as usize][goal.0 as usize] = Tile::Goal;
        }

        // Solved position: every box on its goal, player anywhere else.
        let mut boxes = goals.clone();
        let open: Vec<Pos> = floor
            .iter()
            .copied()
            .filter(|pos| !goals.contains(pos))
            .collect();
        let mut player = *open.choose(&mut self.rng)?;

        let shell = Level::from_parts(
            width,
            height,
            tiles,
            player,
            boxes.clone(),
            Origin::new("generated", attempt as usize),
        );

        let mut grid = Bitgrid::from_positions(&boxes);
        let steps = self
            .rng
            .gen_range(self.config.scramble_min..=self.config.scramble_max);
        for _ in 0..steps {
            let area = reach::reachable(&shell, &grid, player);
            let mut pulls: Vec<(usize, Direction)> = Vec::new();
            for (i, &box_pos) in boxes.iter().enumerate() {
                for dir in ALL_DIRECTIONS {
                    let Some(side) = shell.step(box_pos, dir) else {
                        continue;
                    };
                    let Some(back) = shell.step(side, dir) else {
                        continue;
                    };
                    if area.cells.get(side) && !shell.is_wall(back) && !grid.get(back) {
                        pulls.push((i, dir));
                    }
                }
            }
            let Some(&(i, dir)) = pulls.choose(&mut self.rng) else {
                break;
            };

            // Box follows the player one cell; the player backs off one
            // further.
            let box_pos = boxes[i];
            let side = shell.step(box_pos, dir).unwrap();
            let back = shell.step(side, dir).unwrap();
            grid.unset(box_pos);
            grid.set(side);
            boxes[i] = side;
            player = back;
        }

        Some(Level::from_parts(
            width,
            height,
            tiles,
            player,
            boxes,
            Origin::new("generated", attempt as usize),
        ))
    }

    fn fallback(&mut self) -> GeneratedPuzzle {
        let mut level = Level::from_text(FALLBACK, Origin::new("fallback", 0)).unwrap();
        let outcome = solver::solve(&level, self.config.solver_budget);
        level.meta.iterations = Some(self.config.max_attempts);
        level.meta.optimal_moves = Some(outcome.move_count);
        self.emitted.insert(level.digest());
        GeneratedPuzzle {
            level,
            optimal_moves: Some(outcome.move_count),
            attempts: self.config.max_attempts,
            used_fallback: true,
        }
    }
}

/// Recursive-backtracking maze carve over a grid of walls, starting at
/// (1, 1) and carving in two-cell strides so corridor walls survive. The
/// boundary always stays wall.
fn carve_maze(
    width: u8,
    height: u8,
    rng: &mut ChaCha8Rng,
) -> [[Tile; MAX_SIZE]; MAX_SIZE] {
    let mut tiles = [[Tile::Wall; MAX_SIZE]; MAX_SIZE];
    if width < 3 || height < 3 {
        return tiles;
    }

    tiles[1][1] = Tile::Floor;
    let mut stack = vec![Pos(1, 1)];

    while let Some(&cur) = stack.last() {
        let mut dirs = ALL_DIRECTIONS;
        dirs.shuffle(rng);

        let mut carved = false;
        for dir in dirs {
            let (dx, dy) = dir.delta();
            let nx = cur.0 as i16 + 2 * dx as i16;
            let ny = cur.1 as i16 + 2 * dy as i16;
            if nx < 1 || ny < 1 || nx >= width as i16 - 1 || ny >= height as i16 - 1 {
                continue;
            }
            if tiles[ny as usize][nx as usize] != Tile::Wall {
                continue;
            }
            let wall_x = (cur.0 as i16 + dx as i16) as usize;
            let wall_y = (cur.1 as i16 + dy as i16) as usize;
            tiles[wall_y][wall_x] = Tile::Floor;
            tiles[ny as usize][nx as usize] = Tile::Floor;
            stack.push(Pos(nx as u8, ny as u8));
            carved = true;
            break;
        }
        if !carved {
            stack.pop();
        }
    }

    tiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::DEFAULT_MAX_NODES;

    fn test_config(seed: u64) -> GeneratorConfig {
        GeneratorConfig {
            width: 8,
            height: 8,
            box_count: 2,
            min_moves: 1,
            max_moves: 200,
            scramble_min: 4,
            scramble_max: 12,
            max_attempts: 200,
            solver_budget: 20_000,
            seed: Some(seed),
        }
    }

    #[test]
    fn test_generated_puzzle_is_solvable_within_band() {
        let mut generator = Generator::new(test_config(42));
        let puzzle = generator.generate();

        assert!(!puzzle.used_fallback);
        let outcome = solver::solve(&puzzle.level, DEFAULT_MAX_NODES);
        assert!(outcome.solvable);
        assert!(outcome.move_count >= 1 && outcome.move_count <= 200);
        assert_eq!(puzzle.optimal_moves, Some(outcome.move_count));
        assert_eq!(puzzle.level.meta.optimal_moves, Some(outcome.move_count));
        assert_eq!(puzzle.level.meta.iterations, Some(puzzle.attempts));
    }

    #[test]
    fn test_generated_boards_have_wall_boundary() {
        let mut generator = Generator::new(test_config(7));
        let puzzle = generator.generate();
        let level = &puzzle.level;

        for x in 0..level.width() {
            assert!(level.is_wall(Pos(x, 0)));
            assert!(level.is_wall(Pos(x, level.height() - 1)));
        }
        for y in 0..level.height() {
            assert!(level.is_wall(Pos(0, y)));
            assert!(level.is_wall(Pos(level.width() - 1, y)));
        }
    }

    #[test]
    fn test_same_seed_reproduces_output() {
        let mut a = Generator::new(test_config(1234));
        let mut b = Generator::new(test_config(1234));
        assert_eq!(a.generate().level.digest(), b.generate().level.digest());
    }

    #[test]
    fn test_no_duplicate_puzzles_from_one_generator() {
        let mut generator = Generator::new(test_config(99));
        let first = generator.generate();
        let second = generator.generate();
        assert_ne!(first.level.digest(), second.level.digest());
    }

    #[test]
    fn test_fallback_after_exhausted_attempts() {
        // An unsatisfiable band forces every attempt to fail.
        let config = GeneratorConfig {
            min_moves: 1_000_000,
            max_moves: 1_000_001,
            max_attempts: 3,
            seed: Some(5),
            ..test_config(5)
        };
        let mut generator = Generator::new(config);
        let puzzle = generator.generate();

        assert!(puzzle.used_fallback);
        assert_eq!(puzzle.attempts, 3);
        let outcome = solver::solve(&puzzle.level, DEFAULT_MAX_NODES);
        assert!(outcome.solvable);
    }

    #[test]
    fn test_maze_carve_leaves_boundary_walls() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let tiles = carve_maze(9, 9, &mut rng);
        for i in 0..9 {
            assert_eq!(tiles[0][i], Tile::Wall);
            assert_eq!(tiles[8][i], Tile::Wall);
            assert_eq!(tiles[i][0], Tile::Wall);
            assert_eq!(tiles[i][8], Tile::Wall);
        }
        assert_eq!(tiles[1][1], Tile::Floor);
    }

    #[test]
    fn test_maze_is_connected() {
        let mut rng = ChaCha8Rng::seed_from_u64(23);
        let tiles = carve_maze(11, 11, &mut rng);
        let level = Level::from_parts(11, 11, tiles, Pos(1, 1), vec![], Origin::default());

        let floor_count = (0..11u8)
            .flat_map(|y| (0..11u8).map(move |x| Pos(x, y)))
            .filter(|&pos| !level.is_wall(pos))
            .count();
        let area = reach::reachable_from(&level, &[], Pos(1, 1));
        assert_eq!(area.cells.len(), floor_count);
    }
}
