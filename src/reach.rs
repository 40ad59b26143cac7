use crate::bits::Bitgrid;
use crate::level::{ALL_DIRECTIONS, Direction, Level, MAX_SIZE, Pos};
use arrayvec::ArrayVec;

/// The player's walk-reachable area for a fixed box configuration.
pub struct ReachableArea {
    /// Cells the player can reach without pushing anything.
    pub cells: Bitgrid,
    /// Smallest reachable cell by (row, then column); the region half of the
    /// solver's state key.
    pub canonical: Pos,
}

/// Flood fill from the player over floor and goals, treating boxes as walls.
pub fn reachable(level: &Level, boxes: &Bitgrid, player: Pos) -> ReachableArea {
    let mut cells = Bitgrid::new();
    let mut stack: ArrayVec<Pos, { MAX_SIZE * MAX_SIZE }> = ArrayVec::new();

    cells.set(player);
    stack.push(player);

    while let Some(pos) = stack.pop() {
        for dir in ALL_DIRECTIONS {
            if let Some(next) = level.step(pos, dir) {
                if !level.is_wall(next) && !boxes.get(next) && !cells.get(next) {
                    cells.set(next);
                    stack.push(next);
                }
            }
        }
    }

    let canonical = cells.top_left().unwrap();
    ReachableArea { cells, canonical }
}

/// Convenience wrapper over a plain box list, for callers outside the solver.
pub fn reachable_from(level: &Level, boxes: &[Pos], player: Pos) -> ReachableArea {
    reachable(level, &Bitgrid::from_positions(boxes), player)
}

/// Shortest walk from `from` to `to` as a sequence of cardinal moves, or
/// None when no path exists. BFS with a fixed direction order, so equal-length
/// paths resolve the same way on every run.
pub fn walk_path(level: &Level, boxes: &Bitgrid, from: Pos, to: Pos) -> Option<Vec<Direction>> {
    if from == to {
        return Some(Vec::new());
    }

    // came_from[y][x] = direction of the step that first reached (x, y)
    let mut came_from: [[Option<Direction>; MAX_SIZE]; MAX_SIZE] = [[None; MAX_SIZE]; MAX_SIZE];
    let mut visited = Bitgrid::new();
    let mut queue: std::collections::VecDeque<Pos> = std::collections::VecDeque::new();

    visited.set(from);
    queue.push_back(from);

    while let Some(pos) = queue.pop_front() {
        for dir in ALL_DIRECTIONS {
            let Some(next) = level.step(pos, dir) else {
                continue;
            };
            if level.is_wall(next) || boxes.get(next) || visited.get(next) {
                continue;
            }
            visited.set(next);
            came_from[next.1 as usize][next.0 as usize] = Some(dir);
            if next == to {
                return Some(rebuild_path(level, &came_from, from, to));
            }
            queue.push_back(next);
        }
    }

    None
}

fn rebuild_path(
    level: &Level,
    came_from: &[[Option<Direction>; MAX_SIZE]; MAX_SIZE],
    from: Pos,
    to: Pos,
) -> Vec<Direction> {
    let mut path = Vec::new();
    let mut pos = to;
    while pos != from {
        let dir = came_from[pos.1 as usize][pos.0 as usize].unwrap();
        path.push(dir);
        pos = level.step(pos, dir.reverse()).unwrap();
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{Level, Origin};

    fn parse(text: &str) -> Level {
        Level::from_text(text.trim_matches('\n'), Origin::default()).unwrap()
    }

    #[test]
    fn test_reachable_open_room() {
        let level = parse(
            r#"
#####
#   #
# @ #
#   #
#####
"#,
        );
        let area = reachable_from(&level, &[], level.player());
        assert_eq!(area.cells.len(), 9);
        assert_eq!(area.canonical, Pos(1, 1));
    }

    #[test]
    fn test_boxes_block_reachability() {
        let level = parse(
            r#"
#####
#@$ #
#####
"#,
        );
        let area = reachable_from(&level, level.boxes(), level.player());
        assert_eq!(area.cells.len(), 1);
        assert_eq!(area.canonical, Pos(1, 1));
    }

    #[test]
    fn test_canonical_is_region_local() {
        // Wall splits the room; the player only sees the right half.
        let level = parse(
            r#"
#######
#  #  #
#  # @#
#######
"#,
        );
        let area = reachable_from(&level, &[], level.player());
        assert_eq!(area.cells.len(), 4);
        assert_eq!(area.canonical, Pos(4, 1));
    }

    #[test]
    fn test_walk_path_straight_line() {
        let level = parse(
            r#"
#####
#@  #
#####
"#,
        );
        let boxes = Bitgrid::new();
        let path = walk_path(&level, &boxes, Pos(1, 1), Pos(3, 1)).unwrap();
        assert_eq!(path, vec![Direction::Right, Direction::Right]);
    }

    #[test]
    fn test_walk_path_around_obstacle() {
        let level = parse(
            r#"
#####
#@$ #
#   #
#####
"#,
        );
        let boxes = Bitgrid::from_positions(level.boxes());
        let path = walk_path(&level, &boxes, Pos(1, 1), Pos(3, 1)).unwrap();
        assert_eq!(path.len(), 4);

        // Replay the path and confirm it lands on the target without
        // crossing the box.
        let mut pos = Pos(1, 1);
        for dir in &path {
            pos = level.step(pos, *dir).unwrap();
            assert!(!level.is_wall(pos));
            assert!(!boxes.get(pos));
        }
        assert_eq!(pos, Pos(3, 1));
    }

    #[test]
    fn test_walk_path_no_route() {
        let level = parse(
            r#"
#####
#@#.#
#####
"#,
        );
        let boxes = Bitgrid::new();
        assert_eq!(walk_path(&level, &boxes, Pos(1, 1), Pos(3, 1)), None);
    }

    #[test]
    fn test_walk_path_same_cell() {
        let level = parse(
            r#"
###
#@#
###
"#,
        );
        let boxes = Bitgrid::new();
        assert_eq!(walk_path(&level, &boxes, Pos(1, 1), Pos(1, 1)), Some(vec![]));
    }
}
