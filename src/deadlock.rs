use crate::bits::Bitgrid;
use crate::level::{ALL_DIRECTIONS, Direction, Level, MAX_SIZE, Pos, Tile};
use arrayvec::ArrayVec;

/// Precomputed dead-square map for one level.
///
/// A square is dead when no sequence of legal pushes can deliver a box from
/// it to any goal. Goals are never dead.
pub struct DeadlockOracle {
    dead: Bitgrid,
}

impl DeadlockOracle {
    pub fn new(level: &Level) -> Self {
        let mut live = Bitgrid::new();
        for &goal in level.goals() {
            pull_flood(level, goal, &mut live);
        }

        let mut dead = Bitgrid::new();
        for y in 0..level.height() {
            for x in 0..level.width() {
                let pos = Pos(x, y);
                if !level.is_wall(pos) && !live.get(pos) && level.tile(pos) != Tile::Goal {
                    dead.set(pos);
                }
            }
        }

        expand_dead_lanes(level, &mut dead);

        DeadlockOracle { dead }
    }

    pub fn is_dead(&self, pos: Pos) -> bool {
        self.dead.get(pos)
    }
}

/// Mark every square from which a box can be pushed to `goal`, by pulling a
/// box outward from the goal. A pull from `cur` to `next` needs room for the
/// player one step further in the same direction.
fn pull_flood(level: &Level, goal: Pos, live: &mut Bitgrid) {
    if live.get(goal) {
        // Already swept by an earlier goal; everything reachable from here
        // was found then.
        return;
    }

    let mut stack: ArrayVec<Pos, { MAX_SIZE * MAX_SIZE }> = ArrayVec::new();
    live.set(goal);
    stack.push(goal);

    while let Some(cur) = stack.pop() {
        for dir in ALL_DIRECTIONS {
            let Some(next) = level.step(cur, dir) else {
                continue;
            };
            let Some(player) = level.step(next, dir) else {
                continue;
            };
            if !level.is_wall(next) && !level.is_wall(player) && !live.get(next) {
                live.set(next);
                stack.push(next);
            }
        }
    }
}

/// Static corner-line refinement: in a goal-free floor run flanked entirely
/// by walls on one side (above/below for rows, left/right for columns), dead
/// end cells condemn the whole run.
fn expand_dead_lanes(level: &Level, dead: &mut Bitgrid) {
    for y in 0..level.height() {
        expand_lane(level, dead, Pos(0, y), Direction::Right, Direction::Up);
    }
    for x in 0..level.width() {
        expand_lane(level, dead, Pos(x, 0), Direction::Down, Direction::Left);
    }
}

fn expand_lane(level: &Level, dead: &mut Bitgrid, start: Pos, along: Direction, side: Direction) {
    let mut run: Vec<Pos> = Vec::new();
    let mut cursor = Some(start);

    while let Some(pos) = cursor {
        if level.is_wall(pos) {
            condemn_run(level, dead, &run, side);
            run.clear();
        } else {
            run.push(pos);
        }
        cursor = level.step(pos, along);
    }
    condemn_run(level, dead, &run, side);
}

fn condemn_run(level: &Level, dead: &mut Bitgrid, run: &[Pos], side: Direction) {
    if run.len() < 2 {
        return;
    }
    if run.iter().any(|&pos| level.tile(pos) == Tile::Goal) {
        return;
    }
    let flanked = |dir: Direction| {
        run.iter()
            .all(|&pos| level.step(pos, dir).is_none_or(|p| level.is_wall(p)))
    };
    if !flanked(side) && !flanked(side.reverse()) {
        return;
    }
    if dead.get(run[0]) && dead.get(run[run.len() - 1]) {
        for &pos in run {
            dead.set(pos);
        }
    }
}

/// Freeze check for the 2×2 windows touching a just-pushed box. A window is
/// frozen when all four cells are wall-or-box with at least two boxes, one of
/// them off-goal; no later push can ever dissolve it.
pub fn freeze_after_push(level: &Level, boxes: &Bitgrid, moved: Pos) -> bool {
    let mx = moved.0 as i16;
    let my = moved.1 as i16;
    for wy in (my - 1)..=my {
        for wx in (mx - 1)..=mx {
            if window_frozen(level, boxes, wx, wy) {
                return true;
            }
        }
    }
    false
}

fn window_frozen(level: &Level, boxes: &Bitgrid, wx: i16, wy: i16) -> bool {
    let mut box_count = 0;
    let mut off_goal = false;

    for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
        let x = wx + dx;
        let y = wy + dy;
        // Off-grid counts as wall.
        if x < 0 || y < 0 || x >= level.width() as i16 || y >= level.height() as i16 {
            continue;
        }
        let pos = Pos(x as u8, y as u8);
        if boxes.get(pos) {
            box_count += 1;
            if level.tile(pos) != Tile::Goal {
                off_goal = true;
            }
        } else if !level.is_wall(pos) {
            return false;
        }
    }

    box_count >= 2 && off_goal
}

/// Whole-board freeze scan over a box configuration.
pub fn has_freeze(level: &Level, boxes: &Bitgrid, box_list: &[Pos]) -> bool {
    box_list
        .iter()
        .any(|&pos| freeze_after_push(level, boxes, pos))
}

/// External deadlock-warning API: does this box configuration contain a
/// freeze deadlock?
pub fn is_deadlocked(level: &Level, boxes: &[Pos]) -> bool {
    let grid = Bitgrid::from_positions(boxes);
    has_freeze(level, &grid, boxes)
}
