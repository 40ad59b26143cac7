use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

pub const MAX_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tile {
    Wall,
    Floor,
    Goal,
}

/// Board cell as (x, y): x = column, y = row, both 0-indexed from the
/// top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pos(pub u8, pub u8);

impl Ord for Pos {
    // Row-major: row first, then column. Canonical player cells and sorted
    // box lists both rely on this order.
    fn cmp(&self, other: &Self) -> Ordering {
        (self.1, self.0).cmp(&(other.1, other.0))
    }
}

impl PartialOrd for Pos {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

pub const ALL_DIRECTIONS: [Direction; 4] = [
    Direction::Up,
    Direction::Down,
    Direction::Left,
    Direction::Right,
];

impl Direction {
    pub fn reverse(&self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn delta(&self) -> (i8, i8) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// One-letter encoding used in solution strings.
    pub fn to_char(self) -> char {
        match self {
            Direction::Up => 'u',
            Direction::Down => 'd',
            Direction::Left => 'l',
            Direction::Right => 'r',
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "Up"),
            Direction::Down => write!(f, "Down"),
            Direction::Left => write!(f, "Left"),
            Direction::Right => write!(f, "Right"),
        }
    }
}

/// Where a puzzle came from: corpus label, puzzle number, optional
/// difficulty tag. None of this participates in the digest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Origin {
    pub source: String,
    pub number: usize,
    pub difficulty: Option<String>,
}

impl Origin {
    pub fn new(source: &str, number: usize) -> Self {
        Self {
            source: source.to_string(),
            number,
            difficulty: None,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.source, self.number)
    }
}

/// Optional generator bookkeeping carried alongside a level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelMeta {
    pub iterations: Option<u32>,
    pub optimal_moves: Option<u32>,
}

/// Error type for level parsing operations.
#[derive(Debug)]
pub enum LevelError {
    /// IO error when reading from file
    Io(io::Error),
    /// Invalid level content
    InvalidLevel(String),
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelError::Io(err) => write!(f, "IO error: {}", err),
            LevelError::InvalidLevel(msg) => write!(f, "Invalid level: {}", msg),
        }
    }
}

impl From<io::Error> for LevelError {
    fn from(err: io::Error) -> Self {
        LevelError::Io(err)
    }
}

/// A parsed puzzle: static terrain plus the initial player and box placement.
/// Immutable once parsed; the solver and generator track dynamic state
/// separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    width: u8,
    height: u8,
    tiles: [[Tile; MAX_SIZE]; MAX_SIZE],
    player: Pos,
    boxes: Vec<Pos>,
    goals: Vec<Pos>,
    pub origin: Origin,
    pub meta: LevelMeta,
}

impl Level {
    /// Parse a puzzle from text format.
    ///
    /// Characters:
    /// - `#` = Wall
    /// - ` ` or `-` = Floor
    /// - `.` = Goal
    /// - `$` = Box
    /// - `@` = Player
    /// - `*` = Box on goal
    /// - `+` = Player on goal
    ///
    /// Width is the longest line; shorter lines are padded with floor on the
    /// right. Unknown characters are read as floor. A single trailing `|`
    /// per line (the emitter's row terminator) is stripped first. The only
    /// fatal conditions are an empty grid, a missing or duplicated player,
    /// and a grid larger than `MAX_SIZE`.
    pub fn from_text(text: &str, origin: Origin) -> Result<Self, LevelError> {
        let lines: Vec<&str> = text
            .lines()
            .map(|line| line.strip_suffix('|').unwrap_or(line))
            .collect();

        if lines.iter().all(|line| line.trim().is_empty()) {
            return Err(LevelError::InvalidLevel("empty board".to_string()));
        }

        let height = lines.len();
        let width = lines.iter().map(|line| line.chars().count()).max().unwrap();

        if width > MAX_SIZE {
            return Err(LevelError::InvalidLevel(format!(
                "board width {} exceeds maximum size {}",
                width, MAX_SIZE
            )));
        }
        if height > MAX_SIZE {
            return Err(LevelError::InvalidLevel(format!(
                "board height {} exceeds maximum size {}",
                height, MAX_SIZE
            )));
        }

        let mut tiles = [[Tile::Floor; MAX_SIZE]; MAX_SIZE];
        let mut player = None;
        let mut boxes = Vec::new();
        let mut goals = Vec::new();

        for (y, line) in lines.iter().enumerate() {
            for (x, ch) in line.chars().enumerate() {
                let pos = Pos(x as u8, y as u8);
                match ch {
                    '#' => tiles[y][x] = Tile::Wall,
                    ' ' | '-' => tiles[y][x] = Tile::Floor,
                    '.' => {
                        tiles[y][x] = Tile::Goal;
                        goals.push(pos);
                    }
                    '$' => {
                        boxes.push(pos);
                    }
                    '*' => {
                        tiles[y][x] = Tile::Goal;
                        goals.push(pos);
                        boxes.push(pos);
                    }
                    '@' => {
                        if player.is_some() {
                            return Err(LevelError::InvalidLevel(
                                "multiple players found".to_string(),
                            ));
                        }
                        player = Some(pos);
                    }
                    '+' => {
                        tiles[y][x] = Tile::Goal;
                        goals.push(pos);
                        if player.is_some() {
                            return Err(LevelError::InvalidLevel(
                                "multiple players found".to_string(),
                            ));
                        }
                        player = Some(pos);
                    }
                    // Anything else is tolerated and read as floor.
                    _ => tiles[y][x] = Tile::Floor,
                }
            }
        }

        let Some(player) = player else {
            return Err(LevelError::InvalidLevel(
                "no player found on board".to_string(),
            ));
        };

        boxes.sort();

        Ok(Level {
            width: width as u8,
            height: height as u8,
            tiles,
            player,
            boxes,
            goals,
            origin,
            meta: LevelMeta::default(),
        })
    }

    /// Assemble a level from already-built parts. Boxes are sorted and goals
    /// derived from the terrain; the generator uses this to avoid a render
    /// round-trip.
    pub fn from_parts(
        width: u8,
        height: u8,
        tiles: [[Tile; MAX_SIZE]; MAX_SIZE],
        player: Pos,
        mut boxes: Vec<Pos>,
        origin: Origin,
    ) -> Self {
        let mut goals = Vec::new();
        for y in 0..height {
            for x in 0..width {
                if tiles[y as usize][x as usize] == Tile::Goal {
                    goals.push(Pos(x, y));
                }
            }
        }
        boxes.sort();
        Level {
            width,
            height,
            tiles,
            player,
            boxes,
            goals,
            origin,
            meta: LevelMeta::default(),
        }
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    pub fn tile(&self, pos: Pos) -> Tile {
        self.tiles[pos.1 as usize][pos.0 as usize]
    }

    pub fn is_wall(&self, pos: Pos) -> bool {
        self.tile(pos) == Tile::Wall
    }

    pub fn player(&self) -> Pos {
        self.player
    }

    /// Initial box positions, sorted row-major.
    pub fn boxes(&self) -> &[Pos] {
        &self.boxes
    }

    pub fn goals(&self) -> &[Pos] {
        &self.goals
    }

    /// Move from a position in the given direction, or None when the result
    /// falls off the grid.
    pub fn step(&self, pos: Pos, dir: Direction) -> Option<Pos> {
        let (dx, dy) = dir.delta();
        let x = pos.0 as i16 + dx as i16;
        let y = pos.1 as i16 + dy as i16;
        if x >= 0 && y >= 0 && x < self.width as i16 && y < self.height as i16 {
            Some(Pos(x as u8, y as u8))
        } else {
            None
        }
    }

    /// Render the initial state. Each row ends with a `|` terminator so that
    /// trailing floor survives whitespace-stripping tools.
    pub fn to_text(&self) -> String {
        self.render_with(self.player, &self.boxes)
    }

    /// Render the board with a dynamic overlay of player and box positions.
    pub fn render_with(&self, player: Pos, boxes: &[Pos]) -> String {
        let occupied = crate::bits::Bitgrid::from_positions(boxes);
        let mut out = String::new();
        for y in 0..self.height {
            for x in 0..self.width {
                let pos = Pos(x, y);
                out.push(self.glyph(pos, player, &occupied));
            }
            out.push('|');
            out.push('\n');
        }
        out
    }

    /// Render with an `x mod 10` column header and two-digit row indices.
    pub fn to_text_with_coords(&self) -> String {
        let occupied = crate::bits::Bitgrid::from_positions(&self.boxes);
        let mut out = String::from("  ");
        for x in 0..self.width {
            out.push(char::from_digit((x % 10) as u32, 10).unwrap());
        }
        out.push('\n');
        for y in 0..self.height {
            out.push_str(&format!("{:02}", y));
            for x in 0..self.width {
                out.push(self.glyph(Pos(x, y), self.player, &occupied));
            }
            out.push('|');
            out.push('\n');
        }
        out
    }

    fn glyph(&self, pos: Pos, player: Pos, boxes: &crate::bits::Bitgrid) -> char {
        let tile = self.tile(pos);
        if pos == player {
            match tile {
                Tile::Goal => '+',
                _ => '@',
            }
        } else if boxes.get(pos) {
            match tile {
                Tile::Goal => '*',
                _ => '$',
            }
        } else {
            match tile {
                Tile::Wall => '#',
                Tile::Floor => ' ',
                Tile::Goal => '.',
            }
        }
    }

    /// Cache key: the first 16 hex digits of SHA-256 over the rendered
    /// initial state. Origin and metadata never reach the hash.
    pub fn digest(&self) -> String {
        let hash = Sha256::digest(self.to_text().as_bytes());
        hash[..8].iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// A collection of puzzles parsed from a multi-puzzle text file.
///
/// Puzzles are separated by `; N` lines (a semicolon followed by an index).
/// A puzzle that fails to parse is recorded in `rejected` and does not abort
/// its siblings.
#[derive(Debug)]
pub struct Corpus {
    pub label: String,
    pub levels: Vec<Level>,
    pub rejected: Vec<(usize, LevelError)>,
}

impl Corpus {
    pub fn from_text(label: &str, contents: &str) -> Self {
        let mut corpus = Corpus {
            label: label.to_string(),
            levels: Vec::new(),
            rejected: Vec::new(),
        };

        let mut chunk: Vec<&str> = Vec::new();
        let mut pending_number: Option<usize> = None;
        let mut seq = 0;

        for line in contents.lines() {
            if let Some(number) = separator_number(line) {
                corpus.flush(&mut chunk, pending_number, &mut seq);
                pending_number = Some(number);
            } else {
                chunk.push(line);
            }
        }
        corpus.flush(&mut chunk, pending_number, &mut seq);

        corpus
    }

    pub fn from_file(label: &str, path: &Path) -> Result<Self, LevelError> {
        let contents = fs::read_to_string(path)?;
        Ok(Self::from_text(label, &contents))
    }

    fn flush(&mut self, chunk: &mut Vec<&str>, number: Option<usize>, seq: &mut usize) {
        // Blank padding between puzzles is not part of any puzzle body;
        // interior blank lines are preserved.
        let start = chunk.iter().position(|line| !line.trim().is_empty());
        let Some(start) = start else {
            chunk.clear();
            return;
        };
        let end = chunk.iter().rposition(|line| !line.trim().is_empty()).unwrap();
        let body = chunk[start..=end].join("\n");
        chunk.clear();

        *seq += 1;
        let number = number.unwrap_or(*seq);
        match Level::from_text(&body, Origin::new(&self.label, number)) {
            Ok(level) => self.levels.push(level),
            Err(err) => self.rejected.push((number, err)),
        }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// Matches separator lines of the form `; N` (semicolon first, then an
/// integer, nothing else but whitespace).
fn separator_number(line: &str) -> Option<usize> {
    let rest = line.strip_prefix(';')?.trim();
    if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
        rest.parse().ok()
    } else {
        None
    }
}
