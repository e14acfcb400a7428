use serde::{Deserialize, Serialize};

pub mod path;
pub use path::{PathSegment, merge_path_segments};

// ---- Direction ----

/// One of the eight compass headings, stored as eighths of a turn.
///
/// ```text
/// N:  0   NE: 1   E:  2   SE: 3
/// S:  4   SW: 5   W:  6   NW: 7
/// ```
///
/// Positive x is east, positive y is south.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// Any integer is accepted; it is wrapped into `[0, 8)`.
    pub fn from_eighths(eighths: i32) -> Direction {
        Direction::ALL[eighths.rem_euclid(8) as usize]
    }

    pub fn eighths(self) -> u8 {
        self as u8
    }

    pub fn degrees(self) -> u32 {
        self.eighths() as u32 * 45
    }

    /// Grid offset of a single unit step.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
        }
    }

    pub fn rotate_clockwise(self, eighths: u8) -> Direction {
        Direction::from_eighths(self.eighths() as i32 + eighths as i32)
    }

    pub fn rotate_counter_clockwise(self, eighths: u8) -> Direction {
        Direction::from_eighths(self.eighths() as i32 - eighths as i32)
    }

    pub fn reverse(self) -> Direction {
        self.rotate_clockwise(4)
    }

    /// The compass direction of a displacement, judged by sign only.
    /// `None` for a zero displacement.
    pub fn of_displacement(dx: i32, dy: i32) -> Option<Direction> {
        use std::cmp::Ordering::*;
        match (dx.cmp(&0), dy.cmp(&0)) {
            (Equal, Less) => Some(Direction::North),
            (Greater, Less) => Some(Direction::NorthEast),
            (Greater, Equal) => Some(Direction::East),
            (Greater, Greater) => Some(Direction::SouthEast),
            (Equal, Greater) => Some(Direction::South),
            (Less, Greater) => Some(Direction::SouthWest),
            (Less, Equal) => Some(Direction::West),
            (Less, Less) => Some(Direction::NorthWest),
            (Equal, Equal) => None,
        }
    }
}

impl From<u8> for Direction {
    fn from(eighths: u8) -> Self {
        Direction::from_eighths(eighths as i32)
    }
}

impl From<Direction> for u8 {
    fn from(d: Direction) -> u8 {
        d.eighths()
    }
}

// ---- Bounds and pose ----

/// Rectangular scene bound. Positions are 1-based: `1..=width` × `1..=height`.
/// A width or height below 1 is treated as 1, so there is always a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneBounds {
    pub width: i32,
    pub height: i32,
}

impl SceneBounds {
    pub fn new(width: i32, height: i32) -> Self {
        SceneBounds { width: width.max(1), height: height.max(1) }
    }

    pub fn clamp_x(&self, x: i32) -> i32 {
        x.clamp(1, self.width.max(1))
    }

    pub fn clamp_y(&self, y: i32) -> i32 {
        y.clamp(1, self.height.max(1))
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.clamp_x(x) == x && self.clamp_y(y) == y
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pose {
    pub x: i32,
    pub y: i32,
    pub heading: Direction,
}

impl Pose {
    pub fn new(x: i32, y: i32, heading: Direction) -> Self {
        Pose { x, y, heading }
    }
}

/// Result of a straight-line move: the final pose plus the traced segments,
/// already merged among themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Movement {
    pub pose: Pose,
    pub segments: Vec<PathSegment>,
}

/// Advance `distance` grid units along the pose's heading.
pub fn move_forward(pose: Pose, bounds: SceneBounds, distance: u32, drawing_enabled: bool) -> Movement {
    let end = travel(pose, pose.heading, bounds, distance, drawing_enabled);
    Movement { pose: Pose { heading: pose.heading, ..end.pose }, segments: end.segments }
}

/// Like [`move_forward`] but along the reversed heading. The heading itself
/// is kept.
pub fn move_backward(pose: Pose, bounds: SceneBounds, distance: u32, drawing_enabled: bool) -> Movement {
    let end = travel(pose, pose.heading.reverse(), bounds, distance, drawing_enabled);
    Movement { pose: Pose { heading: pose.heading, ..end.pose }, segments: end.segments }
}

pub fn turn(pose: Pose, eighths_of_turn: u8, clockwise: bool) -> Pose {
    let heading = if clockwise {
        pose.heading.rotate_clockwise(eighths_of_turn)
    } else {
        pose.heading.rotate_counter_clockwise(eighths_of_turn)
    };
    Pose { heading, ..pose }
}

fn travel(start: Pose, direction: Direction, bounds: SceneBounds, distance: u32, drawing_enabled: bool) -> Movement {
    let (dx, dy) = direction.offset();
    let mut x = start.x;
    let mut y = start.y;
    let mut segments = Vec::new();

    for _ in 0..distance {
        let next_x = bounds.clamp_x(x + dx);
        let next_y = bounds.clamp_y(y + dy);
        if next_x == x && next_y == y {
            // Pinned against the bound; later units cannot move either.
            break;
        }
        if drawing_enabled {
            merge_path_segments(&mut segments, [PathSegment::new(x, y, next_x, next_y)]);
        }
        x = next_x;
        y = next_y;
    }

    Movement { pose: Pose { x, y, heading: start.heading }, segments }
}

// ---- Character state ----

/// The character as held by a controller: pose, accumulated path and the
/// bound it lives in. Every operation returns a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterState {
    pub pose: Pose,
    pub path: Vec<PathSegment>,
    pub bounds: SceneBounds,
}

impl CharacterState {
    pub fn new(pose: Pose, bounds: SceneBounds) -> Self {
        let pose = Pose { x: bounds.clamp_x(pose.x), y: bounds.clamp_y(pose.y), ..pose };
        CharacterState { pose, path: Vec::new(), bounds }
    }

    pub fn heading_degrees(&self) -> u32 {
        self.pose.heading.degrees()
    }

    pub fn forward(&self, distance: u32, drawing_enabled: bool) -> CharacterState {
        let movement = move_forward(self.pose, self.bounds, distance, drawing_enabled);
        self.with_movement(movement)
    }

    pub fn backward(&self, distance: u32, drawing_enabled: bool) -> CharacterState {
        let movement = move_backward(self.pose, self.bounds, distance, drawing_enabled);
        self.with_movement(movement)
    }

    pub fn turn_left(&self, eighths_of_turn: u8) -> CharacterState {
        self.with_pose(turn(self.pose, eighths_of_turn, false))
    }

    pub fn turn_right(&self, eighths_of_turn: u8) -> CharacterState {
        self.with_pose(turn(self.pose, eighths_of_turn, true))
    }

    // Direct position setters. Out-of-range targets land on the nearest
    // edge instead of being rejected. None of them draw.

    pub fn move_up(&self) -> CharacterState {
        self.with_position(self.pose.x, self.bounds.clamp_y(self.pose.y - 1))
    }

    pub fn move_down(&self) -> CharacterState {
        self.with_position(self.pose.x, self.bounds.clamp_y(self.pose.y + 1))
    }

    pub fn move_left(&self) -> CharacterState {
        self.with_position(self.bounds.clamp_x(self.pose.x - 1), self.pose.y)
    }

    pub fn move_right(&self) -> CharacterState {
        self.with_position(self.bounds.clamp_x(self.pose.x + 1), self.pose.y)
    }

    /// Column by letter, `A`/`a` being column 1. Non-letters leave the
    /// state unchanged.
    pub fn set_column(&self, label: char) -> CharacterState {
        if !label.is_ascii_alphabetic() {
            return self.clone();
        }
        let column = (label.to_ascii_uppercase() as u8 - b'A') as i32 + 1;
        self.with_position(self.bounds.clamp_x(column), self.pose.y)
    }

    pub fn set_row(&self, row: i32) -> CharacterState {
        self.with_position(self.pose.x, self.bounds.clamp_y(row))
    }

    pub fn column_label(&self) -> char {
        (b'A' + (self.pose.x - 1).clamp(0, 25) as u8) as char
    }

    pub fn row_label(&self) -> String {
        self.pose.y.to_string()
    }

    pub fn path_equals(&self, other: &[PathSegment]) -> bool {
        self.path.as_slice() == other
    }

    fn with_movement(&self, movement: Movement) -> CharacterState {
        let mut path = self.path.clone();
        merge_path_segments(&mut path, movement.segments);
        CharacterState { pose: movement.pose, path, bounds: self.bounds }
    }

    fn with_pose(&self, pose: Pose) -> CharacterState {
        CharacterState { pose, path: self.path.clone(), bounds: self.bounds }
    }

    fn with_position(&self, x: i32, y: i32) -> CharacterState {
        self.with_pose(Pose { x, y, heading: self.pose.heading })
    }
}
