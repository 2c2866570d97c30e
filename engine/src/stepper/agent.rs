use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Left,
    Up,
    Right,
    Down,
}

impl Facing {
    pub const ALL: [Facing; 4] = [Facing::Left, Facing::Up, Facing::Right, Facing::Down];

    pub fn index(self) -> usize {
        match self {
            Facing::Left => 0,
            Facing::Up => 1,
            Facing::Right => 2,
            Facing::Down => 3,
        }
    }

    pub fn from_index(index: usize) -> Facing {
        Self::ALL[index % 4]
    }

    pub fn opposite(self) -> Facing {
        Facing::from_index(self.index() + 2)
    }

    pub fn turned(self, rotation: Rotation) -> Facing {
        match rotation {
            Rotation::Left => Facing::from_index(self.index() + 3),
            Rotation::Right => Facing::from_index(self.index() + 1),
        }
    }

    /// Row/column step one cell ahead.
    pub fn offset(self) -> (isize, isize) {
        match self {
            Facing::Left => (0, -1),
            Facing::Up => (-1, 0),
            Facing::Right => (0, 1),
            Facing::Down => (1, 0),
        }
    }
}

/// A quarter turn. Serialized as the block literals "LEFT" / "RIGHT".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Rotation {
    Left,
    Right,
}

impl Rotation {
    pub fn delta(self) -> i8 {
        match self {
            Rotation::Left => -1,
            Rotation::Right => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
    pub facing: Facing,
}

impl Position {
    pub fn new(row: usize, col: usize, facing: Facing) -> Self {
        Self { row, col, facing }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Marker {
    #[default]
    #[serde(rename = "")]
    None,
    #[serde(rename = "VISITED")]
    Visited,
    #[serde(rename = "BLOCKED")]
    Blocked,
}

/// What the agent senses one cell ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThingAhead {
    #[serde(rename = "")]
    Open,
    /// A wall, or the edge of the grid.
    #[serde(rename = "WALL")]
    Wall,
    #[serde(rename = "VISITED")]
    Visited,
    #[serde(rename = "BLOCKED")]
    Blocked,
}

impl From<Marker> for ThingAhead {
    fn from(marker: Marker) -> Self {
        match marker {
            Marker::None => ThingAhead::Open,
            Marker::Visited => ThingAhead::Visited,
            Marker::Blocked => ThingAhead::Blocked,
        }
    }
}

/// Operations a run performs on the simulated agent.
///
/// `advance_one_cell` may no-op when a wall is ahead; callers are expected
/// to consult `thing_ahead` first.
pub trait AgentControl {
    fn current_position(&self) -> Position;
    fn thing_ahead(&self) -> ThingAhead;
    fn has_reached_goal(&self) -> bool;
    fn apply_marker(&mut self, marker: Marker);
    fn advance_one_cell(&mut self);
    fn rotate(&mut self, rotation: Rotation);
    fn teleport_to(&mut self, position: Position);
}

pub type SharedAgent = Rc<RefCell<dyn AgentControl>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turning_wraps_around_the_compass() {
        assert_eq!(Facing::Left.turned(Rotation::Left), Facing::Down);
        assert_eq!(Facing::Down.turned(Rotation::Right), Facing::Left);
        assert_eq!(Facing::Up.turned(Rotation::Right), Facing::Right);
        assert_eq!(Facing::Up.opposite(), Facing::Down);
    }

    #[test]
    fn literals_match_block_vocabulary() {
        assert_eq!(serde_json::to_string(&Marker::None).unwrap(), r#""""#);
        assert_eq!(serde_json::to_string(&ThingAhead::Wall).unwrap(), r#""WALL""#);
        assert_eq!(serde_json::to_string(&Rotation::Left).unwrap(), r#""LEFT""#);
        let marker: Marker = serde_json::from_str(r#""BLOCKED""#).unwrap();
        assert_eq!(marker, Marker::Blocked);
    }
}
