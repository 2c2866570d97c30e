use std::fmt;

use engine::stepper::{AgentControl, Facing, Marker, Position, Rotation, ThingAhead};
use tracing::debug;

use crate::generation;
use crate::maze::Maze;

pub const START: Position = Position {
    row: 0,
    col: 0,
    facing: Facing::Right,
};

/// The maze plus the walker on it. This is what programs and the player
/// drive; the goal is the exit cell in the bottom-right corner.
#[derive(Debug, Clone)]
pub struct MazeWorld {
    maze: Maze,
    walker: Position,
    shade: f32,
    peeking: bool,
}

impl MazeWorld {
    pub fn new(maze: Maze) -> Self {
        let mut world = Self {
            maze,
            walker: START,
            shade: 1.0,
            peeking: false,
        };
        world.maze.mark(START.row, START.col, Marker::Visited);
        world
    }

    pub fn generate(size: usize, seed: u64) -> Self {
        Self::new(generation::generate(size, size, seed))
    }

    /// Replaces the maze and puts the walker back at the start.
    pub fn regenerate(&mut self, size: usize, seed: u64) {
        debug!(size, seed, "new maze");
        self.maze = generation::generate(size, size, seed);
        self.walker = START;
        self.maze.mark(START.row, START.col, Marker::Visited);
    }

    pub fn maze(&self) -> &Maze {
        &self.maze
    }

    pub fn walker(&self) -> Position {
        self.walker
    }

    pub fn go_home(&mut self) {
        self.maze.clear_markers();
        self.walker = START;
        self.maze.mark(START.row, START.col, Marker::Visited);
    }

    pub fn turn_to(&mut self, facing: Facing) {
        self.walker.facing = facing;
    }

    /// Turns towards `facing`, or steps forward if already facing that way.
    pub fn turn_to_or_move(&mut self, facing: Facing) {
        if self.walker.facing == facing {
            self.move_forward();
        } else {
            self.turn_to(facing);
        }
    }

    /// Steps one cell ahead unless blocked. Entering an unmarked cell marks it visited.
    pub fn move_forward(&mut self) {
        let Some((row, col)) = self.open_cell_ahead() else {
            return;
        };
        let entering = self.maze.marker_of(row, col);
        self.walker.row = row;
        self.walker.col = col;
        if entering == Marker::None {
            self.maze.mark(row, col, Marker::Visited);
        }
    }

    pub fn mark(&mut self, marker: Marker) {
        self.maze.mark(self.walker.row, self.walker.col, marker);
    }

    /// Sets how much of the maze is revealed, 0 (dark) to 1 (fully lit).
    pub fn set_visibility(&mut self, visibility: f32) {
        self.shade = 1.0 - visibility.clamp(0.0, 1.0);
    }

    pub fn set_peeking(&mut self, peeking: bool) {
        self.peeking = peeking;
    }

    pub fn effective_shade(&self) -> f32 {
        if self.peeking { 0.0 } else { self.shade }
    }

    /// Cells lit around the walker: its own cell and, if open, the one ahead.
    pub fn lighted_cells(&self) -> Vec<(usize, usize)> {
        let mut cells = vec![(self.walker.row, self.walker.col)];
        cells.extend(self.open_cell_ahead());
        cells
    }

    fn open_cell_ahead(&self) -> Option<(usize, usize)> {
        if self.maze.facing_wall(&self.walker) {
            return None;
        }
        self.maze
            .neighbor(self.walker.row, self.walker.col, self.walker.facing)
    }
}

impl AgentControl for MazeWorld {
    fn current_position(&self) -> Position {
        self.walker
    }

    fn thing_ahead(&self) -> ThingAhead {
        match self.open_cell_ahead() {
            Some((row, col)) => self.maze.marker_of(row, col).into(),
            None => ThingAhead::Wall,
        }
    }

    fn has_reached_goal(&self) -> bool {
        (self.walker.row, self.walker.col) == self.maze.exit()
    }

    fn apply_marker(&mut self, marker: Marker) {
        self.mark(marker);
    }

    fn advance_one_cell(&mut self) {
        self.move_forward();
    }

    fn rotate(&mut self, rotation: Rotation) {
        self.walker.facing = self.walker.facing.turned(rotation);
    }

    fn teleport_to(&mut self, position: Position) {
        self.walker = position;
    }
}

impl fmt::Display for MazeWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let maze = &self.maze;
        let wall = |row: usize, col: usize, facing: Facing| {
            maze.cell(row, col).is_some_and(|cell| cell.has_wall(facing))
        };

        for row in 0..maze.rows() {
            for col in 0..maze.cols() {
                f.write_str(if wall(row, col, Facing::Up) { "+--" } else { "+  " })?;
            }
            f.write_str("+\n")?;
            for col in 0..maze.cols() {
                f.write_str(if wall(row, col, Facing::Left) { "|" } else { " " })?;
                let body = if (row, col) == (self.walker.row, self.walker.col) {
                    match self.walker.facing {
                        Facing::Left => "<<",
                        Facing::Up => "^^",
                        Facing::Right => ">>",
                        Facing::Down => "vv",
                    }
                } else {
                    match maze.marker_of(row, col) {
                        Marker::None => "  ",
                        Marker::Visited => "..",
                        Marker::Blocked => "xx",
                    }
                };
                f.write_str(body)?;
            }
            let last = maze.cols() - 1;
            f.write_str(if wall(row, last, Facing::Right) { "|\n" } else { " \n" })?;
        }
        for _ in 0..maze.cols() {
            f.write_str("+--")?;
        }
        f.write_str("+\n")
    }
}
