use bitflags::bitflags;
use engine::stepper::{Facing, Marker, Position};

bitflags! {
    /// One bit per side, indexed like [`Facing`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Walls: u8 {
        const LEFT = 1 << 0;
        const UP = 1 << 1;
        const RIGHT = 1 << 2;
        const DOWN = 1 << 3;
    }
}

impl Walls {
    pub fn side(facing: Facing) -> Walls {
        Walls::from_bits_truncate(1 << facing.index())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub walls: Walls,
    pub marker: Marker,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            walls: Walls::all(),
            marker: Marker::None,
        }
    }
}

impl Cell {
    pub fn has_wall(&self, facing: Facing) -> bool {
        self.walls.contains(Walls::side(facing))
    }

    pub fn remove_wall(&mut self, facing: Facing) {
        self.walls.remove(Walls::side(facing));
    }
}

/// A rectangular grid of walled cells. Entrance is the left side of the
/// top-left cell, exit the right side of the bottom-right one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Maze {
    rows: usize,
    cols: usize,
    cells: Vec<Vec<Cell>>,
}

impl Maze {
    pub fn new(rows: usize, cols: usize) -> Self {
        let mut maze = Self {
            rows: rows.max(1),
            cols: cols.max(1),
            cells: Vec::new(),
        };
        maze.reset();
        maze
    }

    pub fn reset(&mut self) {
        self.cells = vec![vec![Cell::default(); self.cols]; self.rows];
        self.cells[0][0].remove_wall(Facing::Left);
        let (last_row, last_col) = self.exit();
        self.cells[last_row][last_col].remove_wall(Facing::Right);
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn exit(&self) -> (usize, usize) {
        (self.rows - 1, self.cols - 1)
    }

    pub fn contains(&self, row: isize, col: isize) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.rows && (col as usize) < self.cols
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.get(row).and_then(|r| r.get(col))
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut Cell> {
        self.cells.get_mut(row).and_then(|r| r.get_mut(col))
    }

    /// The in-bounds cell one step from (row, col) towards `facing`.
    pub fn neighbor(&self, row: usize, col: usize, facing: Facing) -> Option<(usize, usize)> {
        let (dr, dc) = facing.offset();
        let (r, c) = (row as isize + dr, col as isize + dc);
        self.contains(r, c).then_some((r as usize, c as usize))
    }

    /// Opens the wall between (row, col) and its neighbour on both sides.
    pub fn carve(&mut self, row: usize, col: usize, facing: Facing) -> Option<(usize, usize)> {
        let (r, c) = self.neighbor(row, col, facing)?;
        self.cells[row][col].remove_wall(facing);
        self.cells[r][c].remove_wall(facing.opposite());
        Some((r, c))
    }

    pub fn facing_wall(&self, position: &Position) -> bool {
        self.cell(position.row, position.col)
            .is_none_or(|cell| cell.has_wall(position.facing))
    }

    pub fn marker_of(&self, row: usize, col: usize) -> Marker {
        self.cell(row, col).map_or(Marker::None, |cell| cell.marker)
    }

    pub fn mark(&mut self, row: usize, col: usize, marker: Marker) {
        if let Some(cell) = self.cell_mut(row, col) {
            cell.marker = marker;
        }
    }

    /// Applies `marker`, or clears it if the cell already carries it.
    pub fn toggle_mark(&mut self, row: usize, col: usize, marker: Marker) {
        if let Some(cell) = self.cell_mut(row, col) {
            cell.marker = if cell.marker == marker {
                Marker::None
            } else {
                marker
            };
        }
    }

    pub fn clear_markers(&mut self) {
        for cell in self.cells.iter_mut().flatten() {
            cell.marker = Marker::None;
        }
    }

    /// Visits cells row by row; stops early when `visit` returns false.
    pub fn walk_cells<F>(&self, mut visit: F) -> bool
    where
        F: FnMut(&Cell, usize, usize) -> bool,
    {
        for (r, row) in self.cells.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if !visit(cell, r, c) {
                    return false;
                }
            }
        }
        true
    }
}
