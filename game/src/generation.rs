use engine::stepper::Facing;

use crate::maze::Maze;

pub trait Generator {
    fn generate(&mut self, maze: &mut Maze);
}

/// Depth-first carver: from each cell, try the four sides in shuffled order
/// and carve into any unvisited neighbour, backtracking when stuck.
#[derive(Debug, Clone)]
pub struct RecursiveBacktracker {
    rng: Rng,
}

impl RecursiveBacktracker {
    pub fn new(seed: u64) -> Self {
        Self { rng: Rng::new(seed) }
    }

    fn shuffled_facings(&mut self) -> [Facing; 4] {
        let mut facings = Facing::ALL;
        for i in 0..facings.len() {
            let n = (self.rng.next_u32() % 4) as usize;
            facings.swap(n, i);
        }
        facings
    }
}

struct Frame {
    row: usize,
    col: usize,
    facings: [Facing; 4],
    next: usize,
}

impl Generator for RecursiveBacktracker {
    fn generate(&mut self, maze: &mut Maze) {
        let mut visited = vec![vec![false; maze.cols()]; maze.rows()];
        visited[0][0] = true;
        let mut stack = vec![Frame {
            row: 0,
            col: 0,
            facings: self.shuffled_facings(),
            next: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            if frame.next >= frame.facings.len() {
                stack.pop();
                continue;
            }
            let (row, col) = (frame.row, frame.col);
            let facing = frame.facings[frame.next];
            frame.next += 1;

            let Some((r, c)) = maze.neighbor(row, col, facing) else {
                continue;
            };
            if visited[r][c] {
                continue;
            }
            visited[r][c] = true;
            maze.carve(row, col, facing);
            let facings = self.shuffled_facings();
            stack.push(Frame {
                row: r,
                col: c,
                facings,
                next: 0,
            });
        }
    }
}

#[derive(Debug, Clone)]
struct Rng {
    state: u64,
}

impl Rng {
    fn new(seed: u64) -> Self {
        let seed = if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed };
        Self { state: seed }
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        (x.wrapping_mul(0x2545_F491_4F6C_DD1D) >> 32) as u32
    }
}

pub fn generate(rows: usize, cols: usize, seed: u64) -> Maze {
    let mut maze = Maze::new(rows, cols);
    RecursiveBacktracker::new(seed).generate(&mut maze);
    maze
}
