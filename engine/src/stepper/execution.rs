use crate::stepper::agent::{Marker, Position, Rotation, SharedAgent, ThingAhead};

/// A backtracking record pushed by every forward move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub position: Position,
    pub counter: u32,
}

/// Interpreter state for one run: the operations a program may call.
///
/// Holds no maze knowledge; every movement is delegated to the agent.
pub struct ExecutionState {
    agent: SharedAgent,
    counter: u32,
    stack: Vec<Snapshot>,
}

impl ExecutionState {
    pub fn new(agent: SharedAgent) -> Self {
        Self {
            agent,
            counter: 0,
            stack: Vec::new(),
        }
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn thing_ahead(&self) -> ThingAhead {
        self.agent.borrow().thing_ahead()
    }

    pub fn has_reached_goal(&self) -> bool {
        self.agent.borrow().has_reached_goal()
    }

    pub fn increase_counter(&mut self) {
        self.counter = self.counter.saturating_add(1);
    }

    pub fn mark(&mut self, marker: Marker) {
        self.agent.borrow_mut().apply_marker(marker);
    }

    pub fn move_forward(&mut self) {
        let position = self.agent.borrow().current_position();
        self.stack.push(Snapshot {
            position,
            counter: self.counter,
        });
        self.counter = 0;
        self.agent.borrow_mut().advance_one_cell();
    }

    pub fn turn(&mut self, rotation: Rotation) {
        self.agent.borrow_mut().rotate(rotation);
    }

    /// Undoes the latest forward move. No-op on an empty stack.
    pub fn step_back(&mut self) {
        let Some(snapshot) = self.stack.pop() else {
            return;
        };
        self.counter = snapshot.counter;
        self.agent.borrow_mut().teleport_to(snapshot.position);
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn stack(&self) -> &[Snapshot] {
        &self.stack
    }
}
