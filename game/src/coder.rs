use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use engine::input::{
    GamepadStateEvent, HandlerId, InputHandler, InputRouter, KeyEvent, KeyReply, Propagation, keys,
};
use engine::stepper::{RunReport, Runner, RunnerId, SharedRunner, Tick, clamp_interval};
use engine::{Clock, RunnerError};
use tracing::{debug, info};

use crate::blocks::{BlockInterpreter, DEFAULT_MAX_EVALUATIONS, Program};
use crate::world::MazeWorld;

#[derive(Clone)]
struct ActiveRun {
    id: RunnerId,
    runner: SharedRunner,
}

/// Owns the player's program and the run currently executing it.
///
/// At most one run is active; starting another terminates the previous one
/// first, and reports from superseded runs are dropped.
pub struct Coder {
    router: Rc<InputRouter>,
    world: Rc<RefCell<MazeWorld>>,
    clock: Rc<dyn Clock>,
    program: Program,
    interval: Duration,
    max_evaluations: usize,
    keys_handler: Option<HandlerId>,
    active: Rc<RefCell<Option<ActiveRun>>>,
    generation: Rc<Cell<u64>>,
    last_report: Rc<Cell<Option<RunReport>>>,
}

impl Coder {
    pub fn new(router: Rc<InputRouter>, world: Rc<RefCell<MazeWorld>>, clock: Rc<dyn Clock>) -> Self {
        Self {
            router,
            world,
            clock,
            program: Program::depth_first(),
            interval: engine::stepper::DEFAULT_INTERVAL,
            max_evaluations: DEFAULT_MAX_EVALUATIONS,
            keys_handler: None,
            active: Rc::new(RefCell::new(None)),
            generation: Rc::new(Cell::new(0)),
            last_report: Rc::new(Cell::new(None)),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = clamp_interval(interval);
        self
    }

    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.max_evaluations = max_evaluations;
        self
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn set_program(&mut self, program: Program) {
        debug!(name = %program.name, "program replaced");
        self.program = program;
    }

    pub fn visible(&self) -> bool {
        self.keys_handler.is_some()
    }

    pub fn running(&self) -> bool {
        self.active.borrow().is_some()
    }

    pub fn active_runner(&self) -> Option<SharedRunner> {
        self.active.borrow().as_ref().map(|run| run.runner.clone())
    }

    /// The report of the most recent run that was not superseded.
    pub fn last_report(&self) -> Option<RunReport> {
        self.last_report.get()
    }

    pub fn show(&mut self) {
        if self.keys_handler.is_none() {
            self.keys_handler = Some(self.router.add_handler(Rc::new(RefCell::new(CoderKeys))));
        }
    }

    pub fn hide(&mut self) {
        if let Some(handler) = self.keys_handler.take() {
            self.router.remove_handler(handler);
        }
    }

    pub fn toggle(&mut self) {
        if self.visible() {
            self.hide();
        } else {
            self.show();
        }
    }

    /// Starts the current program from the walker's pose.
    pub fn run(&mut self) -> RunnerId {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);

        let previous = self.active.borrow_mut().take();
        if let Some(previous) = previous {
            previous.runner.borrow_mut().terminate();
        }

        let on_complete = {
            let active = self.active.clone();
            let current = self.generation.clone();
            let last_report = self.last_report.clone();
            Box::new(move |report: RunReport| {
                if current.get() != generation {
                    return;
                }
                last_report.set(Some(report));
                let mut slot = active.borrow_mut();
                if slot.as_ref().is_some_and(|run| run.id == report.runner) {
                    *slot = None;
                }
            })
        };

        let program = BlockInterpreter::with_limit(self.program.clone(), self.max_evaluations);
        let runner = Runner::start(
            Box::new(program),
            self.world.clone(),
            &self.router,
            self.clock.clone(),
            self.interval,
            on_complete,
        );

        let (id, done) = {
            let inner = runner.borrow();
            (inner.id(), inner.is_done())
        };
        if done {
            info!(runner = %id, "run finished before its first step");
        } else {
            *self.active.borrow_mut() = Some(ActiveRun { id, runner });
        }
        id
    }

    pub fn terminate(&self) {
        if let Some(runner) = self.active_runner() {
            runner.borrow_mut().terminate();
        }
    }

    /// Polls the active run's timer.
    pub fn tick(&self) -> Result<Option<Tick>, RunnerError> {
        let Some(runner) = self.active_runner() else {
            return Ok(None);
        };
        let tick = runner.borrow_mut().tick()?;
        Ok(Some(tick))
    }
}

impl Drop for Coder {
    fn drop(&mut self) {
        self.terminate();
        self.hide();
    }
}

/// Input layer shown with the coder: lets the coder and run keys through to
/// the base controls and swallows everything else.
struct CoderKeys;

impl InputHandler for CoderKeys {
    fn handle_key(&mut self, event: &KeyEvent) -> KeyReply {
        if event.released || event.is(keys::KEY_C) || event.is(keys::KEY_R) {
            KeyReply::PassOn
        } else {
            KeyReply::Declined
        }
    }

    fn handle_gamepad(&mut self, _event: &GamepadStateEvent) -> Propagation {
        Propagation::Stop
    }
}
