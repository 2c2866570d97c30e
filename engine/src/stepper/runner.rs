use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{ProgramError, RunnerError};
use crate::input::{
    GamepadStateEvent, HandlerId, InputHandler, InputRouter, KeyEvent, KeyReply, Propagation, keys,
};
use crate::stepper::agent::SharedAgent;
use crate::stepper::execution::ExecutionState;

pub const MIN_INTERVAL: Duration = Duration::from_millis(100);
pub const MAX_INTERVAL: Duration = Duration::from_millis(1000);
pub const INTERVAL_STEP: Duration = Duration::from_millis(100);
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// One step unit of a run: perform at most one advancing action and return.
pub trait StepProgram {
    fn step(&mut self, state: &mut ExecutionState) -> Result<(), ProgramError>;
}

impl<F> StepProgram for F
where
    F: FnMut(&mut ExecutionState) -> Result<(), ProgramError>,
{
    fn step(&mut self, state: &mut ExecutionState) -> Result<(), ProgramError> {
        self(state)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunnerId(u64);

impl RunnerId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        RunnerId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RunnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "runner#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerPhase {
    Scheduled { due: Instant },
    Paused,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    ReachedGoal,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub runner: RunnerId,
    pub outcome: RunOutcome,
    pub steps: u64,
}

/// Told exactly once when a run ends, however it ends.
pub type CompletionHook = Box<dyn FnOnce(RunReport)>;

/// Result of polling a runner's timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Paused or already done.
    Idle,
    Waiting,
    Stepped,
    Finished,
}

pub type SharedRunner = Rc<RefCell<Runner>>;

/// Drives a program one step unit at a time on a fixed, adjustable cadence.
///
/// While active it sits on top of the input chain so pause, resume, speed and
/// cancel keys reach it first; everything else is passed on.
pub struct Runner {
    id: RunnerId,
    program: Box<dyn StepProgram>,
    state: ExecutionState,
    clock: Rc<dyn Clock>,
    interval: Duration,
    phase: RunnerPhase,
    steps: u64,
    router: Weak<InputRouter>,
    handler: Option<HandlerId>,
    on_complete: Option<CompletionHook>,
}

impl Runner {
    /// Builds a runner, registers it with `router`, and schedules the first
    /// step. A run whose agent already sits on the goal is done on return.
    pub fn start(
        program: Box<dyn StepProgram>,
        agent: SharedAgent,
        router: &Rc<InputRouter>,
        clock: Rc<dyn Clock>,
        interval: Duration,
        on_complete: CompletionHook,
    ) -> SharedRunner {
        let runner = Rc::new(RefCell::new(Runner {
            id: RunnerId::next(),
            program,
            state: ExecutionState::new(agent),
            clock,
            interval: clamp_interval(interval),
            phase: RunnerPhase::Paused,
            steps: 0,
            router: Rc::downgrade(router),
            handler: None,
            on_complete: Some(on_complete),
        }));

        let handler = router.add_handler(runner.clone());
        // Hook runs outside the borrow.
        let finished = {
            let mut inner = runner.borrow_mut();
            inner.handler = Some(handler);
            info!(runner = %inner.id, interval_ms = inner.interval.as_millis() as u64, "run started");
            if inner.state.has_reached_goal() {
                inner.conclude(RunOutcome::ReachedGoal)
            } else {
                let now = inner.clock.now();
                inner.schedule_next(now);
                None
            }
        };
        if let Some((on_complete, report)) = finished {
            on_complete(report);
        }
        runner
    }

    pub fn id(&self) -> RunnerId {
        self.id
    }

    pub fn phase(&self) -> RunnerPhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == RunnerPhase::Done
    }

    pub fn is_paused(&self) -> bool {
        self.phase == RunnerPhase::Paused
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    pub fn handler(&self) -> Option<HandlerId> {
        self.handler
    }

    /// Fires the pending step if its time has come.
    ///
    /// A program error ends the run before it is returned here.
    pub fn tick(&mut self) -> Result<Tick, RunnerError> {
        let RunnerPhase::Scheduled { due } = self.phase else {
            return Ok(Tick::Idle);
        };
        let now = self.clock.now();
        if now < due {
            return Ok(Tick::Waiting);
        }
        self.run_step(now)
    }

    pub fn terminate(&mut self) {
        self.finish(RunOutcome::Cancelled);
    }

    pub fn pause(&mut self) {
        if let RunnerPhase::Scheduled { .. } = self.phase {
            self.phase = RunnerPhase::Paused;
            debug!(runner = %self.id, "run paused");
        }
    }

    pub fn resume(&mut self) {
        if self.phase == RunnerPhase::Paused {
            debug!(runner = %self.id, "run resumed");
            let now = self.clock.now();
            self.schedule_next(now);
        }
    }

    /// Shortens the interval. Applies from the next scheduled step.
    pub fn faster(&mut self) {
        self.set_interval(self.interval.saturating_sub(INTERVAL_STEP));
    }

    pub fn slower(&mut self) {
        self.set_interval(self.interval + INTERVAL_STEP);
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = clamp_interval(interval);
        debug!(runner = %self.id, interval_ms = self.interval.as_millis() as u64, "run speed changed");
    }

    fn run_step(&mut self, now: Instant) -> Result<Tick, RunnerError> {
        if self.state.has_reached_goal() {
            self.finish(RunOutcome::ReachedGoal);
            return Ok(Tick::Finished);
        }

        self.steps += 1;
        if let Err(source) = self.program.step(&mut self.state) {
            warn!(runner = %self.id, step = self.steps, error = %source, "program step failed");
            self.finish(RunOutcome::Failed);
            return Err(RunnerError::Program {
                runner: self.id,
                step: self.steps,
                source,
            });
        }

        self.schedule_next(now);
        Ok(if self.is_done() {
            Tick::Finished
        } else {
            Tick::Stepped
        })
    }

    fn schedule_next(&mut self, now: Instant) {
        if self.is_done() {
            return;
        }
        if self.state.has_reached_goal() {
            self.finish(RunOutcome::ReachedGoal);
            return;
        }
        self.phase = RunnerPhase::Scheduled {
            due: now + self.interval,
        };
    }

    fn finish(&mut self, outcome: RunOutcome) {
        if let Some((on_complete, report)) = self.conclude(outcome) {
            on_complete(report);
        }
    }

    /// Marks the run done and leaves the chain. Hands back the hook still owed a call.
    fn conclude(&mut self, outcome: RunOutcome) -> Option<(CompletionHook, RunReport)> {
        if self.is_done() {
            return None;
        }
        self.phase = RunnerPhase::Done;
        if let (Some(router), Some(handler)) = (self.router.upgrade(), self.handler.take()) {
            router.remove_handler(handler);
        }
        info!(runner = %self.id, ?outcome, steps = self.steps, "run finished");
        let report = RunReport {
            runner: self.id,
            outcome,
            steps: self.steps,
        };
        self.on_complete.take().map(|on_complete| (on_complete, report))
    }
}

impl InputHandler for Runner {
    fn handle_key(&mut self, event: &KeyEvent) -> KeyReply {
        if event.released {
            return KeyReply::PassOn;
        }
        match event.code.as_str() {
            keys::ESCAPE => self.terminate(),
            keys::KEY_P => self.pause(),
            keys::KEY_R => self.resume(),
            keys::EQUAL => self.faster(),
            keys::MINUS => self.slower(),
            _ => return KeyReply::PassOn,
        }
        KeyReply::Consumed
    }

    // The program owns the agent while it runs.
    fn handle_gamepad(&mut self, _event: &GamepadStateEvent) -> Propagation {
        Propagation::Stop
    }
}

pub fn clamp_interval(interval: Duration) -> Duration {
    interval.clamp(MIN_INTERVAL, MAX_INTERVAL)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::clock::ManualClock;
    use crate::stepper::agent::{AgentControl, Facing, Marker, Position, Rotation, ThingAhead};

    /// A corridor whose goal is `goal` cells to the right.
    struct Line {
        col: usize,
        goal: usize,
    }

    impl AgentControl for Line {
        fn current_position(&self) -> Position {
            Position::new(0, self.col, Facing::Right)
        }
        fn thing_ahead(&self) -> ThingAhead {
            ThingAhead::Open
        }
        fn has_reached_goal(&self) -> bool {
            self.col >= self.goal
        }
        fn apply_marker(&mut self, _marker: Marker) {}
        fn advance_one_cell(&mut self) {
            self.col += 1;
        }
        fn rotate(&mut self, _rotation: Rotation) {}
        fn teleport_to(&mut self, position: Position) {
            self.col = position.col;
        }
    }

    fn forward() -> Box<dyn StepProgram> {
        Box::new(|state: &mut ExecutionState| -> Result<(), ProgramError> {
            state.move_forward();
            Ok(())
        })
    }

    fn start(
        goal: usize,
        clock: &ManualClock,
        reports: &Rc<Cell<u32>>,
    ) -> (Rc<InputRouter>, SharedRunner) {
        let router = Rc::new(InputRouter::new());
        let reports = reports.clone();
        let runner = Runner::start(
            forward(),
            Rc::new(RefCell::new(Line { col: 0, goal })),
            &router,
            Rc::new(clock.clone()),
            Duration::from_millis(100),
            Box::new(move |_| reports.set(reports.get() + 1)),
        );
        (router, runner)
    }

    #[test]
    fn first_step_waits_one_interval() {
        let clock = ManualClock::new();
        let reports = Rc::new(Cell::new(0));
        let (_router, runner) = start(3, &clock, &reports);

        assert_eq!(runner.borrow_mut().tick(), Ok(Tick::Waiting));
        clock.advance(Duration::from_millis(100));
        assert_eq!(runner.borrow_mut().tick(), Ok(Tick::Stepped));
        assert_eq!(runner.borrow().steps(), 1);
    }

    #[test]
    fn starting_on_the_goal_finishes_immediately() {
        let clock = ManualClock::new();
        let reports = Rc::new(Cell::new(0));
        let (router, runner) = start(0, &clock, &reports);

        assert!(runner.borrow().is_done());
        assert_eq!(reports.get(), 1);
        assert_eq!(router.handler_count(), 0);
    }

    #[test]
    fn hook_for_a_run_done_at_start_sees_a_free_chain() {
        let clock = ManualClock::new();
        let router = Rc::new(InputRouter::new());
        let seen: Rc<RefCell<Option<(usize, bool)>>> = Rc::new(RefCell::new(None));
        let (hook_router, sink) = (router.clone(), seen.clone());
        let runner = Runner::start(
            forward(),
            Rc::new(RefCell::new(Line { col: 0, goal: 0 })),
            &router,
            Rc::new(clock.clone()),
            MIN_INTERVAL,
            Box::new(move |report| {
                assert_eq!(report.outcome, RunOutcome::ReachedGoal);
                let consumed = hook_router.dispatch_key(&KeyEvent::press(keys::ESCAPE));
                *sink.borrow_mut() = Some((hook_router.handler_count(), consumed));
            }),
        );

        assert_eq!(*seen.borrow(), Some((0, false)));
        assert!(runner.try_borrow_mut().is_ok());
        assert!(runner.borrow().is_done());
    }

    #[test]
    fn pause_and_resume_are_idempotent() {
        let clock = ManualClock::new();
        let reports = Rc::new(Cell::new(0));
        let (_router, runner) = start(3, &clock, &reports);
        let mut runner = runner.borrow_mut();

        let scheduled = runner.phase();
        runner.resume();
        assert_eq!(runner.phase(), scheduled);

        runner.pause();
        runner.pause();
        assert_eq!(runner.phase(), RunnerPhase::Paused);

        clock.advance(Duration::from_secs(5));
        assert_eq!(runner.tick(), Ok(Tick::Idle));
        assert_eq!(runner.steps(), 0);

        runner.resume();
        assert_eq!(
            runner.phase(),
            RunnerPhase::Scheduled {
                due: clock.now() + Duration::from_millis(100)
            }
        );
    }

    #[test]
    fn speed_changes_clamp_to_range() {
        let clock = ManualClock::new();
        let reports = Rc::new(Cell::new(0));
        let (_router, runner) = start(3, &clock, &reports);
        let mut runner = runner.borrow_mut();

        runner.faster();
        assert_eq!(runner.interval(), MIN_INTERVAL);
        for _ in 0..20 {
            runner.slower();
        }
        assert_eq!(runner.interval(), MAX_INTERVAL);
    }

    #[test]
    fn failing_step_finishes_before_error_returns() {
        let clock = ManualClock::new();
        let router = Rc::new(InputRouter::new());
        let reports: Rc<RefCell<Vec<RunReport>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = reports.clone();
        let runner = Runner::start(
            Box::new(|_: &mut ExecutionState| -> Result<(), ProgramError> {
                Err(ProgramError::Custom("boom".into()))
            }),
            Rc::new(RefCell::new(Line { col: 0, goal: 5 })),
            &router,
            Rc::new(clock.clone()),
            MIN_INTERVAL,
            Box::new(move |report| sink.borrow_mut().push(report)),
        );

        clock.advance(MIN_INTERVAL);
        let err = runner.borrow_mut().tick().unwrap_err();
        assert_eq!(err.runner(), runner.borrow().id());
        assert!(runner.borrow().is_done());
        assert_eq!(router.handler_count(), 0);
        assert_eq!(reports.borrow().len(), 1);
        assert_eq!(reports.borrow()[0].outcome, RunOutcome::Failed);
    }
}
