use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use engine::input::{GamepadStateEvent, InputHandler, InputRouter, KeyEvent, KeyReply, Propagation};
use engine::stepper::{
    AgentControl, ExecutionState, Facing, Marker, Position, Rotation, RunOutcome, RunReport,
    Runner, SharedRunner, StepProgram, ThingAhead, Tick,
};
use engine::{ManualClock, ProgramError};
use proptest::prelude::*;

/// Open floor; the goal is reached after `goal_after` forward moves.
struct Floor {
    position: Position,
    moves: usize,
    goal_after: usize,
}

impl Floor {
    fn shared(goal_after: usize) -> Rc<RefCell<Floor>> {
        Rc::new(RefCell::new(Floor {
            position: Position::new(0, 0, Facing::Right),
            moves: 0,
            goal_after,
        }))
    }
}

impl AgentControl for Floor {
    fn current_position(&self) -> Position {
        self.position
    }
    fn thing_ahead(&self) -> ThingAhead {
        ThingAhead::Open
    }
    fn has_reached_goal(&self) -> bool {
        self.moves >= self.goal_after
    }
    fn apply_marker(&mut self, _marker: Marker) {}
    fn advance_one_cell(&mut self) {
        self.moves += 1;
        self.position.col += 1;
    }
    fn rotate(&mut self, rotation: Rotation) {
        self.position.facing = self.position.facing.turned(rotation);
    }
    fn teleport_to(&mut self, position: Position) {
        self.position = position;
    }
}

struct Harness {
    clock: ManualClock,
    router: Rc<InputRouter>,
    runner: SharedRunner,
    reports: Rc<RefCell<Vec<RunReport>>>,
    invocations: Rc<Cell<usize>>,
}

fn harness(goal_after: usize, interval: Duration) -> Harness {
    harness_on(Rc::new(InputRouter::new()), goal_after, interval)
}

fn harness_on(router: Rc<InputRouter>, goal_after: usize, interval: Duration) -> Harness {
    let clock = ManualClock::new();
    let reports = Rc::new(RefCell::new(Vec::new()));
    let invocations = Rc::new(Cell::new(0));

    let counted = invocations.clone();
    let program: Box<dyn StepProgram> =
        Box::new(move |state: &mut ExecutionState| -> Result<(), ProgramError> {
            counted.set(counted.get() + 1);
            state.move_forward();
            Ok(())
        });
    let sink = reports.clone();
    let runner = Runner::start(
        program,
        Floor::shared(goal_after),
        &router,
        Rc::new(clock.clone()),
        interval,
        Box::new(move |report| sink.borrow_mut().push(report)),
    );

    Harness {
        clock,
        router,
        runner,
        reports,
        invocations,
    }
}

impl Harness {
    fn advance_and_tick(&self, dt: Duration) -> Tick {
        self.clock.advance(dt);
        self.runner.borrow_mut().tick().expect("step should not fail")
    }

    fn press(&self, code: &str) -> bool {
        self.router.dispatch_key(&KeyEvent::press(code))
    }
}

#[test]
fn run_reaches_goal_in_exactly_k_invocations() {
    for k in 1..6 {
        let h = harness(k, Duration::from_millis(100));
        let mut ticks = 0;
        while !h.runner.borrow().is_done() {
            h.advance_and_tick(Duration::from_millis(100));
            ticks += 1;
            assert!(ticks <= k, "run should finish within {k} steps");
        }
        assert_eq!(h.invocations.get(), k);
        assert_eq!(h.reports.borrow().len(), 1);
        assert_eq!(h.reports.borrow()[0].outcome, RunOutcome::ReachedGoal);
        assert_eq!(h.reports.borrow()[0].steps, k as u64);
    }
}

#[test]
fn cancel_mid_interval_stops_everything_once() {
    let h = harness(10, Duration::from_millis(300));
    h.advance_and_tick(Duration::from_millis(300));
    assert_eq!(h.invocations.get(), 1);

    h.clock.advance(Duration::from_millis(150));
    assert!(h.press("Escape"));

    assert!(h.runner.borrow().is_done());
    assert!(h.router.handler_ids().is_empty());
    assert_eq!(h.advance_and_tick(Duration::from_secs(10)), Tick::Idle);
    assert_eq!(h.invocations.get(), 1);

    h.runner.borrow_mut().terminate();
    assert_eq!(h.reports.borrow().len(), 1);
    assert_eq!(h.reports.borrow()[0].outcome, RunOutcome::Cancelled);
}

#[test]
fn speed_keys_clamp_additively() {
    let h = harness(10, Duration::from_millis(100));
    for _ in 0..3 {
        assert!(h.press("Minus"));
    }
    assert_eq!(h.runner.borrow().interval(), Duration::from_millis(400));

    assert!(h.press("Equal"));
    assert_eq!(h.runner.borrow().interval(), Duration::from_millis(300));
    for _ in 0..5 {
        h.press("Equal");
    }
    assert_eq!(h.runner.borrow().interval(), Duration::from_millis(100));
}

#[test]
fn new_interval_applies_from_next_schedule() {
    let h = harness(10, Duration::from_millis(100));
    h.press("Minus");
    h.press("Minus");

    // Already-pending step keeps its deadline.
    assert_eq!(h.advance_and_tick(Duration::from_millis(100)), Tick::Stepped);
    assert_eq!(h.advance_and_tick(Duration::from_millis(200)), Tick::Waiting);
    assert_eq!(h.advance_and_tick(Duration::from_millis(100)), Tick::Stepped);
}

#[test]
fn paused_runner_executes_nothing_until_resumed() {
    let h = harness(10, Duration::from_millis(100));
    assert!(h.press("KeyP"));
    assert_eq!(h.advance_and_tick(Duration::from_secs(3)), Tick::Idle);
    assert_eq!(h.invocations.get(), 0);

    assert!(h.press("KeyR"));
    assert_eq!(h.advance_and_tick(Duration::from_millis(99)), Tick::Waiting);
    assert_eq!(h.advance_and_tick(Duration::from_millis(1)), Tick::Stepped);
}

#[test]
fn unknown_keys_reach_the_handler_underneath() {
    struct Base(Rc<RefCell<Vec<String>>>);
    impl InputHandler for Base {
        fn handle_key(&mut self, event: &KeyEvent) -> KeyReply {
            self.0.borrow_mut().push(event.code.clone());
            KeyReply::Consumed
        }
        fn handle_gamepad(&mut self, _event: &GamepadStateEvent) -> Propagation {
            Propagation::Stop
        }
    }

    let seen = Rc::new(RefCell::new(Vec::new()));
    let router = Rc::new(InputRouter::new());
    let base = router.add_handler(Rc::new(RefCell::new(Base(seen.clone()))));
    let h = harness_on(router, 10, Duration::from_millis(100));
    let runner_handler = h.runner.borrow().handler().expect("runner is registered");
    assert_eq!(h.router.handler_ids(), vec![runner_handler, base]);

    h.press("KeyP");
    h.press("ArrowUp");
    h.router.dispatch_key(&KeyEvent::release("KeyP"));
    assert_eq!(*seen.borrow(), vec!["ArrowUp".to_string(), "KeyP".to_string()]);

    h.press("Escape");
    assert_eq!(h.router.handler_ids(), vec![base]);
}

#[test]
fn gamepad_disconnect_does_not_disturb_an_active_run() {
    let h = harness(3, Duration::from_millis(100));
    h.router
        .gamepad_connected(0, engine::input::GamepadState::new(vec![0.0], vec![false]));
    h.advance_and_tick(Duration::from_millis(100));

    h.router.gamepad_disconnected(0);
    assert!(!h.router.frame_requested());
    assert_eq!(h.advance_and_tick(Duration::from_millis(100)), Tick::Stepped);
    assert_eq!(h.advance_and_tick(Duration::from_millis(100)), Tick::Finished);
}

proptest! {
    #[test]
    fn backtracking_stack_tracks_forward_moves(
        counters in proptest::collection::vec(0u32..5, 1..12),
        back in any::<proptest::sample::Index>(),
    ) {
        let n = counters.len();
        let m = back.index(n + 1);
        let mut state = ExecutionState::new(Floor::shared(usize::MAX));
        for &count in &counters {
            for _ in 0..count {
                state.increase_counter();
            }
            state.move_forward();
        }
        for _ in 0..m {
            state.step_back();
        }

        prop_assert_eq!(state.depth(), n - m);
        if m > 0 {
            prop_assert_eq!(state.counter(), counters[n - m]);
        } else {
            prop_assert_eq!(state.counter(), 0);
        }
    }
}
