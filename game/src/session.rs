use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::time::Instant;

use engine::input::{GamepadSource, GamepadState, HandlerId, InputRouter, KeyEvent};
use engine::stepper::{RunnerPhase, Tick};
use engine::{Clock, RunnerError};
use tracing::info;

use crate::blocks::Program;
use crate::coder::Coder;
use crate::controls::GameControls;
use crate::menu::Menu;
use crate::settings::Settings;
use crate::world::MazeWorld;

pub const MENU_SIZES: [usize; 5] = [8, 12, 16, 20, 24];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Exploring,
    Coding,
    Running,
    Menu,
}

/// Everything one player sees, wired to one input chain. The host loop
/// feeds it keys, gamepad notices, frames and timer ticks.
pub struct Session {
    clock: Rc<dyn Clock>,
    router: Rc<InputRouter>,
    world: Rc<RefCell<MazeWorld>>,
    coder: Rc<RefCell<Coder>>,
    menu: Rc<RefCell<Menu>>,
    controls: HandlerId,
}

impl Session {
    pub fn new(settings: &Settings, clock: Rc<dyn Clock>) -> Self {
        let settings = settings.sanitized();
        let router = Rc::new(InputRouter::with_refire_delay(settings.input.refire_delay));
        let world = Rc::new(RefCell::new(MazeWorld::generate(
            settings.maze.size,
            settings.maze.seed,
        )));
        let coder = Rc::new(RefCell::new(
            Coder::new(router.clone(), world.clone(), clock.clone())
                .with_interval(settings.runner.initial_interval)
                .with_max_evaluations(settings.blocks.max_evaluations_per_step),
        ));

        let mut menu = Menu::maze_sizes(&router, &MENU_SIZES);
        menu.select(&format!("size-{}", settings.maze.size));
        let menu = Rc::new(RefCell::new(menu));

        let controls = router.add_handler(Rc::new(RefCell::new(GameControls::new(
            world.clone(),
            coder.clone(),
            menu.clone(),
            settings.maze.seed,
        ))));
        info!(size = settings.maze.size, seed = settings.maze.seed, "session ready");

        Self {
            clock,
            router,
            world,
            coder,
            menu,
            controls,
        }
    }

    pub fn router(&self) -> &Rc<InputRouter> {
        &self.router
    }

    pub fn world(&self) -> Ref<'_, MazeWorld> {
        self.world.borrow()
    }

    pub fn coder(&self) -> &Rc<RefCell<Coder>> {
        &self.coder
    }

    pub fn menu(&self) -> &Rc<RefCell<Menu>> {
        &self.menu
    }

    pub fn controls_handler(&self) -> HandlerId {
        self.controls
    }

    pub fn set_program(&self, program: Program) {
        self.coder.borrow_mut().set_program(program);
    }

    pub fn mode(&self) -> Mode {
        let coder = self.coder.borrow();
        if self.menu.borrow().is_shown() {
            Mode::Menu
        } else if coder.running() {
            Mode::Running
        } else if coder.visible() {
            Mode::Coding
        } else {
            Mode::Exploring
        }
    }

    /// Returns whether the host should suppress the key's default action.
    pub fn key_event(&self, code: &str, released: bool) -> bool {
        self.router.dispatch_key(&KeyEvent::new(code, released))
    }

    pub fn gamepad_connected(&self, device: usize, baseline: GamepadState) {
        self.router.gamepad_connected(device, baseline);
    }

    pub fn gamepad_disconnected(&self, device: usize) {
        self.router.gamepad_disconnected(device);
    }

    /// Samples gamepads if a frame is pending. Returns whether another
    /// frame should be scheduled.
    pub fn frame(&self, source: &mut dyn GamepadSource) -> bool {
        if self.router.frame_requested() {
            self.router.run_frame(source, self.clock.now());
        }
        self.router.frame_requested()
    }

    pub fn tick(&self) -> Result<Option<Tick>, RunnerError> {
        self.coder.borrow().tick()
    }

    /// When the active run next wants a tick, if it is waiting on its timer.
    pub fn next_deadline(&self) -> Option<Instant> {
        let runner = self.coder.borrow().active_runner()?;
        match runner.borrow().phase() {
            RunnerPhase::Scheduled { due } => Some(due),
            RunnerPhase::Paused | RunnerPhase::Done => None,
        }
    }
}

impl Drop for Session {
    // The controls layer holds the coder, which holds the router.
    fn drop(&mut self) {
        self.router.remove_handler(self.controls);
    }
}
