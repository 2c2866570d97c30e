use std::cell::{Cell, RefCell};
use std::rc::Rc;

use engine::input::{
    GamepadAxis, GamepadButton, GamepadDiff, GamepadStateEvent, InputHandler, KeyEvent, KeyReply,
    Propagation, keys,
};
use engine::stepper::{Facing, Marker};
use tracing::{debug, warn};

use crate::coder::Coder;
use crate::menu::Menu;
use crate::world::MazeWorld;

/// The base layer of the input chain: direct control of the walker plus
/// the keys that open the coder, start a run and open the new-maze menu.
pub struct GameControls {
    world: Rc<RefCell<MazeWorld>>,
    coder: Rc<RefCell<Coder>>,
    menu: Rc<RefCell<Menu>>,
    next_seed: Rc<Cell<u64>>,
}

impl GameControls {
    pub fn new(
        world: Rc<RefCell<MazeWorld>>,
        coder: Rc<RefCell<Coder>>,
        menu: Rc<RefCell<Menu>>,
        seed: u64,
    ) -> Self {
        Self {
            world,
            coder,
            menu,
            next_seed: Rc::new(Cell::new(seed.wrapping_add(1))),
        }
    }

    /// The coder's key layer would sit above the runner, so it stays shut during a run.
    fn toggle_coder(&self) {
        let mut coder = self.coder.borrow_mut();
        if coder.running() {
            debug!("coder toggle ignored while a program runs");
            return;
        }
        coder.toggle();
    }

    fn run_program(&self) {
        let mut coder = self.coder.borrow_mut();
        coder.hide();
        coder.run();
    }

    /// Opens the size menu; accepting regenerates the maze and cancels any run.
    fn open_new_maze_menu(&self) {
        let world = self.world.clone();
        let coder = self.coder.clone();
        let next_seed = self.next_seed.clone();
        let shown = Menu::show(
            &self.menu,
            Box::new(move |choice| {
                let Some(size) = choice.as_deref().and_then(parse_size_id) else {
                    return;
                };
                coder.borrow().terminate();
                let seed = next_seed.get();
                next_seed.set(seed.wrapping_add(1));
                world.borrow_mut().regenerate(size, seed);
            }),
        );
        if let Err(err) = shown {
            warn!(error = %err, "new maze menu not opened");
        }
    }
}

impl InputHandler for GameControls {
    fn handle_key(&mut self, event: &KeyEvent) -> KeyReply {
        if event.released {
            if event.is(keys::KEY_L) {
                self.world.borrow_mut().set_peeking(false);
                return KeyReply::Consumed;
            }
            return KeyReply::Declined;
        }

        match event.code.as_str() {
            keys::ARROW_UP => self.world.borrow_mut().turn_to_or_move(Facing::Up),
            keys::ARROW_DOWN => self.world.borrow_mut().turn_to_or_move(Facing::Down),
            keys::ARROW_LEFT => self.world.borrow_mut().turn_to_or_move(Facing::Left),
            keys::ARROW_RIGHT => self.world.borrow_mut().turn_to_or_move(Facing::Right),
            keys::ENTER | keys::SPACE => self.world.borrow_mut().move_forward(),
            keys::KEY_V => self.world.borrow_mut().mark(Marker::Visited),
            keys::KEY_B => self.world.borrow_mut().mark(Marker::Blocked),
            keys::KEY_X => self.world.borrow_mut().mark(Marker::None),
            keys::KEY_L => self.world.borrow_mut().set_peeking(true),
            keys::KEY_H => self.world.borrow_mut().go_home(),
            keys::KEY_C => self.toggle_coder(),
            keys::KEY_R => self.run_program(),
            keys::KEY_N => self.open_new_maze_menu(),
            other => {
                debug!(code = other, "unknown key");
                return KeyReply::Declined;
            }
        }
        KeyReply::Consumed
    }

    fn handle_gamepad(&mut self, event: &GamepadStateEvent) -> Propagation {
        let diff = &event.diff;
        if diff.pressed(GamepadButton::Start) {
            self.open_new_maze_menu();
            return Propagation::Stop;
        }

        if let Some(trigger) = diff.axis(GamepadAxis::LT) {
            self.world.borrow_mut().set_visibility((trigger + 1.0) / 2.0);
        }

        if diff.pressed(GamepadButton::Back) {
            self.world.borrow_mut().go_home();
            return Propagation::Stop;
        }

        let mut world = self.world.borrow_mut();
        let visited = diff.pressed(GamepadButton::A);
        let blocked = diff.pressed(GamepadButton::B);
        if visited && !blocked {
            world.mark(Marker::Visited);
        }
        if blocked && !visited {
            world.mark(Marker::Blocked);
        }
        if diff.pressed(GamepadButton::X) {
            world.mark(Marker::None);
        }

        if diff.pressed(GamepadButton::RT) {
            world.move_forward();
        } else if let Some(facing) = sticks_direction(diff) {
            world.turn_to_or_move(facing);
        }
        Propagation::Stop
    }
}

/// The first stick pushed fully to one side, checking the left stick, then
/// the pad, then the right stick; horizontal before vertical.
pub fn sticks_direction(diff: &GamepadDiff) -> Option<Facing> {
    [GamepadAxis::LStickH, GamepadAxis::PadH, GamepadAxis::RStickH]
        .into_iter()
        .find_map(|horizontal| {
            let sideways = match diff.axis(horizontal) {
                Some(v) if v == 1.0 => Some(Facing::Right),
                Some(v) if v == -1.0 => Some(Facing::Left),
                _ => None,
            };
            sideways.or_else(|| {
                let vertical = horizontal.vertical()?;
                match diff.axis(vertical) {
                    Some(v) if v == 1.0 => Some(Facing::Down),
                    Some(v) if v == -1.0 => Some(Facing::Up),
                    _ => None,
                }
            })
        })
}

fn parse_size_id(id: &str) -> Option<usize> {
    id.strip_prefix("size-")?.parse().ok()
}
