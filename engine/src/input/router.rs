use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::input::events::{GamepadStateEvent, InputHandler, KeyEvent, Propagation};
use crate::input::gamepad::{DIFF_REFIRE_DELAY, GamepadSampler, GamepadState};

pub type SharedHandler = Rc<RefCell<dyn InputHandler>>;

/// Registration token; removal is by this identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler#{}", self.0)
    }
}

/// The host's view of attached controllers, read once per frame.
pub trait GamepadSource {
    fn connected(&mut self) -> Vec<(usize, GamepadState)>;
}

/// Ordered handler chain plus the per-frame gamepad poll.
///
/// All methods take `&self` so handlers may add or remove registrations
/// (including their own) while a dispatch is walking the chain.
pub struct InputRouter {
    handlers: RefCell<Vec<(HandlerId, SharedHandler)>>,
    next_id: Cell<u64>,
    gamepads: RefCell<BTreeMap<usize, GamepadSampler>>,
    frame_requested: Cell<bool>,
    refire_delay: Duration,
}

impl InputRouter {
    pub fn new() -> Self {
        Self::with_refire_delay(DIFF_REFIRE_DELAY)
    }

    pub fn with_refire_delay(refire_delay: Duration) -> Self {
        Self {
            handlers: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
            gamepads: RefCell::new(BTreeMap::new()),
            frame_requested: Cell::new(false),
            refire_delay,
        }
    }

    /// Registers `handler` ahead of every existing one.
    pub fn add_handler(&self, handler: SharedHandler) -> HandlerId {
        let id = HandlerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.handlers.borrow_mut().insert(0, (id, handler));
        debug!(%id, "input handler added");
        id
    }

    pub fn remove_handler(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let Some(pos) = handlers.iter().position(|(h, _)| *h == id) else {
            return false;
        };
        handlers.remove(pos);
        debug!(%id, "input handler removed");
        true
    }

    pub fn contains(&self, id: HandlerId) -> bool {
        self.handlers.borrow().iter().any(|(h, _)| *h == id)
    }

    /// Registered handlers, first-to-be-asked first.
    pub fn handler_ids(&self) -> Vec<HandlerId> {
        self.handlers.borrow().iter().map(|(id, _)| *id).collect()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }

    /// Walks the chain with one key event. Returns whether the host's default
    /// action should be suppressed, as decided by the handler that ended the
    /// walk, including the last one reached when every handler passes on.
    pub fn dispatch_key(&self, event: &KeyEvent) -> bool {
        let mut consumed = false;
        for (id, handler) in self.chain() {
            if !self.contains(id) {
                continue;
            }
            let Ok(mut handler) = handler.try_borrow_mut() else {
                warn!(%id, code = %event.code, "handler busy; skipping re-entrant key dispatch");
                continue;
            };
            let reply = handler.handle_key(event);
            consumed = reply.consumed();
            if !reply.passes_on() {
                break;
            }
        }
        consumed
    }

    pub fn dispatch_gamepad(&self, event: &GamepadStateEvent) {
        for (id, handler) in self.chain() {
            if !self.contains(id) {
                continue;
            }
            let Ok(mut handler) = handler.try_borrow_mut() else {
                warn!(%id, device = event.device, "handler busy; skipping re-entrant gamepad dispatch");
                continue;
            };
            if handler.handle_gamepad(event) == Propagation::Stop {
                break;
            }
        }
    }

    pub fn gamepad_connected(&self, device: usize, baseline: GamepadState) {
        self.gamepads
            .borrow_mut()
            .insert(device, GamepadSampler::with_refire_delay(baseline, self.refire_delay));
        info!(device, "gamepad connected");
        self.frame_requested.set(true);
    }

    pub fn gamepad_disconnected(&self, device: usize) {
        let mut gamepads = self.gamepads.borrow_mut();
        if gamepads.remove(&device).is_some() {
            info!(device, "gamepad disconnected");
        }
        if gamepads.is_empty() {
            self.frame_requested.set(false);
        }
    }

    pub fn connected_gamepads(&self) -> Vec<usize> {
        self.gamepads.borrow().keys().copied().collect()
    }

    /// Whether the host should call [`InputRouter::run_frame`] on its next frame.
    pub fn frame_requested(&self) -> bool {
        self.frame_requested.get()
    }

    /// One animation frame: rescan devices, diff each one, dispatch non-empty
    /// diffs, and ask for another frame only while a device remains.
    pub fn run_frame(&self, source: &mut dyn GamepadSource, now: Instant) {
        self.frame_requested.set(false);
        let mut current: BTreeMap<usize, GamepadState> = source.connected().into_iter().collect();

        let gone: Vec<usize> = self
            .gamepads
            .borrow()
            .keys()
            .filter(|device| !current.contains_key(*device))
            .copied()
            .collect();
        for device in gone {
            self.gamepad_disconnected(device);
        }
        let fresh: Vec<(usize, GamepadState)> = current
            .iter()
            .filter(|(device, _)| !self.gamepads.borrow().contains_key(*device))
            .map(|(device, state)| (*device, state.clone()))
            .collect();
        for (device, state) in fresh {
            self.gamepad_connected(device, state);
        }

        let events: Vec<GamepadStateEvent> = {
            let mut gamepads = self.gamepads.borrow_mut();
            gamepads
                .iter_mut()
                .filter_map(|(&device, sampler)| {
                    let sample = current.remove(&device)?;
                    let diff = sampler.sample(sample, now);
                    (!diff.is_empty()).then(|| GamepadStateEvent {
                        state: sampler.state().clone(),
                        diff,
                        device,
                    })
                })
                .collect()
        };
        for event in &events {
            self.dispatch_gamepad(event);
        }

        self.frame_requested.set(!self.gamepads.borrow().is_empty());
    }

    fn chain(&self) -> Vec<(HandlerId, SharedHandler)> {
        self.handlers.borrow().clone()
    }
}

impl Default for InputRouter {
    fn default() -> Self {
        Self::new()
    }
}
