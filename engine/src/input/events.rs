use crate::input::gamepad::{GamepadDiff, GamepadState};

/// Platform key codes the built-in handlers understand.
pub mod keys {
    pub const ESCAPE: &str = "Escape";
    pub const ENTER: &str = "Enter";
    pub const SPACE: &str = "Space";
    pub const ARROW_UP: &str = "ArrowUp";
    pub const ARROW_DOWN: &str = "ArrowDown";
    pub const ARROW_LEFT: &str = "ArrowLeft";
    pub const ARROW_RIGHT: &str = "ArrowRight";
    pub const EQUAL: &str = "Equal";
    pub const MINUS: &str = "Minus";
    pub const KEY_B: &str = "KeyB";
    pub const KEY_C: &str = "KeyC";
    pub const KEY_H: &str = "KeyH";
    pub const KEY_L: &str = "KeyL";
    pub const KEY_N: &str = "KeyN";
    pub const KEY_P: &str = "KeyP";
    pub const KEY_R: &str = "KeyR";
    pub const KEY_V: &str = "KeyV";
    pub const KEY_X: &str = "KeyX";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: String,
    pub released: bool,
}

impl KeyEvent {
    pub fn new(code: impl Into<String>, released: bool) -> Self {
        Self {
            code: code.into(),
            released,
        }
    }

    pub fn press(code: impl Into<String>) -> Self {
        Self::new(code, false)
    }

    pub fn release(code: impl Into<String>) -> Self {
        Self::new(code, true)
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }
}

/// One frame's view of a single device: its full state plus what changed.
#[derive(Debug, Clone, PartialEq)]
pub struct GamepadStateEvent {
    pub state: GamepadState,
    pub diff: GamepadDiff,
    pub device: usize,
}

/// What a key handler did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyReply {
    /// Handled; the host should suppress its default action.
    Consumed,
    /// Not handled, and the chain stops here.
    Declined,
    /// Hand the same event to the next handler.
    PassOn,
    /// Handled, but the next handler still sees the event. Reports consumed
    /// if no handler is left to reply.
    ConsumedPassOn,
}

impl KeyReply {
    pub fn consumed(self) -> bool {
        matches!(self, KeyReply::Consumed | KeyReply::ConsumedPassOn)
    }

    pub fn passes_on(self) -> bool {
        matches!(self, KeyReply::PassOn | KeyReply::ConsumedPassOn)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    Stop,
    Continue,
}

pub trait InputHandler {
    fn handle_key(&mut self, event: &KeyEvent) -> KeyReply;

    fn handle_gamepad(&mut self, event: &GamepadStateEvent) -> Propagation;
}
