mod events;
mod gamepad;
mod router;

pub use events::{GamepadStateEvent, InputHandler, KeyEvent, KeyReply, Propagation, keys};
pub use gamepad::{
    AxisReport, DIFF_REFIRE_DELAY, GamepadAxis, GamepadButton, GamepadDiff, GamepadSampler,
    GamepadState,
};
pub use router::{GamepadSource, HandlerId, InputRouter, SharedHandler};
