//! Translates winit keyboard input into the key codes the input router uses.

use engine::input::KeyEvent;
use winit::event::{ElementState, KeyboardInput, VirtualKeyCode};

/// Platform key code string for `key`, e.g. `KeyA`, `ArrowUp`, `Equal`.
pub fn key_code(key: VirtualKeyCode) -> Option<&'static str> {
    use VirtualKeyCode::*;

    Some(match key {
        A => "KeyA",
        B => "KeyB",
        C => "KeyC",
        D => "KeyD",
        E => "KeyE",
        F => "KeyF",
        G => "KeyG",
        H => "KeyH",
        I => "KeyI",
        J => "KeyJ",
        K => "KeyK",
        L => "KeyL",
        M => "KeyM",
        N => "KeyN",
        O => "KeyO",
        P => "KeyP",
        Q => "KeyQ",
        R => "KeyR",
        S => "KeyS",
        T => "KeyT",
        U => "KeyU",
        V => "KeyV",
        W => "KeyW",
        X => "KeyX",
        Y => "KeyY",
        Z => "KeyZ",
        Key0 => "Digit0",
        Key1 => "Digit1",
        Key2 => "Digit2",
        Key3 => "Digit3",
        Key4 => "Digit4",
        Key5 => "Digit5",
        Key6 => "Digit6",
        Key7 => "Digit7",
        Key8 => "Digit8",
        Key9 => "Digit9",
        Up => "ArrowUp",
        Down => "ArrowDown",
        Left => "ArrowLeft",
        Right => "ArrowRight",
        Escape => "Escape",
        Return => "Enter",
        NumpadEnter => "NumpadEnter",
        Space => "Space",
        Tab => "Tab",
        Back => "Backspace",
        Delete => "Delete",
        Insert => "Insert",
        Home => "Home",
        End => "End",
        PageUp => "PageUp",
        PageDown => "PageDown",
        Equals => "Equal",
        Minus => "Minus",
        NumpadAdd => "NumpadAdd",
        NumpadSubtract => "NumpadSubtract",
        Comma => "Comma",
        Period => "Period",
        Slash => "Slash",
        Backslash => "Backslash",
        Semicolon => "Semicolon",
        Apostrophe => "Quote",
        Grave => "Backquote",
        LBracket => "BracketLeft",
        RBracket => "BracketRight",
        LShift => "ShiftLeft",
        RShift => "ShiftRight",
        LControl => "ControlLeft",
        RControl => "ControlRight",
        LAlt => "AltLeft",
        RAlt => "AltRight",
        F1 => "F1",
        F2 => "F2",
        F3 => "F3",
        F4 => "F4",
        F5 => "F5",
        F6 => "F6",
        F7 => "F7",
        F8 => "F8",
        F9 => "F9",
        F10 => "F10",
        F11 => "F11",
        F12 => "F12",
        _ => return None,
    })
}

pub fn is_released(state: ElementState) -> bool {
    state == ElementState::Released
}

/// The router event for a winit keyboard input, if the key has a code.
#[allow(deprecated)]
pub fn key_event(input: &KeyboardInput) -> Option<KeyEvent> {
    let code = key_code(input.virtual_keycode?)?;
    Some(KeyEvent::new(code, is_released(input.state)))
}
