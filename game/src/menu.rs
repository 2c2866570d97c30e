use std::cell::RefCell;
use std::rc::{Rc, Weak};

use engine::input::{
    GamepadAxis, GamepadButton, GamepadStateEvent, HandlerId, InputHandler, InputRouter, KeyEvent,
    KeyReply, Propagation, keys,
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub id: String,
    pub label: String,
}

impl MenuItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Called once when the menu closes, with the chosen item id or `None` if
/// it was cancelled.
pub type MenuCallback = Box<dyn FnOnce(Option<String>)>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MenuError {
    #[error("menu is already shown")]
    AlreadyShown,
    #[error("input router has been dropped")]
    RouterGone,
}

/// A modal list. While shown it sits on top of the input chain and keeps
/// every event to itself.
pub struct Menu {
    router: Weak<InputRouter>,
    items: Vec<MenuItem>,
    selected: usize,
    handler: Option<HandlerId>,
    callback: Option<MenuCallback>,
}

impl Menu {
    pub fn new(router: &Rc<InputRouter>, items: Vec<MenuItem>) -> Self {
        Self {
            router: Rc::downgrade(router),
            items,
            selected: 0,
            handler: None,
            callback: None,
        }
    }

    /// Maze sizes offered by the new-maze menu, ids `size-N`.
    pub fn maze_sizes(router: &Rc<InputRouter>, sizes: &[usize]) -> Self {
        let items = sizes
            .iter()
            .map(|size| MenuItem::new(format!("size-{size}"), format!("{size} x {size}")))
            .collect();
        Self::new(router, items)
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn is_shown(&self) -> bool {
        self.callback.is_some()
    }

    pub fn selected(&self) -> Option<&MenuItem> {
        self.items.get(self.selected)
    }

    /// Pre-selects the item with `id`, if present. Selection otherwise
    /// carries over from the last time the menu was shown.
    pub fn select(&mut self, id: &str) {
        if let Some(index) = self.items.iter().position(|item| item.id == id) {
            self.selected = index;
        }
    }

    pub fn show(menu: &Rc<RefCell<Menu>>, callback: MenuCallback) -> Result<(), MenuError> {
        let router = {
            let mut inner = menu.borrow_mut();
            if inner.is_shown() {
                return Err(MenuError::AlreadyShown);
            }
            let router = inner.router.upgrade().ok_or(MenuError::RouterGone)?;
            inner.callback = Some(callback);
            router
        };
        let handler = router.add_handler(menu.clone());
        menu.borrow_mut().handler = Some(handler);
        debug!(%handler, "menu shown");
        Ok(())
    }

    fn move_selection(&mut self, delta: isize) {
        if self.items.is_empty() {
            return;
        }
        let last = self.items.len() as isize - 1;
        self.selected = (self.selected as isize + delta).clamp(0, last) as usize;
    }

    fn complete(&mut self, accepted: bool) {
        let Some(callback) = self.callback.take() else {
            return;
        };
        if let (Some(router), Some(handler)) = (self.router.upgrade(), self.handler.take()) {
            router.remove_handler(handler);
        }
        let choice = accepted
            .then(|| self.selected().map(|item| item.id.clone()))
            .flatten();
        debug!(?choice, "menu closed");
        callback(choice);
    }
}

impl InputHandler for Menu {
    fn handle_key(&mut self, event: &KeyEvent) -> KeyReply {
        if event.released {
            return KeyReply::Declined;
        }
        match event.code.as_str() {
            keys::ESCAPE => self.complete(false),
            keys::ARROW_UP => self.move_selection(-1),
            keys::ARROW_DOWN => self.move_selection(1),
            keys::ENTER => self.complete(true),
            _ => return KeyReply::Declined,
        }
        KeyReply::Consumed
    }

    fn handle_gamepad(&mut self, event: &GamepadStateEvent) -> Propagation {
        let diff = &event.diff;
        if diff.pressed(GamepadButton::B) || diff.pressed(GamepadButton::Back) {
            self.complete(false);
        } else if diff.pressed(GamepadButton::A) {
            self.complete(true);
        } else {
            let vertical = [GamepadAxis::LStickV, GamepadAxis::PadV, GamepadAxis::RStickV]
                .into_iter()
                .find_map(|axis| diff.axis(axis));
            match vertical {
                Some(v) if v == -1.0 => self.move_selection(-1),
                Some(v) if v == 1.0 => self.move_selection(1),
                _ => {}
            }
        }
        Propagation::Stop
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn menu(router: &Rc<InputRouter>) -> Rc<RefCell<Menu>> {
        Rc::new(RefCell::new(Menu::maze_sizes(router, &[8, 12, 16])))
    }

    fn recorder() -> (Rc<RefCell<Vec<Option<String>>>>, MenuCallback) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        (log, Box::new(move |choice| sink.borrow_mut().push(choice)))
    }

    #[test]
    fn selection_is_clamped_and_accepted() {
        let router = Rc::new(InputRouter::new());
        let menu = menu(&router);
        let (log, callback) = recorder();
        Menu::show(&menu, callback).unwrap();

        for _ in 0..5 {
            assert!(router.dispatch_key(&KeyEvent::press(keys::ARROW_DOWN)));
        }
        assert!(router.dispatch_key(&KeyEvent::press(keys::ENTER)));

        assert_eq!(*log.borrow(), vec![Some("size-16".to_string())]);
        assert!(!menu.borrow().is_shown());
        assert_eq!(router.handler_count(), 0);
    }

    #[test]
    fn escape_cancels_with_no_choice() {
        let router = Rc::new(InputRouter::new());
        let menu = menu(&router);
        let (log, callback) = recorder();
        Menu::show(&menu, callback).unwrap();

        assert!(router.dispatch_key(&KeyEvent::press(keys::ESCAPE)));
        assert_eq!(*log.borrow(), vec![None]);
    }

    #[test]
    fn showing_twice_is_an_error() {
        let router = Rc::new(InputRouter::new());
        let menu = menu(&router);
        let (_log, first) = recorder();
        let (_log2, second) = recorder();
        Menu::show(&menu, first).unwrap();
        assert_eq!(Menu::show(&menu, second), Err(MenuError::AlreadyShown));
        assert_eq!(router.handler_count(), 1);
    }

    #[test]
    fn other_keys_are_declined_and_not_passed_on() {
        let router = Rc::new(InputRouter::new());
        let below = Rc::new(Cell::new(0));

        struct Below(Rc<Cell<u32>>);
        impl InputHandler for Below {
            fn handle_key(&mut self, _event: &KeyEvent) -> KeyReply {
                self.0.set(self.0.get() + 1);
                KeyReply::Consumed
            }
            fn handle_gamepad(&mut self, _event: &GamepadStateEvent) -> Propagation {
                Propagation::Continue
            }
        }
        router.add_handler(Rc::new(RefCell::new(Below(below.clone()))));

        let menu = menu(&router);
        let (_log, callback) = recorder();
        Menu::show(&menu, callback).unwrap();

        assert!(!router.dispatch_key(&KeyEvent::press(keys::KEY_N)));
        assert_eq!(below.get(), 0);
    }

    #[test]
    fn selection_carries_over_between_shows() {
        let router = Rc::new(InputRouter::new());
        let menu = menu(&router);
        let (log, callback) = recorder();
        Menu::show(&menu, callback).unwrap();
        router.dispatch_key(&KeyEvent::press(keys::ARROW_DOWN));
        router.dispatch_key(&KeyEvent::press(keys::ESCAPE));

        let (_, callback) = recorder();
        Menu::show(&menu, callback).unwrap();
        assert_eq!(menu.borrow().selected().map(|item| item.id.as_str()), Some("size-12"));
        assert_eq!(*log.borrow(), vec![None]);
    }
}
