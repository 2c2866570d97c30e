pub mod blocks;
pub mod coder;
pub mod controls;
pub mod generation;
pub mod input_adapter;
pub mod maze;
pub mod menu;
pub mod session;
pub mod settings;
pub mod world;

pub use blocks::{BlockInterpreter, Program};
pub use session::{Mode, Session};
pub use settings::{Settings, SettingsStore};
pub use world::MazeWorld;
