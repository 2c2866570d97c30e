//! Input routing and cooperative program stepping for a single-threaded host loop.

pub mod clock;
pub mod error;
pub mod input;
pub mod logging;
pub mod stepper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ProgramError, RunnerError};
