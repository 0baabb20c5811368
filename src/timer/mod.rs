pub mod controller;
pub mod state;

pub use controller::{TimerController, TimerEvent};
pub use state::{TickOutcome, TimerState, TimerStatus};
