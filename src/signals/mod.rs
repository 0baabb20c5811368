pub mod controller;
pub mod frame_sampler;
pub mod watchers;

pub use controller::SignalController;
