pub mod anomaly;
pub mod session;
pub mod signal;

pub use anomaly::{AnomalyEvent, AnomalyKind};
pub use session::{AnswerMap, Session};
pub use signal::RawSignal;
