pub mod queue;
pub mod timer;
pub mod virtual_clock;

pub use queue::{TimerId, TimerQueue};
pub use timer::{CalibrationStats, HighPrecisionTimer, Timer};
pub use virtual_clock::VirtualClock;
