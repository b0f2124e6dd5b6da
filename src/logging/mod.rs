//! Logging infrastructure for console progress output and the optional log file.

mod logger;
mod plain;
mod subscriber;
mod types;

pub use logger::Logger;
pub use subscriber::init_subscriber;
pub use types::{Log, StepEntry, StepStatus};
