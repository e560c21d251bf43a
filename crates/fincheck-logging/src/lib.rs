pub mod level;
pub mod subscriber;

pub use level::LogLevel;
pub use subscriber::{init_logging, LogFormat, LoggingConfig, LoggingError};
