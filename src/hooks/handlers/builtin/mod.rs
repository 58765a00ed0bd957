//! Built-in hook handlers

mod logging;
mod transform;

pub use self::logging::LoggingHandler;
pub use self::transform::{Transform, TransformHandler};
