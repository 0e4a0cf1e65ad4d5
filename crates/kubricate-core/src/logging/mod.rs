//! Logging abstraction for composition and secret orchestration.
//!
//! The composer, stacks, managers, connectors, and providers all accept an
//! optional [`Logger`]. Logging is purely informational: attaching one, or
//! attaching none, never changes what a build or an injection produces.

mod console;
mod traits;

pub use console::{ConsoleLogger, LogLevel};
pub use traits::{BoxedLogger, Logger, NoOpLogger, SharedLogger};
