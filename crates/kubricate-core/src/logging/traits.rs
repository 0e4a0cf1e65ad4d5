//! Logger trait and type aliases

use std::sync::Arc;

/// Sink for diagnostic messages emitted during composition.
///
/// Implementations must be cheap to call; hot paths log at debug level.
pub trait Logger: Send + Sync {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Owned logger handle.
pub type BoxedLogger = Box<dyn Logger>;

/// Cloneable logger handle, shared across a stack and everything it owns.
pub type SharedLogger = Arc<dyn Logger>;

/// Logger that discards every message.
///
/// Used wherever a logger is required but nothing was attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl NoOpLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Logger for NoOpLogger {
    fn debug(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_logger_discards_everything() {
        let logger: SharedLogger = Arc::new(NoOpLogger::new());
        logger.debug("debug");
        logger.info("info");
        logger.warn("warn");
        logger.error("error");
    }

    #[test]
    fn test_shared_logger_clones_point_at_same_sink() {
        let logger: SharedLogger = Arc::new(NoOpLogger::new());
        let clone = Arc::clone(&logger);
        assert_eq!(Arc::strong_count(&logger), 2);
        clone.info("still works");
    }
}
