#![forbid(unsafe_code)]

//! Worker configuration.

/// Default name given to worker threads.
pub const DEFAULT_THREAD_NAME: &str = "rill-worker";

/// Settings for [`WorkerContext::spawn`](crate::WorkerContext::spawn).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Name of the spawned thread, visible in panics and debuggers.
    pub thread_name: String,
    /// Stack size in bytes; `None` keeps the platform default.
    pub stack_size: Option<usize>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
            stack_size: None,
        }
    }
}

impl WorkerConfig {
    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    #[must_use]
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.thread_name, "rill-worker");
        assert_eq!(config.stack_size, None);
    }

    #[test]
    fn builder_setters() {
        let config = WorkerConfig::default()
            .with_thread_name("ui")
            .with_stack_size(1 << 20);
        assert_eq!(config.thread_name, "ui");
        assert_eq!(config.stack_size, Some(1 << 20));
    }
}
