use std::sync::Mutex;

/// Receives ordered, human-readable status lines while a pipeline runs.
pub trait ProgressSink: Send + Sync {
    fn report(&self, message: &str);
}

/// Forwards progress to the tracing subscriber.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn report(&self, message: &str) {
        tracing::info!("{message}");
    }
}

/// Buffers progress lines for later retrieval.
#[derive(Default)]
pub struct CollectingSink {
    lines: Mutex<Vec<String>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl ProgressSink for CollectingSink {
    fn report(&self, message: &str) {
        tracing::debug!("{message}");
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(message.to_owned());
        }
    }
}
