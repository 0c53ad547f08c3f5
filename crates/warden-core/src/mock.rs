use crate::container::ContainerRuntime;
use crate::ContainerError;
use std::sync::Mutex;
use warden_mods::CancelToken;

/// In-memory container runtime for tests and dry runs.
///
/// Records every call in order and fails the operations it is told to.
#[derive(Default)]
pub struct MockRuntime {
    calls: Mutex<Vec<&'static str>>,
    running: Mutex<bool>,
    fail_start: bool,
    fail_stop: bool,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// A runtime that reports the container as already running.
    pub fn running() -> Self {
        Self {
            running: Mutex::new(true),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    #[must_use]
    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().map(|r| *r).unwrap_or(false)
    }

    fn apply(
        &self,
        op: &'static str,
        fail: bool,
        running_after: bool,
        cancel: &CancelToken,
    ) -> Result<(), ContainerError> {
        if cancel.is_cancelled() {
            return Err(ContainerError::Cancelled);
        }
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(op);
        }
        if fail {
            return Err(ContainerError::CommandFailed {
                command: format!("mock {op}"),
                status: "exit status: 1".to_owned(),
                output: format!("mock {op} failure"),
            });
        }
        if let Ok(mut running) = self.running.lock() {
            *running = running_after;
        }
        Ok(())
    }
}

impl ContainerRuntime for MockRuntime {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn start(&self, cancel: &CancelToken) -> Result<(), ContainerError> {
        self.apply("start", self.fail_start, true, cancel)
    }

    fn stop(&self, cancel: &CancelToken) -> Result<(), ContainerError> {
        self.apply("stop", self.fail_stop, false, cancel)
    }
}
