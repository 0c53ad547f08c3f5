use crate::ContainerError;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use warden_mods::CancelToken;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

/// Start/stop control over the one managed server container.
pub trait ContainerRuntime: Send + Sync {
    fn name(&self) -> &str;

    fn start(&self, cancel: &CancelToken) -> Result<(), ContainerError>;

    fn stop(&self, cancel: &CancelToken) -> Result<(), ContainerError>;
}

/// Drives the container through the `docker` command line.
///
/// The process needs access to the Docker socket.
pub struct DockerCli {
    binary: PathBuf,
    container: String,
    timeout: Duration,
}

impl DockerCli {
    pub fn new(container: &str) -> Self {
        Self {
            binary: PathBuf::from("docker"),
            container: container.to_owned(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn run(&self, action: &str, cancel: &CancelToken) -> Result<(), ContainerError> {
        let command = format!("{} {action} {}", self.binary.display(), self.container);
        if cancel.is_cancelled() {
            return Err(ContainerError::Cancelled);
        }
        debug!("running `{command}`");

        let mut child = Command::new(&self.binary)
            .arg(action)
            .arg(&self.container)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drained concurrently so a chatty child never blocks on a full pipe.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ContainerError::Cancelled);
            }
            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ContainerError::Timeout {
                    command,
                    secs: self.timeout.as_secs(),
                });
            }
            thread::sleep(POLL_INTERVAL);
        };

        if status.success() {
            return Ok(());
        }
        let mut text = String::from_utf8_lossy(&collect(stdout)).into_owned();
        text.push_str(&String::from_utf8_lossy(&collect(stderr)));
        Err(ContainerError::CommandFailed {
            command,
            status: status.to_string(),
            output: text.trim().to_owned(),
        })
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<thread::JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(handle: Option<thread::JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

impl ContainerRuntime for DockerCli {
    fn name(&self) -> &str {
        &self.container
    }

    fn start(&self, cancel: &CancelToken) -> Result<(), ContainerError> {
        info!("starting container {}", self.container);
        self.run("start", cancel)
    }

    fn stop(&self, cancel: &CancelToken) -> Result<(), ContainerError> {
        info!("stopping container {}", self.container);
        self.run("stop", cancel)
    }
}
