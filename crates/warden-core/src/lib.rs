//! Lifecycle orchestration and readiness gating for a managed game-server container.
//!
//! This crate sequences the stop → clean autosaves → sync mods → start pipeline
//! with a declared fatal/non-fatal policy per phase, serialises pipelines with
//! an advisory lock, and owns the one-way readiness flag that the health
//! endpoint publishes once the startup sync has run. It also provides the
//! container runtime abstraction (Docker CLI and mock backends) and the
//! whole-process configuration.

pub mod concurrency;
pub mod config;
pub mod container;
pub mod lifecycle;
pub mod mock;
pub mod pipeline;
pub mod progress;
pub mod readiness;
pub mod saves;
pub mod startup;

pub use concurrency::{install_signal_handler, PipelineLock};
pub use config::WardenConfig;
pub use container::{ContainerRuntime, DockerCli};
pub use lifecycle::{validate_transition, FailurePolicy, Phase, PipelineKind, PipelineState};
pub use pipeline::{Orchestrator, PhaseFailure, PipelineReport, SyncSummary};
pub use progress::{CollectingSink, LogSink, ProgressSink};
pub use readiness::{Readiness, ReadinessGate, ReadyLatch};
pub use saves::SaveStore;
pub use startup::run_startup;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("container error: {0}")]
    Container(#[from] ContainerError),
    #[error("mod sync error: {0}")]
    Mods(#[from] warden_mods::ModError),
    #[error("config error: {0}")]
    Config(String),
    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("saves directory {path}: {source}")]
    Saves {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid pipeline transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("another lifecycle pipeline is already running")]
    PipelineBusy,
    #[error("pipeline lock {path}: {source}")]
    Lock {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("container I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("`{command}` failed ({status}): {output}")]
    CommandFailed {
        command: String,
        status: String,
        output: String,
    },
    #[error("`{command}` did not finish within {secs}s")]
    Timeout { command: String, secs: u64 },
    #[error("container operation cancelled")]
    Cancelled,
}
