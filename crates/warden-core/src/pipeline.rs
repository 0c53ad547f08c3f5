use crate::concurrency::PipelineLock;
use crate::container::ContainerRuntime;
use crate::lifecycle::{validate_transition, FailurePolicy, Phase, PipelineKind, PipelineState};
use crate::progress::ProgressSink;
use crate::saves::SaveStore;
use crate::CoreError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};
use warden_mods::{CancelToken, ModSynchronizer, SyncOutcome};

/// Mod sync result as carried in a [`PipelineReport`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub downloaded: usize,
    pub failed: Vec<String>,
    /// Fatal sync error, if the run aborted.
    pub error: Option<String>,
}

impl From<&SyncOutcome> for SyncSummary {
    fn from(outcome: &SyncOutcome) -> Self {
        Self {
            downloaded: outcome.downloaded,
            failed: outcome.failed.clone(),
            error: outcome.fatal.as_ref().map(ToString::to_string),
        }
    }
}

/// The phase that ended a pipeline in `Failed`, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseFailure {
    pub phase: Phase,
    pub message: String,
}

/// Terminal report of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub kind: PipelineKind,
    pub state: PipelineState,
    pub started_at: String,
    pub finished_at: Option<String>,
    /// Non-fatal phase failures, in phase order.
    pub warnings: Vec<String>,
    pub sync: Option<SyncSummary>,
    pub failure: Option<PhaseFailure>,
}

impl PipelineReport {
    fn new(kind: PipelineKind) -> Self {
        Self {
            kind,
            state: PipelineState::Idle,
            started_at: chrono::Utc::now().to_rfc3339(),
            finished_at: None,
            warnings: Vec::new(),
            sync: None,
            failure: None,
        }
    }

    fn finish(&mut self, state: PipelineState) {
        self.state = state;
        self.finished_at = Some(chrono::Utc::now().to_rfc3339());
    }

    pub fn is_done(&self) -> bool {
        self.state == PipelineState::Done
    }
}

/// Runs lifecycle pipelines against one managed server.
///
/// At most one pipeline runs at a time: entry is guarded by an exclusive
/// [`PipelineLock`] and a second trigger gets [`CoreError::PipelineBusy`].
pub struct Orchestrator {
    container: Arc<dyn ContainerRuntime>,
    saves: SaveStore,
    mods: Arc<dyn ModSynchronizer>,
    lock_path: PathBuf,
    running: AtomicBool,
}

impl Orchestrator {
    pub fn new(
        container: Arc<dyn ContainerRuntime>,
        saves: SaveStore,
        mods: Arc<dyn ModSynchronizer>,
        lock_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            container,
            saves,
            mods,
            lock_path: lock_path.into(),
            running: AtomicBool::new(false),
        }
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Whether this orchestrator is inside a pipeline or exclusive sync.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run `kind` to a terminal state, or reject it if another pipeline holds the lock.
    ///
    /// A fatal phase failure is not an `Err`: it is reported as a `Failed`
    /// report naming the phase. `Err` means the pipeline never ran.
    pub fn run(
        &self,
        kind: PipelineKind,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<PipelineReport, CoreError> {
        let Some(_lock) = PipelineLock::try_acquire(&self.lock_path)? else {
            warn!("{kind} rejected: another pipeline is running");
            return Err(CoreError::PipelineBusy);
        };
        self.running.store(true, Ordering::Release);
        let report = self.walk(kind, sink, cancel);
        self.running.store(false, Ordering::Release);
        report
    }

    /// Synchronise mods under the pipeline lock, waiting for it if necessary.
    pub fn sync_exclusive(&self, cancel: &CancelToken) -> Result<SyncOutcome, CoreError> {
        let _lock = PipelineLock::acquire(&self.lock_path)?;
        self.running.store(true, Ordering::Release);
        let outcome = self.mods.sync(cancel);
        self.running.store(false, Ordering::Release);
        Ok(outcome)
    }

    fn walk(
        &self,
        kind: PipelineKind,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<PipelineReport, CoreError> {
        let mut report = PipelineReport::new(kind);
        info!("{kind} pipeline started");

        for &phase in kind.phases() {
            validate_transition(report.state, phase.state())?;
            report.state = phase.state();

            let Err(message) = self.run_phase(phase, &mut report, sink, cancel) else {
                continue;
            };
            match phase.failure_policy() {
                FailurePolicy::Abort => {
                    validate_transition(report.state, PipelineState::Failed)?;
                    error!("{kind} pipeline failed at {phase}: {message}");
                    sink.report(&format!("{phase} failed: {message}"));
                    report.failure = Some(PhaseFailure { phase, message });
                    report.finish(PipelineState::Failed);
                    return Ok(report);
                }
                FailurePolicy::Continue => {
                    warn!("{phase} failed, continuing: {message}");
                    sink.report(&format!("{phase} failed, continuing: {message}"));
                    report.warnings.push(format!("{phase}: {message}"));
                }
            }
        }

        validate_transition(report.state, PipelineState::Done)?;
        report.finish(PipelineState::Done);
        info!("{kind} pipeline done");
        sink.report(&format!("{kind} complete"));
        Ok(report)
    }

    fn run_phase(
        &self,
        phase: Phase,
        report: &mut PipelineReport,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<(), String> {
        match phase {
            Phase::Stop => {
                sink.report(&format!("stopping {}...", self.container.name()));
                self.container.stop(cancel).map_err(|e| e.to_string())?;
                sink.report("server stopped");
            }
            Phase::CleanAutosaves => {
                sink.report("cleaning autosaves...");
                let removed = self.saves.clean_autosaves().map_err(|e| e.to_string())?;
                sink.report(&format!("removed {removed} autosave(s)"));
            }
            Phase::SyncMods => {
                sink.report("syncing mods...");
                let outcome = self.mods.sync(cancel);
                let summary = SyncSummary::from(&outcome);
                sink.report(&format!("mods: {} downloaded", summary.downloaded));
                if !summary.failed.is_empty() {
                    sink.report(&format!("failed mods: {}", summary.failed.join(", ")));
                }
                report.sync = Some(summary);
                if let Some(fatal) = outcome.fatal {
                    return Err(fatal.to_string());
                }
                if !outcome.failed.is_empty() {
                    return Err(format!(
                        "{} mod(s) failed to sync: {}",
                        outcome.failed.len(),
                        outcome.failed.join(", ")
                    ));
                }
            }
            Phase::Start => {
                sink.report(&format!("starting {}...", self.container.name()));
                self.container.start(cancel).map_err(|e| e.to_string())?;
                sink.report("server started");
            }
        }
        Ok(())
    }
}
