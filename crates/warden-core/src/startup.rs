use crate::pipeline::Orchestrator;
use crate::readiness::ReadyLatch;
use crate::CoreError;
use tracing::{error, info, warn};
use warden_mods::{CancelToken, SyncOutcome};

/// Run the startup mod sync once, then release the readiness latch.
///
/// The latch is released whatever happens here, including a fatal sync
/// error or a lock failure, so a broken mod setup never keeps dependent
/// containers waiting forever.
pub fn run_startup(
    orchestrator: &Orchestrator,
    latch: ReadyLatch,
    cancel: &CancelToken,
) -> Result<SyncOutcome, CoreError> {
    info!("running startup mod sync");
    let result = orchestrator.sync_exclusive(cancel);

    match &result {
        Ok(outcome) => {
            if let Some(fatal) = &outcome.fatal {
                error!("startup mod sync failed: {fatal}");
            } else if outcome.failed.is_empty() {
                info!("startup mod sync: {} downloaded", outcome.downloaded);
            } else {
                warn!(
                    "startup mod sync: {} downloaded, failed: {}",
                    outcome.downloaded,
                    outcome.failed.join(", ")
                );
            }
        }
        Err(e) => error!("startup mod sync did not run: {e}"),
    }

    latch.release();
    result
}
