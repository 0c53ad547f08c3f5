use super::{json_pretty, spin_fail, spin_ok, spinner, EXIT_FAILURE, EXIT_SUCCESS};
use warden_core::{SyncSummary, WardenConfig};
use warden_mods::CancelToken;

pub fn run(config: &WardenConfig, cancel: &CancelToken, json: bool) -> Result<u8, String> {
    if config.portal.credentials().is_none() && !json {
        eprintln!("note: mod portal credentials not set, nothing will be downloaded");
    }

    let orchestrator = config.orchestrator();
    let pb = if json {
        None
    } else {
        Some(spinner("syncing mods..."))
    };

    let outcome = orchestrator.sync_exclusive(cancel).map_err(|e| {
        if let Some(ref pb) = pb {
            spin_fail(pb, "mod sync did not run");
        }
        e.to_string()
    })?;
    let summary = SyncSummary::from(&outcome);

    if let Some(ref pb) = pb {
        if outcome.is_clean() {
            spin_ok(pb, &format!("{} mod(s) downloaded", summary.downloaded));
        } else {
            spin_fail(pb, "mod sync incomplete");
        }
    }

    if json {
        println!("{}", json_pretty(&summary)?);
    } else {
        if !summary.failed.is_empty() {
            println!("failed: {}", summary.failed.join(", "));
        }
        if let Some(error) = &summary.error {
            println!("error: {error}");
        }
    }

    if outcome.is_clean() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILURE)
    }
}
