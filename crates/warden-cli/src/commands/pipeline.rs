use super::{
    colorize_state, json_pretty, spin_fail, spin_ok, SpinnerSink, EXIT_BUSY,
    EXIT_PIPELINE_FAILED, EXIT_SUCCESS,
};
use warden_core::{CollectingSink, CoreError, PipelineKind, PipelineReport, WardenConfig};
use warden_mods::CancelToken;

pub fn run(
    config: &WardenConfig,
    kind: PipelineKind,
    cancel: &CancelToken,
    json: bool,
) -> Result<u8, String> {
    let orchestrator = config.orchestrator();

    let result = if json {
        orchestrator.run(kind, &CollectingSink::new(), cancel)
    } else {
        let sink = SpinnerSink::new(&format!("{kind}..."));
        let result = orchestrator.run(kind, &sink, cancel);
        match &result {
            Ok(report) if report.is_done() => spin_ok(sink.bar(), &format!("{kind} complete")),
            Ok(_) => spin_fail(sink.bar(), &format!("{kind} failed")),
            Err(_) => spin_fail(sink.bar(), &format!("{kind} did not run")),
        }
        result
    };

    let report = match result {
        Ok(report) => report,
        Err(CoreError::PipelineBusy) => {
            eprintln!("error: another pipeline is already running");
            return Ok(EXIT_BUSY);
        }
        Err(e) => return Err(e.to_string()),
    };

    if json {
        println!("{}", json_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.is_done() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_PIPELINE_FAILED)
    }
}

fn print_report(report: &PipelineReport) {
    println!("{} {}", report.kind, colorize_state(&report.state.to_string()));
    if let Some(sync) = &report.sync {
        println!("mods downloaded: {}", sync.downloaded);
        if !sync.failed.is_empty() {
            println!("mods failed: {}", sync.failed.join(", "));
        }
    }
    for warning in &report.warnings {
        println!("warning: {warning}");
    }
    if let Some(failure) = &report.failure {
        println!("failed at {}: {}", failure.phase, failure.message);
    }
}
