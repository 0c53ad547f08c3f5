use super::EXIT_SUCCESS;
use std::sync::Arc;
use std::thread;
use tracing::info;
use warden_core::{install_signal_handler, run_startup, ReadinessGate, WardenConfig};
use warden_mods::CancelToken;
use warden_server::AppState;

/// Bind the HTTP surface, run the startup sync, release readiness, then
/// serve lifecycle triggers until SIGINT/SIGTERM.
pub fn run(config: &WardenConfig, cancel: &CancelToken) -> Result<u8, String> {
    let server = Arc::new(warden_server::bind(&config.server.listen).map_err(|e| e.to_string())?);
    info!("listening on {}", config.server.listen);

    let (gate, latch) = ReadinessGate::new();
    let orchestrator = Arc::new(config.orchestrator());
    let state = Arc::new(
        AppState::new(gate)
            .with_orchestrator(Arc::clone(&orchestrator))
            .with_trigger_token(config.server.trigger_token.clone())
            .with_cancel(cancel.clone()),
    );

    {
        let server = Arc::clone(&server);
        install_signal_handler(cancel.clone(), move || server.unblock());
    }

    let srv = Arc::clone(&server);
    let shared = Arc::clone(&state);
    let handle = thread::spawn(move || warden_server::run_server(&srv, &shared));

    // Logged inside; serving continues whatever the outcome.
    let _ = run_startup(&orchestrator, latch, cancel);

    handle
        .join()
        .map_err(|_| "HTTP server thread panicked".to_owned())?;
    // In-flight pipelines hold the cancelled token; let them clean up.
    state.join_workers();
    info!("shut down");
    Ok(EXIT_SUCCESS)
}
