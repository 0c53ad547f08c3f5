use super::{EXIT_FAILURE, EXIT_SUCCESS};
use std::time::Duration;
use warden_core::WardenConfig;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Health URL for the configured listen address; wildcard hosts probe loopback.
pub fn default_url(listen: &str) -> String {
    let (host, port) = listen.rsplit_once(':').unwrap_or((listen, "8080"));
    let host = match host {
        "" | "0.0.0.0" => "127.0.0.1",
        "[::]" => "[::1]",
        other => other,
    };
    format!("http://{host}:{port}/health")
}

/// Exit 0 when the server answers 200, 1 otherwise. Suitable for a
/// container `HEALTHCHECK`.
pub fn run(config: &WardenConfig, url: Option<&str>) -> Result<u8, String> {
    let url = url.map_or_else(|| default_url(&config.server.listen), str::to_owned);
    let agent_config = ureq::Agent::config_builder()
        .timeout_global(Some(PROBE_TIMEOUT))
        .build();
    let agent = ureq::Agent::new_with_config(agent_config);

    match agent.get(&url).call() {
        Ok(_) => {
            println!("ok");
            Ok(EXIT_SUCCESS)
        }
        Err(ureq::Error::StatusCode(code)) => {
            println!("not ready ({code})");
            Ok(EXIT_FAILURE)
        }
        Err(e) => Err(format!("{url}: {e}")),
    }
}
