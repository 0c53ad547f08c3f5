mod commands;

use clap::{Parser, Subcommand};
use commands::{EXIT_CONFIG_ERROR, EXIT_FAILURE};
use std::path::PathBuf;
use std::process::ExitCode;
use warden_core::{install_signal_handler, PipelineKind, WardenConfig};
use warden_mods::CancelToken;

#[derive(Debug, Parser)]
#[command(
    name = "warden",
    version,
    about = "Mod sync, lifecycle control and readiness gate for a dedicated game server"
)]
struct Cli {
    /// Path to a TOML config file (default: /etc/warden/warden.toml if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the startup sync, publish readiness and serve lifecycle triggers.
    Serve,
    /// Download missing mods from the mod list once.
    Sync,
    /// Clean autosaves, sync mods and start the server container.
    Start,
    /// Stop the server container, then run the start pipeline.
    Restart,
    /// Probe a running warden's health endpoint.
    Health {
        /// Health URL (default: derived from the configured listen address).
        #[arg(long)]
        url: Option<String>,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if matches!(cli.command, Commands::Serve) {
        "info"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("WARDEN_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match WardenConfig::resolve(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let cancel = CancelToken::new();
    let json = cli.json;

    let result = match cli.command {
        Commands::Serve => commands::serve::run(&config, &cancel),
        Commands::Sync => {
            install_signal_handler(cancel.clone(), || {});
            commands::sync::run(&config, &cancel, json)
        }
        Commands::Start => {
            install_signal_handler(cancel.clone(), || {});
            commands::pipeline::run(&config, PipelineKind::Start, &cancel, json)
        }
        Commands::Restart => {
            install_signal_handler(cancel.clone(), || {});
            commands::pipeline::run(&config, PipelineKind::Restart, &cancel, json)
        }
        Commands::Health { url } => commands::health::run(&config, url.as_deref()),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
