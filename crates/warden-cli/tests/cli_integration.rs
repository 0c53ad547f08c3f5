//! CLI subprocess integration tests.
//!
//! These tests invoke the `warden` binary as a subprocess and verify exit
//! codes, stdout content, and JSON output.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const ENV_VARS: &[&str] = &[
    "FACTORIO_MOD_PORTAL_USER",
    "FACTORIO_MOD_PORTAL_TOKEN",
    "FACTORIO_VERSION",
    "FACTORIO_MODS_DIR",
    "FACTORIO_MOD_LIST_FILE",
    "FACTORIO_SAVES_DIR",
    "DOCKER_CONTAINER_NAME",
    "WARDEN_LISTEN",
    "WARDEN_TRIGGER_TOKEN",
    "WARDEN_LOCK_FILE",
    "WARDEN_PORTAL_URL",
    "WARDEN_LOG",
];

fn warden_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_warden"));
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

/// A scratch server layout plus a config file pointing at it.
struct Layout {
    dir: tempfile::TempDir,
    config: PathBuf,
}

impl Layout {
    fn new(docker_binary: &str, mods: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mods_dir = dir.path().join("mods");
        let saves_dir = dir.path().join("saves");
        fs::create_dir_all(&mods_dir).unwrap();
        fs::create_dir_all(&saves_dir).unwrap();

        let entries: Vec<String> = mods
            .iter()
            .map(|m| format!(r#"{{"name": "{m}", "enabled": true}}"#))
            .collect();
        fs::write(
            mods_dir.join("mod-list.json"),
            format!(r#"{{"mods": [{}]}}"#, entries.join(", ")),
        )
        .unwrap();

        let config = dir.path().join("warden.toml");
        fs::write(
            &config,
            format!(
                r#"
lock_file = "{lock}"

[portal]
base_url = "http://127.0.0.1:1"
timeout_secs = 5

[paths]
mods_dir = "{mods}"
mod_list = "{mods}/mod-list.json"
saves_dir = "{saves}"

[container]
name = "factorio-test"
docker_binary = "{docker_binary}"
timeout_secs = 10
"#,
                mods = mods_dir.display(),
                saves = saves_dir.display(),
                lock = dir.path().join("pipeline.lock").display(),
            ),
        )
        .unwrap();

        Self { dir, config }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn run(&self, args: &[&str]) -> Output {
        warden_bin()
            .arg("--config")
            .arg(&self.config)
            .args(args)
            .output()
            .unwrap()
    }
}

fn json_stdout(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("invalid JSON ({e}): {stdout}"))
}

#[test]
fn cli_version_exits_zero() {
    let output = warden_bin().arg("--version").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("warden"));
}

#[test]
fn cli_help_lists_commands() {
    let output = warden_bin().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for cmd in ["serve", "sync", "start", "restart", "health"] {
        assert!(stdout.contains(cmd), "help must list '{cmd}'");
    }
}

#[test]
fn missing_explicit_config_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let output = warden_bin()
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("sync")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn malformed_config_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("warden.toml");
    fs::write(&config, "[paths\nmods_dir = 1").unwrap();
    let output = warden_bin()
        .arg("--config")
        .arg(&config)
        .arg("sync")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("warden.toml"));
}

#[test]
fn sync_without_credentials_is_noop() {
    let layout = Layout::new("true", &["ExtraMod"]);
    let output = layout.run(&["--json", "sync"]);
    assert!(output.status.success(), "{output:?}");

    let json = json_stdout(&output);
    assert_eq!(json["downloaded"], 0);
    assert_eq!(json["failed"].as_array().unwrap().len(), 0);
    assert!(json["error"].is_null());
}

#[test]
fn sync_reports_unreachable_portal_per_mod() {
    let layout = Layout::new("true", &["base", "ExtraMod"]);
    let output = warden_bin()
        .arg("--config")
        .arg(&layout.config)
        .args(["--json", "sync"])
        .env("FACTORIO_MOD_PORTAL_USER", "alice")
        .env("FACTORIO_MOD_PORTAL_TOKEN", "secret")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let json = json_stdout(&output);
    assert_eq!(json["failed"], serde_json::json!(["ExtraMod"]));
    assert!(json["error"].is_null());
}

#[test]
fn sync_with_missing_list_is_fatal() {
    let layout = Layout::new("true", &[]);
    fs::remove_file(layout.path().join("mods/mod-list.json")).unwrap();
    let output = warden_bin()
        .arg("--config")
        .arg(&layout.config)
        .args(["--json", "sync"])
        .env("FACTORIO_MOD_PORTAL_USER", "alice")
        .env("FACTORIO_MOD_PORTAL_TOKEN", "secret")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(json_stdout(&output)["error"]
        .as_str()
        .unwrap()
        .contains("mod-list.json"));
}

#[cfg(unix)]
#[test]
fn start_pipeline_with_working_runtime() {
    let layout = Layout::new("true", &[]);
    fs::write(layout.path().join("saves/_autosave1.zip"), b"old").unwrap();

    let output = layout.run(&["--json", "start"]);
    assert!(output.status.success(), "{output:?}");

    let json = json_stdout(&output);
    assert_eq!(json["kind"], "start");
    assert_eq!(json["state"], "done");
    assert!(!layout.path().join("saves/_autosave1.zip").exists());
}

#[cfg(unix)]
#[test]
fn restart_with_failing_runtime_exits_3() {
    let layout = Layout::new("false", &[]);
    fs::write(layout.path().join("saves/_autosave1.zip"), b"old").unwrap();

    let output = layout.run(&["--json", "restart"]);
    assert_eq!(output.status.code(), Some(3));

    let json = json_stdout(&output);
    assert_eq!(json["state"], "failed");
    assert_eq!(json["failure"]["phase"], "stop");
    // Stop is fatal, so cleanup never ran.
    assert!(layout.path().join("saves/_autosave1.zip").exists());
}

#[test]
fn pipeline_while_locked_exits_4() {
    let layout = Layout::new("true", &[]);
    let _held = warden_core::PipelineLock::acquire(&layout.path().join("pipeline.lock")).unwrap();

    let output = layout.run(&["start"]);
    assert_eq!(output.status.code(), Some(4));
    assert!(String::from_utf8_lossy(&output.stderr).contains("already running"));
}

#[test]
fn health_probe_follows_readiness() {
    let (gate, latch) = warden_core::ReadinessGate::new();
    let server = warden_server::TestServer::start(warden_server::AppState::new(gate)).unwrap();
    let url = format!("{}/health", server.url);

    let before = warden_bin().args(["health", "--url", &url]).output().unwrap();
    assert_eq!(before.status.code(), Some(1));

    latch.release();
    let after = warden_bin().args(["health", "--url", &url]).output().unwrap();
    assert!(after.status.success());
    assert_eq!(String::from_utf8_lossy(&after.stdout).trim(), "ok");
}

#[test]
fn health_probe_without_server_fails() {
    let output = warden_bin()
        .args(["health", "--url", "http://127.0.0.1:1/health"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}
