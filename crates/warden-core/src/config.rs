use crate::container::DockerCli;
use crate::pipeline::Orchestrator;
use crate::saves::SaveStore;
use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use warden_mods::{HttpPortal, ModSyncer, PortalConfig};

/// Config file read when `--config` is not given. Its absence is not an error.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/warden/warden.toml";

const LOCK_DIR_NAME: &str = "warden";
const LOCK_FILE_NAME: &str = "pipeline.lock";

/// Whole-process configuration: defaults, then TOML, then environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    pub portal: PortalConfig,
    pub paths: PathsConfig,
    pub container: ContainerConfig,
    pub server: ServerConfig,
    /// Defaults to `<tmp>/warden/pipeline.lock`. Never placed inside the mods
    /// directory: taking the lock creates missing parents, which would mask
    /// an unmounted mods volume. Point every process that shares a mods
    /// directory at the same file.
    pub lock_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub mods_dir: PathBuf,
    pub mod_list: PathBuf,
    pub saves_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            mods_dir: PathBuf::from("/factorio/mods"),
            mod_list: PathBuf::from("/factorio/mods/mod-list.json"),
            saves_dir: PathBuf::from("/factorio/saves"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    pub name: String,
    pub docker_binary: PathBuf,
    pub timeout_secs: u64,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            name: "factorio".to_owned(),
            docker_binary: PathBuf::from("docker"),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    /// When set, lifecycle triggers must carry `Authorization: Bearer <token>`.
    pub trigger_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_owned(),
            trigger_token: None,
        }
    }
}

impl WardenConfig {
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self, CoreError> {
        toml::from_str(content).map_err(|source| CoreError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load an explicit file, or the default file if it exists, or defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, CoreError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.is_file() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load as [`load_or_default`](Self::load_or_default), then apply the
    /// process environment.
    pub fn resolve(path: Option<&Path>) -> Result<Self, CoreError> {
        let mut config = Self::load_or_default(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override fields from environment variables. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = var("FACTORIO_MOD_PORTAL_USER") {
            self.portal.username = v;
        }
        if let Some(v) = var("FACTORIO_MOD_PORTAL_TOKEN") {
            self.portal.token = v;
        }
        if let Some(v) = var("FACTORIO_VERSION") {
            self.portal.engine_version = v;
        }
        if let Some(v) = var("WARDEN_PORTAL_URL") {
            self.portal.base_url = v.trim_end_matches('/').to_owned();
        }
        if let Some(v) = var("FACTORIO_MODS_DIR") {
            self.paths.mods_dir = PathBuf::from(v);
        }
        if let Some(v) = var("FACTORIO_MOD_LIST_FILE") {
            self.paths.mod_list = PathBuf::from(v);
        }
        if let Some(v) = var("FACTORIO_SAVES_DIR") {
            self.paths.saves_dir = PathBuf::from(v);
        }
        if let Some(v) = var("DOCKER_CONTAINER_NAME") {
            self.container.name = v;
        }
        if let Some(v) = var("WARDEN_LISTEN") {
            self.server.listen = v;
        }
        if let Some(v) = var("WARDEN_TRIGGER_TOKEN") {
            self.server.trigger_token = Some(v);
        }
        if let Some(v) = var("WARDEN_LOCK_FILE") {
            self.lock_file = Some(PathBuf::from(v));
        }
    }

    pub fn lock_path(&self) -> PathBuf {
        self.lock_file
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(LOCK_DIR_NAME).join(LOCK_FILE_NAME))
    }

    pub fn mod_syncer(&self) -> ModSyncer {
        ModSyncer::new(
            Box::new(HttpPortal::new(&self.portal)),
            self.portal.credentials(),
            &self.portal.engine_version,
            &self.paths.mods_dir,
            &self.paths.mod_list,
        )
    }

    pub fn docker(&self) -> DockerCli {
        DockerCli::new(&self.container.name)
            .with_binary(&self.container.docker_binary)
            .with_timeout(Duration::from_secs(self.container.timeout_secs))
    }

    pub fn save_store(&self) -> SaveStore {
        SaveStore::new(&self.paths.saves_dir)
    }

    /// Wire the Docker backend, saves directory and portal-backed syncer together.
    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(
            Arc::new(self.docker()),
            self.save_store(),
            Arc::new(self.mod_syncer()),
            self.lock_path(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use warden_mods::{CancelToken, ModError};

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_deployment_layout() {
        let config = WardenConfig::default();
        assert_eq!(config.paths.mods_dir, Path::new("/factorio/mods"));
        assert_eq!(config.paths.saves_dir, Path::new("/factorio/saves"));
        assert_eq!(config.container.name, "factorio");
        assert_eq!(config.server.listen, "0.0.0.0:8080");
        assert_eq!(config.portal.engine_version, "2.0");
        assert_eq!(
            config.lock_path(),
            std::env::temp_dir().join("warden/pipeline.lock")
        );
        assert!(config.portal.credentials().is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = WardenConfig::parse(
            r#"
lock_file = "/run/warden.lock"

[portal]
username = "alice"
token = "secret"

[container]
name = "factorio-test"
"#,
            Path::new("warden.toml"),
        )
        .unwrap();
        assert_eq!(config.container.name, "factorio-test");
        assert_eq!(config.container.timeout_secs, 120);
        assert_eq!(config.portal.base_url, "https://mods.factorio.com");
        assert!(config.portal.credentials().is_some());
        assert_eq!(config.lock_path(), Path::new("/run/warden.lock"));
    }

    #[test]
    fn malformed_toml_names_file() {
        let err = WardenConfig::parse("[portal\n", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, CoreError::ConfigParse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = WardenConfig::default();
        config.apply_env(env(&[
            ("FACTORIO_MOD_PORTAL_USER", "bob"),
            ("FACTORIO_MOD_PORTAL_TOKEN", "tok"),
            ("FACTORIO_VERSION", "1.1"),
            ("FACTORIO_MODS_DIR", "/srv/mods"),
            ("DOCKER_CONTAINER_NAME", "game"),
            ("WARDEN_PORTAL_URL", "http://127.0.0.1:9000/"),
            ("WARDEN_TRIGGER_TOKEN", "hunter2"),
        ]));
        assert_eq!(config.portal.engine_version, "1.1");
        assert_eq!(config.portal.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.container.name, "game");
        assert_eq!(config.server.trigger_token.as_deref(), Some("hunter2"));
        assert_eq!(config.paths.mods_dir, Path::new("/srv/mods"));
        assert!(!config.lock_path().starts_with("/srv/mods"));
        assert!(config.portal.credentials().is_some());
    }

    #[test]
    fn empty_env_values_do_not_override() {
        let mut config = WardenConfig::default();
        config.apply_env(env(&[("DOCKER_CONTAINER_NAME", ""), ("FACTORIO_VERSION", "")]));
        assert_eq!(config, WardenConfig::default());
    }

    #[test]
    fn missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = WardenConfig::load_or_default(Some(&dir.path().join("nope.toml")));
        assert!(matches!(result, Err(CoreError::Config(_))));
    }

    #[test]
    fn loads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warden.toml");
        std::fs::write(&path, "[server]\nlisten = \"127.0.0.1:9999\"\n").unwrap();
        let config = WardenConfig::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:9999");
    }

    #[test]
    fn unmounted_mods_dir_is_fatal_scan_error() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("mod-list.json");
        std::fs::write(&list, r#"{"mods":[{"name":"ExtraMod","enabled":true}]}"#).unwrap();

        let mut config = WardenConfig::default();
        config.portal = PortalConfig::new("http://127.0.0.1:1").with_credentials("alice", "secret");
        config.paths.mods_dir = dir.path().join("unmounted-mods");
        config.paths.mod_list = list;

        let outcome = config
            .orchestrator()
            .sync_exclusive(&CancelToken::new())
            .unwrap();

        assert!(
            matches!(outcome.fatal, Some(ModError::DirScan { .. })),
            "{outcome:?}"
        );
        assert!(outcome.failed.is_empty());
        assert!(!config.paths.mods_dir.exists());
    }
}
