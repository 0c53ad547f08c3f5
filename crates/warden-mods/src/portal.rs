use crate::version::{ModRelease, ModVersion};
use crate::{CancelToken, Credentials, ModError, PortalConfig};
use serde::Deserialize;
use std::io::Read;

/// Source of release metadata and artifact bodies.
pub trait ModPortal: Send + Sync {
    /// All releases the portal advertises for `mod_name`, in portal order.
    fn fetch_releases(
        &self,
        mod_name: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<ModRelease>, ModError>;

    /// Open the artifact body of `release` for streaming.
    fn open_download(
        &self,
        release: &ModRelease,
        credentials: &Credentials,
        cancel: &CancelToken,
    ) -> Result<Box<dyn Read>, ModError>;
}

#[derive(Debug, Deserialize)]
struct ModInfo {
    #[serde(default)]
    releases: Vec<WireRelease>,
}

#[derive(Debug, Deserialize)]
struct WireRelease {
    #[serde(default)]
    download_url: String,
    #[serde(default)]
    file_name: String,
    #[serde(default)]
    version: ModVersion,
    #[serde(default)]
    info_json: WireInfoJson,
}

#[derive(Debug, Default, Deserialize)]
struct WireInfoJson {
    #[serde(default)]
    factorio_version: String,
}

impl From<WireRelease> for ModRelease {
    fn from(w: WireRelease) -> Self {
        Self {
            version: w.version,
            engine_version: w.info_json.factorio_version,
            download_path: w.download_url,
            file_name: w.file_name,
        }
    }
}

/// Mod portal client over HTTP.
///
/// - `GET <base>/api/mods/<name>` returns `{"releases": [...]}`
/// - `GET <base><download_url>?username=..&token=..` returns the archive
pub struct HttpPortal {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpPortal {
    pub fn new(config: &PortalConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout()))
            .build();
        Self {
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            agent: ureq::Agent::new_with_config(agent_config),
        }
    }

    fn metadata_url(&self, mod_name: &str) -> Result<String, ModError> {
        let mut url = url::Url::parse(&self.base_url)
            .map_err(|e| ModError::Config(format!("invalid portal url '{}': {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| ModError::Config(format!("portal url '{}' cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "mods", mod_name]);
        Ok(url.into())
    }

    fn call(
        &self,
        req: ureq::RequestBuilder<ureq::typestate::WithoutBody>,
        display_url: &str,
    ) -> Result<ureq::http::Response<ureq::Body>, ModError> {
        match req.call() {
            Ok(resp) => {
                let code = resp.status().as_u16();
                if (200..300).contains(&code) {
                    Ok(resp)
                } else {
                    Err(ModError::Status {
                        status: code,
                        url: display_url.to_owned(),
                    })
                }
            }
            Err(ureq::Error::StatusCode(code)) => Err(ModError::Status {
                status: code,
                url: display_url.to_owned(),
            }),
            Err(e) => Err(ModError::Http(format!("{display_url}: {e}"))),
        }
    }
}

impl ModPortal for HttpPortal {
    fn fetch_releases(
        &self,
        mod_name: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<ModRelease>, ModError> {
        cancel.check()?;
        let url = self.metadata_url(mod_name)?;
        tracing::debug!("GET {url}");
        let resp = self.call(self.agent.get(&url), &url)?;

        let mut body = Vec::new();
        resp.into_body()
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| ModError::Http(format!("{url}: {e}")))?;
        let info: ModInfo =
            serde_json::from_slice(&body).map_err(|e| ModError::InvalidResponse {
                name: mod_name.to_owned(),
                reason: e.to_string(),
            })?;
        Ok(info.releases.into_iter().map(ModRelease::from).collect())
    }

    fn open_download(
        &self,
        release: &ModRelease,
        credentials: &Credentials,
        cancel: &CancelToken,
    ) -> Result<Box<dyn Read>, ModError> {
        cancel.check()?;
        let url = format!("{}{}", self.base_url, release.download_path);
        tracing::debug!("GET {url}");
        let req = self
            .agent
            .get(&url)
            .query("username", &credentials.username)
            .query("token", &credentials.token);
        let resp = self.call(req, &url)?;
        Ok(Box::new(resp.into_body().into_reader()))
    }
}
