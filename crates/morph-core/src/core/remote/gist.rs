use anyhow::{bail, Context, Result};
use morph_domain::{GistPayload, RemoteBundle};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use tracing::{debug, info};
use url::Url;

use super::RemoteSyncError;
use crate::config::Config;
use crate::effects::RemoteClient;

const GIST_MEDIA_TYPE: &str = "application/vnd.github+json";

/// Gist API client: one gist holds one script/document pair.
pub struct GistClient {
    http: Client,
    api_base: Url,
    token: Option<String>,
    token_env: String,
    online: bool,
}

impl GistClient {
    /// # Errors
    /// Returns an error if `api_base` is not an absolute http(s) URL.
    pub fn new(
        http: Client,
        api_base: &str,
        token: Option<String>,
        token_env: impl Into<String>,
        online: bool,
    ) -> Result<Self> {
        let api_base =
            Url::parse(api_base).with_context(|| format!("invalid gist API URL {api_base:?}"))?;
        if api_base.cannot_be_a_base() || !matches!(api_base.scheme(), "http" | "https") {
            bail!("gist API URL must be an http(s) base URL (got {api_base})");
        }
        Ok(Self {
            http,
            api_base,
            token,
            token_env: token_env.into(),
            online,
        })
    }

    /// # Errors
    /// Returns an error if the HTTP client cannot be built or the configured
    /// API URL is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        let remote = config.remote();
        Self::new(
            super::build_http_client()?,
            &remote.api_base,
            remote.token.clone(),
            remote.token_env.clone(),
            config.network().online,
        )
    }

    fn gist_url(&self, remote_ref: &str) -> Result<Url, RemoteSyncError> {
        let id = remote_ref.trim();
        if id.is_empty() || id.contains('/') {
            return Err(RemoteSyncError::InvalidRef {
                remote_ref: remote_ref.to_string(),
            });
        }
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| RemoteSyncError::InvalidRef {
                remote_ref: remote_ref.to_string(),
            })?
            .pop_if_empty()
            .push("gists")
            .push(id);
        Ok(url)
    }

    fn ensure_online(&self) -> Result<(), RemoteSyncError> {
        if self.online {
            Ok(())
        } else {
            Err(RemoteSyncError::Offline)
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(ACCEPT, GIST_MEDIA_TYPE);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn check_status(response: Response, remote_ref: &str) -> Result<Response, RemoteSyncError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                RemoteSyncError::Unauthorized { status }
            }
            StatusCode::NOT_FOUND => RemoteSyncError::NotFound {
                remote_ref: remote_ref.to_string(),
            },
            status => RemoteSyncError::Status { status },
        })
    }
}

impl RemoteClient for GistClient {
    fn fetch_bundle(&self, remote_ref: &str) -> Result<RemoteBundle, RemoteSyncError> {
        self.ensure_online()?;
        let url = self.gist_url(remote_ref)?;
        debug!(%url, "fetching gist");
        let response = self
            .authorize(self.http.get(url))
            .send()
            .map_err(RemoteSyncError::Transport)?;
        let payload: GistPayload = Self::check_status(response, remote_ref)?
            .json()
            .map_err(RemoteSyncError::Decode)?;
        let bundle = RemoteBundle::from(payload);
        info!(
            gist = remote_ref,
            script = bundle.script.is_some(),
            document = bundle.document.is_some(),
            "gist fetched"
        );
        Ok(bundle)
    }

    fn save_bundle(&self, remote_ref: &str, bundle: &RemoteBundle) -> Result<(), RemoteSyncError> {
        self.ensure_online()?;
        if self.token.is_none() {
            return Err(RemoteSyncError::MissingToken {
                env: self.token_env.clone(),
            });
        }
        let url = self.gist_url(remote_ref)?;
        debug!(%url, "saving gist");
        let response = self
            .authorize(self.http.patch(url))
            .json(&bundle.to_payload())
            .send()
            .map_err(RemoteSyncError::Transport)?;
        Self::check_status(response, remote_ref)?;
        info!(gist = remote_ref, "gist saved");
        Ok(())
    }
}
