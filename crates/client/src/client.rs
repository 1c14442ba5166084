//! Client for the core process API.
//!
//! Holds the login session for the lifetime of the process. A `401` from any
//! v3 call triggers one token refresh (or a fresh login when refresh is not
//! possible) followed by exactly one retry of the original request.

use std::fmt;
use std::sync::Arc;

use reqwest::{Method, Response, StatusCode};
use streamsync_core::ProcessConfig;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::CoreConfig;
use crate::error::{Error, Result};
use crate::types::{LoginRequest, LoginResponse, Process, RefreshResponse};

struct Session {
    access_token: String,
    refresh_token: Option<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("refreshable", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

/// Client for the core v3 process API.
#[derive(Debug, Clone)]
pub struct CoreClient {
    /// Configuration for the client.
    config: Arc<CoreConfig>,
    /// HTTP client.
    http_client: reqwest::Client,
    /// Current login session, shared between clones.
    session: Arc<RwLock<Option<Session>>>,
}

impl CoreClient {
    /// Create a new client. No request is made until `login` or an API call.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the HTTP client cannot be built.
    pub fn new(config: CoreConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::config_error(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config: Arc::new(config),
            http_client,
            session: Arc::new(RwLock::new(None)),
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Log in and store the session tokens.
    ///
    /// Without configured credentials the core is assumed to run without
    /// authentication and this is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `Error::Auth` when the credentials are rejected and
    /// `Error::ServiceUnavailable` when core cannot be reached.
    pub async fn login(&self) -> Result<()> {
        if !self.config.has_credentials() {
            info!(core = %self.config.base_url, "No credentials configured, skipping login");
            return Ok(());
        }

        let url = self.endpoint("api/login")?;
        let response = self
            .http_client
            .post(url)
            .json(&LoginRequest {
                username: &self.config.username,
                password: &self.config.password,
            })
            .send()
            .await
            .map_err(|e| Error::service_unavailable(format!("login: {e}")))?;

        let login: LoginResponse = check_status(response, "login")
            .await?
            .json()
            .await
            .map_err(|e| Error::invalid_response(format!("login: {e}")))?;

        *self.session.write().await = Some(Session {
            access_token: login.access_token,
            refresh_token: login.refresh_token,
        });

        info!(
            core = %self.config.base_url,
            username = %self.config.username,
            "Logged in to core"
        );
        Ok(())
    }

    /// List all processes known to core, with their configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::ServiceUnavailable` or `Error::Auth` when the listing
    /// fails, `Error::InvalidResponse` when the body cannot be decoded.
    pub async fn list_processes(&self) -> Result<Vec<Process>> {
        let mut url = self.endpoint("api/v3/process")?;
        url.query_pairs_mut().append_pair("filter", "config");

        let processes: Vec<Process> = self
            .send(Method::GET, url, None, "process list")
            .await?
            .json()
            .await
            .map_err(|e| Error::invalid_response(format!("process list: {e}")))?;

        debug!(count = processes.len(), "Listed core processes");
        Ok(processes)
    }

    /// Create a new process.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` when core rejects the config and
    /// `Error::ServiceUnavailable` when core cannot be reached.
    pub async fn create_process(&self, config: &ProcessConfig) -> Result<()> {
        let url = self.endpoint("api/v3/process")?;
        let resource = format!("process '{}'", config.id);
        self.send(Method::POST, url, Some(config), &resource).await?;
        Ok(())
    }

    /// Replace the configuration of the process `id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` when no such process exists, plus the
    /// errors of `create_process`.
    pub async fn replace_process(&self, id: &str, config: &ProcessConfig) -> Result<()> {
        let url = self.process_url(id)?;
        let resource = format!("process '{id}'");
        self.send(Method::PUT, url, Some(config), &resource).await?;
        Ok(())
    }

    /// Delete the process `id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` when no such process exists and
    /// `Error::ServiceUnavailable` when core cannot be reached.
    pub async fn delete_process(&self, id: &str) -> Result<()> {
        let url = self.process_url(id)?;
        let resource = format!("process '{id}'");
        self.send(Method::DELETE, url, None, &resource).await?;
        Ok(())
    }

    /// Send an authorized request, renewing the session once on `401`.
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&ProcessConfig>,
        resource: &str,
    ) -> Result<Response> {
        let response = self.dispatch(method.clone(), url.clone(), body).await?;

        if response.status() == StatusCode::UNAUTHORIZED && self.config.has_credentials() {
            warn!(resource, "Core rejected the session, re-authenticating");
            self.reauthenticate().await?;
            let retried = self.dispatch(method, url, body).await?;
            return check_status(retried, resource).await;
        }

        check_status(response, resource).await
    }

    async fn dispatch(
        &self,
        method: Method,
        url: Url,
        body: Option<&ProcessConfig>,
    ) -> Result<Response> {
        let token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone());

        let mut request = self.http_client.request(method, url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        request
            .send()
            .await
            .map_err(|e| Error::service_unavailable(e.to_string()))
    }

    async fn reauthenticate(&self) -> Result<()> {
        match self.refresh().await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(error = %e, "Token refresh failed, logging in again");
                self.login().await
            }
        }
    }

    async fn refresh(&self) -> Result<()> {
        let refresh_token = self
            .session
            .read()
            .await
            .as_ref()
            .and_then(|s| s.refresh_token.clone());

        let Some(refresh_token) = refresh_token else {
            return Err(Error::auth("no refresh token available"));
        };

        let url = self.endpoint("api/login/refresh")?;
        let response = self
            .http_client
            .get(url)
            .bearer_auth(refresh_token)
            .send()
            .await
            .map_err(|e| Error::service_unavailable(format!("login refresh: {e}")))?;

        let refreshed: RefreshResponse = check_status(response, "login refresh")
            .await?
            .json()
            .await
            .map_err(|e| Error::invalid_response(format!("login refresh: {e}")))?;

        if let Some(session) = self.session.write().await.as_mut() {
            session.access_token = refreshed.access_token;
        }
        debug!("Refreshed core access token");
        Ok(())
    }

    /// Resolve `path` relative to the base URL, keeping any base path prefix.
    fn endpoint(&self, path: &str) -> Result<Url> {
        let mut base = self.config.base_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        Ok(base.join(path)?)
    }

    fn process_url(&self, id: &str) -> Result<Url> {
        let mut url = self.endpoint("api/v3/process")?;
        url.path_segments_mut()
            .map_err(|()| Error::config_error("core address cannot be used as a base URL"))?
            .push(id);
        Ok(url)
    }
}

/// Map a non-success status onto the client error taxonomy.
async fn check_status(response: Response, resource: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let err = match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            Error::validation(format!("{resource}: {status}: {body}"))
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::auth(format!("{resource}: {status}"))
        }
        StatusCode::NOT_FOUND => Error::not_found(resource),
        s if s.is_server_error() => {
            Error::service_unavailable(format!("{resource}: core returned {status}"))
        }
        _ => Error::invalid_response(format!("{resource}: unexpected status {status}: {body}")),
    };
    Err(err)
}
