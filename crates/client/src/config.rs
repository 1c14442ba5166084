//! Configuration for the core client.

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

/// Configuration for the `CoreClient`.
#[derive(Clone)]
pub struct CoreConfig {
    /// Base URL of the core service, e.g. `http://core:8080`.
    pub base_url: Url,

    /// Login name. Empty means the core runs without authentication.
    pub username: String,

    /// Login password.
    pub password: String,

    /// Timeout for each HTTP request.
    pub timeout: Duration,
}

impl CoreConfig {
    /// Create a config for the given base URL with no credentials.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            username: String::new(),
            password: String::new(),
            timeout: default_timeout(),
        }
    }

    /// Parse the base URL from a string.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the address is empty or not an http(s) URL.
    pub fn from_address(address: &str) -> Result<Self> {
        let address = address.trim();
        if address.is_empty() {
            return Err(Error::config_error("core address must not be empty"));
        }
        let base_url = Url::parse(address)
            .map_err(|e| Error::config_error(format!("invalid core address '{address}': {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::config_error(format!(
                "core address '{address}' must use http or https"
            )));
        }
        Ok(Self::new(base_url))
    }

    /// Set the login credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether a login is required before calling the API.
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

const fn default_timeout() -> Duration {
    Duration::from_secs(30)
}
