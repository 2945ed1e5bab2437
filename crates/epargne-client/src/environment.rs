//! The environment the client talks to, and URL resolution against it.

use std::borrow::Cow;

use crate::Error;

/// Environment variable holding the API base URL.
pub const BASE_URL_ENV: &str = "EPARGNE_API_BASE_URL";

/// Environment variable naming the environment (`development`, `staging`, `production`...).
pub const ENV_NAME_ENV: &str = "EPARGNE_ENV";

/// Environment variable enabling debug mode (`1` or `true`).
pub const DEBUG_ENV: &str = "EPARGNE_DEBUG";

/// The active API environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Environment {
    pub(crate) name: Cow<'static, str>,
    pub(crate) api_base_url: String,
    pub(crate) debug: bool,
}

impl Environment {
    /// An environment with the given base URL, named `custom`, debug off.
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            name: Cow::Borrowed("custom"),
            api_base_url: api_base_url.into(),
            debug: false,
        }
    }

    /// Read the environment from process environment variables.
    pub fn from_env() -> Result<Self, Error> {
        let api_base_url =
            std::env::var(BASE_URL_ENV).map_err(|_| Error::EnvironmentNotInferrable)?;
        if api_base_url.trim().is_empty() {
            return Err(Error::EnvironmentNotInferrable);
        }

        let name = std::env::var(ENV_NAME_ENV).unwrap_or_else(|_| "development".to_string());
        let debug = std::env::var(DEBUG_ENV)
            .map(|value| parse_flag(&value))
            .unwrap_or(false);

        Ok(Self {
            name: Cow::Owned(name),
            api_base_url,
            debug,
        })
    }

    /// Rename the environment.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Cow::Owned(name.into());
        self
    }

    /// Toggle debug mode.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// The environment name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The API base URL.
    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    /// Whether request tracing is enabled.
    pub fn is_debug_mode(&self) -> bool {
        self.debug
    }

    /// Whether the API is served over https, which decides the cookies' `Secure` flag.
    pub fn is_secure(&self) -> bool {
        self.api_base_url.starts_with("https://")
    }

    /// Resolve `endpoint` against this environment's base URL.
    pub fn build_api_url(&self, endpoint: &str) -> String {
        build_api_url(&self.api_base_url, endpoint)
    }
}

/// Resolve `endpoint` against `base_url`.
///
/// Absolute `http://` and `https://` endpoints are returned unchanged. Otherwise a single
/// leading `/` is optional and the two parts are joined with exactly one `/`.
pub fn build_api_url(base_url: &str, endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return endpoint.to_string();
    }

    let endpoint = endpoint.strip_prefix('/').unwrap_or(endpoint);
    let base_url = base_url.strip_suffix('/').unwrap_or(base_url);

    format!("{base_url}/{endpoint}")
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
