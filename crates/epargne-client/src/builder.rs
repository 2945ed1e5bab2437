use std::{borrow::Cow, sync::Arc, time::Duration};

use crate::{
    cookie::{CookieJar, MemoryCookieJar},
    environment::Environment,
    host::{Host, LoggingHost, DEFAULT_REDIRECT_DELAY},
    refresh::Refresher,
    token::TokenStore,
    transport::{HttpTransport, ReqwestTransport},
    Client, ClientState, Error, DEFAULT_REFRESH_ENDPOINT,
};

/// Environment variable overriding the refresh endpoint.
pub const REFRESH_ENDPOINT_ENV: &str = "EPARGNE_REFRESH_ENDPOINT";

/// A builder for configuring a [Client].
pub struct ClientBuilder {
    environment: Option<Environment>,
    debug: Option<bool>,
    refresh_endpoint: Cow<'static, str>,
    transport: Option<Arc<dyn HttpTransport>>,
    cookies: Option<Arc<dyn CookieJar>>,
    host: Option<Arc<dyn Host>>,
    redirect_delay: Duration,
}

impl ClientBuilder {
    pub(crate) fn new() -> Self {
        Self {
            environment: None,
            debug: None,
            refresh_endpoint: Cow::Borrowed(DEFAULT_REFRESH_ENDPOINT),
            transport: None,
            cookies: None,
            host: None,
            redirect_delay: DEFAULT_REDIRECT_DELAY,
        }
    }

    /// Infer the environment from process environment variables.
    ///
    /// See [crate::environment] for the variables read. The refresh endpoint can be
    /// overridden with `EPARGNE_REFRESH_ENDPOINT`.
    pub fn from_environment(mut self) -> Result<Self, Error> {
        let environment = Environment::from_env()?;
        tracing::info!(
            name = environment.name(),
            base_url = environment.api_base_url(),
            "environment inferred"
        );

        if let Ok(refresh_endpoint) = std::env::var(REFRESH_ENDPOINT_ENV) {
            self.refresh_endpoint = refresh_endpoint.into();
        }
        self.environment = Some(environment);
        Ok(self)
    }

    /// Use the given environment.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Override the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.environment = Some(match self.environment.take() {
            Some(mut environment) => {
                environment.api_base_url = base_url;
                environment
            }
            None => Environment::new(base_url),
        });
        self
    }

    /// Override debug mode.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    /// Override the refresh endpoint (default is `auth/refresh`).
    pub fn with_refresh_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.refresh_endpoint = endpoint.into().into();
        self
    }

    /// Use a custom HTTP transport (default is [ReqwestTransport]).
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom cookie jar (default is an empty [MemoryCookieJar]).
    pub fn with_cookie_jar(mut self, cookies: Arc<dyn CookieJar>) -> Self {
        self.cookies = Some(cookies);
        self
    }

    /// Use a custom host (default is [LoggingHost]).
    pub fn with_host(mut self, host: Arc<dyn Host>) -> Self {
        self.host = Some(host);
        self
    }

    /// Override the delay between a notice and its redirect (default is two seconds).
    pub fn with_redirect_delay(mut self, delay: Duration) -> Self {
        self.redirect_delay = delay;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<Client, Error> {
        let mut environment = self.environment.ok_or(Error::EnvironmentNotInferrable)?;
        if let Some(debug) = self.debug {
            environment.debug = debug;
        }

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };
        let cookies: Arc<dyn CookieJar> = match self.cookies {
            Some(cookies) => cookies,
            None => Arc::new(MemoryCookieJar::default()),
        };
        let host: Arc<dyn Host> = match self.host {
            Some(host) => host,
            None => Arc::new(LoggingHost),
        };

        let tokens = Arc::new(TokenStore::new(cookies, environment.is_secure()));
        let refresher = Refresher::new(
            tokens.clone(),
            transport.clone(),
            environment.build_api_url(&self.refresh_endpoint),
        );

        Ok(Client {
            state: Arc::new(ClientState {
                environment,
                transport,
                tokens,
                refresher,
                host,
                redirect_delay: self.redirect_delay,
            }),
        })
    }
}
