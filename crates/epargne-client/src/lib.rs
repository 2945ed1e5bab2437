//! `epargne-client` is an asynchronous Rust client for the Challenge Épargne REST API.
//!
//! It attaches the stored bearer token to requests, unwraps the `{success, data}` response
//! envelope into typed values, and transparently renews an expired access token once
//! before giving up on the session.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::{sync::Arc, time::Duration};

use http::Method;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::watch;

pub use builder::{ClientBuilder, REFRESH_ENDPOINT_ENV};
pub use environment::{build_api_url, Environment};
pub use error::Error;
pub use request::RequestOptions;

use host::Host;
use refresh::{Refresher, TokenResponse};
use request::Outcome;
use schema::Schema;
use token::{AuthState, TokenPair, TokenStore};
use transport::HttpTransport;

/// Cookie storage.
pub mod cookie;

/// API environment and URL building.
pub mod environment;

/// Side effects on the embedding application.
pub mod host;

/// Payload validation.
pub mod schema;

/// Token storage.
pub mod token;

/// HTTP transport.
pub mod transport;

mod builder;
mod error;
mod recovery;
mod refresh;
mod request;

pub use error::{
    DECODE_ERROR_MESSAGE, MAINTENANCE_MESSAGE, NETWORK_ERROR_MESSAGE, SCHEMA_ERROR_MESSAGE,
    SESSION_EXPIRED_MESSAGE,
};
pub use recovery::is_token_expiry;

/// Default refresh endpoint, relative to the API base URL.
pub const DEFAULT_REFRESH_ENDPOINT: &str = "auth/refresh";

/// The Challenge Épargne API client handle.
///
/// Cloning is cheap, clones share tokens and in-flight token renewals.
#[derive(Clone)]
pub struct Client {
    state: Arc<ClientState>,
}

pub(crate) struct ClientState {
    environment: Environment,
    transport: Arc<dyn HttpTransport>,
    tokens: Arc<TokenStore>,
    refresher: Refresher,
    host: Arc<dyn Host>,
    redirect_delay: Duration,
}

impl Client {
    /// Construct a new builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The environment this client talks to.
    pub fn environment(&self) -> &Environment {
        &self.state.environment
    }

    /// Resolve an endpoint against the API base URL.
    pub fn build_api_url(&self, endpoint: &str) -> String {
        self.state.environment.build_api_url(endpoint)
    }

    /// The token store.
    pub fn tokens(&self) -> &TokenStore {
        &self.state.tokens
    }

    /// Subscribe to authentication state changes.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.tokens.subscribe()
    }

    /// Perform a request and decode the unwrapped payload into `T`.
    ///
    /// Use [serde_json::Value] as `T` to get the payload untouched.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T, Error> {
        let value = self.state.execute(method, endpoint, options).await?;
        serde_json::from_value(value).map_err(error::decode)
    }

    /// Perform a request and validate the unwrapped payload with `schema`.
    pub async fn request_with_schema<S: Schema>(
        &self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
        schema: &S,
    ) -> Result<S::Output, Error> {
        let value = self.state.execute(method, endpoint, options).await?;
        schema.safe_parse(&value).map_err(|err| {
            tracing::debug!(?err, %endpoint, "payload rejected by schema");
            Error::Schema(err)
        })
    }

    /// `GET` an endpoint.
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, Error> {
        self.request(Method::GET, endpoint, RequestOptions::new())
            .await
    }

    /// `POST` a JSON body to an endpoint.
    pub async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &(impl Serialize + ?Sized),
    ) -> Result<T, Error> {
        self.request(Method::POST, endpoint, RequestOptions::new().json(body)?)
            .await
    }

    /// `PUT` a JSON body to an endpoint.
    pub async fn put<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &(impl Serialize + ?Sized),
    ) -> Result<T, Error> {
        self.request(Method::PUT, endpoint, RequestOptions::new().json(body)?)
            .await
    }

    /// `PATCH` an endpoint with a JSON body.
    pub async fn patch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &(impl Serialize + ?Sized),
    ) -> Result<T, Error> {
        self.request(Method::PATCH, endpoint, RequestOptions::new().json(body)?)
            .await
    }

    /// `DELETE` an endpoint.
    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, Error> {
        self.request(Method::DELETE, endpoint, RequestOptions::new())
            .await
    }

    /// Log in against a public endpoint returning `{accessToken, refreshToken?}`,
    /// and store the returned tokens.
    pub async fn login(
        &self,
        endpoint: &str,
        credentials: &(impl Serialize + ?Sized),
    ) -> Result<TokenPair, Error> {
        let options = RequestOptions::new().json(credentials)?.public();
        let TokenResponse {
            access_token,
            refresh_token,
        } = self.request(Method::POST, endpoint, options).await?;

        self.state
            .tokens
            .set_tokens(access_token.clone(), refresh_token.clone());
        tracing::info!("logged in");

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Forget the stored tokens.
    pub fn logout(&self) {
        self.state.tokens.clear_tokens();
        tracing::info!("logged out");
    }

    /// Renew the access token using the refresh token.
    ///
    /// Returns whether new tokens were stored. Concurrent calls share one renewal.
    pub async fn refresh_access_token(&self) -> bool {
        self.state.refresher.refresh_access_token().await
    }
}

impl ClientState {
    async fn execute(
        &self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Value, Error> {
        let stored_token = self.tokens.token();
        let token = options.token.clone().or_else(|| stored_token.clone());
        let url = self.environment.build_api_url(endpoint);

        let response = self
            .send(&method, &url, &options, token.as_deref())
            .await?;

        match self.interpret(response, &options)? {
            Outcome::Done(value) => Ok(value),
            Outcome::TokenExpired => {
                self.recover(&method, &url, &options, stored_token.as_deref())
                    .await
            }
        }
    }
}
