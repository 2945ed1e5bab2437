//! Request execution and response interpretation.

use std::time::Duration;

use epargne_common::envelope::{best_message, Payload};
use http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
};
use serde::Serialize;
use serde_json::Value;

use crate::{
    error,
    host::{schedule_redirect, Notice, MAINTENANCE_PATH},
    recovery,
    transport::{HttpRequest, HttpResponse},
    ClientState, Error,
};

/// Per-call options.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    pub(crate) body: Option<Value>,
    pub(crate) headers: HeaderMap,
    pub(crate) token: Option<String>,
    pub(crate) public: bool,
    pub(crate) timeout: Option<Duration>,
}

impl RequestOptions {
    /// Options with no body, no extra headers, using the stored token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Send `body` serialized as JSON.
    pub fn json(mut self, body: &(impl Serialize + ?Sized)) -> Result<Self, Error> {
        self.body = Some(serde_json::to_value(body).map_err(error::codec)?);
        Ok(self)
    }

    /// Add a header. Headers given here override the defaults.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Use `token` instead of the stored access token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Mark the endpoint as public (login, registration...): a 401 is never recovered.
    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    /// Fail with a network error if no response arrives within `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// What a single attempt yielded when it did not fail outright.
pub(crate) enum Outcome {
    /// The unwrapped payload.
    Done(Value),
    /// A 401 classified as an expired access token on a protected route.
    TokenExpired,
}

impl ClientState {
    /// Perform one HTTP exchange. Errors only when no response was received.
    pub(crate) async fn send(
        &self,
        method: &Method,
        url: &str,
        options: &RequestOptions,
        token: Option<&str>,
    ) -> Result<HttpResponse, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}")).map_err(error::codec)?,
            );
        }
        for (name, value) in &options.headers {
            headers.insert(name.clone(), value.clone());
        }

        let body = options
            .body
            .as_ref()
            .map(serde_json::to_vec)
            .transpose()
            .map_err(error::codec)?;

        let request = HttpRequest {
            method: method.clone(),
            url: url.to_string(),
            headers,
            body,
        };

        if self.environment.is_debug_mode() {
            tracing::debug!(%method, %url, authorized = token.is_some(), "api request");
        }

        let response = match options.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.transport.send(request))
                .await
                .map_err(error::network)?,
            None => self.transport.send(request).await,
        }
        .map_err(|err| {
            tracing::warn!(%method, %url, ?err, "api unreachable");
            error::network(err)
        })?;

        if self.environment.is_debug_mode() {
            tracing::debug!(%method, %url, status = %response.status, "api response");
        }

        Ok(response)
    }

    /// Interpret the response to a first attempt.
    pub(crate) fn interpret(
        &self,
        response: HttpResponse,
        options: &RequestOptions,
    ) -> Result<Outcome, Error> {
        if response.status.is_success() {
            return unwrap_payload(response).map(Outcome::Done);
        }

        if response.status == StatusCode::SERVICE_UNAVAILABLE {
            tracing::warn!("api in maintenance");
            self.host.notify(Notice::maintenance());
            schedule_redirect(self.host.clone(), MAINTENANCE_PATH, self.redirect_delay);
            return Err(Error::Maintenance);
        }

        let (message, details) = describe_failure(&response);

        match response.status {
            StatusCode::UNAUTHORIZED => {
                if options.public || !recovery::is_token_expiry(&message) {
                    Err(Error::Unauthorized { message, details })
                } else {
                    Ok(Outcome::TokenExpired)
                }
            }
            StatusCode::UNPROCESSABLE_ENTITY => Err(Error::Validation {
                message: format!("Erreur de validation: {message}"),
                details,
            }),
            status => Err(Error::Http {
                status,
                message,
                details,
            }),
        }
    }
}

/// Unwrap an OK response. Empty or unparseable bodies resolve to `Null`.
pub(crate) fn unwrap_payload(response: HttpResponse) -> Result<Value, Error> {
    match Payload::from_slice(&response.body) {
        Payload::Success(data) | Payload::Bare(data) => Ok(data),
        failure => Err(Error::Business {
            status: response.status,
            message: failure.failure_message().unwrap_or_default(),
        }),
    }
}

/// The best message of a non-OK response, plus its parsed body.
///
/// Falls back to the status text when the body has nothing to say.
fn describe_failure(response: &HttpResponse) -> (String, Option<Value>) {
    let status_text = || {
        response
            .status
            .canonical_reason()
            .unwrap_or("Unknown status")
            .to_string()
    };

    let Ok(body) = serde_json::from_slice::<Value>(&response.body) else {
        return (status_text(), None);
    };

    let message = body.get("message").and_then(Value::as_str);
    let errors: Vec<String> = body
        .get("errors")
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .filter_map(|error| error.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    (
        best_message(message, &errors).unwrap_or_else(status_text),
        Some(body),
    )
}
