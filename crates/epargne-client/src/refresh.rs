//! Access token renewal.

use std::sync::{Arc, Mutex, PoisonError};

use epargne_common::envelope::Payload;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    HeaderMap, HeaderValue, Method,
};
use serde::Deserialize;

use crate::{
    token::TokenStore,
    transport::{HttpRequest, HttpTransport},
};

/// Token pair as returned by the login and refresh endpoints.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Renews the access token with the refresh token.
///
/// Concurrent renewals share one request: whoever asks while a renewal is in flight
/// waits for that renewal's outcome instead of starting another.
#[derive(Clone)]
pub(crate) struct Refresher {
    inner: Arc<RefresherInner>,
}

struct RefresherInner {
    tokens: Arc<TokenStore>,
    transport: Arc<dyn HttpTransport>,
    url: String,
    in_flight: Mutex<Option<Shared<BoxFuture<'static, bool>>>>,
}

impl Refresher {
    pub fn new(tokens: Arc<TokenStore>, transport: Arc<dyn HttpTransport>, url: String) -> Self {
        Self {
            inner: Arc::new(RefresherInner {
                tokens,
                transport,
                url,
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Renew the access token. Returns whether new tokens were stored.
    pub async fn refresh_access_token(&self) -> bool {
        let renewal = {
            let mut in_flight = self
                .inner
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            match in_flight.as_ref() {
                Some(renewal) => {
                    tracing::debug!("joining in-flight token refresh");
                    renewal.clone()
                }
                None => {
                    let inner = self.inner.clone();
                    let renewal = async move {
                        let refreshed = inner.refresh_once().await;
                        inner
                            .in_flight
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .take();
                        refreshed
                    }
                    .boxed()
                    .shared();

                    *in_flight = Some(renewal.clone());
                    renewal
                }
            }
        };

        renewal.await
    }
}

impl RefresherInner {
    async fn refresh_once(&self) -> bool {
        let Some(refresh_token) = self.tokens.refresh_token() else {
            tracing::debug!("no refresh token");
            return false;
        };
        let Ok(authorization) = HeaderValue::from_str(&format!("Bearer {refresh_token}")) else {
            tracing::warn!("refresh token is not a valid header value");
            return false;
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, authorization);

        let response = match self
            .transport
            .send(HttpRequest {
                method: Method::POST,
                url: self.url.clone(),
                headers,
                body: None,
            })
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(?err, "token refresh request failed");
                return false;
            }
        };

        if !response.status.is_success() {
            tracing::info!(status = %response.status, "token refresh rejected");
            return false;
        }

        let data = match Payload::from_slice(&response.body) {
            Payload::Success(data) | Payload::Bare(data) => data,
            Payload::Failure { .. } => {
                tracing::info!("token refresh answered success: false");
                return false;
            }
        };

        match serde_json::from_value::<TokenResponse>(data) {
            Ok(TokenResponse {
                access_token,
                refresh_token: rotated,
            }) => {
                // rotation is optional server-side
                self.tokens
                    .set_tokens(access_token, Some(rotated.unwrap_or(refresh_token)));
                tracing::info!("access token refreshed");
                true
            }
            Err(err) => {
                tracing::warn!(?err, "token refresh response without access token");
                false
            }
        }
    }
}
