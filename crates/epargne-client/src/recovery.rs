//! Recovery from expired access tokens.
//!
//! A 401 on a protected route is first classified: rejections that mention credentials,
//! passwords or email verification are final. Anything else is taken as an expired
//! access token and goes through [Recovery]: one renewal, one retry, and otherwise the
//! session ends.

use http::Method;
use serde_json::Value;

use crate::{
    host::{schedule_redirect, Notice, ROOT_PATH},
    request::{unwrap_payload, RequestOptions},
    ClientState, Error,
};

/// Fragments of 401 messages that are not about token expiry.
const NON_EXPIRY_KEYWORDS: &[&str] = &[
    "mot de passe",
    "password",
    "identifiant",
    "credentials",
    "vérifi",
    "verifi",
    "email",
    "e-mail",
];

/// Whether a 401 message describes an expired (or otherwise stale) access token.
pub fn is_token_expiry(message: &str) -> bool {
    let message = message.to_lowercase();
    !NON_EXPIRY_KEYWORDS
        .iter()
        .any(|keyword| message.contains(keyword))
}

/// States of the recovery protocol. Transitions only move forward, so each request
/// renews at most once and retries at most once.
#[derive(Debug)]
enum Recovery {
    /// A protected request was rejected with an expired token.
    DetectedExpiry,
    /// Renewing the access token.
    Refreshing,
    /// Fresh tokens are stored, the request is sent once more.
    Retrying,
    /// The retry went through.
    RetryOk(Value),
    /// Renewal or retry failed: the session is over.
    RetryFailed,
}

impl ClientState {
    /// Run the recovery protocol for a request that started while the store held
    /// `stored_token`.
    pub(crate) async fn recover(
        &self,
        method: &Method,
        url: &str,
        options: &RequestOptions,
        stored_token: Option<&str>,
    ) -> Result<Value, Error> {
        let mut state = Recovery::DetectedExpiry;

        loop {
            tracing::debug!(?state, %url, "token recovery");

            state = match state {
                Recovery::DetectedExpiry => {
                    let current = self.tokens.token();
                    if current.is_some() && current.as_deref() != stored_token {
                        // renewed by someone else since the request started
                        Recovery::Retrying
                    } else {
                        Recovery::Refreshing
                    }
                }
                Recovery::Refreshing => {
                    if self.refresher.refresh_access_token().await {
                        Recovery::Retrying
                    } else {
                        Recovery::RetryFailed
                    }
                }
                Recovery::Retrying => {
                    let token = self.tokens.token();
                    let response = self.send(method, url, options, token.as_deref()).await?;
                    if response.status.is_success() {
                        Recovery::RetryOk(unwrap_payload(response)?)
                    } else {
                        tracing::info!(status = %response.status, "retry after refresh failed");
                        Recovery::RetryFailed
                    }
                }
                Recovery::RetryOk(value) => return Ok(value),
                Recovery::RetryFailed => {
                    self.expire_session();
                    return Err(Error::SessionExpired);
                }
            };
        }
    }

    fn expire_session(&self) {
        tracing::warn!("session expired");
        self.tokens.clear_tokens();
        self.host.notify(Notice::session_expired());
        schedule_redirect(self.host.clone(), ROOT_PATH, self.redirect_delay);
    }
}
