//! The token store: the current credential pair, in memory and mirrored to cookies.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use epargne_common::access_token::{self, TokenInfo};
use tokio::sync::watch;

use crate::cookie::{Cookie, CookieJar, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};

/// An access token and its optional refresh token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenPair {
    /// The bearer token sent with API requests.
    pub access_token: String,

    /// The token used to obtain a new access token.
    pub refresh_token: Option<String>,
}

/// Authentication state published on every token change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthState {
    /// Whether tokens are present.
    pub is_authenticated: bool,
}

/// Single source of truth for the current credential pair.
///
/// Memory is the fast path, cookies are the durable projection. A pair is replaced
/// as a whole, so readers never observe an access token from one pair with the
/// refresh token of another.
pub struct TokenStore {
    current: ArcSwapOption<TokenPair>,
    cookies: Arc<dyn CookieJar>,
    secure: bool,
    auth_tx: watch::Sender<AuthState>,
}

impl TokenStore {
    /// Create a store over the given cookie jar, writing `Secure` cookies when `secure` is set.
    ///
    /// A session already persisted in the jar is picked up by the getters.
    pub fn new(cookies: Arc<dyn CookieJar>, secure: bool) -> Self {
        let is_authenticated = cookies.get(ACCESS_TOKEN_COOKIE).is_some();
        let (auth_tx, _) = watch::channel(AuthState { is_authenticated });

        Self {
            current: ArcSwapOption::empty(),
            cookies,
            secure,
            auth_tx,
        }
    }

    /// Store a new pair, replacing the current one.
    ///
    /// The `refresh_jwt` cookie is written only when `refresh_token` is given.
    pub fn set_tokens(&self, access_token: impl Into<String>, refresh_token: Option<String>) {
        let pair = TokenPair {
            access_token: access_token.into(),
            refresh_token,
        };

        self.cookies.set(Cookie::new(
            ACCESS_TOKEN_COOKIE,
            pair.access_token.clone(),
            self.secure,
        ));
        if let Some(refresh_token) = &pair.refresh_token {
            self.cookies.set(Cookie::new(
                REFRESH_TOKEN_COOKIE,
                refresh_token.clone(),
                self.secure,
            ));
        }
        self.current.store(Some(Arc::new(pair)));

        tracing::debug!("tokens updated");
        self.auth_tx.send_replace(AuthState {
            is_authenticated: true,
        });
    }

    /// The current access token.
    pub fn token(&self) -> Option<String> {
        self.current
            .load_full()
            .map(|pair| pair.access_token.clone())
            .or_else(|| self.cookies.get(ACCESS_TOKEN_COOKIE))
    }

    /// The current refresh token.
    pub fn refresh_token(&self) -> Option<String> {
        self.current
            .load_full()
            .and_then(|pair| pair.refresh_token.clone())
            .or_else(|| self.cookies.get(REFRESH_TOKEN_COOKIE))
    }

    /// The current pair, if an access token is known.
    pub fn tokens(&self) -> Option<TokenPair> {
        Some(TokenPair {
            access_token: self.token()?,
            refresh_token: self.refresh_token(),
        })
    }

    /// Forget both tokens, in memory and in cookies.
    pub fn clear_tokens(&self) {
        self.current.store(None);
        self.cookies
            .set(Cookie::expired(ACCESS_TOKEN_COOKIE, self.secure));
        self.cookies
            .set(Cookie::expired(REFRESH_TOKEN_COOKIE, self.secure));

        tracing::debug!("tokens cleared");
        self.auth_tx.send_replace(AuthState {
            is_authenticated: false,
        });
    }

    /// Drop the in-memory copy only, as a process restart would.
    pub fn forget_memory(&self) {
        self.current.store(None);
    }

    /// Decode `token`, or the current access token, without verifying it.
    ///
    /// Returns `None` when there is no token or it is malformed.
    pub fn token_info(&self, token: Option<&str>) -> Option<TokenInfo> {
        match token {
            Some(token) => access_token::token_info(token),
            None => access_token::token_info(&self.token()?),
        }
    }

    /// Subscribe to authentication state changes.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.auth_tx.subscribe()
    }
}
