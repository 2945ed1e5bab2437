//! Unverified decoding of access token claims.
//!
//! Signatures are never checked here: the API server is the party that verifies tokens.
//! The client only reads the claims to know when a token is about to expire.

use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::{Duration, OffsetDateTime};

/// Claims carried by an access token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TokenClaims {
    /// Expiration time, in seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issued at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Subject, usually the user id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Any other claim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Claims plus expiry information computed at a given instant.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenInfo {
    /// The decoded claims.
    pub claims: TokenClaims,

    /// Whether `exp` lies in the past. Tokens without `exp` never expire.
    pub is_expired: bool,

    /// The expiry as a timestamp.
    pub expires_at: Option<OffsetDateTime>,

    /// Time left before expiry, negative once expired.
    pub time_until_expiry: Option<Duration>,
}

impl TokenInfo {
    /// Compute the expiry view of `claims` relative to `now`.
    pub fn at(claims: TokenClaims, now: OffsetDateTime) -> Self {
        let expires_at = claims
            .exp
            .and_then(|exp| OffsetDateTime::from_unix_timestamp(exp).ok());

        Self {
            is_expired: claims
                .exp
                .map(|exp| exp < now.unix_timestamp())
                .unwrap_or(false),
            time_until_expiry: expires_at.map(|expires_at| expires_at - now),
            expires_at,
            claims,
        }
    }

    /// Compute the expiry view relative to the current time.
    pub fn now(claims: TokenClaims) -> Self {
        Self::at(claims, OffsetDateTime::now_utc())
    }
}

/// Decode the claims of a JWT without verifying its signature.
///
/// Returns `None` for anything that is not a well-formed JWT.
pub fn decode_unverified(token: &str) -> Option<TokenClaims> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .map(|token_data| token_data.claims)
}

/// Decode a token and compute its expiry view relative to the current time.
pub fn token_info(token: &str) -> Option<TokenInfo> {
    decode_unverified(token).map(TokenInfo::now)
}
