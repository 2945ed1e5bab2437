use http::StatusCode;
use serde_json::{json, Value};

use crate::environment::BASE_URL_ENV;

/// Message of [Error::Network].
pub const NETWORK_ERROR_MESSAGE: &str = "Network error or server unreachable";

/// Message of [Error::Maintenance].
pub const MAINTENANCE_MESSAGE: &str = "Service en maintenance";

/// Message of [Error::SessionExpired].
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expirée";

/// Message of [Error::Schema].
pub const SCHEMA_ERROR_MESSAGE: &str = "Erreur de validation des données";

/// Message of [Error::Decode].
pub const DECODE_ERROR_MESSAGE: &str = "Schema validation error";

/// Errors that can happen either during client configuration or while talking to the API.
///
/// Every variant can be viewed as a `{status, message, details}` triple through
/// [Error::status], [Error::message] and [Error::details]. Status `0` means no HTTP
/// response was received.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Automatic environment inference did not work.
    #[error("environment not inferrable: {BASE_URL_ENV} is not set")]
    EnvironmentNotInferrable,

    /// No HTTP response was received.
    #[error("network error: {0}")]
    Network(anyhow::Error),

    /// The API answered 503.
    #[error("{MAINTENANCE_MESSAGE}")]
    Maintenance,

    /// The access token expired and could not be renewed.
    #[error("{SESSION_EXPIRED_MESSAGE}")]
    SessionExpired,

    /// A 401 that is not a token expiry (bad credentials, unverified email, public route).
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// The best available message.
        message: String,
        /// The parsed error body, if any.
        details: Option<Value>,
    },

    /// The API rejected the request as invalid (422).
    #[error("{message}")]
    Validation {
        /// Contextual message.
        message: String,
        /// The parsed error body, if any.
        details: Option<Value>,
    },

    /// Any other non-OK HTTP status.
    #[error("{message} (HTTP {status})")]
    Http {
        /// The HTTP status.
        status: StatusCode,
        /// The best available message.
        message: String,
        /// The parsed error body, if any.
        details: Option<Value>,
    },

    /// An OK response carrying `success: false`.
    #[error("{message}")]
    Business {
        /// The HTTP status of the response.
        status: StatusCode,
        /// The joined `errors` or the `message`.
        message: String,
    },

    /// The payload was rejected by the supplied schema.
    #[error("{SCHEMA_ERROR_MESSAGE}: {0}")]
    Schema(anyhow::Error),

    /// The payload could not be decoded into the requested type.
    #[error("{DECODE_ERROR_MESSAGE}: {0}")]
    Decode(anyhow::Error),

    /// A request could not be encoded.
    #[error("encoding error: {0}")]
    Codec(anyhow::Error),
}

impl Error {
    /// The HTTP status this error represents, `0` for network failures.
    pub fn status(&self) -> u16 {
        match self {
            Self::EnvironmentNotInferrable | Self::Network(_) | Self::Codec(_) => 0,
            Self::Maintenance => StatusCode::SERVICE_UNAVAILABLE.as_u16(),
            Self::SessionExpired | Self::Unauthorized { .. } => {
                StatusCode::UNAUTHORIZED.as_u16()
            }
            Self::Validation { .. } | Self::Schema(_) | Self::Decode(_) => {
                StatusCode::UNPROCESSABLE_ENTITY.as_u16()
            }
            Self::Http { status, .. } | Self::Business { status, .. } => status.as_u16(),
        }
    }

    /// The user-facing message.
    pub fn message(&self) -> String {
        match self {
            Self::Network(_) => NETWORK_ERROR_MESSAGE.to_string(),
            Self::Maintenance => MAINTENANCE_MESSAGE.to_string(),
            Self::SessionExpired => SESSION_EXPIRED_MESSAGE.to_string(),
            Self::Unauthorized { message, .. }
            | Self::Validation { message, .. }
            | Self::Http { message, .. }
            | Self::Business { message, .. } => message.clone(),
            Self::Schema(_) => SCHEMA_ERROR_MESSAGE.to_string(),
            Self::Decode(_) => DECODE_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// Additional detail, when available.
    pub fn details(&self) -> Option<Value> {
        match self {
            Self::Network(err) | Self::Codec(err) => Some(Value::String(err.to_string())),
            Self::SessionExpired => Some(json!({ "expired": true })),
            Self::Unauthorized { details, .. }
            | Self::Validation { details, .. }
            | Self::Http { details, .. } => details.clone(),
            Self::Schema(err) | Self::Decode(err) => Some(Value::String(format!("{err:#}"))),
            _ => None,
        }
    }
}

pub(crate) fn network(err: impl Into<anyhow::Error>) -> Error {
    Error::Network(err.into())
}

pub(crate) fn codec(err: impl std::error::Error + Send + Sync + 'static) -> Error {
    Error::Codec(anyhow::Error::from(err))
}

pub(crate) fn decode(err: impl std::error::Error + Send + Sync + 'static) -> Error {
    Error::Decode(anyhow::Error::from(err))
}
