//! The `{success, data, message, errors}` response envelope.
//!
//! Business endpoints wrap their payload in an [Envelope]. Some endpoints (and some
//! intermediaries) return bare JSON instead, so a body is first classified into a
//! [Payload] before anything else looks at it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message used when a failed response carries neither `message` nor `errors`.
pub const DEFAULT_ERROR_MESSAGE: &str = "Une erreur est survenue";

/// The wire format of an enveloped API response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Whether the operation succeeded on the business level.
    pub success: bool,

    /// The payload, present on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Human readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// List of error messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

/// A response body after envelope interpretation.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// An envelope with `success: true`. Holds the unwrapped `data`, or `Null` if absent.
    Success(Value),

    /// An envelope with `success: false`.
    Failure {
        /// The envelope's `message`, if any.
        message: Option<String>,
        /// The envelope's `errors`, empty if absent.
        errors: Vec<String>,
    },

    /// JSON that is not an envelope, passed through untouched.
    Bare(Value),
}

impl Payload {
    /// Classify a parsed JSON body.
    ///
    /// Only objects with a boolean `success` key are envelopes. An object whose other
    /// envelope fields have unexpected types is still treated as an envelope, with
    /// those fields ignored.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Self::Bare(value);
        };
        let Some(success) = map.get("success").and_then(Value::as_bool) else {
            return Self::Bare(Value::Object(map));
        };

        if success {
            Self::Success(map.remove("data").unwrap_or(Value::Null))
        } else {
            let message = match map.remove("message") {
                Some(Value::String(message)) => Some(message),
                _ => None,
            };
            let errors = match map.remove("errors") {
                Some(Value::Array(errors)) => errors
                    .into_iter()
                    .filter_map(|error| match error {
                        Value::String(error) => Some(error),
                        _ => None,
                    })
                    .collect(),
                _ => vec![],
            };

            Self::Failure { message, errors }
        }
    }

    /// Parse and classify a raw body. Empty or unparseable bodies become `Bare(Null)`.
    pub fn from_slice(body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => Self::from_value(value),
            Err(_) => Self::Bare(Value::Null),
        }
    }

    /// The message describing a failure, if this is one.
    pub fn failure_message(&self) -> Option<String> {
        match self {
            Self::Failure { message, errors } => {
                Some(best_message(message.as_deref(), errors).unwrap_or_else(default_message))
            }
            _ => None,
        }
    }
}

impl From<Envelope> for Payload {
    fn from(envelope: Envelope) -> Self {
        if envelope.success {
            Self::Success(envelope.data.unwrap_or(Value::Null))
        } else {
            Self::Failure {
                message: envelope.message,
                errors: envelope.errors.unwrap_or_default(),
            }
        }
    }
}

/// Pick the most useful message: the joined `errors` first, then `message`.
///
/// Empty strings and empty lists count as absent.
pub fn best_message(message: Option<&str>, errors: &[String]) -> Option<String> {
    let errors: Vec<&str> = errors
        .iter()
        .map(String::as_str)
        .filter(|error| !error.is_empty())
        .collect();

    if !errors.is_empty() {
        return Some(errors.join(", "));
    }

    message
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}

fn default_message() -> String {
    DEFAULT_ERROR_MESSAGE.to_string()
}
