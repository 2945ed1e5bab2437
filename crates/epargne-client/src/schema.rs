//! Payload validation.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// A validator for unwrapped payloads.
///
/// Any validation library can be plugged in by implementing this single capability.
pub trait Schema {
    /// The validated value.
    type Output;

    /// Validate `value`, returning the validated (possibly coerced) value.
    fn safe_parse(&self, value: &Value) -> Result<Self::Output, anyhow::Error>;
}

/// A schema that accepts whatever deserializes into `T`.
pub struct Typed<T>(PhantomData<fn() -> T>);

impl<T> Typed<T> {
    /// Create the schema.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Typed<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> Schema for Typed<T> {
    type Output = T;

    fn safe_parse(&self, value: &Value) -> Result<T, anyhow::Error> {
        Ok(T::deserialize(value)?)
    }
}

/// A schema defined by a closure.
pub struct FnSchema<F>(pub F);

impl<F, T> Schema for FnSchema<F>
where
    F: Fn(&Value) -> Result<T, anyhow::Error>,
{
    type Output = T;

    fn safe_parse(&self, value: &Value) -> Result<T, anyhow::Error> {
        (self.0)(value)
    }
}
