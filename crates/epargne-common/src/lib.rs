//! `epargne-common` defines the wire types shared by parties talking to the Challenge Épargne API.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod envelope;

#[cfg(feature = "access_token")]
pub mod access_token;
