//! The HTTP seam between the client and the network.

use std::{future::Future, pin::Pin};

use http::{HeaderMap, Method, StatusCode};

/// A fully resolved HTTP request.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Encoded body.
    pub body: Option<Vec<u8>>,
}

/// A received HTTP response.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Raw body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// A response with the given status and body.
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Something that can perform HTTP requests.
///
/// An error means no response was received at all.
pub trait HttpTransport: Send + Sync {
    /// Send the request and wait for the full response.
    fn send(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, anyhow::Error>> + Send + '_>>;
}

/// [HttpTransport] backed by [reqwest].
///
/// Cookies set by the API are kept and sent back, like a browser does for
/// `credentials: include` requests.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport with a cookie-keeping reqwest client.
    pub fn new() -> Result<Self, crate::Error> {
        let client = reqwest::ClientBuilder::new()
            .cookie_store(true)
            .build()
            .map_err(crate::error::network)?;

        Ok(Self { client })
    }

    /// Wrap an existing reqwest client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, anyhow::Error>> + Send + '_>> {
        Box::pin(async move {
            let mut builder = self
                .client
                .request(request.method, &request.url)
                .headers(request.headers);
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await?;
            let status = response.status();
            let body = response.bytes().await?;

            Ok(HttpResponse {
                status,
                body: body.to_vec(),
            })
        })
    }
}
