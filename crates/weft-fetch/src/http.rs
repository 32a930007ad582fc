//! HTTP client abstraction.
//!
//! The download session talks to this minimal trait; [`ReqwestClient`] is
//! the production implementation and tests substitute in-memory clients
//! (which is also how "no network call happened" is asserted, via a call
//! counter on the mock).

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, TryStreamExt};

pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// One HTTP response, body unconsumed.
pub struct HttpResponse<E> {
    pub status: u16,
    /// `ETag` header, for the conditional-cache sidecar.
    pub etag: Option<String>,
    /// Whether the body arrived gzip-encoded (`Content-Encoding: gzip`).
    pub gzipped: bool,
    pub body: BoxStream<'static, std::result::Result<Bytes, E>>,
}

pub trait HttpClient: Send + Sync {
    type Error: std::error::Error + Send + 'static;

    /// Issue a GET with the given headers and return status, relevant
    /// headers, and the body as a stream. Non-2xx statuses are returned,
    /// not mapped to errors; the session decides what they mean.
    fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> impl Future<Output = std::result::Result<HttpResponse<Self::Error>, Self::Error>> + Send;
}

/// Production client backed by `reqwest`.
///
/// Automatic decompression is disabled at the feature level; the session
/// owns gzip handling so hashes are computed over exactly the bytes landed.
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> std::result::Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
        })
    }
}

impl HttpClient for ReqwestClient {
    type Error = reqwest::Error;

    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> std::result::Result<HttpResponse<Self::Error>, Self::Error> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        let response = request.send().await?;

        let status = response.status().as_u16();
        let etag = response
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let gzipped = response
            .headers()
            .get(reqwest::header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("gzip"));

        Ok(HttpResponse {
            status,
            etag,
            gzipped,
            body: Box::pin(response.bytes_stream().map_ok(Bytes::from)),
        })
    }
}
