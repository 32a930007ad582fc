//! One download of one remote resource to one local path.

use std::io::Write;
use std::path::{Path, PathBuf};

use futures_util::TryStreamExt;
use tracing::{debug, info};
use weft_fs::StagedFile;

use crate::error::{FetchError, Result};
use crate::http::HttpClient;

/// Builder for a single fetch, mirroring the cache semantics every pipeline
/// stage relies on:
///
/// - `skip_if_exists`: an existing destination short-circuits everything,
///   including conditional-cache revalidation. No network call is made.
/// - offline mode: the network is never touched; an existing destination is
///   trusted, a missing one fails fast naming the path.
/// - `etag`: a sidecar file next to the destination stores the server's
///   revalidation token; a 304 keeps the local copy.
/// - `gzip`: advertises gzip and transparently inflates an encoded body.
///
/// The destination only ever appears fully written: bytes land in a staging
/// file in the same directory and are renamed into place.
pub struct DownloadSession<'c, C: HttpClient> {
    client: &'c C,
    url: String,
    dest: PathBuf,
    etag: bool,
    gzip: bool,
    skip_if_exists: bool,
    offline: bool,
}

impl<'c, C: HttpClient> DownloadSession<'c, C> {
    pub fn new(client: &'c C, url: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            client,
            url: url.into(),
            dest: dest.into(),
            etag: false,
            gzip: false,
            skip_if_exists: false,
            offline: false,
        }
    }

    /// Store and replay an `ETag` revalidation token beside the destination.
    pub fn etag(mut self, enabled: bool) -> Self {
        self.etag = enabled;
        self
    }

    /// Advertise and transparently inflate gzip transfer encoding.
    pub fn gzip(mut self, enabled: bool) -> Self {
        self.gzip = enabled;
        self
    }

    /// Trust an existing destination without any network traffic.
    pub fn skip_if_exists(mut self) -> Self {
        self.skip_if_exists = true;
        self
    }

    /// Forbid network access entirely.
    pub fn offline(mut self, enabled: bool) -> Self {
        self.offline = enabled;
        self
    }

    pub async fn download(self) -> Result<PathBuf> {
        if self.skip_if_exists && self.dest.exists() {
            debug!(dest = %self.dest.display(), "destination present, skipping fetch");
            return Ok(self.dest);
        }

        if self.offline {
            if self.dest.exists() {
                debug!(dest = %self.dest.display(), "offline, presuming cached copy up-to-date");
                return Ok(self.dest);
            }
            return Err(FetchError::Offline { path: self.dest });
        }

        let mut headers = Vec::new();
        if self.etag && self.dest.exists()
            && let Ok(token) = std::fs::read_to_string(etag_path(&self.dest))
        {
            headers.push(("If-None-Match".to_string(), token.trim().to_string()));
        }
        if self.gzip {
            headers.push(("Accept-Encoding".to_string(), "gzip".to_string()));
        }

        debug!(url = %self.url, dest = %self.dest.display(), "downloading");
        let response =
            self.client
                .get(&self.url, &headers)
                .await
                .map_err(|e| FetchError::Network {
                    url: self.url.clone(),
                    message: e.to_string(),
                })?;

        if response.status == 304 && self.dest.exists() {
            debug!(url = %self.url, "not modified, keeping cached copy");
            return Ok(self.dest);
        }
        if !(200..300).contains(&response.status) {
            return Err(FetchError::Status {
                url: self.url,
                status: response.status,
            });
        }

        let place = |source| FetchError::Place {
            path: self.dest.clone(),
            source,
        };
        let mut staged = StagedFile::create(&self.dest).map_err(place)?;
        let mut body = response.body;
        let mut total: u64 = 0;
        while let Some(chunk) = body.try_next().await.map_err(|e| FetchError::Network {
            url: self.url.clone(),
            message: e.to_string(),
        })? {
            staged.write_all(&chunk)?;
            total += chunk.len() as u64;
        }

        if response.gzipped {
            // Landed bytes are the raw encoded stream; inflate into a second
            // staging file and commit that one instead.
            staged.flush()?;
            let mut inflated = StagedFile::create(&self.dest).map_err(place)?;
            let raw = std::fs::File::open(staged.staging_path())?;
            let mut decoder = flate2::read::GzDecoder::new(raw);
            std::io::copy(&mut decoder, &mut inflated)?;
            inflated.commit().map_err(place)?;
        } else {
            staged.commit().map_err(place)?;
        }

        if self.etag {
            let sidecar = etag_path(&self.dest);
            match response.etag {
                Some(token) => {
                    weft_fs::atomic_write(&sidecar, token.as_bytes()).map_err(place)?
                }
                // Server stopped sending a token; drop the stale one.
                None => {
                    let _ = std::fs::remove_file(&sidecar);
                }
            }
        }

        info!(url = %self.url, bytes = total, dest = %self.dest.display(), "downloaded");
        Ok(self.dest)
    }
}

/// Sidecar path recording the revalidation token for `dest`.
fn etag_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".etag");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{BoxStream, HttpResponse};
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct MockError(String);

    impl std::fmt::Display for MockError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl std::error::Error for MockError {}

    #[derive(Clone)]
    struct MockResponse {
        status: u16,
        etag: Option<String>,
        gzipped: bool,
        body: Vec<u8>,
    }

    struct MockClient {
        responses: HashMap<String, MockResponse>,
        calls: AtomicUsize,
    }

    impl MockClient {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
                calls: AtomicUsize::new(0),
            }
        }

        fn serve(mut self, url: &str, response: MockResponse) -> Self {
            self.responses.insert(url.to_string(), response);
            self
        }

        fn plain(body: &[u8]) -> MockResponse {
            MockResponse {
                status: 200,
                etag: None,
                gzipped: false,
                body: body.to_vec(),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl HttpClient for MockClient {
        type Error = MockError;

        async fn get(
            &self,
            url: &str,
            headers: &[(String, String)],
        ) -> std::result::Result<HttpResponse<Self::Error>, Self::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let response = self
                .responses
                .get(url)
                .cloned()
                .ok_or_else(|| MockError(format!("no route for {url}")))?;

            let revalidated = headers
                .iter()
                .any(|(name, value)| {
                    name == "If-None-Match" && Some(value) == response.etag.as_ref()
                });
            let (status, body) = if revalidated {
                (304, Vec::new())
            } else {
                (response.status, response.body)
            };

            let chunks: Vec<std::result::Result<Bytes, MockError>> = body
                .chunks(3)
                .map(|c| Ok(Bytes::copy_from_slice(c)))
                .collect();
            let stream: BoxStream<'static, _> = Box::pin(futures_util::stream::iter(chunks));
            Ok(HttpResponse {
                status,
                etag: response.etag,
                gzipped: response.gzipped,
                body: stream,
            })
        }
    }

    #[tokio::test]
    async fn downloads_to_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("artifact.jar");
        let client = MockClient::new().serve("http://host/a.jar", MockClient::plain(b"jar bytes"));

        let out = DownloadSession::new(&client, "http://host/a.jar", &dest)
            .download()
            .await
            .unwrap();

        assert_eq!(out, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), b"jar bytes");
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn skip_if_exists_never_touches_the_network() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("artifact.jar");
        std::fs::write(&dest, b"already here").unwrap();
        let client = MockClient::new();

        DownloadSession::new(&client, "http://host/a.jar", &dest)
            .etag(true)
            .skip_if_exists()
            .download()
            .await
            .unwrap();

        assert_eq!(client.calls(), 0);
        assert_eq!(std::fs::read(&dest).unwrap(), b"already here");
    }

    #[tokio::test]
    async fn offline_trusts_cache_and_fails_on_misses() {
        let dir = tempfile::tempdir().unwrap();
        let cached = dir.path().join("cached.jar");
        std::fs::write(&cached, b"cached").unwrap();
        let client = MockClient::new();

        DownloadSession::new(&client, "http://host/a.jar", &cached)
            .offline(true)
            .download()
            .await
            .unwrap();

        let missing = dir.path().join("missing.jar");
        let err = DownloadSession::new(&client, "http://host/a.jar", &missing)
            .offline(true)
            .download()
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Offline { path } if path == missing));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn etag_round_trip_keeps_cached_copy_on_304() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("manifest.json");
        let client = MockClient::new().serve(
            "http://host/manifest",
            MockResponse {
                status: 200,
                etag: Some("\"v1\"".to_string()),
                gzipped: false,
                body: b"first body".to_vec(),
            },
        );

        DownloadSession::new(&client, "http://host/manifest", &dest)
            .etag(true)
            .download()
            .await
            .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"first body");
        assert!(etag_path(&dest).exists());

        // Second fetch revalidates; the mock answers 304 and the local file
        // is kept even though the route's body would differ.
        DownloadSession::new(&client, "http://host/manifest", &dest)
            .etag(true)
            .download()
            .await
            .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"first body");
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn gzip_bodies_are_inflated() {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"inflate me").unwrap();
        let compressed = encoder.finish().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("data.json");
        let client = MockClient::new().serve(
            "http://host/data",
            MockResponse {
                status: 200,
                etag: None,
                gzipped: true,
                body: compressed,
            },
        );

        DownloadSession::new(&client, "http://host/data", &dest)
            .gzip(true)
            .download()
            .await
            .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"inflate me");
    }

    #[tokio::test]
    async fn error_status_leaves_no_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("gone.jar");
        let client = MockClient::new().serve(
            "http://host/gone.jar",
            MockResponse {
                status: 404,
                etag: None,
                gzipped: false,
                body: Vec::new(),
            },
        );

        let err = DownloadSession::new(&client, "http://host/gone.jar", &dest)
            .download()
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert!(!dest.exists());
    }
}
