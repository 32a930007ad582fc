//! Stage 1: resolve the version index, per-version metadata, and role jars.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info, warn};
use weft_fetch::{DownloadSession, HttpClient};
use weft_verify::matches_sha1;

use crate::cache::ArtifactId;
use crate::context::PipelineContext;
use crate::error::StageError;
use crate::manifest::{VersionInfo, VersionManifest};
use crate::stage::Stage;

/// Paths and metadata produced by [`ArtifactFetchStage`].
#[derive(Debug)]
pub struct FetchedArtifacts {
    pub info: VersionInfo,
    pub client_jar: PathBuf,
    pub server_jar: PathBuf,
}

/// Fetches the shared version manifest, the requested version's metadata,
/// and its client and server jars, each gated by the published SHA-1.
///
/// This stage always reports out-of-date so the manifest gets revalidated
/// against its stored `ETag` on every online run. Everything downstream of
/// the manifest short-circuits on its own: the metadata document is skipped
/// when present, jars are skipped when their digest still matches.
pub struct ArtifactFetchStage<'a, C: HttpClient> {
    ctx: &'a PipelineContext<C>,
    id: ArtifactId,
    manifest_url: String,
    metadata_url_override: Option<String>,
}

impl<'a, C: HttpClient> ArtifactFetchStage<'a, C> {
    pub fn new(
        ctx: &'a PipelineContext<C>,
        id: ArtifactId,
        manifest_url: impl Into<String>,
        metadata_url_override: Option<String>,
    ) -> Self {
        Self {
            ctx,
            id,
            manifest_url: manifest_url.into(),
            metadata_url_override,
        }
    }

    async fn ensure_metadata(&self) -> Result<VersionInfo, StageError> {
        let manifest_path = self.ctx.cache.version_manifest();
        DownloadSession::new(&self.ctx.client, &self.manifest_url, &manifest_path)
            .etag(true)
            .gzip(true)
            .offline(self.ctx.offline)
            .download()
            .await?;
        let manifest = VersionManifest::load(&manifest_path)?;

        let metadata_url = match &self.metadata_url_override {
            Some(url) => {
                info!(url = %url, "using custom version metadata");
                url.clone()
            }
            None => {
                manifest
                    .find(&self.id.version)
                    .ok_or_else(|| StageError::VersionNotFound {
                        version: self.id.version.clone(),
                    })?
                    .url
                    .clone()
            }
        };

        let info_path = self.ctx.cache.version_info(&self.id);
        DownloadSession::new(&self.ctx.client, metadata_url, &info_path)
            .etag(true)
            .gzip(true)
            .skip_if_exists()
            .offline(self.ctx.offline)
            .download()
            .await?;
        VersionInfo::load(&info_path)
    }

    /// Land one role jar and hold it to the published digest. A first
    /// mismatch discards the file and fetches again; a second is fatal.
    async fn ensure_jar(&self, info: &VersionInfo, role: &str) -> Result<PathBuf, StageError> {
        let download = info
            .downloads
            .get(role)
            .ok_or_else(|| StageError::RoleMissing {
                version: self.id.version.clone(),
                role: role.to_string(),
            })?;
        let path = self.ctx.cache.artifact_jar(&self.id, role);

        if self.ctx.offline {
            DownloadSession::new(&self.ctx.client, &download.url, &path)
                .offline(true)
                .download()
                .await?;
            return Ok(path);
        }

        if path.exists() && matches_sha1(&path, &download.sha1)? {
            debug!(path = %path.display(), "digest matches, keeping cached jar");
            return Ok(path);
        }

        DownloadSession::new(&self.ctx.client, &download.url, &path)
            .etag(true)
            .download()
            .await?;
        if !matches_sha1(&path, &download.sha1)? {
            warn!(path = %path.display(), "digest mismatch, discarding and fetching once more");
            fs::remove_file(&path)?;
            DownloadSession::new(&self.ctx.client, &download.url, &path)
                .download()
                .await?;
            if !matches_sha1(&path, &download.sha1)? {
                return Err(StageError::ChecksumRecurred {
                    path,
                    expected: download.sha1.clone(),
                });
            }
        }
        Ok(path)
    }
}

impl<C: HttpClient> Stage for ArtifactFetchStage<'_, C> {
    type Output = FetchedArtifacts;

    fn name(&self) -> &'static str {
        "artifact-fetch"
    }

    fn artifact(&self) -> String {
        self.id.to_string()
    }

    fn outputs(&self) -> Vec<PathBuf> {
        vec![
            self.ctx.cache.version_info(&self.id),
            self.ctx.cache.artifact_jar(&self.id, "client"),
            self.ctx.cache.artifact_jar(&self.id, "server"),
        ]
    }

    fn is_up_to_date(&self) -> Result<bool, StageError> {
        // The manifest must be revalidated every run, so freshness is never
        // decided from paths alone.
        Ok(false)
    }

    fn reuse(&self) -> Result<Self::Output, StageError> {
        let info = VersionInfo::load(&self.ctx.cache.version_info(&self.id))?;
        Ok(FetchedArtifacts {
            client_jar: self.ctx.cache.artifact_jar(&self.id, "client"),
            server_jar: self.ctx.cache.artifact_jar(&self.id, "server"),
            info,
        })
    }

    async fn run(&mut self) -> Result<Self::Output, StageError> {
        weft_fs::ensure_dir(self.ctx.cache.path())?;
        let info = self.ensure_metadata().await?;
        let client_jar = self.ensure_jar(&info, "client").await?;
        let server_jar = self.ensure_jar(&info, "server").await?;
        Ok(FetchedArtifacts {
            info,
            client_jar,
            server_jar,
        })
    }
}
