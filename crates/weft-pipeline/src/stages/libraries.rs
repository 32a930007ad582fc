//! Stage 3: discover and fetch the libraries a patch archive expects.

use std::path::PathBuf;

use futures_util::{TryStreamExt, stream};
use tracing::{debug, info};
use weft_fetch::{DownloadSession, HttpClient};
use weft_sniff::JAR_SUFFIX;

use crate::context::PipelineContext;
use crate::error::StageError;
use crate::stage::Stage;

/// How many library downloads run at once.
const FETCH_CONCURRENCY: usize = 4;

/// Ordered local paths of the discovered libraries.
#[derive(Debug)]
pub struct ResolvedLibraries {
    pub paths: Vec<PathBuf>,
}

/// Sniffs the patched jar's library-manifest class for jar filenames and
/// fetches each from the configured base URL into the patch-scoped libs
/// directory.
///
/// Discovery is local and cheap, so it reruns every time; each individual
/// download skips when its file is already present. A jar with no manifest
/// class resolves to an empty library set.
pub struct LibraryFetchStage<'a, C: HttpClient> {
    ctx: &'a PipelineContext<C>,
    patched_jar: PathBuf,
    manifest_class: String,
    base_url: String,
    libs_dir: PathBuf,
}

impl<'a, C: HttpClient> LibraryFetchStage<'a, C> {
    pub fn new(
        ctx: &'a PipelineContext<C>,
        patched_jar: impl Into<PathBuf>,
        manifest_class: impl Into<String>,
        base_url: impl Into<String>,
        dep_string: &str,
    ) -> Self {
        Self {
            ctx,
            patched_jar: patched_jar.into(),
            manifest_class: manifest_class.into(),
            base_url: base_url.into(),
            libs_dir: ctx.cache.libs_dir(dep_string),
        }
    }

    /// Sniff the manifest class and map each discovered name to its local
    /// destination, preserving discovery order.
    fn discover(&self) -> Result<Vec<(String, PathBuf)>, StageError> {
        let names =
            match weft_sniff::sniff_archive(&self.patched_jar, &self.manifest_class, JAR_SUFFIX)? {
                Some(names) => names,
                None => {
                    info!(
                        class = self.manifest_class,
                        "no library manifest class in patched jar"
                    );
                    return Ok(Vec::new());
                }
            };

        names
            .into_iter()
            .map(|name| {
                // Names come from untrusted class constants; only accept a
                // plain file name so nothing escapes the libs directory.
                if name.contains('/') || name.contains('\\') || name.contains("..") {
                    return Err(StageError::BadLibraryName { name });
                }
                info!(library = %name, "discovered library");
                let dest = self.libs_dir.join(&name);
                Ok((name, dest))
            })
            .collect()
    }
}

impl<C: HttpClient> Stage for LibraryFetchStage<'_, C> {
    type Output = ResolvedLibraries;

    fn name(&self) -> &'static str {
        "library-fetch"
    }

    fn artifact(&self) -> String {
        self.patched_jar
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.patched_jar.display().to_string())
    }

    fn outputs(&self) -> Vec<PathBuf> {
        vec![self.libs_dir.clone()]
    }

    fn is_up_to_date(&self) -> Result<bool, StageError> {
        // The library list lives inside the jar, so freshness is judged per
        // file during the run instead of up front.
        Ok(false)
    }

    fn reuse(&self) -> Result<Self::Output, StageError> {
        let paths = self
            .discover()?
            .into_iter()
            .map(|(_, dest)| dest)
            .collect();
        Ok(ResolvedLibraries { paths })
    }

    async fn run(&mut self) -> Result<Self::Output, StageError> {
        let discovered = self.discover()?;
        if discovered.is_empty() {
            return Ok(ResolvedLibraries { paths: Vec::new() });
        }
        debug!(count = discovered.len(), dir = %self.libs_dir.display(), "resolving libraries");
        weft_fs::ensure_dir(&self.libs_dir)?;

        let paths: Vec<PathBuf> = discovered.iter().map(|(_, dest)| dest.clone()).collect();
        stream::iter(discovered.into_iter().map(Ok::<_, weft_fetch::FetchError>))
            .map_ok(|(name, dest)| {
                let url = format!("{}{}", self.base_url, name);
                DownloadSession::new(&self.ctx.client, url, dest)
                    .etag(true)
                    .skip_if_exists()
                    .offline(self.ctx.offline)
                    .download()
            })
            .try_buffer_unordered(FETCH_CONCURRENCY)
            .try_collect::<Vec<_>>()
            .await?;

        Ok(ResolvedLibraries { paths })
    }
}
