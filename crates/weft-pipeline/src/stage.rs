//! The stage contract and the driver that runs one stage with refresh
//! handling and error context.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{PipelineError, StageError};

/// One cached step of the pipeline.
///
/// A stage owns a set of on-disk outputs. The driver asks whether they are
/// current, clears them when a rebuild is wanted, and only then invokes
/// `run`. Stages whose freshness cannot be judged from paths alone (network
/// revalidation, per-file skip logic) report `is_up_to_date` as false and
/// short-circuit internally.
pub trait Stage {
    type Output;

    fn name(&self) -> &'static str;

    /// Identity string attached to errors, usually "name version".
    fn artifact(&self) -> String;

    /// Everything `run` writes. Deleted before a forced rebuild.
    fn outputs(&self) -> Vec<PathBuf>;

    fn is_up_to_date(&self) -> Result<bool, StageError>;

    /// Build the output value from existing files without doing the work.
    fn reuse(&self) -> Result<Self::Output, StageError>;

    fn run(&mut self) -> impl Future<Output = Result<Self::Output, StageError>> + Send;
}

/// Run one stage, honoring `force_refresh` and tagging any failure with the
/// stage name and artifact identity.
pub async fn run_stage<S: Stage>(
    stage: &mut S,
    force_refresh: bool,
) -> Result<S::Output, PipelineError> {
    let name = stage.name();
    let artifact = stage.artifact();
    let wrap = |source: StageError| PipelineError {
        stage: name,
        artifact: artifact.clone(),
        source,
    };

    if !force_refresh && stage.is_up_to_date().map_err(wrap)? {
        debug!(stage = name, "outputs up to date, reusing");
        return stage.reuse().map_err(wrap);
    }

    if force_refresh {
        for path in stage.outputs() {
            let removed = if path.is_dir() {
                debug!(stage = name, path = %path.display(), "discarding stale output directory");
                fs::remove_dir_all(&path)
            } else if path.exists() {
                debug!(stage = name, path = %path.display(), "discarding stale output");
                fs::remove_file(&path)
            } else {
                Ok(())
            };
            removed.map_err(|e| wrap(e.into()))?;
        }
    }

    debug!(stage = name, artifact = %artifact, "running");
    stage.run().await.map_err(wrap)
}
