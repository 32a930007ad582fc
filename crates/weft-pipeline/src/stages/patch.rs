//! Stage 2: overlay a patch archive onto a base jar.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tracing::debug;
use weft_fs::StagedFile;

use crate::error::StageError;
use crate::stage::Stage;

/// Path of the jar produced by [`PatchStage`].
#[derive(Debug)]
pub struct PatchedArtifact {
    pub jar: PathBuf,
}

/// Builds a new jar from a base jar with every entry of the patch archive
/// laid on top. Patch entries win over base entries of the same name.
///
/// `META-INF/` is dropped from both inputs: overlaying foreign classes
/// invalidates any signature the base jar carried, so the signing metadata
/// must not survive into the output.
pub struct PatchStage {
    base_jar: PathBuf,
    patch_archive: PathBuf,
    output: PathBuf,
}

impl PatchStage {
    pub fn new(
        base_jar: impl Into<PathBuf>,
        patch_archive: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            base_jar: base_jar.into(),
            patch_archive: patch_archive.into(),
            output: output.into(),
        }
    }

    fn overlay(&self) -> Result<(), StageError> {
        let staged = StagedFile::create(&self.output)?;
        let mut writer = zip::ZipWriter::new(staged);
        let options = zip::write::SimpleFileOptions::default();

        let mut patch = open_archive(&self.patch_archive)?;
        let mut written: HashSet<String> = HashSet::new();
        for index in 0..patch.len() {
            let mut entry = patch
                .by_index(index)
                .map_err(|source| archive_err(&self.patch_archive, source))?;
            if entry.is_dir() || skip_entry(entry.name()) {
                continue;
            }
            let name = entry.name().to_string();
            writer
                .start_file(&name, options)
                .map_err(|source| archive_err(&self.output, source))?;
            copy_entry(&mut entry, &mut writer)?;
            written.insert(name);
        }
        debug!(
            patch = %self.patch_archive.display(),
            entries = written.len(),
            "patch entries written"
        );

        let mut base = open_archive(&self.base_jar)?;
        for index in 0..base.len() {
            let mut entry = base
                .by_index(index)
                .map_err(|source| archive_err(&self.base_jar, source))?;
            if entry.is_dir() || skip_entry(entry.name()) || written.contains(entry.name()) {
                continue;
            }
            let name = entry.name().to_string();
            writer
                .start_file(name, options)
                .map_err(|source| archive_err(&self.output, source))?;
            copy_entry(&mut entry, &mut writer)?;
        }

        let staged = writer
            .finish()
            .map_err(|source| archive_err(&self.output, source))?;
        staged.commit()?;
        Ok(())
    }
}

fn skip_entry(name: &str) -> bool {
    name.starts_with("META-INF/")
}

fn open_archive(path: &Path) -> Result<zip::ZipArchive<File>, StageError> {
    let file = File::open(path)?;
    zip::ZipArchive::new(file).map_err(|source| archive_err(path, source))
}

fn archive_err(path: &Path, source: zip::result::ZipError) -> StageError {
    StageError::Archive {
        path: path.to_path_buf(),
        source,
    }
}

fn copy_entry(entry: &mut impl Read, writer: &mut impl io::Write) -> Result<(), StageError> {
    io::copy(entry, writer)?;
    Ok(())
}

impl Stage for PatchStage {
    type Output = PatchedArtifact;

    fn name(&self) -> &'static str {
        "patch"
    }

    fn artifact(&self) -> String {
        self.output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.output.display().to_string())
    }

    fn outputs(&self) -> Vec<PathBuf> {
        vec![self.output.clone()]
    }

    fn is_up_to_date(&self) -> Result<bool, StageError> {
        Ok(self.output.exists())
    }

    fn reuse(&self) -> Result<Self::Output, StageError> {
        Ok(PatchedArtifact {
            jar: self.output.clone(),
        })
    }

    async fn run(&mut self) -> Result<Self::Output, StageError> {
        self.overlay()?;
        Ok(PatchedArtifact {
            jar: self.output.clone(),
        })
    }
}
