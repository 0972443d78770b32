use crate::error::OrchestratorError;
use std::path::{Path, PathBuf};

/// The shared directory predictors read images from.
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copies every regular file of `source` into the staging directory.
    /// Returns the number of files copied.
    pub fn import_from(&self, source: &Path) -> Result<usize, OrchestratorError> {
        let staging_error = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| OrchestratorError::Staging { path, source }
        };

        std::fs::create_dir_all(&self.dir).map_err(staging_error(&self.dir))?;

        let mut copied = 0;
        for entry in std::fs::read_dir(source).map_err(staging_error(source))? {
            let entry = entry.map_err(staging_error(source))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            std::fs::copy(&path, self.dir.join(entry.file_name()))
                .map_err(staging_error(&path))?;
            copied += 1;
        }

        tracing::info!(copied, "Copied files from {:?} to {:?}", source, self.dir);
        Ok(copied)
    }

    /// Removes the staging directory and everything in it.
    pub fn clear(&self) -> Result<(), OrchestratorError> {
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => {
                tracing::info!("Removed files from {:?}", self.dir);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(OrchestratorError::Staging {
                path: self.dir.clone(),
                source,
            }),
        }
    }
}
