use crate::error::OrchestratorError;
use std::path::{Path, PathBuf};

pub const SUPPORTED_EXTENSIONS: [&str; 2] = [".png", ".jpg"];

/// An image that will be sent to the predictors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchImage {
    /// File name, used as the report key.
    pub id: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct ImageBatch {
    images: Vec<BatchImage>,
    skipped: Vec<String>,
}

/// Case-sensitive suffix match against [`SUPPORTED_EXTENSIONS`].
pub fn is_eligible(file_name: &str) -> bool {
    SUPPORTED_EXTENSIONS
        .iter()
        .any(|extension| file_name.ends_with(extension))
}

impl ImageBatch {
    /// Lists `dir` in file name order.
    pub fn scan(dir: &Path) -> Result<Self, OrchestratorError> {
        let staging_error = |source: std::io::Error| OrchestratorError::Staging {
            path: dir.to_path_buf(),
            source,
        };

        // Symlinks are kept: predictors resolve the path on their side.
        let dir = std::path::absolute(dir).map_err(staging_error)?;
        let mut names = std::fs::read_dir(&dir)
            .map_err(staging_error)?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(staging_error)?;
        names.sort();

        let mut batch = ImageBatch::default();
        for name in names {
            if is_eligible(&name) {
                batch.images.push(BatchImage {
                    path: dir.join(&name),
                    id: name,
                });
            } else {
                tracing::warn!(
                    "Image format not supported for {}, skipping prediction for this image",
                    name
                );
                batch.skipped.push(name);
            }
        }

        tracing::info!(
            eligible = batch.images.len(),
            skipped = batch.skipped.len(),
            "Scanned batch directory {:?}",
            dir
        );
        Ok(batch)
    }

    pub fn images(&self) -> &[BatchImage] {
        &self.images
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }
}

impl FromIterator<BatchImage> for ImageBatch {
    fn from_iter<T: IntoIterator<Item = BatchImage>>(iter: T) -> Self {
        Self {
            images: iter.into_iter().collect(),
            skipped: Vec::new(),
        }
    }
}
