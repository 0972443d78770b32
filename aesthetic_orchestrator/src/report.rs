use crate::error::OrchestratorError;
use serde::{Deserialize, Serialize};
use serde_json::{ser::PrettyFormatter, Serializer, Value};
use std::{collections::BTreeMap, path::Path};

/// Image file name -> predictor name -> predictor payload.
///
/// Keys are kept sorted so the same outcomes always render to the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredictionReport {
    images: BTreeMap<String, BTreeMap<String, Value>>,
}

impl PredictionReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an image with no predictions yet. Existing entries are kept.
    pub fn insert_image(&mut self, image: &str) {
        self.images.entry(image.to_string()).or_default();
    }

    pub fn record(&mut self, image: &str, predictor: &str, payload: Value) {
        self.images
            .entry(image.to_string())
            .or_default()
            .insert(predictor.to_string(), payload);
    }

    pub fn get(&self, image: &str) -> Option<&BTreeMap<String, Value>> {
        self.images.get(image)
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Pretty JSON, four-space indent.
    pub fn to_json(&self) -> Result<String, OrchestratorError> {
        let mut buffer = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    pub fn write_to(&self, path: &Path) -> Result<(), OrchestratorError> {
        let report_error = |source: std::io::Error| OrchestratorError::Report {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(report_error)?;
        }
        std::fs::write(path, self.to_json()?).map_err(report_error)?;

        tracing::info!(images = self.image_count(), "Wrote predictions to {:?}", path);
        Ok(())
    }
}
