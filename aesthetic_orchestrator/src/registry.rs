use crate::error::OrchestratorError;
use std::collections::BTreeMap;

const READINESS_SUFFIX: &str = "/is_model_ready";
const PREDICT_SUFFIX: &str = "/predict";

/// Network location of one predictor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictorEndpoint {
    name: String,
    base_url: String,
    readiness_url: String,
    predict_url: String,
}

impl PredictorEndpoint {
    pub fn new(name: &str, base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            name: name.to_string(),
            readiness_url: format!("{}{}", base_url, READINESS_SUFFIX),
            predict_url: format!("{}{}", base_url, PREDICT_SUFFIX),
            base_url,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn readiness_url(&self) -> &str {
        &self.readiness_url
    }

    pub fn predict_url(&self) -> &str {
        &self.predict_url
    }
}

/// Predictor names requested for a run, in order, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredictorSelection {
    names: Vec<String>,
}

impl PredictorSelection {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut selection = Vec::new();
        for name in names {
            let name = name.into();
            if !selection.contains(&name) {
                selection.push(name);
            }
        }
        Self { names: selection }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

#[derive(Debug, Clone, Default)]
pub struct PredictorRegistry {
    endpoints: BTreeMap<String, PredictorEndpoint>,
}

impl PredictorRegistry {
    pub fn from_addresses(addresses: &BTreeMap<String, String>) -> Self {
        let endpoints = addresses
            .iter()
            .map(|(name, base_url)| (name.clone(), PredictorEndpoint::new(name, base_url)))
            .collect();
        Self { endpoints }
    }

    pub fn get(&self, name: &str) -> Option<&PredictorEndpoint> {
        self.endpoints.get(name)
    }

    pub fn known_names(&self) -> Vec<String> {
        self.endpoints.keys().cloned().collect()
    }

    pub fn validate(&self, selection: &PredictorSelection) -> bool {
        validate(selection, self)
    }

    /// Endpoints for every selected predictor, in selection order.
    pub fn resolve(
        &self,
        selection: &PredictorSelection,
    ) -> Result<Vec<PredictorEndpoint>, OrchestratorError> {
        if !self.validate(selection) {
            let unknown = selection
                .names()
                .iter()
                .filter(|name| !self.endpoints.contains_key(name.as_str()))
                .cloned()
                .collect();
            return Err(OrchestratorError::InvalidSelection {
                unknown,
                known: self.known_names(),
            });
        }

        Ok(selection
            .names()
            .iter()
            .filter_map(|name| self.endpoints.get(name.as_str()).cloned())
            .collect())
    }
}

/// True iff every selected name is a key of the registry.
pub fn validate(selection: &PredictorSelection, registry: &PredictorRegistry) -> bool {
    selection
        .names()
        .iter()
        .all(|name| registry.endpoints.contains_key(name.as_str()))
}
