use crate::{error::PredictorError, registry::PredictorEndpoint};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::{path::Path, time::Duration};
use tracing::instrument;

/// Body fragment a predictor returns while its model is still loading.
pub const NOT_INITIALIZED_SENTINEL: &str = "Model not initialized";

/// Body of a predict call. Inputs are still images, so the frame range is
/// always zero.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRequest {
    pub content_path: String,
    pub start_frame: u32,
    pub end_frame: u32,
}

impl PredictionRequest {
    pub fn for_image(path: &Path) -> Self {
        Self {
            content_path: path.to_string_lossy().into_owned(),
            start_frame: 0,
            end_frame: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    NotReady,
}

#[async_trait]
pub trait PredictorClient: Send + Sync + 'static {
    async fn probe(&self, endpoint: &PredictorEndpoint) -> Result<Readiness, PredictorError>;

    async fn predict(
        &self,
        endpoint: &PredictorEndpoint,
        request: &PredictionRequest,
    ) -> Result<Value, PredictorError>;
}

#[derive(Clone)]
pub struct HttpPredictorClient {
    client: Client,
}

impl HttpPredictorClient {
    pub fn new(timeout: Option<Duration>) -> Result<Self, PredictorError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl PredictorClient for HttpPredictorClient {
    #[instrument(skip(self), fields(predictor = endpoint.name()))]
    async fn probe(&self, endpoint: &PredictorEndpoint) -> Result<Readiness, PredictorError> {
        let response = self.client.get(endpoint.readiness_url()).send().await?;
        let body = response.bytes().await?;

        if String::from_utf8_lossy(&body).contains(NOT_INITIALIZED_SENTINEL) {
            return Ok(Readiness::NotReady);
        }
        Ok(Readiness::Ready)
    }

    #[instrument(skip(self, request), fields(predictor = endpoint.name(), content = %request.content_path))]
    async fn predict(
        &self,
        endpoint: &PredictorEndpoint,
        request: &PredictionRequest,
    ) -> Result<Value, PredictorError> {
        let response = self
            .client
            .post(endpoint.predict_url())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PredictorError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let payload: Value =
            serde_json::from_slice(&body).map_err(|e| PredictorError::Decode(e.to_string()))?;

        if payload.is_null() {
            return Err(PredictorError::EmptyPayload);
        }

        Ok(payload)
    }
}
