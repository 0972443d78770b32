use crate::{
    batch::ImageBatch,
    client::{PredictionRequest, PredictorClient},
    error::PredictorError,
    registry::PredictorEndpoint,
    report::PredictionReport,
    telemetry::Metrics,
};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::instrument;

/// Outcome of one (image, predictor) call, handed back to the aggregating loop.
struct PairOutcome {
    image: String,
    predictor: String,
    result: Result<Value, PredictorError>,
}

pub struct Dispatcher<C: PredictorClient> {
    client: Arc<C>,
    max_in_flight: usize,
    metrics: Arc<Metrics>,
}

impl<C: PredictorClient> Dispatcher<C> {
    pub fn new(client: Arc<C>, max_in_flight: usize, metrics: Arc<Metrics>) -> Self {
        Self {
            client,
            max_in_flight: max_in_flight.max(1),
            metrics,
        }
    }

    /// Sends every image to every endpoint and collects the answers.
    ///
    /// Each eligible image gets a report entry, possibly empty. A failed call
    /// leaves its predictor out of that image's entry and nothing else.
    #[instrument(skip_all, fields(images = batch.images().len(), predictors = endpoints.len()))]
    pub async fn dispatch(
        &self,
        batch: &ImageBatch,
        endpoints: &[PredictorEndpoint],
    ) -> PredictionReport {
        tracing::info!("Starting prediction");

        let mut report = PredictionReport::new();
        for image in batch.images() {
            report.insert_image(&image.id);
        }

        let pairs = batch.images().iter().flat_map(|image| {
            endpoints
                .iter()
                .map(move |endpoint| (image, endpoint))
        });

        let mut outcomes = stream::iter(pairs)
            .map(|(image, endpoint)| {
                let client = self.client.clone();
                let request = PredictionRequest::for_image(&image.path);
                async move {
                    let started = Instant::now();
                    let result = client.predict(endpoint, &request).await;
                    (
                        PairOutcome {
                            image: image.id.clone(),
                            predictor: endpoint.name().to_string(),
                            result,
                        },
                        started.elapsed().as_millis() as u64,
                    )
                }
            })
            .buffer_unordered(self.max_in_flight);

        while let Some((outcome, elapsed_ms)) = outcomes.next().await {
            self.aggregate(&mut report, outcome, elapsed_ms);
        }

        tracing::info!(images = report.image_count(), "Prediction finished");
        report
    }

    fn aggregate(&self, report: &mut PredictionReport, outcome: PairOutcome, elapsed_ms: u64) {
        match outcome.result {
            Ok(payload) => {
                self.metrics
                    .record_dispatch(&outcome.predictor, "success", elapsed_ms);
                tracing::debug!(
                    "Predictor {} answered for {}",
                    outcome.predictor,
                    outcome.image
                );
                report.record(&outcome.image, &outcome.predictor, payload);
            }
            Err(e) => {
                self.metrics
                    .record_dispatch(&outcome.predictor, e.kind(), elapsed_ms);
                tracing::warn!(
                    error_kind = e.kind(),
                    "No prediction from {} for {}: {}",
                    outcome.predictor,
                    outcome.image,
                    e
                );
            }
        }
    }
}
