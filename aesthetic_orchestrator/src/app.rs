use crate::{
    batch::ImageBatch,
    client::{HttpPredictorClient, PredictorClient},
    config::Config,
    dispatch::Dispatcher,
    error::OrchestratorError,
    readiness::{ReadinessGate, ReadinessPolicy},
    registry::{PredictorEndpoint, PredictorRegistry, PredictorSelection},
    report::PredictionReport,
    staging::StagingArea,
    telemetry::Metrics,
};
use std::{path::Path, sync::Arc};

pub struct Orchestrator<C: PredictorClient> {
    endpoints: Vec<PredictorEndpoint>,
    gate: ReadinessGate<C>,
    dispatcher: Dispatcher<C>,
    metrics: Arc<Metrics>,
}

impl<C: PredictorClient> Orchestrator<C> {
    /// Fails with `InvalidSelection` when a selected name has no address in
    /// the active run mode. Nothing is probed or read before that check.
    pub fn new(config: &Config, client: Arc<C>) -> Result<Self, OrchestratorError> {
        let registry = PredictorRegistry::from_addresses(config.base_addresses());
        let selection = PredictorSelection::new(config.predictors.iter().cloned());

        let endpoints = registry.resolve(&selection).inspect_err(|e| {
            tracing::error!("{}. Aborting prediction", e);
        })?;
        if endpoints.is_empty() {
            tracing::warn!("No predictors selected, images will get empty results");
        }

        let metrics = Arc::new(Metrics::new()?);
        let gate = ReadinessGate::new(
            client.clone(),
            ReadinessPolicy::from(&config.readiness),
            metrics.clone(),
        );
        let dispatcher = Dispatcher::new(client, config.dispatch.max_in_flight, metrics.clone());

        Ok(Self {
            endpoints,
            gate,
            dispatcher,
            metrics,
        })
    }

    pub fn endpoints(&self) -> &[PredictorEndpoint] {
        &self.endpoints
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Waits for every selected predictor, then scores every image in
    /// `staging_dir` with each of them.
    pub async fn predict_batch(
        &self,
        staging_dir: &Path,
    ) -> Result<PredictionReport, OrchestratorError> {
        self.gate.await_ready(&self.endpoints).await?;

        let batch = ImageBatch::scan(staging_dir)?;
        self.metrics.record_skipped(batch.skipped().len() as u64);

        Ok(self.dispatcher.dispatch(&batch, &self.endpoints).await)
    }
}

pub async fn run(config: &Config) -> Result<PredictionReport, OrchestratorError> {
    let client = HttpPredictorClient::new(config.dispatch.get_request_timeout())
        .map_err(OrchestratorError::Client)?;
    run_with_client(config, Arc::new(client)).await
}

pub async fn run_with_client<C: PredictorClient>(
    config: &Config,
    client: Arc<C>,
) -> Result<PredictionReport, OrchestratorError> {
    tracing::info!(
        mode = config.run_mode().as_str(),
        predictors = ?config.predictors,
        "Starting prediction run"
    );
    let orchestrator = Orchestrator::new(config, client)?;

    let staging = StagingArea::new(config.staging_dir());
    if let Some(source) = &config.staging.import_from {
        staging.import_from(source)?;
    }

    let report = orchestrator.predict_batch(staging.dir()).await?;

    tracing::info!("Writing predictions to output json file");
    report.write_to(&config.report.output_path)?;

    if config.staging.clear_after_run {
        staging.clear()?;
    }
    if let Some(path) = &config.metrics.textfile {
        orchestrator.metrics().write_textfile(path)?;
    }

    tracing::info!("Finished");
    Ok(report)
}
