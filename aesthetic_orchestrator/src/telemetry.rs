use crate::error::OrchestratorError;
use opentelemetry::{
    metrics::{Counter, Histogram, MeterProvider},
    KeyValue,
};
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, Registry, TextEncoder};
use std::{collections::HashSet, path::Path};

pub struct Metrics {
    readiness_probes: Counter<u64>,
    dispatch_outcomes: Counter<u64>,
    dispatch_duration: Histogram<u64>,
    skipped_entries: Counter<u64>,
    // Instruments stop exporting once the provider is dropped.
    _provider: SdkMeterProvider,
    pub registry: Registry,
}

impl Metrics {
    pub fn new() -> Result<Self, OrchestratorError> {
        let registry = Registry::new();
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()
            .map_err(|e| OrchestratorError::Telemetry(e.to_string()))?;

        let provider = SdkMeterProvider::builder().with_reader(exporter).build();

        let meter = provider.meter("aesthetic_orchestrator");

        let readiness_probes = meter
            .u64_counter("readiness_probes_total")
            .with_description("Readiness probes sent to predictors")
            .build();

        let dispatch_outcomes = meter
            .u64_counter("dispatch_outcomes_total")
            .with_description("Predict calls by predictor and outcome")
            .build();

        let boundaries = generate_boundaries((10, 100, 500, 2000, 10000));

        let dispatch_duration = meter
            .u64_histogram("dispatch_duration_ms")
            .with_boundaries(boundaries)
            .with_description("Duration of predict calls in milliseconds")
            .build();

        let skipped_entries = meter
            .u64_counter("skipped_entries_total")
            .with_description("Batch entries skipped for an unsupported extension")
            .build();

        Ok(Metrics {
            readiness_probes,
            dispatch_outcomes,
            dispatch_duration,
            skipped_entries,
            _provider: provider,
            registry,
        })
    }

    pub fn record_probe(&self, predictor: &str, outcome: &str) {
        let attributes = vec![
            KeyValue::new("predictor", predictor.to_string()),
            KeyValue::new("outcome", outcome.to_string()),
        ];
        self.readiness_probes.add(1, &attributes);
    }

    pub fn record_dispatch(&self, predictor: &str, outcome: &str, duration_ms: u64) {
        let attributes = vec![
            KeyValue::new("predictor", predictor.to_string()),
            KeyValue::new("outcome", outcome.to_string()),
        ];
        self.dispatch_outcomes.add(1, &attributes);
        self.dispatch_duration.record(
            duration_ms,
            &[KeyValue::new("predictor", predictor.to_string())],
        );
    }

    pub fn record_skipped(&self, count: u64) {
        self.skipped_entries.add(count, &[]);
    }

    /// Prometheus text exposition of everything recorded so far.
    pub fn render(&self) -> Result<String, OrchestratorError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| OrchestratorError::Telemetry(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| OrchestratorError::Telemetry(e.to_string()))
    }

    pub fn write_textfile(&self, path: &Path) -> Result<(), OrchestratorError> {
        let rendered = self.render()?;
        let write_error = |e: std::io::Error| {
            OrchestratorError::Telemetry(format!("failed to write {:?}: {}", path, e))
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        std::fs::write(path, rendered).map_err(write_error)?;

        tracing::info!("Wrote metrics to {:?}", path);
        Ok(())
    }
}

fn generate_boundaries(parts: (i32, i32, i32, i32, i32)) -> Vec<f64> {
    let first_step: usize = 10;
    let middle_step: usize = 50;
    let end_step: usize = 250;
    let tail_step: usize = 2000;
    let first_part = (parts.0..=parts.1).step_by(first_step);
    let middle_part = (parts.1..=parts.2).step_by(middle_step);
    let end_part = (parts.2..=parts.3).step_by(end_step);
    let tail_part = (parts.3..=parts.4).step_by(tail_step);

    let mut seen = HashSet::new();
    first_part
        .chain(middle_part)
        .chain(end_part)
        .chain(tail_part)
        .filter(|&x| seen.insert(x))
        .map(|x| x as f64)
        .collect()
}
