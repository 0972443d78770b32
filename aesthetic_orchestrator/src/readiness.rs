use crate::{
    client::{PredictorClient, Readiness},
    config::ReadinessConfig,
    error::OrchestratorError,
    registry::PredictorEndpoint,
    telemetry::Metrics,
};
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration, Instant};

/// How long to keep probing a predictor that is not ready yet.
///
/// With neither bound set the gate waits forever, one probe every `interval`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
    pub timeout: Option<Duration>,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: None,
            timeout: None,
        }
    }
}

impl From<&ReadinessConfig> for ReadinessPolicy {
    fn from(config: &ReadinessConfig) -> Self {
        Self {
            interval: config.get_poll_interval(),
            max_attempts: config.max_attempts,
            timeout: config.get_timeout(),
        }
    }
}

pub struct ReadinessGate<C: PredictorClient> {
    client: Arc<C>,
    policy: ReadinessPolicy,
    metrics: Arc<Metrics>,
}

impl<C: PredictorClient> ReadinessGate<C> {
    pub fn new(client: Arc<C>, policy: ReadinessPolicy, metrics: Arc<Metrics>) -> Self {
        Self {
            client,
            policy,
            metrics,
        }
    }

    /// Returns once every endpoint has reported ready, probing them one at a
    /// time in the given order.
    pub async fn await_ready(&self, endpoints: &[PredictorEndpoint]) -> Result<(), OrchestratorError> {
        for endpoint in endpoints {
            tracing::info!("Waiting for connection with predictor {} ...", endpoint.name());
            let attempts = self.wait_for(endpoint).await?;
            tracing::info!(
                attempts,
                "Connection established to predictor {}",
                endpoint.name()
            );
        }
        Ok(())
    }

    async fn wait_for(&self, endpoint: &PredictorEndpoint) -> Result<u32, OrchestratorError> {
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;

            let outcome = match self.remaining(started) {
                Some(remaining) => timeout(remaining, self.client.probe(endpoint)).await.ok(),
                None => Some(self.client.probe(endpoint).await),
            };

            match outcome {
                Some(Ok(Readiness::Ready)) => {
                    self.metrics.record_probe(endpoint.name(), "ready");
                    return Ok(attempts);
                }
                Some(Ok(Readiness::NotReady)) => {
                    self.metrics.record_probe(endpoint.name(), "not_ready");
                    tracing::debug!(attempts, "Predictor {} is still loading", endpoint.name());
                }
                Some(Err(e)) => {
                    self.metrics.record_probe(endpoint.name(), "unreachable");
                    tracing::warn!(attempts, "Predictor {} is unreachable: {}", endpoint.name(), e);
                }
                None => {
                    self.metrics.record_probe(endpoint.name(), "timeout");
                    tracing::warn!(attempts, "Readiness probe to {} timed out", endpoint.name());
                }
            }

            if self.exhausted(started, attempts) {
                tracing::error!(
                    attempts,
                    "Giving up on predictor {} before it became ready",
                    endpoint.name()
                );
                return Err(OrchestratorError::ReadinessTimeout {
                    predictor: endpoint.name().to_string(),
                    attempts,
                });
            }

            sleep(self.policy.interval).await;
        }
    }

    fn remaining(&self, started: Instant) -> Option<Duration> {
        self.policy
            .timeout
            .map(|limit| limit.saturating_sub(started.elapsed()))
    }

    fn exhausted(&self, started: Instant, attempts: u32) -> bool {
        if let Some(max_attempts) = self.policy.max_attempts {
            if attempts >= max_attempts {
                return true;
            }
        }
        if let Some(limit) = self.policy.timeout {
            if started.elapsed() + self.policy.interval > limit {
                return true;
            }
        }
        false
    }
}
