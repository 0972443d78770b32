// Mock predictors for integration tests
#![allow(dead_code)]

use aesthetic_orchestrator::config::{
    AddressConfig, Config, DispatchConfig, LogLevel, MetricsConfig, ReadinessConfig,
    ReportConfig, StagingConfig,
};
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::{collections::BTreeMap, path::Path, sync::Arc};
use tokio::net::TcpListener;

/// How a mock predictor answers predict calls.
#[derive(Clone, Debug)]
pub enum PredictBehavior {
    /// Echoes the content path back with a fixed score.
    Score(f64),
    /// Answers 500 with a JSON error body.
    ServerError,
    /// Answers 200 with a body that is not JSON.
    Garbage,
    /// Answers 200 with a JSON `null`.
    Null,
}

pub type EventLog = Arc<Mutex<Vec<String>>>;

struct MockState {
    name: String,
    loading_probes: Mutex<u32>,
    behavior: PredictBehavior,
    requests: Mutex<Vec<Value>>,
    events: EventLog,
}

pub struct MockPredictor {
    pub base_url: String,
    state: Arc<MockState>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockPredictor {
    /// Starts a predictor on an ephemeral port that reports "Model not
    /// initialized" for the first `loading_probes` readiness probes.
    pub async fn start(
        name: &str,
        loading_probes: u32,
        behavior: PredictBehavior,
        events: EventLog,
    ) -> Self {
        let state = Arc::new(MockState {
            name: name.to_string(),
            loading_probes: Mutex::new(loading_probes),
            behavior,
            requests: Mutex::new(Vec::new()),
            events,
        });

        let app = Router::new()
            .route("/is_model_ready", get(is_model_ready))
            .route("/predict", post(predict))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            handle,
        }
    }

    pub fn requests(&self) -> Vec<Value> {
        self.state.requests.lock().clone()
    }
}

impl Drop for MockPredictor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn is_model_ready(State(state): State<Arc<MockState>>) -> String {
    let mut loading = state.loading_probes.lock();
    state.events.lock().push(format!("probe:{}", state.name));
    if *loading > 0 {
        *loading -= 1;
        return "Model not initialized".to_string();
    }
    "Model initialized".to_string()
}

async fn predict(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.events.lock().push(format!("predict:{}", state.name));
    state.requests.lock().push(body.clone());

    match state.behavior {
        PredictBehavior::Score(score) => {
            Json(json!({"score": score, "contentPath": body["contentPath"]})).into_response()
        }
        PredictBehavior::ServerError => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "prediction failed"})),
        )
            .into_response(),
        PredictBehavior::Garbage => "<html>oops</html>".into_response(),
        PredictBehavior::Null => Json(Value::Null).into_response(),
    }
}

/// An address nothing listens on.
pub fn closed_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

pub fn write_images(dir: &Path, names: &[&str]) {
    std::fs::create_dir_all(dir).unwrap();
    for name in names {
        std::fs::write(dir.join(name), b"fake image").unwrap();
    }
}

pub fn test_config(
    addresses: &[(&str, &str)],
    predictors: &[&str],
    staging_dir: &Path,
    output_path: &Path,
) -> Config {
    Config {
        log_level: LogLevel::Debug,
        deploy: false,
        predictors: predictors.iter().map(|p| p.to_string()).collect(),
        addresses: AddressConfig {
            test: addresses
                .iter()
                .map(|(name, url)| (name.to_string(), url.to_string()))
                .collect::<BTreeMap<_, _>>(),
            deploy: BTreeMap::new(),
        },
        staging: StagingConfig {
            test_dir: staging_dir.to_path_buf(),
            ..Default::default()
        },
        readiness: ReadinessConfig {
            poll_interval_secs: 1,
            max_attempts: None,
            timeout_secs: None,
        },
        dispatch: DispatchConfig {
            request_timeout_secs: Some(5),
            max_in_flight: 1,
        },
        report: ReportConfig {
            output_path: output_path.to_path_buf(),
        },
        metrics: MetricsConfig::default(),
    }
}
