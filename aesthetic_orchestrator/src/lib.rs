mod batch;
mod dispatch;
mod readiness;
mod staging;
mod telemetry;

pub mod app;
pub mod client;
pub mod config;
pub mod error;
pub mod registry;
pub mod report;

pub use app::{run, run_with_client, Orchestrator};
pub use batch::{is_eligible, BatchImage, ImageBatch};
pub use dispatch::Dispatcher;
pub use readiness::{ReadinessGate, ReadinessPolicy};
pub use staging::StagingArea;
pub use telemetry::Metrics;
