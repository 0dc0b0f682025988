//! Observability for Red Flag Detector: structured logging via
//! `tracing-subscriber` and optional OpenTelemetry span export.

pub mod tracing_setup;

pub use tracing_setup::{LogFormat, TracingOptions, init_tracing, shutdown_tracing};
