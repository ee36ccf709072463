//! Exporter self-observability.
//!
//! Counts what the folder watcher sees and exposes the build version, rendered
//! by the `/metrics` handler alongside the gauges created from file content.

pub mod metrics;

pub use metrics::{EventCounter, ExporterMetrics, FOLDER_EVENTS_METRIC};
