//! Self-instrumentation of the exporter.
//!
//! Watcher activity is counted per (filename, operation) in a `DashMap` of
//! atomics, the same way the ad-hoc gauges are stored, and rendered in the
//! Prometheus text exposition format next to them. Label keys are fixed, so
//! the map is keyed by the label values directly.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Name of the watcher events series. Reserved in the gauge registry.
pub const FOLDER_EVENTS_METRIC: &str = "metrics_folder_watcher_events";
const FOLDER_EVENTS_HELP: &str = "Events detected by the Metrics Folder Watcher.";
const VERSION_HELP: &str = "Version of the application.";

/// Helper to escape label values.
pub(crate) fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// Helper to escape help text.
pub(crate) fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Format a sample value the way Prometheus clients do (`+Inf`, `-Inf`, `NaN`).
pub(crate) fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "+Inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        v.to_string()
    }
}

/// Counter keyed by (basename, operation).
///
/// Grows without eviction; cardinality is bounded by the watched folder's contents.
#[derive(Default)]
pub struct EventCounter {
    map: DashMap<(String, String), AtomicU64>,
}

impl EventCounter {
    /// Increment by 1.
    pub fn inc(&self, filename: &str, operation: &str) {
        if let Some(counter) = self.map.get(&(filename.to_string(), operation.to_string())) {
            counter.fetch_add(1, Ordering::Relaxed);
            return;
        }
        let counter = self
            .map
            .entry((filename.to_string(), operation.to_string()))
            .or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Current count (0 if never seen).
    pub fn get(&self, filename: &str, operation: &str) -> u64 {
        self.map
            .get(&(filename.to_string(), operation.to_string()))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Number of distinct (filename, operation) series.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Render in Prometheus text exposition format, sorted for stable output.
    fn render(&self, name: &str, out: &mut String) {
        let mut rows: Vec<(String, String, u64)> = self
            .map
            .iter()
            .map(|r| {
                let (file, op) = r.key();
                (file.clone(), op.clone(), r.value().load(Ordering::Relaxed))
            })
            .collect();
        rows.sort();

        let _ = writeln!(out, "# HELP {} {}", name, FOLDER_EVENTS_HELP);
        let _ = writeln!(out, "# TYPE {} gauge", name);
        for (file, op, val) in rows {
            let _ = writeln!(
                out,
                "{}{{filename=\"{}\",operations=\"{}\"}} {}",
                name,
                escape_label(&file),
                escape_label(&op),
                val
            );
        }
    }
}

/// Exporter-owned series: watcher events, build version, draining flag.
pub struct ExporterMetrics {
    pub folder_events: EventCounter,
    version_metric: String,
    version: f64,
    draining: AtomicBool,
}

impl ExporterMetrics {
    pub fn new(namespace: &str, version: f64) -> Self {
        Self {
            folder_events: EventCounter::default(),
            version_metric: format!("{namespace}_version_info"),
            version,
            draining: AtomicBool::new(false),
        }
    }

    /// Mark draining state.
    pub fn set_draining(&self) { self.draining.store(true, Ordering::Relaxed); }
    /// Return whether draining is active.
    pub fn is_draining(&self) -> bool { self.draining.load(Ordering::Relaxed) }

    pub fn version(&self) -> f64 {
        self.version
    }

    /// Names the gauge registry must never hand out to file content.
    pub fn reserved_names(&self) -> Vec<String> {
        vec![FOLDER_EVENTS_METRIC.to_string(), self.version_metric.clone()]
    }

    /// Render the exporter's own series.
    pub fn render(&self, out: &mut String) {
        self.folder_events.render(FOLDER_EVENTS_METRIC, out);
        let _ = writeln!(out, "# HELP {} {}", self.version_metric, VERSION_HELP);
        let _ = writeln!(out, "# TYPE {} gauge", self.version_metric);
        let _ = writeln!(out, "{} {}", self.version_metric, format_value(self.version));
    }
}
