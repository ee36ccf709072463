//! Shared application state for the Aurora exporter.
//!
//! Owns the gauge registry and the exporter's own metrics, and hands the folder
//! watcher its processor. Built once at startup and cloned into handlers.

use std::sync::Arc;

use aurora_core::error::Result;

use crate::config::ExporterConfig;
use crate::obs::ExporterMetrics;
use crate::registry::MetricRegistry;
use crate::watch::{EventProcessor, FolderWatcher, WatchTarget, WatcherState, WatcherStatus};

/// Build version: `AURORA_VERSION` at compile time, else the crate version.
pub const VERSION: &str = match option_env!("AURORA_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ExporterConfig,
    registry: Arc<MetricRegistry>,
    metrics: Arc<ExporterMetrics>,
    watcher: Arc<WatcherStatus>,
}

impl AppState {
    /// Build application state.
    /// Returns Result so main can handle errors gracefully (no panic).
    pub fn new(cfg: ExporterConfig) -> Result<Self> {
        cfg.validate()?;

        let metrics = Arc::new(ExporterMetrics::new(&cfg.exporter.namespace, version_value(VERSION)));
        let registry = Arc::new(MetricRegistry::with_reserved(metrics.reserved_names()));

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                registry,
                metrics,
                watcher: Arc::new(WatcherStatus::default()),
            }),
        })
    }

    pub fn registry(&self) -> Arc<MetricRegistry> {
        Arc::clone(&self.inner.registry)
    }

    pub fn metrics(&self) -> Arc<ExporterMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    pub fn watch_target(&self) -> WatchTarget {
        WatchTarget::new(&self.inner.cfg.watcher.path)
    }

    /// Processor wired to this state's registry and metrics.
    pub fn processor(&self) -> Arc<EventProcessor> {
        Arc::new(EventProcessor::new(
            self.registry(),
            self.metrics(),
            self.inner.cfg.watcher.extension.clone(),
        ))
    }

    /// Folder watcher for the configured directory, reporting its lifecycle
    /// back into this state.
    pub fn folder_watcher(&self) -> FolderWatcher {
        FolderWatcher::with_status(
            self.watch_target(),
            self.processor(),
            Arc::clone(&self.inner.watcher),
        )
    }

    pub fn watcher_state(&self) -> WatcherState {
        self.inner.watcher.get()
    }

    /// Ready to serve only while the watcher runs and shutdown has not begun.
    pub fn is_ready(&self) -> bool {
        !self.is_draining() && self.watcher_state() == WatcherState::Running
    }

    pub fn set_draining(&self) {
        self.inner.metrics.set_draining();
    }

    pub fn is_draining(&self) -> bool {
        self.inner.metrics.is_draining()
    }

    /// Full `/metrics` body: exporter series first, then file-driven gauges.
    pub fn render_metrics(&self) -> String {
        let mut out = String::new();
        self.inner.metrics.render(&mut out);
        self.inner.registry.render(&mut out);
        out
    }
}

/// Numeric version for the version gauge; 0 when the version is not a plain number.
pub fn version_value(version: &str) -> f64 {
    version.trim().parse().unwrap_or(0.0)
}
