//! Per-notification processing: count, filter, read, parse, upsert.
//!
//! Every failure here is local to one file. Read and parse errors are logged
//! and the file is skipped; the watcher keeps running and the registry keeps
//! whatever it had before.

use std::path::Path;
use std::sync::Arc;

use notify::Event;
use tracing::{debug, info, instrument, warn};

use aurora_core::error::{AuroraError, Result};
use aurora_core::exposition::{parse_text, MetricFamily};

use crate::obs::ExporterMetrics;
use crate::registry::MetricRegistry;
use crate::watch::classify::{basename, classify, is_eligible, Operation};

/// What happened to one path of one notification.
#[derive(Debug)]
pub enum Outcome {
    /// Extension did not match; only counted.
    Filtered,
    /// Remove / rename / chmod: counted, registry untouched.
    Ignored,
    /// Unrecognised event kind: counted and logged.
    Unknown,
    /// File parsed; number of samples written to the registry.
    Ingested(usize),
    /// Read or parse failure; file skipped.
    Skipped(AuroraError),
}

/// Turns filesystem notifications into registry updates.
pub struct EventProcessor {
    registry: Arc<MetricRegistry>,
    metrics: Arc<ExporterMetrics>,
    extension: String,
}

impl EventProcessor {
    pub fn new(
        registry: Arc<MetricRegistry>,
        metrics: Arc<ExporterMetrics>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            metrics,
            extension: extension.into(),
        }
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Handle one notification. Events carrying several paths (e.g. a rename
    /// with both ends) are handled once per path.
    #[instrument(skip_all, fields(kind = ?event.kind))]
    pub async fn respond(&self, event: &Event) -> Vec<Outcome> {
        let op = classify(&event.kind);
        let mut outcomes = Vec::with_capacity(event.paths.len());
        for path in &event.paths {
            outcomes.push(self.respond_path(op, path).await);
        }
        outcomes
    }

    pub async fn respond_path(&self, op: Operation, path: &Path) -> Outcome {
        let file = basename(path);
        self.metrics.folder_events.inc(&file, op.as_str());

        if !is_eligible(path, &self.extension) {
            return Outcome::Filtered;
        }

        if op.triggers_ingest() {
            info!(file = %file, op = op.as_str(), "metrics file changed");
            return match self.ingest_file(path).await {
                Ok(applied) => Outcome::Ingested(applied),
                Err(e) => {
                    warn!(file = %file, code = e.code().as_str(), error = %e, "skipping metrics file");
                    Outcome::Skipped(e)
                }
            };
        }

        if op == Operation::Unknown {
            info!(file = %file, "unknown event");
            return Outcome::Unknown;
        }
        Outcome::Ignored
    }

    /// Read and parse the whole file, then apply it. Nothing is applied when
    /// reading or parsing fails.
    pub async fn ingest_file(&self, path: &Path) -> Result<usize> {
        let data = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AuroraError::Read(format!("{}: {e}", path.display())))?;
        let families = parse_text(&data)?;
        Ok(self.apply(&families))
    }

    /// Upsert every sample of every scalar family under the family name.
    ///
    /// Labels are dropped: samples of one family overwrite the same gauge in
    /// file order, so the last one wins. Histogram and summary families are
    /// skipped.
    pub fn apply(&self, families: &[MetricFamily]) -> usize {
        let mut applied = 0;
        for mf in families {
            if !mf.kind.is_scalar() {
                debug!(name = %mf.name, kind = %mf.kind, "skipping non-scalar family");
                continue;
            }
            for sample in &mf.samples {
                if let Err(e) = self.registry.upsert(&mf.name, &mf.help, sample.value) {
                    warn!(name = %mf.name, code = e.code().as_str(), error = %e, "family not exported");
                    break;
                }
                debug!(name = %mf.name, kind = %mf.kind, value = sample.value, "gauge updated");
                applied += 1;
            }
        }
        applied
    }
}
