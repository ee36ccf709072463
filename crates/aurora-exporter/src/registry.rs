//! Registry of gauges republished from metric files.
//!
//! Grow-only: a gauge is created the first time its name is seen and is never
//! removed, even when the file that produced it goes away. Values are `f64`
//! bits in an `AtomicU64`, so a scrape running concurrently with an upsert
//! sees either the old or the new value, never a torn one.

use std::collections::HashSet;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use aurora_core::error::{AuroraError, Result};

use crate::obs::metrics::{escape_help, format_value};

/// One exported series.
#[derive(Debug)]
pub struct RegisteredGauge {
    name: String,
    help: String,
    bits: AtomicU64,
}

impl RegisteredGauge {
    fn new(name: &str, help: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            bits: AtomicU64::new(value.to_bits()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Help text from the first registration.
    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn value(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }
}

/// Name -> gauge mapping, shared between the watcher (writer) and scrapes (readers).
#[derive(Default)]
pub struct MetricRegistry {
    gauges: DashMap<String, Arc<RegisteredGauge>>,
    reserved: HashSet<String>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that refuses the given names (the exporter's own series).
    pub fn with_reserved<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            gauges: DashMap::new(),
            reserved: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Set the gauge `name` to `value`, creating it with `help` on first sight.
    ///
    /// Help text of an existing gauge is left untouched.
    pub fn upsert(&self, name: &str, help: &str, value: f64) -> Result<()> {
        if self.reserved.contains(name) {
            return Err(AuroraError::ReservedName(name.to_string()));
        }

        if let Some(gauge) = self.gauges.get(name) {
            gauge.set(value);
            return Ok(());
        }

        let gauge = self
            .gauges
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(RegisteredGauge::new(name, help, value)));
        gauge.set(value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<RegisteredGauge>> {
        self.gauges.get(name).map(|r| Arc::clone(r.value()))
    }

    pub fn len(&self) -> usize {
        self.gauges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gauges.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.gauges.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    /// Render every gauge in Prometheus text exposition format, sorted by name.
    pub fn render(&self, out: &mut String) {
        let mut gauges: Vec<Arc<RegisteredGauge>> =
            self.gauges.iter().map(|r| Arc::clone(r.value())).collect();
        gauges.sort_by(|a, b| a.name.cmp(&b.name));

        for g in gauges {
            if !g.help.is_empty() {
                let _ = writeln!(out, "# HELP {} {}", g.name, escape_help(&g.help));
            }
            let _ = writeln!(out, "# TYPE {} gauge", g.name);
            let _ = writeln!(out, "{} {}", g.name, format_value(g.value()));
        }
    }
}
