//! Parsed exposition model.

use std::fmt;

/// Declared kind of a metric family (`# TYPE` line).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
    Summary,
    /// No `# TYPE` line, or `# TYPE ... untyped`.
    #[default]
    Untyped,
}

impl MetricKind {
    /// Parse the kind token of a `# TYPE` line.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "counter" => Some(MetricKind::Counter),
            "gauge" => Some(MetricKind::Gauge),
            "histogram" => Some(MetricKind::Histogram),
            "summary" => Some(MetricKind::Summary),
            "untyped" => Some(MetricKind::Untyped),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
            MetricKind::Summary => "summary",
            MetricKind::Untyped => "untyped",
        }
    }

    /// Single-value kinds. Only these can be republished as a plain gauge.
    pub fn is_scalar(self) -> bool {
        matches!(self, MetricKind::Counter | MetricKind::Gauge | MetricKind::Untyped)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed data point.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    /// Series name as written in the file. Equal to the family name except for
    /// histogram/summary suffixes (`_bucket`, `_sum`, `_count`).
    pub name: String,
    /// Label pairs in file order.
    pub labels: Vec<(String, String)>,
    pub value: f64,
    /// Optional timestamp (milliseconds since epoch).
    pub timestamp_ms: Option<i64>,
}

impl MetricSample {
    /// Look up a label value by name.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A parsed family: everything declared under one metric name.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub name: String,
    /// Empty when the file has no `# HELP` line for this family.
    pub help: String,
    pub kind: MetricKind,
    pub samples: Vec<MetricSample>,
}

impl MetricFamily {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: String::new(),
            kind: MetricKind::Untyped,
            samples: Vec::new(),
        }
    }
}
