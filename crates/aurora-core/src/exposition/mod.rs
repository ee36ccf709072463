//! Prometheus text exposition format (version 0.0.4).
//!
//! - `family`: the parsed model (families, samples, kinds).
//! - `text`: the line-oriented parser.
//!
//! The parser is panic-free and all-or-nothing: malformed input is reported as
//! a `ParseError` with the offending line, and no families are returned, so a
//! bad file can never be half-applied downstream.

pub mod family;
pub mod text;

pub use family::{MetricFamily, MetricKind, MetricSample};
pub use text::{parse_text, ParseError, ParseErrorKind};
