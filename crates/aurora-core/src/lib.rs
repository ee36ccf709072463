//! Aurora core: exposition-format model, text parser, and the shared error type.
//!
//! This crate owns the parsing contract for metric files dropped into the
//! watched folder. It carries no runtime, filesystem, or transport dependencies
//! so the parser can be exercised as a pure function.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed metric files surface as `ParseError` instead of crashing the
//! watcher that feeds them in.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod exposition;

/// Shared result type.
pub use error::{AuroraError, Result};
pub use exposition::{parse_text, MetricFamily, MetricKind, MetricSample, ParseError};
