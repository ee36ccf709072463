//! Aurora exporter library entry.
//!
//! This crate wires the folder watcher, the gauge registry, and the scrape
//! endpoints into the exporter daemon. It is intended to be consumed by the
//! binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod obs;
pub mod ops;
pub mod registry;
pub mod router;
pub mod watch;
