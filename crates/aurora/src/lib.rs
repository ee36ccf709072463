//! Top-level facade crate for Aurora.
//!
//! Re-exports the exposition core and the exporter library so users can depend on a single crate.

pub mod core {
    pub use aurora_core::*;
}

pub mod exporter {
    pub use aurora_exporter::*;
}
