//! Folder watching.
//!
//! - `classify`: notify event kind -> operation, extension filter.
//! - `pipeline`: count, filter, read, parse and upsert one notification.
//! - `folder`: the notify subscription and its processing task.

pub mod classify;
pub mod folder;
pub mod pipeline;

pub use classify::{classify, is_eligible, Operation};
pub use folder::{FolderWatcher, WatchTarget, WatcherState, WatcherStatus};
pub use pipeline::{EventProcessor, Outcome};
