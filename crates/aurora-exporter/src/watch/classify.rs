//! Event classification and file eligibility.

use std::path::Path;

use notify::event::ModifyKind;
use notify::EventKind;

/// Watcher-level operation derived from a notify event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Write,
    Remove,
    Rename,
    /// Permission / metadata change.
    Chmod,
    Unknown,
}

impl Operation {
    /// Label value used by the events counter.
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "CREATE",
            Operation::Write => "WRITE",
            Operation::Remove => "REMOVE",
            Operation::Rename => "RENAME",
            Operation::Chmod => "CHMOD",
            Operation::Unknown => "UNKNOWN",
        }
    }

    /// Only new or rewritten files are read and parsed.
    pub fn triggers_ingest(self) -> bool {
        matches!(self, Operation::Create | Operation::Write)
    }
}

pub fn classify(kind: &EventKind) -> Operation {
    match kind {
        EventKind::Create(_) => Operation::Create,
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
            Operation::Write
        }
        EventKind::Modify(ModifyKind::Name(_)) => Operation::Rename,
        EventKind::Modify(ModifyKind::Metadata(_)) => Operation::Chmod,
        EventKind::Remove(_) => Operation::Remove,
        _ => Operation::Unknown,
    }
}

/// Whether the file name ends with the configured metrics extension (e.g. `.txt`).
/// Case-sensitive. A file named exactly `.txt` counts.
pub fn is_eligible(path: &Path, extension: &str) -> bool {
    let wanted = extension.strip_prefix('.').unwrap_or(extension);
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.strip_suffix(wanted)
        .is_some_and(|stem| stem.ends_with('.'))
}

/// Final path component, used as the `filename` label.
pub fn basename(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => path.to_string_lossy().into_owned(),
    }
}
