use std::time::Duration;

/// Running counters for a walk.
///
/// Updated as the iterator is pulled, so a snapshot taken mid-walk reflects
/// only the work done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Directories listed (one batched read each).
    pub dirs_read: usize,

    /// Entries decoded from listings, including the `.` of every directory.
    pub entries_seen: usize,

    /// Entries handed to the caller.
    pub yielded: usize,

    /// Errors reported or skipped.
    pub errors: usize,

    /// Wall-clock time from the first pull to the snapshot.
    pub duration: Duration,

    /// Entries seen per second. Convenience field, equals
    /// `entries_seen / duration.as_secs_f64()`, clamped to 0 on
    /// zero-duration runs.
    pub entries_per_sec: usize,
}

impl ScanStats {
    /// Stamp `duration` and recompute `entries_per_sec`.
    pub(crate) fn at(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self.entries_per_sec = if duration.as_secs_f64() > 0.0 {
            (self.entries_seen as f64 / duration.as_secs_f64()) as usize
        } else {
            0
        };
        self
    }
}
