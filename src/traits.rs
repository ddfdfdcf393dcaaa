use std::path::Path;

use crate::entry::{Dent, RawDirent};
use crate::error::GetdentsError;

/// A batched directory-listing primitive.
///
/// The walker calls [`open`](DirectoryReader::open) and then
/// [`read_batch`](DirectoryReader::read_batch) exactly once per directory
/// it visits, and drops the handle before descending anywhere else. Dropping
/// the handle is the close operation, so implementations must release the
/// underlying descriptor in `Drop`.
///
/// # Contract
///
/// - `open` fails with `NotADirectory` for non-directories and with
///   `PermissionDenied`/`NotFound` per the usual filesystem semantics.
/// - `read_batch` returns every entry of the directory, including `.` and
///   excluding `..`. It fails with `BufferTooSmall` below the reader's
///   minimum buffer size and with `AllocationFailure` when the buffer cannot
///   be allocated.
/// - With `randomize` set, the order of the returned batch is shuffled.
///
/// The crate's implementation is [`Getdents`](crate::Getdents). Tests and
/// callers with unusual filesystems can substitute their own, e.g. one that
/// wraps another reader and rewrites type codes.
pub trait DirectoryReader {
    /// An open directory. Closed on drop.
    type Handle;

    /// Smallest `buffer_size` this reader accepts. Checked once when a walk
    /// is configured so the error surfaces before iteration starts.
    fn min_buffer_size(&self) -> usize {
        1
    }

    /// Open `path` for listing.
    fn open(&self, path: &Path) -> Result<Self::Handle, GetdentsError>;

    /// Read the full listing of an open directory.
    fn read_batch(
        &self,
        handle: &mut Self::Handle,
        buffer_size: usize,
        randomize: bool,
    ) -> Result<Vec<RawDirent>, GetdentsError>;
}

/// Additional per-entry predicate applied after the built-in filters.
///
/// # Example
///
/// ```rust
/// use getdents::{Matcher, Dent};
///
/// struct ExtensionMatcher(&'static str);
///
/// impl Matcher for ExtensionMatcher {
///     fn is_match(&self, entry: &Dent) -> bool {
///         entry.path()
///             .extension()
///             .map(|e| e.eq_ignore_ascii_case(self.0))
///             .unwrap_or(false)
///     }
/// }
/// ```
pub trait Matcher {
    /// Returns `true` if this entry should be included in results.
    fn is_match(&self, entry: &Dent) -> bool;
}

impl<F> Matcher for F
where
    F: Fn(&Dent) -> bool,
{
    fn is_match(&self, entry: &Dent) -> bool {
        self(entry)
    }
}
