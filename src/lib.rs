//! # getdents
//!
//! Lazy recursive directory walker built on batched `getdents64(2)` reads.
//!
//! Every directory is listed with a single batched read into a large buffer
//! (64 KiB by default) instead of one `readdir` call per entry, then closed
//! before its entries are handed out. Entries carry the type reported by the
//! kernel; a metadata lookup happens only for `DT_UNKNOWN` entries or when a
//! size is asked for.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! // Every entry under /etc, including /etc itself.
//! for entry in getdents::walk("/etc").build()? {
//!     let entry = entry?;
//!     println!("{} (dir: {})", entry, entry.is_dir());
//! }
//!
//! // Regular files of at least 4 KiB, at most two levels down.
//! let files = getdents::files("/etc")
//!     .max_depth(2)
//!     .min_size(4096)
//!     .build()?;
//! for listing in files {
//!     println!("{}", listing?.entry().unwrap());
//! }
//! # Ok::<(), getdents::GetdentsError>(())
//! ```
//!
//! # Depth
//!
//! Depth is counted in levels below the root: the root is level 0, its
//! entries level 1. `max_depth(n)` descends into at most `n` levels of
//! subdirectories and still reports the directories found at the boundary.
//! `min_depth(m)` hides entries above level `m` without skipping their
//! subtrees.
//!
//! # Custom readers
//!
//! The walker is generic over [`DirectoryReader`]. [`Getdents`] is the
//! `getdents64` implementation used by [`WalkBuilder::build`]; any other
//! reader can be supplied with [`WalkBuilder::build_with`].

#![deny(unsafe_code)]

#[cfg(not(any(target_os = "linux", target_os = "android")))]
compile_error!("getdents requires Linux or Android (getdents64)");

mod builder;
mod entry;
mod error;
mod filter;
mod reader;
mod results;
mod traits;
mod walker;

// ── Public re-exports ─────────────────────────────────────────────────────────

pub use builder::{PathsBuilder, WalkBuilder};
pub use entry::{Dent, EntryType, RawDirent};
pub use error::GetdentsError;
pub use filter::{Listing, Paths, TypeFilter};
pub use reader::{DirHandle, Getdents, DEFAULT_BUFFER_SIZE, MIN_BUFFER_SIZE};
pub use results::ScanStats;
pub use traits::{DirectoryReader, Matcher};
pub use walker::{ErrorPolicy, WalkConfig, Walker};

// ── Entry points ──────────────────────────────────────────────────────────────

/// Walk every entry under `root`, the root itself included.
pub fn walk(root: impl Into<std::path::PathBuf>) -> WalkBuilder {
    WalkBuilder::new(root)
}

/// Filtered walk over every entry type. Narrow it with
/// [`include_dirs`](PathsBuilder::include_dirs),
/// [`include_files`](PathsBuilder::include_files),
/// [`include_symlinks`](PathsBuilder::include_symlinks) and
/// [`exclude`](PathsBuilder::exclude).
pub fn paths(root: impl Into<std::path::PathBuf>) -> PathsBuilder {
    PathsBuilder::new(root, TypeFilter::all())
}

/// Regular files only. Supports [`min_size`](PathsBuilder::min_size) and
/// [`max_size`](PathsBuilder::max_size).
pub fn files(root: impl Into<std::path::PathBuf>) -> PathsBuilder {
    PathsBuilder::new(root, TypeFilter::only(EntryType::RegularFile))
}

/// Symbolic links only.
pub fn links(root: impl Into<std::path::PathBuf>) -> PathsBuilder {
    PathsBuilder::new(root, TypeFilter::only(EntryType::Symlink))
}

/// Directories only.
///
/// # Example
///
/// ```rust,no_run
/// let names: Vec<_> = getdents::dirs("/usr/share")
///     .max_depth(0)
///     .names_only(true)
///     .build()?
///     .filter_map(Result::ok)
///     .map(|l| l.name().to_os_string())
///     .collect();
/// # Ok::<(), getdents::GetdentsError>(())
/// ```
pub fn dirs(root: impl Into<std::path::PathBuf>) -> PathsBuilder {
    PathsBuilder::new(root, TypeFilter::only(EntryType::Directory))
}
