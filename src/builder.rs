use std::collections::HashSet;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::entry::EntryType;
use crate::error::GetdentsError;
use crate::filter::{FilterOptions, Paths, TypeFilter};
use crate::reader::Getdents;
use crate::traits::{DirectoryReader, Matcher};
use crate::walker::{ErrorPolicy, WalkConfig, Walker};

// ---------------------------------------------------------------------------
// WalkBuilder
// ---------------------------------------------------------------------------

/// Configures a [`Walker`].
///
/// Created via [`getdents::walk()`](crate::walk).
///
/// # Example
///
/// ```rust,no_run
/// let walker = getdents::walk("/var/log")
///     .max_depth(2)
///     .randomize(true)
///     .build()?;
///
/// for entry in walker {
///     println!("{}", entry?);
/// }
/// # Ok::<(), getdents::GetdentsError>(())
/// ```
#[derive(Debug, Clone)]
pub struct WalkBuilder {
    config: WalkConfig,
}

impl WalkBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            config: WalkConfig {
                root: root.into(),
                ..WalkConfig::default()
            },
        }
    }

    // ── Traversal ─────────────────────────────────────────────────────────

    /// Bytes handed to each batched read. Defaults to 64 KiB.
    ///
    /// Larger buffers mean fewer syscalls on very large directories.
    pub fn buffer_size(mut self, bytes: usize) -> Self {
        self.config.buffer_size = bytes;
        self
    }

    /// Skip entries fewer than `d` levels below the root. `0` (the default)
    /// includes the root; negative values are treated as `0`.
    ///
    /// Shallower directories are still traversed.
    pub fn min_depth(mut self, d: i64) -> Self {
        self.config.min_depth = usize::try_from(d).unwrap_or(0);
        self
    }

    /// Descend at most `d` levels below the root. `0` lists the root's own
    /// entries without entering any subdirectory. Negative values mean
    /// unbounded, which is the default.
    pub fn max_depth(mut self, d: i64) -> Self {
        self.config.max_depth = usize::try_from(d).ok();
        self
    }

    /// Shuffle the order of every directory listing.
    pub fn randomize(mut self, yes: bool) -> Self {
        self.config.randomize = yes;
        self
    }

    /// How unreadable subdirectories are reported. Defaults to
    /// [`ErrorPolicy::Report`].
    pub fn on_error(mut self, policy: ErrorPolicy) -> Self {
        self.config.on_error = policy;
        self
    }

    pub fn config(&self) -> &WalkConfig {
        &self.config
    }

    // ── Build ─────────────────────────────────────────────────────────────

    /// Build a walker over the `getdents64` reader.
    ///
    /// # Errors
    ///
    /// Configuration errors are returned here, never from the iterator:
    /// a buffer below the minimum, or a root that is missing, unreadable or
    /// not a directory.
    pub fn build(self) -> Result<Walker<Getdents>, GetdentsError> {
        self.build_with(Getdents)
    }

    /// Build a walker over a custom [`DirectoryReader`].
    pub fn build_with<R: DirectoryReader>(self, reader: R) -> Result<Walker<R>, GetdentsError> {
        Walker::new(self.config, reader)
    }
}

// ---------------------------------------------------------------------------
// PathsBuilder
// ---------------------------------------------------------------------------

/// Configures a filtered walk.
///
/// Created via [`paths()`](crate::paths), [`files()`](crate::files),
/// [`links()`](crate::links) or [`dirs()`](crate::dirs), which differ only
/// in the initial [`TypeFilter`].
///
/// # Example
///
/// ```rust,no_run
/// let big_logs = getdents::files("/var/log")
///     .min_size(1 << 20)
///     .names_only(true)
///     .build()?;
///
/// for name in big_logs {
///     println!("{:?}", name?.name());
/// }
/// # Ok::<(), getdents::GetdentsError>(())
/// ```
pub struct PathsBuilder {
    walk: WalkBuilder,
    types: TypeFilter,
    names: Option<HashSet<OsString>>,
    names_only: bool,
    min_size: u64,
    max_size: Option<u64>,
    matcher: Option<Box<dyn Matcher>>,
}

impl PathsBuilder {
    pub fn new(root: impl Into<PathBuf>, types: TypeFilter) -> Self {
        Self {
            walk: WalkBuilder::new(root),
            types,
            names: None,
            names_only: false,
            min_size: 0,
            max_size: None,
            matcher: None,
        }
    }

    // ── Traversal ─────────────────────────────────────────────────────────

    /// See [`WalkBuilder::buffer_size`].
    pub fn buffer_size(mut self, bytes: usize) -> Self {
        self.walk = self.walk.buffer_size(bytes);
        self
    }

    /// See [`WalkBuilder::min_depth`].
    pub fn min_depth(mut self, d: i64) -> Self {
        self.walk = self.walk.min_depth(d);
        self
    }

    /// See [`WalkBuilder::max_depth`].
    pub fn max_depth(mut self, d: i64) -> Self {
        self.walk = self.walk.max_depth(d);
        self
    }

    /// See [`WalkBuilder::randomize`].
    pub fn randomize(mut self, yes: bool) -> Self {
        self.walk = self.walk.randomize(yes);
        self
    }

    /// See [`WalkBuilder::on_error`].
    pub fn on_error(mut self, policy: ErrorPolicy) -> Self {
        self.walk = self.walk.on_error(policy);
        self
    }

    // ── Types ─────────────────────────────────────────────────────────────

    pub fn include_dirs(mut self, yes: bool) -> Self {
        self.types = self.types.set(EntryType::Directory, yes);
        self
    }

    pub fn include_files(mut self, yes: bool) -> Self {
        self.types = self.types.set(EntryType::RegularFile, yes);
        self
    }

    pub fn include_symlinks(mut self, yes: bool) -> Self {
        self.types = self.types.set(EntryType::Symlink, yes);
        self
    }

    /// Drop every entry of type `ty`.
    pub fn exclude(mut self, ty: EntryType) -> Self {
        self.types = self.types.set(ty, false);
        self
    }

    pub fn types(mut self, types: TypeFilter) -> Self {
        self.types = types;
        self
    }

    // ── Names ─────────────────────────────────────────────────────────────

    /// Only yield entries whose name exactly equals one of `names`.
    ///
    /// Matching is against the entry's own name, never the full path. An
    /// empty list disables the filter.
    pub fn names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let set: HashSet<OsString> = names.into_iter().map(Into::into).collect();
        self.names = if set.is_empty() { None } else { Some(set) };
        self
    }

    /// Yield bare names ([`Listing::Name`](crate::Listing::Name)) instead of
    /// full entries.
    pub fn names_only(mut self, yes: bool) -> Self {
        self.names_only = yes;
        self
    }

    // ── Size ──────────────────────────────────────────────────────────────

    /// Skip entries smaller than `bytes`. Setting a size bound makes every
    /// entry that passes the type filter cost one `stat`; meant for
    /// [`files()`](crate::files).
    pub fn min_size(mut self, bytes: u64) -> Self {
        self.min_size = bytes;
        self
    }

    /// Skip entries larger than `bytes`.
    pub fn max_size(mut self, bytes: u64) -> Self {
        self.max_size = Some(bytes);
        self
    }

    // ── Matcher ───────────────────────────────────────────────────────────

    /// Set a custom matcher, applied after the built-in filters.
    pub fn with_matcher(mut self, m: impl Matcher + 'static) -> Self {
        self.matcher = Some(Box::new(m));
        self
    }

    // ── Build ─────────────────────────────────────────────────────────────

    /// Build the filtered walk over the `getdents64` reader.
    ///
    /// # Errors
    ///
    /// Everything [`WalkBuilder::build`] reports, plus `InvalidConfig` when
    /// `min_size` exceeds `max_size`.
    pub fn build(self) -> Result<Paths<Getdents>, GetdentsError> {
        self.build_with(Getdents)
    }

    /// Build the filtered walk over a custom [`DirectoryReader`].
    pub fn build_with<R: DirectoryReader>(self, reader: R) -> Result<Paths<R>, GetdentsError> {
        if let Some(max) = self.max_size {
            if self.min_size > max {
                return Err(GetdentsError::InvalidConfig(format!(
                    "min_size {} exceeds max_size {}",
                    self.min_size, max
                )));
            }
        }

        tracing::debug!(
            types = ?self.types,
            names = ?self.names,
            names_only = self.names_only,
            min_size = self.min_size,
            max_size = ?self.max_size,
            "filters configured"
        );

        let walker = self.walk.build_with(reader)?;
        Ok(Paths::new(
            walker,
            FilterOptions {
                types: self.types,
                names: self.names,
                names_only: self.names_only,
                min_size: self.min_size,
                max_size: self.max_size,
                matcher: self.matcher,
            },
        ))
    }
}
