use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::iter::FusedIterator;
use std::os::unix::ffi::OsStrExt;

use crate::entry::{Dent, EntryType};
use crate::error::GetdentsError;
use crate::reader::Getdents;
use crate::results::ScanStats;
use crate::traits::{DirectoryReader, Matcher};
use crate::walker::Walker;

// ---------------------------------------------------------------------------
// TypeFilter
// ---------------------------------------------------------------------------

/// Set of entry types to let through, one bit per `DT_*` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeFilter(u16);

impl TypeFilter {
    const TYPES: [EntryType; 8] = [
        EntryType::Unknown,
        EntryType::Fifo,
        EntryType::CharDevice,
        EntryType::Directory,
        EntryType::BlockDevice,
        EntryType::RegularFile,
        EntryType::Symlink,
        EntryType::Socket,
    ];

    fn bit(ty: EntryType) -> u16 {
        1 << ty.as_raw()
    }

    /// Every type, including unresolved entries.
    pub fn all() -> Self {
        Self(Self::TYPES.iter().fold(0, |acc, &t| acc | Self::bit(t)))
    }

    pub fn none() -> Self {
        Self(0)
    }

    pub fn only(ty: EntryType) -> Self {
        Self(Self::bit(ty))
    }

    pub fn set(self, ty: EntryType, allowed: bool) -> Self {
        if allowed {
            Self(self.0 | Self::bit(ty))
        } else {
            Self(self.0 & !Self::bit(ty))
        }
    }

    pub fn allows(self, ty: EntryType) -> bool {
        self.0 & Self::bit(ty) != 0
    }
}

impl Default for TypeFilter {
    fn default() -> Self {
        Self::all()
    }
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// One result of a filtered walk: the full entry, or only its name when
/// names-only output was requested.
#[derive(Debug, PartialEq, Eq)]
pub enum Listing {
    Entry(Dent),
    Name(OsString),
}

impl Listing {
    /// The entry's name, in both forms.
    pub fn name(&self) -> &OsStr {
        match self {
            Self::Entry(d) => d.name(),
            Self::Name(n) => n,
        }
    }

    pub fn entry(&self) -> Option<&Dent> {
        match self {
            Self::Entry(d) => Some(d),
            Self::Name(_) => None,
        }
    }

    pub fn into_entry(self) -> Option<Dent> {
        match self {
            Self::Entry(d) => Some(d),
            Self::Name(_) => None,
        }
    }

    /// Raw bytes to print: the full path for entries, the name otherwise.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Entry(d) => d.path().as_os_str().as_bytes(),
            Self::Name(n) => n.as_bytes(),
        }
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Filter settings applied on top of a [`Walker`].
///
/// `pub(crate)`: callers configure these through
/// [`PathsBuilder`](crate::PathsBuilder).
pub(crate) struct FilterOptions {
    pub types: TypeFilter,
    pub names: Option<HashSet<OsString>>,
    pub names_only: bool,
    pub min_size: u64,
    pub max_size: Option<u64>,
    pub matcher: Option<Box<dyn Matcher>>,
}

impl FilterOptions {
    /// Sizes are only looked up when a bound is actually set.
    fn checks_size(&self) -> bool {
        self.min_size > 0 || self.max_size.is_some()
    }
}

/// A walk with type, name, size and custom filters applied, in walk order.
///
/// Filtering never changes which directories are descended into: the
/// underlying [`Walker`] still traverses everything within its depth bounds.
pub struct Paths<R: DirectoryReader = Getdents> {
    walker: Walker<R>,
    opts: FilterOptions,
    yielded: usize,
    errors: usize,
}

impl<R: DirectoryReader> Paths<R> {
    pub(crate) fn new(walker: Walker<R>, opts: FilterOptions) -> Self {
        Self {
            walker,
            opts,
            yielded: 0,
            errors: 0,
        }
    }

    pub fn walker(&self) -> &Walker<R> {
        &self.walker
    }

    /// Walk counters, with `yielded` and `errors` reflecting this filter's
    /// output.
    pub fn stats(&self) -> ScanStats {
        let mut stats = self.walker.stats();
        stats.yielded = self.yielded;
        stats.errors += self.errors;
        stats
    }

    fn keep(&self, dent: &Dent) -> Result<bool, GetdentsError> {
        if let Some(names) = &self.opts.names {
            if !names.contains(dent.name()) {
                return Ok(false);
            }
        }

        if !self.opts.types.allows(dent.file_type()?) {
            return Ok(false);
        }

        if self.opts.checks_size() {
            let size = dent.size()?;
            if size < self.opts.min_size {
                return Ok(false);
            }
            if self.opts.max_size.is_some_and(|max| size > max) {
                return Ok(false);
            }
        }

        Ok(self.opts.matcher.as_ref().map_or(true, |m| m.is_match(dent)))
    }
}

impl<R: DirectoryReader> Iterator for Paths<R> {
    type Item = Result<Listing, GetdentsError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let dent = match self.walker.next()? {
                Ok(d) => d,
                Err(e) => return Some(Err(e)),
            };

            match self.keep(&dent) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    self.errors += 1;
                    return Some(Err(e));
                }
            }

            self.yielded += 1;
            let listing = if self.opts.names_only {
                Listing::Name(dent.name().to_os_string())
            } else {
                Listing::Entry(dent)
            };
            return Some(Ok(listing));
        }
    }
}

impl<R: DirectoryReader> FusedIterator for Paths<R> {}
