use std::fs;
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};
use std::time::Instant;
use std::vec;

use crate::entry::{Dent, RawDirent};
use crate::error::GetdentsError;
use crate::reader::{Getdents, DEFAULT_BUFFER_SIZE};
use crate::results::ScanStats;
use crate::traits::DirectoryReader;

// ---------------------------------------------------------------------------
// WalkConfig
// ---------------------------------------------------------------------------

/// What to do when a subdirectory cannot be opened or read mid-walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Yield `Err(DirectoryUnavailable)` for the subtree and carry on with
    /// its siblings.
    #[default]
    Report,

    /// Log a warning, count it in [`ScanStats::errors`], and carry on
    /// without yielding anything.
    Skip,

    /// Yield `Err(DirectoryUnavailable)` and end the walk.
    Abort,
}

/// Traversal parameters.
///
/// Usually filled in through [`WalkBuilder`](crate::WalkBuilder), which also
/// normalizes negative depths.
#[derive(Debug, Clone)]
pub struct WalkConfig {
    /// Starting directory. Relative paths are resolved against the current
    /// directory (following symlinks) once, when the walker is built.
    pub root: PathBuf,

    /// Bytes per batched read.
    pub buffer_size: usize,

    /// Entries fewer than this many levels below the root are not yielded.
    /// `0` yields the root itself.
    pub min_depth: usize,

    /// Deepest level whose directories are descended into. Directories at
    /// this level are yielded as leaves. `None` is unbounded.
    pub max_depth: Option<usize>,

    /// Shuffle every directory listing.
    pub randomize: bool,

    pub on_error: ErrorPolicy,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            min_depth: 0,
            max_depth: None,
            randomize: false,
            on_error: ErrorPolicy::Report,
        }
    }
}

// ---------------------------------------------------------------------------
// Walker
// ---------------------------------------------------------------------------

/// One listed directory whose entries are still being handed out.
struct Frame {
    dir: PathBuf,
    depth: usize,
    batch: vec::IntoIter<RawDirent>,
}

/// Depth-first, lazy walk over a directory tree.
///
/// Each directory is opened, read in full with one
/// [`read_batch`](DirectoryReader::read_batch), and closed before any of its
/// entries are handed out, so at most one directory handle is open at a
/// time and dropping the walker mid-way leaks nothing.
///
/// A directory is yielded once, through its own `.` record, at the point its
/// listing is consumed. Only entries whose type is directory are descended
/// into; symlinks are never followed.
pub struct Walker<R: DirectoryReader = Getdents> {
    reader: R,
    root: PathBuf,
    buffer_size: usize,
    randomize: bool,
    on_error: ErrorPolicy,
    max_depth: Option<usize>,
    /// `min_depth` converted to an absolute segment count.
    min_segments: usize,
    stack: Vec<Frame>,
    started: Option<Instant>,
    stats: ScanStats,
}

impl<R: DirectoryReader> Walker<R> {
    /// Validate `config` and prepare a walk. No directory is read yet.
    ///
    /// # Errors
    ///
    /// `BufferTooSmall` if the buffer is below the reader's minimum;
    /// `NotFound`, `PermissionDenied` or `NotADirectory` if the root cannot
    /// be resolved to a directory.
    pub fn new(config: WalkConfig, reader: R) -> Result<Self, GetdentsError> {
        let min = reader.min_buffer_size();
        if config.buffer_size < min {
            return Err(GetdentsError::BufferTooSmall {
                size: config.buffer_size,
                min,
            });
        }

        let root = resolve_root(&config.root)?;
        let min_segments = config.min_depth.saturating_add(root.components().count());

        tracing::debug!(
            root = %root.display(),
            buffer_size = config.buffer_size,
            min_depth = config.min_depth,
            max_depth = ?config.max_depth,
            randomize = config.randomize,
            "walker configured"
        );

        Ok(Self {
            reader,
            root,
            buffer_size: config.buffer_size,
            randomize: config.randomize,
            on_error: config.on_error,
            max_depth: config.max_depth,
            min_segments,
            stack: Vec::new(),
            started: None,
            stats: ScanStats::default(),
        })
    }

    /// The absolute root this walk started from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Counters for the work done so far.
    pub fn stats(&self) -> ScanStats {
        let elapsed = self.started.map(|t| t.elapsed()).unwrap_or_default();
        self.stats.at(elapsed)
    }

    /// Open, drain and close one directory.
    fn list(&mut self, dir: &Path, depth: usize) -> Result<Frame, GetdentsError> {
        let mut handle = self.reader.open(dir)?;
        let batch = self
            .reader
            .read_batch(&mut handle, self.buffer_size, self.randomize)?;
        drop(handle);

        self.stats.dirs_read += 1;
        Ok(Frame {
            dir: dir.to_path_buf(),
            depth,
            batch: batch.into_iter(),
        })
    }

    /// Apply the error policy to a subtree that could not be listed.
    fn unavailable(&mut self, path: PathBuf, err: GetdentsError) -> Option<GetdentsError> {
        self.stats.errors += 1;
        match self.on_error {
            ErrorPolicy::Skip => {
                tracing::warn!(path = %path.display(), error = %err, "skipping unreadable directory");
                None
            }
            ErrorPolicy::Report => Some(GetdentsError::DirectoryUnavailable {
                path,
                source: Box::new(err),
            }),
            ErrorPolicy::Abort => {
                self.stack.clear();
                Some(GetdentsError::DirectoryUnavailable {
                    path,
                    source: Box::new(err),
                })
            }
        }
    }

    fn too_shallow(&self, dent: &Dent) -> bool {
        dent.depth() < self.min_segments
    }

    fn emit(&mut self, dent: Dent) -> Option<Result<Dent, GetdentsError>> {
        self.stats.yielded += 1;
        Some(Ok(dent))
    }
}

impl<R: DirectoryReader> Iterator for Walker<R> {
    type Item = Result<Dent, GetdentsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.started.is_none() {
            self.started = Some(Instant::now());
            let root = self.root.clone();
            match self.list(&root, 0) {
                Ok(frame) => self.stack.push(frame),
                Err(e) => {
                    self.stats.errors += 1;
                    return Some(Err(e));
                }
            }
        }

        loop {
            let frame = self.stack.last_mut()?;
            let Some(raw) = frame.batch.next() else {
                self.stack.pop();
                continue;
            };
            let depth = frame.depth;
            let dent = Dent::new(frame.dir.clone(), raw);
            let is_listed_dir = dent.path() == frame.dir;

            self.stats.entries_seen += 1;
            tracing::trace!(?dent, depth, "entry");

            if is_listed_dir {
                if self.too_shallow(&dent) {
                    continue;
                }
                return self.emit(dent);
            }

            if dent.is_dir() && self.max_depth.map_or(true, |max| depth < max) {
                // Yielded later through the child's own `.` record.
                match self.list(dent.path(), depth + 1) {
                    Ok(child) => self.stack.push(child),
                    Err(e) => {
                        if let Some(err) = self.unavailable(dent.into_path(), e) {
                            return Some(Err(err));
                        }
                    }
                }
                continue;
            }

            if self.too_shallow(&dent) {
                continue;
            }
            return self.emit(dent);
        }
    }
}

impl<R: DirectoryReader> FusedIterator for Walker<R> {}

/// Make the root absolute. Relative roots are canonicalized against the
/// current directory; absolute roots only lose redundant separators and
/// `.` segments.
fn resolve_root(root: &Path) -> Result<PathBuf, GetdentsError> {
    if root.as_os_str().is_empty() {
        return Err(GetdentsError::InvalidConfig("root path is empty".into()));
    }

    let resolved = if root.is_absolute() {
        root.components().collect()
    } else {
        fs::canonicalize(root).map_err(|e| GetdentsError::from_io(root, e))?
    };

    let md = fs::metadata(&resolved).map_err(|e| GetdentsError::from_io(&resolved, e))?;
    if !md.is_dir() {
        return Err(GetdentsError::NotADirectory(resolved));
    }
    Ok(resolved)
}
