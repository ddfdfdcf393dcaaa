use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GetdentsError {
    // Opening
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("path not found: {}", .0.display())]
    NotFound(PathBuf),

    // Buffer
    #[error("buffer size {size} is too small (minimum {min})")]
    BufferTooSmall { size: usize, min: usize },

    #[error("could not allocate a {0} byte directory buffer")]
    AllocationFailure(usize),

    // Traversal
    #[error("directory unavailable: {}", path.display())]
    DirectoryUnavailable {
        path: PathBuf,
        #[source]
        source: Box<GetdentsError>,
    },

    // Config
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error at {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl GetdentsError {
    /// Classify an `io::Error` raised while touching `path`.
    pub(crate) fn from_io(path: &Path, err: io::Error) -> Self {
        if err.raw_os_error() == Some(libc::ENOTDIR) {
            return Self::NotADirectory(path.to_path_buf());
        }
        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }

    /// The path this error occurred at, if applicable.
    /// Callers use this to present "Skipped: <path>" without pattern matching on variants.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotADirectory(p)
            | Self::PermissionDenied(p)
            | Self::NotFound(p)
            | Self::DirectoryUnavailable { path: p, .. }
            | Self::Io { path: p, .. } => Some(p),
            _ => None,
        }
    }

    /// Whether the walk can continue after this error.
    ///
    /// Errors scoped to one entry or one subtree (an unreadable directory, a
    /// file that vanished before its size was read) leave the rest of the
    /// traversal intact. Buffer and configuration errors affect every read.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied(_)
                | Self::NotFound(_)
                | Self::DirectoryUnavailable { .. }
                | Self::Io { .. }
        )
    }
}
