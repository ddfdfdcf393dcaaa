use std::cell::OnceCell;
use std::cmp::Ordering;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

use crate::error::GetdentsError;

/// One `(inode, type, name)` record as returned by a
/// [`DirectoryReader`](crate::traits::DirectoryReader) batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDirent {
    /// Inode number (`d_ino`).
    pub inode: u64,

    /// Raw type code (`d_type`), one of the `DT_*` constants.
    pub raw_type: u8,

    /// Entry name in filesystem-native bytes.
    pub name: OsString,
}

/// The on-disk type of an entry, mirroring the POSIX `DT_*` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    /// The filesystem did not report a type (`DT_UNKNOWN`).
    Unknown,
    Fifo,
    CharDevice,
    Directory,
    BlockDevice,
    RegularFile,
    Symlink,
    Socket,
}

impl EntryType {
    /// Map a `d_type` code. Codes outside the known set read as `Unknown`
    /// and therefore go through the metadata fallback.
    pub fn from_raw(code: u8) -> Self {
        match code {
            libc::DT_FIFO => Self::Fifo,
            libc::DT_CHR => Self::CharDevice,
            libc::DT_DIR => Self::Directory,
            libc::DT_BLK => Self::BlockDevice,
            libc::DT_REG => Self::RegularFile,
            libc::DT_LNK => Self::Symlink,
            libc::DT_SOCK => Self::Socket,
            _ => Self::Unknown,
        }
    }

    /// The `d_type` code for this type.
    pub fn as_raw(self) -> u8 {
        match self {
            Self::Unknown => libc::DT_UNKNOWN,
            Self::Fifo => libc::DT_FIFO,
            Self::CharDevice => libc::DT_CHR,
            Self::Directory => libc::DT_DIR,
            Self::BlockDevice => libc::DT_BLK,
            Self::RegularFile => libc::DT_REG,
            Self::Symlink => libc::DT_LNK,
            Self::Socket => libc::DT_SOCK,
        }
    }

    fn from_file_type(ft: fs::FileType) -> Self {
        if ft.is_dir() {
            Self::Directory
        } else if ft.is_file() {
            Self::RegularFile
        } else if ft.is_symlink() {
            Self::Symlink
        } else if ft.is_fifo() {
            Self::Fifo
        } else if ft.is_char_device() {
            Self::CharDevice
        } else if ft.is_block_device() {
            Self::BlockDevice
        } else if ft.is_socket() {
            Self::Socket
        } else {
            Self::Unknown
        }
    }
}

/// A single directory entry produced by the walker.
///
/// Identity (`parent`, `name`, `inode`, raw type) is fixed at construction
/// and `path` is computed once from it. Everything that needs a syscall is
/// lazy and cached on the entry:
///
/// - the resolved type, only when the raw code is `DT_UNKNOWN` (one
///   `lstat`, shared by every `is_*` predicate),
/// - the size, only when [`size()`](Dent::size) is called (one `stat`).
///
/// Equality, ordering and hashing all compare the raw bytes of the path.
pub struct Dent {
    parent: PathBuf,
    name: OsString,
    path: PathBuf,
    inode: u64,
    raw_type: u8,
    resolved: OnceCell<Result<EntryType, io::ErrorKind>>,
    depth: OnceCell<usize>,
    size: OnceCell<Result<u64, io::ErrorKind>>,
}

impl Dent {
    /// Build an entry found in directory `parent`.
    ///
    /// A `.` name is the directory being listed: the entry becomes that
    /// directory itself, named after the last segment of `parent`. `parent`
    /// is normalized by component first, so `/x/` and `/x` give the same
    /// path. No I/O happens here.
    pub fn new(parent: PathBuf, raw: RawDirent) -> Self {
        let RawDirent {
            inode,
            raw_type,
            name,
        } = raw;
        let parent: PathBuf = parent.components().collect();

        let (parent, name, path) = if name.as_bytes() == b"." {
            let own_name = parent.file_name().map(OsStr::to_os_string).unwrap_or_default();
            let grandparent = parent.parent().map(Path::to_path_buf).unwrap_or_else(|| parent.clone());
            (grandparent, own_name, parent)
        } else {
            let path = parent.join(&name);
            (parent, name, path)
        };

        Self {
            parent,
            name,
            path,
            inode,
            raw_type,
            resolved: OnceCell::new(),
            depth: OnceCell::new(),
            size: OnceCell::new(),
        }
    }

    pub fn parent(&self) -> &Path {
        &self.parent
    }

    pub fn name(&self) -> &OsStr {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }

    pub fn inode(&self) -> u64 {
        self.inode
    }

    pub fn raw_type(&self) -> u8 {
        self.raw_type
    }

    /// The type as reported by the directory listing, without any fallback.
    pub fn reported_type(&self) -> EntryType {
        EntryType::from_raw(self.raw_type)
    }

    /// The entry's type.
    ///
    /// Returns the listed type when the filesystem reported one. For
    /// `DT_UNKNOWN` entries this performs a single `lstat` on first use and
    /// caches the outcome, including a failure.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `PermissionDenied` if the fallback lookup fails,
    /// e.g. when the entry was removed after being listed.
    pub fn file_type(&self) -> Result<EntryType, GetdentsError> {
        let reported = self.reported_type();
        if reported != EntryType::Unknown {
            return Ok(reported);
        }
        let resolved = self.resolved.get_or_init(|| {
            tracing::trace!(path = %self.path.display(), "resolving unknown entry type");
            fs::symlink_metadata(&self.path)
                .map(|md| EntryType::from_file_type(md.file_type()))
                .map_err(|e| e.kind())
        });
        resolved
            .as_ref()
            .copied()
            .map_err(|kind| GetdentsError::from_io(&self.path, io::Error::from(*kind)))
    }

    fn is(&self, ty: EntryType) -> bool {
        matches!(self.file_type(), Ok(t) if t == ty)
    }

    /// `true` when the listing did not report a type. This never changes
    /// after construction; resolution happens through the other predicates.
    pub fn is_unknown(&self) -> bool {
        self.reported_type() == EntryType::Unknown
    }

    pub fn is_fifo(&self) -> bool {
        self.is(EntryType::Fifo)
    }

    pub fn is_char_device(&self) -> bool {
        self.is(EntryType::CharDevice)
    }

    pub fn is_dir(&self) -> bool {
        self.is(EntryType::Directory)
    }

    pub fn is_block_device(&self) -> bool {
        self.is(EntryType::BlockDevice)
    }

    /// Regular files only. An unknown entry counts as a file only once the
    /// fallback lookup says it is one.
    pub fn is_file(&self) -> bool {
        self.is(EntryType::RegularFile)
    }

    pub fn is_symlink(&self) -> bool {
        self.is(EntryType::Symlink)
    }

    pub fn is_socket(&self) -> bool {
        self.is(EntryType::Socket)
    }

    /// Number of path segments from the filesystem root, counting the root.
    pub fn depth(&self) -> usize {
        *self.depth.get_or_init(|| self.path.components().count())
    }

    /// Size in bytes, from a `stat` on first call.
    ///
    /// # Errors
    ///
    /// `NotFound` if the entry vanished after listing, `PermissionDenied`
    /// if it cannot be inspected. The failure is cached like a success.
    pub fn size(&self) -> Result<u64, GetdentsError> {
        let size = self
            .size
            .get_or_init(|| fs::metadata(&self.path).map(|md| md.len()).map_err(|e| e.kind()));
        size.as_ref()
            .copied()
            .map_err(|kind| GetdentsError::from_io(&self.path, io::Error::from(*kind)))
    }
}

impl Dent {
    fn key(&self) -> &[u8] {
        self.path.as_os_str().as_bytes()
    }
}

impl PartialEq for Dent {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Dent {}

impl PartialOrd for Dent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Dent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(other.key())
    }
}

impl Hash for Dent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl AsRef<Path> for Dent {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for Dent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl fmt::Debug for Dent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dent")
            .field("parent", &self.parent)
            .field("name", &self.name)
            .field("inode", &self.inode)
            .field("raw_type", &self.reported_type())
            .field("path", &self.path)
            .finish()
    }
}
