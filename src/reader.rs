//! `getdents64(2)` directory reader.

use std::collections::hash_map::RandomState;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::hash::{BuildHasher, Hasher};
use std::io;
use std::mem::offset_of;
use std::os::unix::ffi::OsStringExt;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use crate::entry::RawDirent;
use crate::error::GetdentsError;
use crate::traits::DirectoryReader;

/// Default buffer handed to each `getdents64` call: 64 KiB.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

const NAME_MAX: usize = 255;

/// Fixed part of a `linux_dirent64` record, padded to its 8-byte alignment.
const DIRENT_HEADER: usize = offset_of!(libc::dirent64, d_name).next_multiple_of(8);

/// Smallest buffer guaranteed to hold one record with a maximal name.
pub const MIN_BUFFER_SIZE: usize = NAME_MAX + DIRENT_HEADER;

const INO_AT: usize = offset_of!(libc::dirent64, d_ino);
const RECLEN_AT: usize = offset_of!(libc::dirent64, d_reclen);
const TYPE_AT: usize = offset_of!(libc::dirent64, d_type);
const NAME_AT: usize = offset_of!(libc::dirent64, d_name);

/// Reads directories with the raw `getdents64` system call, so each syscall
/// returns as many entries as fit in the buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Getdents;

/// An open directory descriptor. Closed when dropped.
#[derive(Debug)]
pub struct DirHandle {
    file: File,
    path: PathBuf,
}

impl DirHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DirectoryReader for Getdents {
    type Handle = DirHandle;

    fn min_buffer_size(&self) -> usize {
        MIN_BUFFER_SIZE
    }

    fn open(&self, path: &Path) -> Result<DirHandle, GetdentsError> {
        // std already sets O_CLOEXEC
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_DIRECTORY | libc::O_NONBLOCK)
            .open(path)
            .map_err(|e| GetdentsError::from_io(path, e))?;
        Ok(DirHandle {
            file,
            path: path.to_path_buf(),
        })
    }

    fn read_batch(
        &self,
        handle: &mut DirHandle,
        buffer_size: usize,
        randomize: bool,
    ) -> Result<Vec<RawDirent>, GetdentsError> {
        if buffer_size < MIN_BUFFER_SIZE {
            return Err(GetdentsError::BufferTooSmall {
                size: buffer_size,
                min: MIN_BUFFER_SIZE,
            });
        }

        let mut buf: Vec<u8> = Vec::new();
        buf.try_reserve_exact(buffer_size)
            .map_err(|_| GetdentsError::AllocationFailure(buffer_size))?;
        buf.resize(buffer_size, 0);

        let mut entries = Vec::new();
        let mut syscalls = 0usize;
        loop {
            let nread = getdents64(&handle.file, &mut buf)
                .map_err(|e| GetdentsError::from_io(&handle.path, e))?;
            syscalls += 1;
            if nread == 0 {
                break;
            }
            decode_records(&buf[..nread], &mut entries)
                .map_err(|e| GetdentsError::from_io(&handle.path, e))?;
        }

        tracing::debug!(
            path = %handle.path.display(),
            entries = entries.len(),
            syscalls,
            "read directory"
        );

        if randomize {
            shuffle(&mut entries);
        }
        Ok(entries)
    }
}

/// One `getdents64` call into `buf`. Returns the number of bytes written,
/// 0 at end of directory.
#[allow(unsafe_code)]
fn getdents64(dir: &File, buf: &mut [u8]) -> io::Result<usize> {
    let count = buf.len().min(libc::c_uint::MAX as usize) as libc::c_uint;
    // SAFETY: the descriptor is open for the lifetime of `dir` and the kernel
    // writes at most `count` bytes into `buf`, which is at least that long.
    let ret = unsafe {
        libc::syscall(
            libc::SYS_getdents64,
            dir.as_raw_fd(),
            buf.as_mut_ptr().cast::<libc::c_void>(),
            count,
        )
    };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(ret as usize)
}

/// Decode the `linux_dirent64` records in `bytes`, skipping `..`.
fn decode_records(bytes: &[u8], out: &mut Vec<RawDirent>) -> io::Result<()> {
    let mut pos = 0;
    while pos < bytes.len() {
        let rest = &bytes[pos..];
        if rest.len() < NAME_AT {
            return Err(malformed("truncated record header"));
        }
        let reclen = u16::from_ne_bytes([rest[RECLEN_AT], rest[RECLEN_AT + 1]]) as usize;
        if reclen < NAME_AT || reclen > rest.len() {
            return Err(malformed("record length out of bounds"));
        }

        let mut ino = [0u8; 8];
        ino.copy_from_slice(&rest[INO_AT..INO_AT + 8]);
        let name_field = &rest[NAME_AT..reclen];
        let name_len = name_field.iter().position(|&b| b == 0).unwrap_or(name_field.len());
        let name = &name_field[..name_len];

        if name != b".." {
            out.push(RawDirent {
                inode: u64::from_ne_bytes(ino),
                raw_type: rest[TYPE_AT],
                name: OsString::from_vec(name.to_vec()),
            });
        }
        pos += reclen;
    }
    Ok(())
}

fn malformed(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, format!("getdents64: {msg}"))
}

/// Fisher-Yates with a xorshift64* stream seeded fresh per call.
fn shuffle<T>(items: &mut [T]) {
    let mut state = RandomState::new().build_hasher().finish() | 1;
    let mut next = move || {
        state ^= state >> 12;
        state ^= state << 25;
        state ^= state >> 27;
        state.wrapping_mul(0x2545_F491_4F6C_DD1D)
    };
    for i in (1..items.len()).rev() {
        let j = (next() % (i as u64 + 1)) as usize;
        items.swap(i, j);
    }
}
