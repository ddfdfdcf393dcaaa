//! Descriptor accounting for the walker.
//!
//! Kept in its own test binary with a single test: `/proc/self/fd` is
//! process-wide, so any test running alongside would disturb the counts.

use std::cell::Cell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use getdents::{walk, DirHandle, DirectoryReader, Getdents, GetdentsError, RawDirent};

fn open_fds() -> usize {
    // The read_dir handle itself is counted every time, so it cancels out.
    fs::read_dir("/proc/self/fd").unwrap().count()
}

/// Records the highest descriptor count seen while a handle is open.
struct Counting {
    peak: Rc<Cell<usize>>,
}

impl DirectoryReader for Counting {
    type Handle = DirHandle;

    fn min_buffer_size(&self) -> usize {
        Getdents.min_buffer_size()
    }

    fn open(&self, path: &Path) -> Result<DirHandle, GetdentsError> {
        Getdents.open(path)
    }

    fn read_batch(
        &self,
        handle: &mut DirHandle,
        buffer_size: usize,
        randomize: bool,
    ) -> Result<Vec<RawDirent>, GetdentsError> {
        self.peak.set(self.peak.get().max(open_fds()));
        Getdents.read_batch(handle, buffer_size, randomize)
    }
}

#[test]
fn no_handle_outlives_a_read() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("a/b/c/d")).unwrap();
    fs::create_dir_all(root.join("e/f")).unwrap();
    for sub in ["a", "a/b", "a/b/c", "e"] {
        fs::write(root.join(sub).join("file"), "x").unwrap();
    }

    let baseline = open_fds();
    let peak = Rc::new(Cell::new(0));

    let mut walker = walk(root)
        .build_with(Counting { peak: Rc::clone(&peak) })
        .unwrap();
    assert_eq!(open_fds(), baseline);

    for _ in 0..4 {
        walker.next().unwrap().unwrap();
        assert_eq!(open_fds(), baseline, "handle left open between items");
    }
    assert_eq!(peak.get(), baseline + 1, "more than one handle open during a read");

    drop(walker);
    assert_eq!(open_fds(), baseline);

    // A complete walk ends in the same state.
    let n = walk(root)
        .build_with(Counting { peak: Rc::clone(&peak) })
        .unwrap()
        .count();
    assert_eq!(n, 11);
    assert_eq!(peak.get(), baseline + 1);
    assert_eq!(open_fds(), baseline);
}
