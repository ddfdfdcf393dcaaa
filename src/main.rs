//! getdents - stream every entry under a directory.
//!
//! Entry point for the CLI application.

use std::ffi::OsString;
use std::io::{self, BufWriter, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;
use std::process::{Command, ExitCode};

use anyhow::{bail, Context, Result};
use clap::Parser;
use getdents::{Dent, EntryType, ErrorPolicy, Listing, DEFAULT_BUFFER_SIZE};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Stream directory entries using batched getdents64 reads
#[derive(Parser, Debug)]
#[command(
    name = "getdents",
    version,
    about = "Stream directory entries using batched getdents64 reads",
    after_help = "EXAMPLES:\n    \
        getdents /var/log --printn\n    \
        getdents . --max-depth 1 --nofiles --printn\n    \
        getdents /srv --count --nodirs\n    \
        getdents /data --exec md5sum --nodirs --nosymlinks"
)]
struct Cli {
    /// Directory to walk
    #[arg(value_name = "PATH")]
    path: PathBuf,

    /// Descend at most this many levels of directories below PATH
    #[arg(long, value_name = "INT")]
    max_depth: Option<u32>,

    /// Only print entries at least this many levels below PATH
    #[arg(long, value_name = "INT")]
    min_depth: Option<u32>,

    /// Run CMD with each printed path as its only argument and print its
    /// output (expected to be a single line) before the path
    #[arg(long = "exec", value_name = "CMD")]
    command: Option<OsString>,

    /// Print entry names instead of full paths
    #[arg(long)]
    namesonly: bool,

    /// Print the number of entries instead of the entries
    #[arg(long)]
    count: bool,

    /// Randomize output order
    #[arg(long)]
    random: bool,

    /// Do not print regular files
    #[arg(long)]
    nofiles: bool,

    /// Do not print directories
    #[arg(long)]
    nodirs: bool,

    /// Do not print symbolic links
    #[arg(long)]
    nosymlinks: bool,

    /// Do not print character devices
    #[arg(long)]
    nochar: bool,

    /// Do not print block devices
    #[arg(long)]
    noblock: bool,

    /// Do not print fifos
    #[arg(long)]
    nofifo: bool,

    /// Do not print sockets
    #[arg(long)]
    nosockets: bool,

    /// Terminate items with a newline instead of a NUL byte
    #[arg(long)]
    printn: bool,

    /// Bytes per getdents64 call
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,

    /// Debugging output on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when the walk finished but some entries failed.
fn run() -> Result<bool> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let mut builder = getdents::paths(&cli.path)
        .buffer_size(cli.buffer_size)
        .randomize(cli.random)
        .on_error(ErrorPolicy::Report)
        .include_files(!cli.nofiles)
        .include_dirs(!cli.nodirs)
        .include_symlinks(!cli.nosymlinks);
    if let Some(d) = cli.max_depth {
        builder = builder.max_depth(i64::from(d));
    }
    if let Some(d) = cli.min_depth {
        builder = builder.min_depth(i64::from(d));
    }
    for (skip, ty) in [
        (cli.nochar, EntryType::CharDevice),
        (cli.noblock, EntryType::BlockDevice),
        (cli.nofifo, EntryType::Fifo),
        (cli.nosockets, EntryType::Socket),
    ] {
        if skip {
            builder = builder.exclude(ty);
        }
    }

    let mut entries = builder
        .build()
        .with_context(|| format!("cannot walk {}", cli.path.display()))?;

    let end: &[u8] = if cli.printn { b"\n" } else { b"\0" };
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut matched: u64 = 0;
    let mut failures: u64 = 0;

    for item in entries.by_ref() {
        let listing = match item {
            Ok(l) => l,
            Err(e) => {
                failures += 1;
                warn!("{:#}", anyhow::Error::from(e));
                continue;
            }
        };
        matched += 1;
        if cli.count {
            continue;
        }

        let Listing::Entry(dent) = listing else {
            continue;
        };
        if let Some(cmd) = &cli.command {
            let prefix = exec_first_line(cmd, &dent)?;
            out.write_all(&prefix)?;
            out.write_all(b" ")?;
            out.write_all(dent.path().as_os_str().as_bytes())?;
        } else if cli.namesonly {
            out.write_all(dent.name().as_bytes())?;
        } else {
            out.write_all(dent.path().as_os_str().as_bytes())?;
        }
        out.write_all(end)?;
    }

    if cli.count {
        writeln!(out, "{matched}")?;
    }
    out.flush()?;

    let stats = entries.stats();
    info!(
        dirs = stats.dirs_read,
        seen = stats.entries_seen,
        printed = matched,
        errors = stats.errors,
        elapsed_ms = stats.duration.as_millis() as u64,
        per_sec = stats.entries_per_sec,
        "walk finished"
    );

    Ok(failures == 0)
}

/// Run `cmd <path>` and return its stdout without the trailing newline.
fn exec_first_line(cmd: &OsString, dent: &Dent) -> Result<Vec<u8>> {
    let output = Command::new(cmd)
        .arg(dent.path())
        .output()
        .with_context(|| format!("failed to run {:?}", cmd))?;
    if !output.status.success() {
        bail!("{:?} exited with {} on {}", cmd, output.status, dent);
    }
    let mut stdout = output.stdout;
    if stdout.last() == Some(&b'\n') {
        stdout.pop();
    }
    Ok(stdout)
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "getdents=debug,warn" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
