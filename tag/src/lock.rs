//! Single instance lock
//!
//! The lock file contains the PID of the running tag. It is locked for as long as the process
//! holds on to the [`LockFile`], so a second tag fails to take the lock while the first one runs.

use lbeacon_tag::retry::{retry, DEFAULT_ATTEMPTS};
use nix::fcntl::{flock, FlockArg};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum Error {
    Open(PathBuf, std::io::Error),
    /// Another process holds the lock
    Locked(PathBuf, nix::Error),
    WritePid(PathBuf, std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Open(path, e) => write!(f, "failed to open lock file {}, {}", path.display(), e),
            Error::Locked(path, e) => write!(f, "failed to lock {} (is another tag running?), {}", path.display(), e),
            Error::WritePid(path, e) => write!(f, "failed to write the PID to {}, {}", path.display(), e),
        }
    }
}

impl std::error::Error for Error {}

/// A held lock file
///
/// The lock is released when this is dropped.
#[derive(Debug)]
pub struct LockFile {
    _file: File,
}

impl LockFile {
    /// Take the lock and write the PID of this process into it
    pub fn acquire<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();

        let mut file = retry(DEFAULT_ATTEMPTS, |_| {
            OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .mode(0o644)
                .open(path)
        })
        .map_err(|e| Error::Open(path.to_path_buf(), e))?;

        flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock).map_err(|e| Error::Locked(path.to_path_buf(), e))?;

        // truncated only once locked so the PID of a running tag is kept
        file.set_len(0)
            .and_then(|_| writeln!(file, "{}", std::process::id()))
            .and_then(|_| file.flush())
            .map_err(|e| Error::WritePid(path.to_path_buf(), e))?;

        log::debug!("locked {}", path.display());

        Ok(LockFile { _file: file })
    }
}
