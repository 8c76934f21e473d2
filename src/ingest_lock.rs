use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::bounding_box::BoundingBox;

/// Host-wide lock held by an ingester for one bounding box
///
/// Two ingesters polling the same box would write interleaved batches of the
/// same aircraft, so `ingest` refuses to start while another process holds
/// the lock. The lock is released when the value is dropped.
pub struct IngestLock {
    lock_file: File,
    lock_path: PathBuf,
}

impl IngestLock {
    /// Acquire the lock for `bbox` in the runtime directory
    pub fn acquire(bbox: &BoundingBox) -> Result<Self> {
        Self::acquire_in(&runtime_dir(), bbox)
    }

    /// Acquire the lock for `bbox` in `dir`
    pub fn acquire_in(dir: &Path, bbox: &BoundingBox) -> Result<Self> {
        let lock_path = dir.join(format!("swiss-tracker-ingest-{}.lock", bbox.slug()));

        std::fs::create_dir_all(dir).context("Failed to create lock directory")?;

        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file {}", lock_path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            let fd = lock_file.as_raw_fd();
            let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
            if result != 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::WouldBlock {
                    anyhow::bail!(
                        "Another ingester is already running for {}. Lock file: {}",
                        bbox,
                        lock_path.display()
                    );
                }
                return Err(err).context("Failed to acquire ingest lock");
            }
        }

        // Only the holder rewrites the PID
        lock_file
            .set_len(0)
            .context("Failed to truncate lock file")?;
        let pid = std::process::id();
        let mut writer = &lock_file;
        writeln!(writer, "{}", pid).context("Failed to write PID to lock file")?;

        info!("Acquired ingest lock at {}", lock_path.display());
        debug!("Process ID: {}", pid);

        Ok(Self {
            lock_file,
            lock_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

fn runtime_dir() -> PathBuf {
    std::env::var("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir())
}

impl Drop for IngestLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            let fd = self.lock_file.as_raw_fd();
            unsafe {
                libc::flock(fd, libc::LOCK_UN);
            }
        }

        if let Err(e) = std::fs::remove_file(&self.lock_path) {
            warn!("Failed to remove lock file {}: {}", self.lock_path.display(), e);
        } else {
            debug!("Released ingest lock at {}", self.lock_path.display());
        }
    }
}
