//! File-backed snapshot store.
//!
//! Writes go to a uniquely named temporary file in the same directory, are
//! synced, and then renamed over the target, so a crash mid-write leaves the
//! previous snapshot intact. Each read or write runs on a helper thread and
//! the caller waits at most the configured timeout; a timed-out write is not
//! cancelled, but it never replaces a snapshot from a later write.

use super::SnapshotStore;
use crate::error::{GraphError, Result};
use log::{debug, trace, warn};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

/// Snapshot store keeping one file per snapshot name under a directory.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
    io_timeout: Option<Duration>,
    // Ticket handed to each write, in call order
    next_ticket: Arc<AtomicU64>,
    // Ticket of the last write renamed into place. Held across the rename, so
    // an older write that finishes late is discarded instead of landing.
    committed: Arc<Mutex<u64>>,
}

impl FileSnapshotStore {
    /// Open (and create if needed) a snapshot directory.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Storage`] if the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>, io_timeout: Option<Duration>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            GraphError::storage(
                format!("Failed to create snapshot directory {}", dir.display()),
                Some(e),
            )
        })?;
        debug!("Snapshot directory ready: {}", dir.display());

        Ok(Self {
            dir,
            io_timeout,
            next_ticket: Arc::new(AtomicU64::new(0)),
            committed: Arc::new(Mutex::new(0)),
        })
    }

    /// The directory snapshots are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Run blocking I/O on a helper thread, waiting at most `io_timeout`.
    fn run_with_timeout<T, F>(&self, operation: &str, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let Some(timeout) = self.io_timeout else {
            return job();
        };

        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("docgraph-io".to_string())
            .spawn(move || {
                // The receiver is gone if the caller already timed out
                let _ = tx.send(job());
            })
            .map_err(|e| GraphError::storage("Failed to spawn snapshot I/O thread", Some(e)))?;

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                warn!("{operation} did not finish within {timeout:?}");
                Err(GraphError::Timeout {
                    operation: operation.to_string(),
                    after: timeout,
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(GraphError::storage(
                format!("{operation} thread exited without a result"),
                None::<std::io::Error>,
            )),
        }
    }
}

fn write_atomic(path: &Path, data: &[u8], committed: &Mutex<u64>, ticket: u64) -> Result<()> {
    let tmp_path = {
        let mut name = path.as_os_str().to_os_string();
        name.push(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
        PathBuf::from(name)
    };

    let write_tmp = || -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(data)?;
        file.sync_all()
    };
    if let Err(e) = write_tmp() {
        let _ = fs::remove_file(&tmp_path);
        return Err(GraphError::storage(
            format!("Failed to write {}", tmp_path.display()),
            Some(e),
        ));
    }

    let mut last = committed.lock().unwrap_or_else(PoisonError::into_inner);
    if ticket <= *last {
        trace!(
            "Discarding snapshot write {ticket} to {}: write {} already landed",
            path.display(),
            *last
        );
        let _ = fs::remove_file(&tmp_path);
        return Ok(());
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        GraphError::storage(format!("Failed to replace {}", path.display()), Some(e))
    })?;
    *last = ticket;
    Ok(())
}

impl SnapshotStore for FileSnapshotStore {
    fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.path_for(name);
        let data = data.to_vec();
        let committed = Arc::clone(&self.committed);
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;

        trace!("Writing {} bytes to {} (write {ticket})", data.len(), path.display());
        self.run_with_timeout("snapshot write", move || {
            write_atomic(&path, &data, &committed, ticket)
        })
    }

    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(name);
        self.run_with_timeout("snapshot read", move || match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GraphError::storage(
                format!("Failed to read {}", path.display()),
                Some(e),
            )),
        })
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.path_for(name).is_file())
    }

    fn remove(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.path_for(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GraphError::storage("Failed to remove snapshot", Some(e))),
        }
    }
}
