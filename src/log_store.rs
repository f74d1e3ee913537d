//! The durable surface: a file-backed byte stream that mirrors the concatenation of
//! [`RingLog`]'s committed commands, guarded by a single async mutex shared by every
//! writer (client sessions and [`crate::ticker::Ticker`]) and every reader.

use crate::command::Command;
use crate::error::LogResult;
use crate::ring_log::RingLog;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, warn};

struct Inner {
    ring: RingLog,
    file: File,
}

/// Mutex-guarded, file-backed mirror of a [`RingLog`].
///
/// The store mutex guards both the file and the ring log together: a commit writes the
/// command to the file and appends it to the ring log as one atomic step, so a reader
/// that acquires the lock afterwards sees both updated or neither. This is what makes
/// the file's invariant — "always a concatenation of complete commands, in commit order"
/// — hold even with many concurrent writers.
pub struct LogStore {
    inner: Mutex<Inner>,
    path: PathBuf,
}

impl LogStore {
    /// Creates (or truncates) the backing file at `path` with world read/write
    /// permissions, matching the original `open(..., O_CREAT | O_RDWR, 0666)`, and backs
    /// it with a [`RingLog`] of `capacity` slots.
    pub async fn create(path: impl AsRef<Path>, capacity: usize) -> LogResult<Self> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .append(true)
            .truncate(false)
            .open(&path)
            .await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o666))
                .await?;
        }

        debug!(path = %path.display(), capacity, "log store backing file ready");

        Ok(Self {
            inner: Mutex::new(Inner {
                ring: RingLog::new(capacity),
                file,
            }),
            path,
        })
    }

    /// Commits `cmd`: appends its bytes to the backing file, then to the in-memory ring
    /// log, under a single lock acquisition.
    ///
    /// Used both by client sessions (after `Accumulator` signals a completed command)
    /// and by [`crate::ticker::Ticker`] (for synthesized timestamp commands) — the two
    /// share this one path so the file and the ring log never diverge regardless of who
    /// is writing.
    pub async fn commit(&self, cmd: Command) -> LogResult<()> {
        let mut inner = self.inner.lock().await;

        if let Err(err) = inner.file.write_all(cmd.as_bytes()).await {
            warn!(error = %err, "failed to append command to backing file");
            return Err(err.into());
        }

        inner.ring.append(cmd);
        Ok(())
    }

    /// Seeks to the beginning of the backing file and reads its full current contents.
    ///
    /// Held under the same lock as [`LogStore::commit`], so this never observes a
    /// partially-written command and never interleaves with another snapshot read or
    /// commit.
    pub async fn snapshot_read(&self) -> LogResult<Bytes> {
        let mut inner = self.inner.lock().await;

        inner.file.seek(std::io::SeekFrom::Start(0)).await?;
        let mut buf = Vec::with_capacity(inner.ring.total_bytes());
        inner.file.read_to_end(&mut buf).await?;

        Ok(Bytes::from(buf))
    }

    /// Runs `f` with shared access to the underlying [`RingLog`], under the store lock.
    ///
    /// This is how [`crate::server::ConnectionServer`] and
    /// [`crate::positioner::Positioner`] observe ring-log state (command counts, offset
    /// resolution) without racing a concurrent commit.
    pub async fn with_ring<R>(&self, f: impl FnOnce(&RingLog) -> R) -> R {
        let inner = self.inner.lock().await;
        f(&inner.ring)
    }

    /// Path to the backing file, for logging and for the shutdown-time removal in
    /// [`crate::server::ConnectionServer::shutdown`].
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the backing file. Called once, on clean shutdown.
    pub async fn remove_file(&self) -> LogResult<()> {
        tokio::fs::remove_file(&self.path).await?;
        Ok(())
    }
}
