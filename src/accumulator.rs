//! Per-writer staging buffer that defers commit until a newline terminator is seen.

use crate::command::Command;
use crate::error::{LogError, LogResult};
use bytes::Bytes;

/// Outcome of feeding a chunk to an [`Accumulator`].
#[derive(Debug, PartialEq, Eq)]
pub enum Feed {
    /// No terminator has been seen yet; the chunk was appended to the pending buffer.
    Incomplete,
    /// A terminator completed a command, which the caller should hand to `RingLog` and
    /// `LogStore`.
    ///
    /// Any bytes in `chunk` *after* the terminator are dropped by this call rather than
    /// carried over as the start of the next command — the original source does not
    /// support multiple commands arriving in a single `read()`, and this rewrite
    /// preserves that limitation rather than silently fixing it.
    Complete(Command),
}

const TERMINATOR: u8 = b'\n';

/// Accumulates bytes fed to it until a terminator completes a command.
///
/// One `Accumulator` belongs to exactly one writer context (one [`crate::session`]
/// connection, or one character-device write handle) for its entire lifetime; instances
/// never share a buffer or a lock.
#[derive(Debug, Default)]
pub struct Accumulator {
    pending: Vec<u8>,
}

impl Accumulator {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self { pending: Vec::new() }
    }

    /// Extends the pending buffer with `chunk` and checks whether it now contains a
    /// complete command.
    ///
    /// Infallible wrapper around [`Accumulator::try_feed`] for the common case where the
    /// caller has no fallible-allocation path of its own to report through; panics only
    /// on the allocator's own abort, which is this crate's default global allocator
    /// behavior on real exhaustion anyway.
    #[allow(clippy::expect_used)] // try_feed only errs on allocation failure, which the default global allocator already turns into an abort before this can run
    pub fn feed(&mut self, chunk: &[u8]) -> Feed {
        self.try_feed(chunk)
            .expect("global allocator aborts on real exhaustion rather than returning Err")
    }

    /// Extends the pending buffer with `chunk`, failing with
    /// [`LogError::OutOfMemory`] — and leaving the accumulator's prior state intact —
    /// if growing the buffer cannot be done without reallocating.
    ///
    /// Only the newly appended region is scanned for the terminator: bytes already
    /// accepted in a prior call never contain one (otherwise they would already have
    /// been committed), so re-scanning the whole buffer on every call would be wasted
    /// work. Mirrors the source's `realloc`-and-append loop, replacing `realloc`'s
    /// "leaves the original block untouched on failure" guarantee with
    /// `Vec::try_reserve`.
    pub fn try_feed(&mut self, chunk: &[u8]) -> LogResult<Feed> {
        self.pending
            .try_reserve(chunk.len())
            .map_err(|_| LogError::OutOfMemory)?;

        let scan_from = self.pending.len();
        self.pending.extend_from_slice(chunk);

        match chunk.iter().position(|&b| b == TERMINATOR) {
            Some(pos_in_chunk) => {
                let command_len = scan_from + pos_in_chunk + 1;
                let command_bytes = Bytes::copy_from_slice(&self.pending[..command_len]);
                self.pending.clear();
                Ok(Feed::Complete(Command::new(command_bytes)))
            }
            None => Ok(Feed::Incomplete),
        }
    }

    /// Number of bytes currently buffered for the in-flight command.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Whether any bytes are currently buffered for an incomplete command.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
