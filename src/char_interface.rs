//! In-process, seekable byte interface over a [`RingLog`] — the character-device surface.
//!
//! Unlike [`crate::server`], this is synchronous end to end: no `.await` boundary
//! separates a caller from the `RingLog` it addresses, so a plain `std::sync::Mutex`
//! around fast, allocation-free bookkeeping is the right tool (this codebase's own lints
//! warn against holding a `std::sync::Mutex` across `.await`, and nothing here ever does).

use crate::accumulator::{Accumulator, Feed};
use crate::command::Command;
use crate::error::{LogError, LogResult};
use crate::positioner::{self, SeekTo};
use crate::ring_log::RingLog;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// The only out-of-band request code [`CharHandle::ioctl`] recognizes, matching the
/// character driver's single `_IOW(AESD_IOC_MAGIC, 1, struct aesd_seekto)` command.
pub const SEEKTO_REQUEST_CODE: u32 = 1;

/// Origin for [`CharHandle::seek`], matching `SEEK_SET`/`SEEK_CUR`/`SEEK_END`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Set,
    Current,
    End,
}

/// Shared backing store for any number of [`CharHandle`]s, analogous to the character
/// device's single global circular buffer shared by every open file descriptor.
pub struct CharInterface {
    ring: Mutex<RingLog>,
}

const LOCK_POLL_INTERVAL: Duration = Duration::from_micros(200);

impl CharInterface {
    /// Creates an interface backed by an empty [`RingLog`] of `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(RingLog::new(capacity)),
        }
    }

    /// Opens a new handle onto this interface, with its own read position and its own
    /// write accumulator — the in-process analogue of `open()` on a character device.
    pub fn open(&self) -> CharHandle<'_> {
        CharHandle {
            interface: self,
            accumulator: Accumulator::new(),
            f_pos: 0,
        }
    }

    /// Acquires the ring log lock, polling in small increments so a caller holding
    /// `cancel` can interrupt a long wait. There is no true interruptible futex behind a
    /// `std::sync::Mutex`, so this is the closest equivalent available without pulling in
    /// a second concurrency primitive for one code path.
    fn lock_interruptibly(&self, cancel: &AtomicBool) -> LogResult<MutexGuard<'_, RingLog>> {
        loop {
            if let Ok(guard) = self.ring.try_lock() {
                return Ok(guard);
            }
            if cancel.load(Ordering::SeqCst) {
                return Err(LogError::Interrupted);
            }
            std::thread::sleep(LOCK_POLL_INTERVAL);
        }
    }
}

/// One open handle onto a [`CharInterface`]: a read position plus a private accumulator,
/// the equivalent of one open file descriptor on the character device.
pub struct CharHandle<'a> {
    interface: &'a CharInterface,
    accumulator: Accumulator,
    f_pos: usize,
}

impl<'a> CharHandle<'a> {
    /// Copies bytes starting at the handle's current `f_pos` into `dst`, stopping when
    /// `dst` is full or the log runs out of data, and advances `f_pos` by the number of
    /// bytes copied. Returns the number of bytes read (`0` at end of data, never an
    /// error).
    pub fn read(&mut self, dst: &mut [u8], cancel: &AtomicBool) -> LogResult<usize> {
        let guard = self.interface.lock_interruptibly(cancel)?;

        let mut copied = 0;
        let mut pos = self.f_pos;
        while copied < dst.len() {
            let Some(resolved) = guard.resolve_offset(pos) else {
                break;
            };
            // `resolve_offset` only ever names a slot that `iterate()` (and so
            // `command_at`) can also see; if that ever stopped holding, treating it as
            // end-of-data is safer than panicking mid-read.
            let Some(cmd) = guard.command_at(resolved.slot) else {
                break;
            };
            let available = &cmd.as_bytes()[resolved.intra_offset..];
            let take = available.len().min(dst.len() - copied);
            dst[copied..copied + take].copy_from_slice(&available[..take]);
            copied += take;
            pos += take;
        }

        self.f_pos = pos;
        Ok(copied)
    }

    /// Feeds `src` into this handle's accumulator, committing any completed command to
    /// the shared ring log.
    pub fn write(&mut self, src: &[u8], cancel: &AtomicBool) -> LogResult<usize> {
        if let Feed::Complete(cmd) = self.accumulator.feed(src) {
            self.commit(cmd, cancel)?;
        }
        Ok(src.len())
    }

    fn commit(&self, cmd: Command, cancel: &AtomicBool) -> LogResult<()> {
        let mut guard = self.interface.lock_interruptibly(cancel)?;
        guard.append(cmd);
        Ok(())
    }

    /// Recomputes `f_pos` from `off` and `whence`. Rejects any resulting negative
    /// position, and rejects `SEEK_END` with `off` greater than the log's total bytes
    /// (the corrected behavior — see module docs on the source's missing bounds check).
    pub fn seek(&mut self, off: i64, whence: Whence, cancel: &AtomicBool) -> LogResult<usize> {
        let new_pos: i64 = match whence {
            Whence::Set => off,
            Whence::Current => self.f_pos as i64 + off,
            Whence::End => {
                let guard = self.interface.lock_interruptibly(cancel)?;
                let total = guard.total_bytes() as i64;
                if off > total {
                    return Err(LogError::InvalidArgument(
                        "SEEK_END offset exceeds total log size",
                    ));
                }
                total - off
            }
        };

        if new_pos < 0 {
            return Err(LogError::InvalidArgument("resulting position is negative"));
        }

        self.f_pos = new_pos as usize;
        Ok(self.f_pos)
    }

    /// Positions this handle to the absolute byte offset of `(write_cmd,
    /// write_cmd_offset)`, delegating the range checks and arithmetic to
    /// [`positioner::resolve`].
    pub fn position_to(&mut self, write_cmd: u32, write_cmd_offset: u32, cancel: &AtomicBool) -> LogResult<usize> {
        let guard = self.interface.lock_interruptibly(cancel)?;
        let pos = positioner::resolve(
            &guard,
            SeekTo {
                write_cmd,
                write_cmd_offset,
            },
        )?;
        drop(guard);
        self.f_pos = pos;
        Ok(pos)
    }

    /// Current read/write position.
    pub fn position(&self) -> usize {
        self.f_pos
    }

    /// Out-of-band ioctl-style dispatch over `request_code`. Only
    /// [`SEEKTO_REQUEST_CODE`] is recognized, in which case this delegates to
    /// [`CharHandle::position_to`]; every other code is rejected with
    /// `LogError::InappropriateOperation`, matching the driver's `default: return
    /// -ENOTTY` branch in its ioctl switch.
    pub fn ioctl(&mut self, request_code: u32, request: SeekTo, cancel: &AtomicBool) -> LogResult<usize> {
        if request_code != SEEKTO_REQUEST_CODE {
            return Err(LogError::InappropriateOperation);
        }
        self.position_to(request.write_cmd, request.write_cmd_offset, cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn never_cancel() -> AtomicBool {
        AtomicBool::new(false)
    }

    #[test]
    fn write_then_read_from_start_returns_the_command() {
        let iface = CharInterface::new(5);
        let cancel = never_cancel();
        let mut handle = iface.open();

        handle.write(b"hello\n", &cancel).expect("write");

        let mut buf = [0u8; 16];
        let n = handle.read(&mut buf, &cancel).expect("read");
        assert_eq!(&buf[..n], b"hello\n");
    }

    #[test]
    fn read_past_end_of_data_returns_zero() {
        let iface = CharInterface::new(5);
        let cancel = never_cancel();
        let mut handle = iface.open();
        handle.write(b"hi\n", &cancel).expect("write");

        let mut buf = [0u8; 16];
        let n1 = handle.read(&mut buf, &cancel).expect("read");
        assert_eq!(n1, 3);
        let n2 = handle.read(&mut buf, &cancel).expect("read");
        assert_eq!(n2, 0);
    }

    #[test]
    fn seek_end_rejects_offset_past_total_bytes() {
        let iface = CharInterface::new(5);
        let cancel = never_cancel();
        let mut handle = iface.open();
        handle.write(b"ab\n", &cancel).expect("write");

        let err = handle.seek(10, Whence::End, &cancel).unwrap_err();
        assert!(matches!(err, LogError::InvalidArgument(_)));
    }

    #[test]
    fn seek_set_then_seek_cur_compose() {
        let iface = CharInterface::new(5);
        let cancel = never_cancel();
        let mut handle = iface.open();
        handle.write(b"abcdef\n", &cancel).expect("write");

        handle.seek(2, Whence::Set, &cancel).expect("seek set");
        handle.seek(3, Whence::Current, &cancel).expect("seek cur");
        assert_eq!(handle.position(), 5);
    }

    #[test]
    fn negative_resulting_position_is_rejected() {
        let iface = CharInterface::new(5);
        let cancel = never_cancel();
        let mut handle = iface.open();
        let err = handle.seek(-1, Whence::Set, &cancel).unwrap_err();
        assert!(matches!(err, LogError::InvalidArgument(_)));
    }

    #[test]
    fn ioctl_rejects_unrecognized_request_codes() {
        let iface = CharInterface::new(5);
        let cancel = never_cancel();
        let mut handle = iface.open();
        handle.write(b"A\n", &cancel).expect("write");

        let err = handle
            .ioctl(
                SEEKTO_REQUEST_CODE + 1,
                SeekTo {
                    write_cmd: 0,
                    write_cmd_offset: 0,
                },
                &cancel,
            )
            .unwrap_err();
        assert!(matches!(err, LogError::InappropriateOperation));
    }

    #[test]
    fn ioctl_dispatches_the_seekto_code_to_position_to() {
        let iface = CharInterface::new(5);
        let cancel = never_cancel();
        let mut handle = iface.open();
        handle.write(b"A\n", &cancel).expect("write");
        handle.write(b"B\n", &cancel).expect("write");

        let pos = handle
            .ioctl(
                SEEKTO_REQUEST_CODE,
                SeekTo {
                    write_cmd: 1,
                    write_cmd_offset: 0,
                },
                &cancel,
            )
            .expect("recognized request code should succeed");
        assert_eq!(pos, 2);
    }

    #[test]
    fn position_to_delegates_to_positioner() {
        let iface = CharInterface::new(5);
        let cancel = never_cancel();
        let mut handle = iface.open();
        handle.write(b"A\n", &cancel).expect("write");
        handle.write(b"B\n", &cancel).expect("write");
        handle.write(b"C\n", &cancel).expect("write");

        let pos = handle.position_to(1, 0, &cancel).expect("position_to");
        assert_eq!(pos, 2);
    }

    #[test]
    fn cancellation_flag_interrupts_a_blocked_lock_wait() {
        use std::sync::Arc;

        let iface = Arc::new(CharInterface::new(5));
        let cancel = Arc::new(AtomicBool::new(false));

        let guard = iface.ring.lock().expect("lock for test setup");

        let waiter_iface = iface.clone();
        let waiter_cancel = cancel.clone();
        let waiter = std::thread::spawn(move || {
            let mut handle = waiter_iface.open();
            // SEEK_END locks the ring, so this blocks for as long as the main thread
            // holds `guard` below, until the cancel flag is observed.
            handle.seek(0, Whence::End, &waiter_cancel)
        });

        std::thread::sleep(Duration::from_millis(20));
        cancel.store(true, Ordering::SeqCst);

        let result = waiter.join().expect("waiter thread should not panic");
        assert!(matches!(result, Err(LogError::Interrupted)));
        drop(guard);
    }
}
