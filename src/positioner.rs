//! Translates an out-of-band `(command_index, intra_offset)` coordinate to an absolute
//! byte position within the logical concatenation of a [`RingLog`]'s committed commands.
//!
//! This mirrors `aesd_adjust_file_offset` in the original character driver: walk the
//! commands oldest→newest, summing sizes up to (but not including) `write_cmd`, then add
//! `write_cmd_offset`. The two range checks below are the only place in the whole system
//! that surfaces `InvalidArgument`.

use crate::error::{LogError, LogResult};
use crate::ring_log::RingLog;

/// An out-of-band positioning request, matching the character driver's
/// `aesd_seekto` ioctl payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekTo {
    /// Zero-referenced index of the command to position into, oldest→newest.
    pub write_cmd: u32,
    /// Zero-referenced byte offset within that command.
    pub write_cmd_offset: u32,
}

/// Resolves a [`SeekTo`] request against `log`, returning the absolute byte position or
/// `LogError::InvalidArgument` if either coordinate is out of range.
///
/// Takes no lock itself — callers are expected to hold `log`'s guard (or own it
/// exclusively) for the duration of the call, which is what makes the resolution atomic
/// with respect to concurrent `RingLog` mutation.
pub fn resolve(log: &RingLog, request: SeekTo) -> LogResult<usize> {
    let write_cmd = request.write_cmd as usize;

    let target = log
        .command_at(write_cmd)
        .ok_or(LogError::InvalidArgument("write_cmd is out of range"))?;

    let write_cmd_offset = request.write_cmd_offset as usize;
    if write_cmd_offset >= target.len() {
        return Err(LogError::InvalidArgument(
            "write_cmd_offset is out of range for the selected command",
        ));
    }

    let preceding_bytes: usize = log.iterate().take(write_cmd).map(|c| c.len()).sum();
    Ok(preceding_bytes + write_cmd_offset)
}
