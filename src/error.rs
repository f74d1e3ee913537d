//! Custom error types for the command log engine.
//!
//! `LogError` consolidates every error kind the core surfaces: allocation failure, I/O
//! failure, cancellation, out-of-range positioning coordinates, and unrecognized
//! out-of-band requests. Using `thiserror` keeps `Display` messages centralized and lets
//! `?` compose across `RingLog`, `LogStore`, and `CharInterface` without manual wrapping.

use thiserror::Error;

/// Convenience alias for results using [`LogError`].
pub type LogResult<T> = std::result::Result<T, LogError>;

#[derive(Error, Debug)]
pub enum LogError {
    /// Allocation failed; the operation was aborted and prior state is preserved.
    ///
    /// The default global allocator aborts the process rather than returning this, so in
    /// practice this variant is reachable only through a caller-supplied fallible path.
    #[error("out of memory")]
    OutOfMemory,

    /// Socket or file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking wait (an interruptible RingLog lock acquisition on the character-device
    /// surface) was canceled before it completed.
    #[error("operation interrupted")]
    Interrupted,

    /// A positioning coordinate was out of range, or a seek would yield a negative position.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// An out-of-band request used an unrecognized request code.
    #[error("inappropriate operation")]
    InappropriateOperation,

    /// Configuration failed validation before the server could start.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl LogError {
    /// A read that starts at or beyond `total_bytes` is not an error condition; callers
    /// should check for this directly rather than constructing a `LogError` for it.
    pub const END_OF_DATA_IS_NOT_AN_ERROR: &'static str =
        "a read starting beyond total_bytes returns Ok(0), not an error";
}
