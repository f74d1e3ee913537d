//! The unit of commit in [`crate::ring_log::RingLog`].

use bytes::Bytes;

/// An owned, newline-terminated byte sequence.
///
/// `Command` is a thin wrapper around [`Bytes`] so that a committed command can be
/// shared cheaply between [`crate::log_store::LogStore`] and
/// [`crate::char_interface::CharInterface`] readers without re-copying its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command(Bytes);

impl Command {
    /// Wraps `bytes` as a command. The caller is responsible for ensuring it ends in `\n`;
    /// `Accumulator` is the only expected producer and it upholds that invariant.
    pub fn new(bytes: Bytes) -> Self {
        Self(bytes)
    }

    /// Number of bytes in the command, including its terminating newline.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// A command is never empty: `Accumulator` only commits on a terminator byte.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrows the command's bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the underlying shared byte buffer.
    pub fn bytes(&self) -> Bytes {
        self.0.clone()
    }
}

impl From<Bytes> for Command {
    fn from(bytes: Bytes) -> Self {
        Self::new(bytes)
    }
}

impl AsRef<[u8]> for Command {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}
