//! A fixed-capacity, wrap-around, oldest-wins store of [`Command`]s.
//!
//! This is a direct, generalized port of the circular buffer at the heart of the
//! original character device driver: `out_idx`/`in_idx` walk a fixed-size slot array,
//! `full` disambiguates `in_idx == out_idx` (empty vs. full), and `total_bytes` is kept
//! as a running sum so callers never need to re-sum the slots to answer "how many bytes
//! would a full read return".

use crate::command::Command;

/// Fixed-capacity, wrap-around store of committed commands.
///
/// All mutating and traversal operations are synchronous and allocation-free aside from
/// the `Vec` growth that happens once, at construction. Callers needing concurrent
/// access wrap a `RingLog` in a mutex (the network server and the character-device
/// surface each keep their own instance).
#[derive(Debug)]
pub struct RingLog {
    slots: Vec<Option<Command>>,
    in_idx: usize,
    out_idx: usize,
    full: bool,
    total_bytes: usize,
}

/// The position of a byte within a committed command, as returned by
/// [`RingLog::resolve_offset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedOffset {
    /// Index of the command in oldest→newest order, i.e. the `write_cmd` coordinate
    /// accepted by [`crate::positioner::Positioner`].
    pub slot: usize,
    /// Byte offset within that command.
    pub intra_offset: usize,
}

impl RingLog {
    /// Creates an empty ring log with room for `capacity` commands.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0; `Settings::validate` is expected to have rejected this
    /// before a `RingLog` is constructed.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RingLog capacity must be greater than 0");
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            in_idx: 0,
            out_idx: 0,
            full: false,
            total_bytes: 0,
        }
    }

    /// Number of committed commands currently held.
    pub fn count(&self) -> usize {
        if self.full {
            self.slots.len()
        } else {
            (self.in_idx + self.slots.len() - self.out_idx) % self.slots.len()
        }
    }

    /// Total bytes across all currently-held commands.
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Capacity this ring log was constructed with.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Appends `cmd`, evicting the oldest command if the log is full.
    pub fn append(&mut self, cmd: Command) {
        let cap = self.slots.len();

        if self.full {
            if let Some(evicted) = self.slots[self.in_idx].take() {
                self.total_bytes -= evicted.len();
            }
        }

        self.total_bytes += cmd.len();
        self.slots[self.in_idx] = Some(cmd);

        self.in_idx = (self.in_idx + 1) % cap;

        if self.full {
            self.out_idx = self.in_idx;
        }

        if self.in_idx == self.out_idx {
            self.full = true;
        }
    }

    /// Walks oldest→newest, returning the slot and intra-command offset containing
    /// `char_offset` in the concatenated byte stream, or `None` if `char_offset` is at or
    /// past [`RingLog::total_bytes`] (or the log is empty).
    pub fn resolve_offset(&self, mut char_offset: usize) -> Option<ResolvedOffset> {
        for (slot, cmd) in self.iterate().enumerate() {
            if char_offset < cmd.len() {
                return Some(ResolvedOffset {
                    slot,
                    intra_offset: char_offset,
                });
            }
            char_offset -= cmd.len();
        }
        None
    }

    /// Returns the command at oldest→newest index `slot`, if it exists.
    pub fn command_at(&self, slot: usize) -> Option<&Command> {
        self.iterate().nth(slot)
    }

    /// Iterates committed commands oldest→newest. Finite, restartable, and read-only.
    pub fn iterate(&self) -> impl Iterator<Item = &Command> + '_ {
        let cap = self.slots.len();
        let count = self.count();
        (0..count).filter_map(move |i| self.slots[(self.out_idx + i) % cap].as_ref())
    }
}
