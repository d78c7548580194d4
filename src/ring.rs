// Copyright © 2026 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Provide the fixed-capacity ring of write commands with offset lookup.
// Author: Lukas Bower

//! Fixed-capacity circular log of write commands.

use crate::error::RinglogError;

/// One committed write command owned by the ring.
#[derive(Debug)]
pub struct LogEntry {
    bytes: Vec<u8>,
}

impl LogEntry {
    fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Borrow the command bytes, delimiter included.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size of the command in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Fixed-capacity circular store of write commands.
///
/// Entries live in `capacity` slots addressed by `write_index` (next slot to
/// fill) and `oldest_index` (logical start). Once the ring fills, every
/// append evicts the oldest entry. All valid entries concatenated oldest to
/// newest form one virtual byte stream addressed by global offsets.
#[derive(Debug)]
pub struct RingLog {
    slots: Box<[Option<LogEntry>]>,
    write_index: usize,
    oldest_index: usize,
    full: bool,
    total_bytes: u64,
}

impl RingLog {
    /// Construct an empty ring with the given slot count.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            write_index: 0,
            oldest_index: 0,
            full: false,
            total_bytes: 0,
        }
    }

    /// Configured slot count.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of committed commands currently retained.
    pub fn len(&self) -> usize {
        if self.full {
            self.capacity()
        } else {
            self.write_index.saturating_sub(self.oldest_index)
        }
    }

    /// True when no command has been committed since the last reset.
    pub fn is_empty(&self) -> bool {
        !self.full && self.oldest_index == self.write_index
    }

    /// Sum of the sizes of all valid entries.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    fn check_consistent(&self) -> Result<(), RinglogError> {
        let broken = if self.full {
            self.oldest_index != self.write_index
        } else {
            self.oldest_index > self.write_index
        };
        if broken {
            return Err(RinglogError::CorruptRing {
                oldest: self.oldest_index,
                write: self.write_index,
                full: self.full,
            });
        }
        Ok(())
    }

    /// Append one command, evicting the oldest entry when the ring is full.
    ///
    /// Returns the size of the evicted entry, 0 when nothing was evicted.
    pub fn append(&mut self, bytes: Vec<u8>) -> usize {
        let added = bytes.len() as u64;
        let mut evicted = 0;
        if self.full {
            if let Some(old) = self.slots[self.oldest_index].take() {
                evicted = old.size();
                self.total_bytes -= evicted as u64;
            }
            self.oldest_index = (self.oldest_index + 1) % self.capacity();
        }
        self.slots[self.write_index] = Some(LogEntry::new(bytes));
        self.write_index = (self.write_index + 1) % self.capacity();
        self.total_bytes += added;
        if !self.full && self.write_index == self.oldest_index {
            self.full = true;
        }
        evicted
    }

    /// Iterate valid entries in logical (oldest to newest) order.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        let capacity = self.capacity();
        let count = self.len();
        let start = self.oldest_index;
        (0..count).filter_map(move |i| self.slots[(start + i) % capacity].as_ref())
    }

    /// Borrow the committed command at the given logical index.
    pub fn entry(&self, logical_index: usize) -> Option<&LogEntry> {
        if logical_index >= self.len() {
            return None;
        }
        self.slots[(self.oldest_index + logical_index) % self.capacity()].as_ref()
    }

    /// Resolve a global byte offset to `(logical_index, intra_entry_offset)`.
    ///
    /// Walks valid entries in logical order accumulating sizes. Offsets at or
    /// past `total_bytes` fail with `OffsetOutOfRange`; a ring whose indices
    /// contradict the `full` flag fails with `CorruptRing` instead of
    /// scanning slots that may no longer describe valid entries.
    pub fn find_entry_for_offset(&self, global_offset: u64) -> Result<(usize, usize), RinglogError> {
        self.check_consistent()?;
        let mut remaining = global_offset;
        for (logical, entry) in self.entries().enumerate() {
            let size = entry.size() as u64;
            if remaining < size {
                return Ok((logical, remaining as usize));
            }
            remaining -= size;
        }
        Err(RinglogError::OffsetOutOfRange {
            offset: global_offset,
            total: self.total_bytes,
        })
    }

    /// Translate `(command_index, intra_command_offset)` into a global offset.
    ///
    /// Rejects an index that names no committed command and an offset at or
    /// past the end of the named command.
    pub fn resolve_seek(&self, index: u32, offset: u64) -> Result<u64, RinglogError> {
        self.check_consistent()?;
        let invalid = RinglogError::InvalidSeek { index, offset };
        let Some(entry) = self.entry(index as usize) else {
            return Err(invalid);
        };
        if offset >= entry.size() as u64 {
            return Err(invalid);
        }
        let preceding: u64 = self
            .entries()
            .take(index as usize)
            .map(|e| e.size() as u64)
            .sum();
        Ok(preceding + offset)
    }

    /// Drop every entry and return the ring to its initial empty state.
    pub fn reset(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.write_index = 0;
        self.oldest_index = 0;
        self.full = false;
        self.total_bytes = 0;
    }
}
