// Copyright © 2026 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Assemble inbound socket bytes into delimiter-terminated commands.
// Author: Lukas Bower

//! Delimiter-based command framing for inbound byte streams.

use crate::error::RinglogError;

/// Byte terminating every write command.
pub const DELIMITER: u8 = b'\n';

/// Capacity the assembly buffer returns to once drained.
const BASELINE_CAPACITY: usize = 1024 + 10;

/// Increment the assembly buffer grows by when a command outruns it.
const GROW_INCREMENT: usize = 1024;

/// Per-session assembly of a byte stream into completed commands.
///
/// Received chunks accumulate until a delimiter appears; the completed
/// command (delimiter included) is handed out and any trailing bytes start
/// the next command. The buffer grows in fixed increments through fallible
/// reservation and shrinks back to its baseline once usage allows, so one
/// oversized command does not pin memory for the rest of the session.
#[derive(Debug)]
pub struct CommandFramer {
    buf: Vec<u8>,
}

impl Default for CommandFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandFramer {
    /// Construct a framer with the baseline assembly buffer.
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(BASELINE_CAPACITY),
        }
    }

    /// Bytes accumulated towards the next command.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Append one received chunk, growing the buffer as needed.
    ///
    /// A refused reservation surfaces as `OutOfMemory` and aborts only the
    /// owning session; no command bytes are ever silently truncated.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Result<(), RinglogError> {
        let needed = self.buf.len() + chunk.len();
        if needed > self.buf.capacity() {
            // try_reserve_exact counts from len, so rounding the chunk up to
            // whole increments keeps the growth policy in 1 KiB steps.
            let additional = chunk.len().div_ceil(GROW_INCREMENT) * GROW_INCREMENT;
            self.buf
                .try_reserve_exact(additional)
                .map_err(|_| RinglogError::OutOfMemory {
                    requested: additional,
                })?;
        }
        self.buf.extend_from_slice(chunk);
        Ok(())
    }

    /// Extract the next completed command, delimiter included.
    ///
    /// Returns `None` until a delimiter arrives. Unconsumed trailing bytes
    /// are kept as the start of the following command, and the buffer shrinks
    /// back to its baseline capacity once the leftover fits.
    pub fn next_command(&mut self) -> Option<Vec<u8>> {
        let end = self.buf.iter().position(|&b| b == DELIMITER)?;
        let command: Vec<u8> = self.buf.drain(..=end).collect();
        if self.buf.capacity() > BASELINE_CAPACITY && self.buf.len() <= BASELINE_CAPACITY {
            self.buf.shrink_to(BASELINE_CAPACITY);
        }
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_split_across_chunks_is_assembled() {
        let mut framer = CommandFramer::new();
        framer.push_bytes(b"hel").unwrap();
        assert!(framer.next_command().is_none());
        framer.push_bytes(b"lo\n").unwrap();
        assert_eq!(framer.next_command().unwrap(), b"hello\n");
        assert!(framer.next_command().is_none());
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn multiple_commands_in_one_chunk_come_out_in_order() {
        let mut framer = CommandFramer::new();
        framer.push_bytes(b"one\ntwo\nthr").unwrap();
        assert_eq!(framer.next_command().unwrap(), b"one\n");
        assert_eq!(framer.next_command().unwrap(), b"two\n");
        assert!(framer.next_command().is_none());
        assert_eq!(framer.pending(), 3);
        framer.push_bytes(b"ee\n").unwrap();
        assert_eq!(framer.next_command().unwrap(), b"three\n");
    }

    #[test]
    fn empty_command_is_just_the_delimiter() {
        let mut framer = CommandFramer::new();
        framer.push_bytes(b"\n").unwrap();
        assert_eq!(framer.next_command().unwrap(), b"\n");
    }

    #[test]
    fn buffer_grows_for_oversized_command_then_shrinks_back() {
        let mut framer = CommandFramer::new();
        let big = vec![b'x'; 8 * 1024];
        framer.push_bytes(&big).unwrap();
        assert!(framer.buf.capacity() > BASELINE_CAPACITY);
        framer.push_bytes(b"\n").unwrap();
        let command = framer.next_command().unwrap();
        assert_eq!(command.len(), big.len() + 1);
        assert!(command.ends_with(b"\n"));
        assert!(framer.buf.capacity() <= BASELINE_CAPACITY);
        assert_eq!(framer.pending(), 0);
    }
}
