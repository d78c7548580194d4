// Copyright © 2026 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Serialize all ring access behind one shared, lockable log handle.
// Author: Lukas Bower

//! The shared log handle serializing all ring access.

use std::fs::File;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::RinglogError;
use crate::protocol::SeekRequest;
use crate::ring::RingLog;

/// What an append did to the ring.
#[derive(Debug, Clone, Copy)]
pub struct AppendOutcome {
    /// Size of the entry evicted to make room, 0 when none was.
    pub evicted_bytes: usize,
    /// Bytes retained by the ring after the append.
    pub total_bytes: u64,
}

struct LogState {
    ring: RingLog,
    backing: Option<File>,
}

/// Cloneable handle to the process-wide log.
///
/// Every mutation and every position-sensitive read runs under one exclusive
/// lock, so appends from different sessions are totally ordered and a
/// streaming read observes a non-torn snapshot. Individual operations are
/// bounded by a single command or one full-log read, which keeps the plain
/// mutex acceptable; nothing here batches or reorders.
#[derive(Clone)]
pub struct SharedLog {
    inner: Arc<Mutex<LogState>>,
}

impl SharedLog {
    /// Construct a log with no backing writer.
    pub fn new(capacity: usize) -> Self {
        Self::build(capacity, None)
    }

    /// Construct a log mirroring every committed command to `backing`.
    pub fn with_backing(capacity: usize, backing: File) -> Self {
        Self::build(capacity, Some(backing))
    }

    fn build(capacity: usize, backing: Option<File>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LogState {
                ring: RingLog::new(capacity),
                backing,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LogState> {
        self.inner.lock().unwrap()
    }

    /// Append one command: mirror it to the backing writer, flush, then
    /// commit it to the ring.
    ///
    /// The flush lands the write before the caller acknowledges it to the
    /// client. Runs entirely under the lock so no two commands ever
    /// interleave their bytes. A failed mirror write surfaces as
    /// [`RinglogError::BackingIo`]: the handle is shared, so the failure
    /// condemns every session, and the command is not committed to the ring.
    pub fn append_command(&self, bytes: Vec<u8>) -> Result<AppendOutcome, RinglogError> {
        let mut state = self.lock();
        if let Some(backing) = state.backing.as_mut() {
            backing
                .write_all(&bytes)
                .and_then(|()| backing.flush())
                .map_err(RinglogError::BackingIo)?;
        }
        let evicted_bytes = state.ring.append(bytes);
        Ok(AppendOutcome {
            evicted_bytes,
            total_bytes: state.ring.total_bytes(),
        })
    }

    /// Validate a seek request and translate it into a global byte offset.
    pub fn resolve_seek(&self, request: &SeekRequest) -> Result<u64, RinglogError> {
        self.lock()
            .ring
            .resolve_seek(request.command_index, request.command_offset)
    }

    /// Stream log content from `offset` to the current end into `writer`.
    ///
    /// The lock is held for the whole send, so a concurrent append can never
    /// be observed mid-stream. `write_all` retries partial sends until every
    /// byte is out or the connection errors. An offset exactly at the end of
    /// the log streams nothing; offsets past it are rejected.
    pub fn stream_from<W: Write>(&self, offset: u64, writer: &mut W) -> Result<u64, RinglogError> {
        let state = self.lock();
        if offset == state.ring.total_bytes() {
            return Ok(0);
        }
        let (first, local) = state.ring.find_entry_for_offset(offset)?;
        let mut sent = 0u64;
        for (logical, entry) in state.ring.entries().enumerate().skip(first) {
            let slice = if logical == first {
                &entry.bytes()[local..]
            } else {
                entry.bytes()
            };
            writer.write_all(slice)?;
            sent += slice.len() as u64;
        }
        writer.flush()?;
        Ok(sent)
    }

    /// Bytes currently retained by the ring.
    pub fn total_bytes(&self) -> u64 {
        self.lock().ring.total_bytes()
    }

    /// Number of committed commands currently retained.
    pub fn committed(&self) -> usize {
        self.lock().ring.len()
    }

    /// Drop every retained entry under the lock.
    pub fn reset(&self) {
        self.lock().ring.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;
    use std::thread;

    fn read_back(log: &SharedLog, offset: u64) -> Vec<u8> {
        let mut out = Vec::new();
        log.stream_from(offset, &mut out).unwrap();
        out
    }

    #[test]
    fn appended_bytes_come_back_at_the_tail() {
        let log = SharedLog::new(4);
        log.append_command(b"hello\n".to_vec()).unwrap();
        let outcome = log.append_command(b"world\n".to_vec()).unwrap();
        assert_eq!(outcome.evicted_bytes, 0);
        assert_eq!(outcome.total_bytes, 12);
        let full = read_back(&log, 0);
        assert_eq!(full, b"hello\nworld\n");
        assert!(full.ends_with(b"world\n"));
    }

    #[test]
    fn stream_from_seek_offset_skips_prefix() {
        let log = SharedLog::new(4);
        log.append_command(b"hello\n".to_vec()).unwrap();
        log.append_command(b"world\n".to_vec()).unwrap();
        let offset = log
            .resolve_seek(&SeekRequest {
                command_index: 0,
                command_offset: 2,
            })
            .unwrap();
        assert_eq!(offset, 2);
        assert_eq!(read_back(&log, offset), b"llo\nworld\n");
    }

    #[test]
    fn stream_at_end_of_log_is_empty() {
        let log = SharedLog::new(4);
        assert_eq!(read_back(&log, 0), b"");
        log.append_command(b"abc\n".to_vec()).unwrap();
        assert_eq!(read_back(&log, 4), b"");
        assert!(matches!(
            log.stream_from(5, &mut Vec::new()),
            Err(RinglogError::OffsetOutOfRange { .. })
        ));
    }

    #[test]
    fn backing_file_sees_every_command_before_acknowledgment() {
        let path = std::env::temp_dir().join(format!("ringlog-store-{}", std::process::id()));
        let backing = File::create(&path).unwrap();
        let log = SharedLog::with_backing(2, backing);
        log.append_command(b"one\n".to_vec()).unwrap();
        log.append_command(b"two\n".to_vec()).unwrap();
        // Eviction trims the ring but never the backing file.
        log.append_command(b"three\n".to_vec()).unwrap();
        let mut mirrored = String::new();
        fs::File::open(&path)
            .unwrap()
            .read_to_string(&mut mirrored)
            .unwrap();
        assert_eq!(mirrored, "one\ntwo\nthree\n");
        assert_eq!(read_back(&log, 0), b"two\nthree\n");
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn failed_backing_write_is_fatal_and_commits_nothing() {
        let path = std::env::temp_dir().join(format!("ringlog-deadstore-{}", std::process::id()));
        fs::write(&path, b"").unwrap();
        // A read-only handle refuses every mirror write.
        let backing = File::open(&path).unwrap();
        let log = SharedLog::with_backing(4, backing);
        match log.append_command(b"hello\n".to_vec()) {
            Err(e @ RinglogError::BackingIo(_)) => assert!(e.is_process_fatal()),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(log.committed(), 0);
        assert_eq!(log.total_bytes(), 0);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn concurrent_appends_never_interleave() {
        let log = SharedLog::new(8);
        let writers: Vec<_> = [b"AAAA\n", b"BBBB\n"]
            .into_iter()
            .map(|cmd| {
                let log = log.clone();
                thread::spawn(move || log.append_command(cmd.to_vec()).unwrap())
            })
            .collect();
        for handle in writers {
            handle.join().unwrap();
        }
        let full = String::from_utf8(read_back(&log, 0)).unwrap();
        assert_eq!(full.len(), 10);
        assert!(full.contains("AAAA\n"), "torn log: {full:?}");
        assert!(full.contains("BBBB\n"), "torn log: {full:?}");
    }
}
