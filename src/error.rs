// Copyright © 2026 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Define the ringlogd error taxonomy shared across components.
// Author: Lukas Bower

//! Error taxonomy shared by every ringlogd component.

use thiserror::Error;

/// Errors surfaced by the ring log, framer, and session layers.
///
/// Most variants are session-local: the session that triggered one is closed
/// and the rest of the server keeps running. The exceptions are an I/O
/// failure on the listening socket and [`RinglogError::BackingIo`], a failure
/// of the shared backing writer every session appends through; both are
/// process-fatal and answered with an orderly shutdown.
#[derive(Debug, Error)]
pub enum RinglogError {
    /// A fallible allocation was refused while growing a buffer.
    #[error("out of memory while reserving {requested} bytes")]
    OutOfMemory {
        /// Number of additional bytes the reservation asked for.
        requested: usize,
    },

    /// A seek named a command or intra-command offset that does not exist.
    #[error("seek to command {index} offset {offset} is out of range")]
    InvalidSeek {
        /// Zero-based command index supplied by the client.
        index: u32,
        /// Byte offset into that command supplied by the client.
        offset: u64,
    },

    /// A global byte offset lies past the end of the retained log.
    #[error("global offset {offset} is past the end of the log ({total} bytes)")]
    OffsetOutOfRange {
        /// Offset that was requested.
        offset: u64,
        /// Total bytes currently retained.
        total: u64,
    },

    /// The ring's index state violated its own invariant.
    ///
    /// Lookups refuse to scan a ring in this state rather than walk slots
    /// that may no longer describe valid entries.
    #[error("ring state corrupt: oldest {oldest}, write {write}, full {full}")]
    CorruptRing {
        /// Logical start index recorded by the ring.
        oldest: usize,
        /// Next write index recorded by the ring.
        write: usize,
        /// Whether the ring believed itself full.
        full: bool,
    },

    /// The shared backing writer failed to take a committed command.
    ///
    /// The backing handle is shared by every session, so this store will
    /// keep failing for all of them; it is process-fatal.
    #[error("backing store write failed: {0}")]
    BackingIo(#[source] std::io::Error),

    /// Socket I/O with one peer failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RinglogError {
    /// True when the error condemns the whole process, not just one session.
    pub fn is_process_fatal(&self) -> bool {
        matches!(self, Self::BackingIo(_))
    }
}
