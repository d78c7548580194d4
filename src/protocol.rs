// Copyright © 2026 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Classify completed commands into appends and seek controls.
// Author: Lukas Bower

//! Wire grammar for control commands.

use log::warn;

use crate::framer::DELIMITER;

/// Literal prefix of the seek control command.
pub const SEEK_PREFIX: &[u8] = b"SEEKTO:";

/// Validated request to reposition the next response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekRequest {
    /// Zero-based index of the target committed command.
    pub command_index: u32,
    /// Byte offset into that command.
    pub command_offset: u64,
}

/// What a completed command asks the session to do.
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// Ordinary payload to append to the log.
    Append,
    /// Control command; never written into the log.
    Seek(SeekRequest),
}

/// Classify one completed command (delimiter included).
///
/// Only an exact match of `SEEKTO:<index>,<offset>` with unsigned decimal
/// integers, no surrounding whitespace, and nothing before the delimiter is
/// a seek. Near-misses are logged and treated as ordinary payloads so they
/// are never silently dropped.
pub fn classify(command: &[u8]) -> Dispatch {
    match parse_seek(command) {
        Some(request) => Dispatch::Seek(request),
        None => {
            if command.starts_with(SEEK_PREFIX) {
                warn!(
                    "malformed seek control treated as payload: {:?}",
                    String::from_utf8_lossy(command)
                );
            }
            Dispatch::Append
        }
    }
}

fn parse_seek(command: &[u8]) -> Option<SeekRequest> {
    let body = command.strip_suffix(&[DELIMITER])?;
    let body = body.strip_prefix(SEEK_PREFIX)?;
    let text = std::str::from_utf8(body).ok()?;
    let (index, offset) = text.split_once(',')?;
    Some(SeekRequest {
        command_index: parse_unsigned(index)?,
        command_offset: parse_unsigned(offset)?,
    })
}

/// Parse a plain unsigned decimal: digits only, no sign, no whitespace.
fn parse_unsigned<T: std::str::FromStr>(field: &str) -> Option<T> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}
