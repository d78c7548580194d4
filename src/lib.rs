// Copyright © 2026 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Expose the ring-buffered socket log daemon library surface.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Ring-buffered socket log daemon.
//!
//! `ringlogd` accepts newline-delimited write commands over TCP, retains the
//! most recent commands in a fixed-capacity ring, and answers every completed
//! command with the concatenated log content. A `SEEKTO:<index>,<offset>`
//! control command repositions the next response without touching the log.
//!
//! One thread serves each connection; the only cross-thread state is the
//! [`store::SharedLog`] handle, which serializes every append and every
//! position-sensitive read behind a single mutex.

pub mod annotate;
pub mod backing;
pub mod config;
pub mod error;
pub mod framer;
pub mod protocol;
pub mod ring;
pub mod server;
pub mod session;
pub mod store;

pub use config::{BackingMode, ServerConfig};
pub use error::RinglogError;
pub use ring::RingLog;
pub use server::Supervisor;
pub use store::SharedLog;
