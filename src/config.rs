// Copyright © 2026 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Describe the runtime configuration consumed by the supervisor.
// Author: Lukas Bower

//! Runtime configuration and backing-mode selection.

use std::path::PathBuf;
use std::time::Duration;

/// Default TCP port clients connect to.
pub const DEFAULT_PORT: u16 = 9000;

/// Default number of write commands retained by the ring.
pub const DEFAULT_CAPACITY: usize = 10;

/// Default backing path in ephemeral-file mode.
pub const DEFAULT_DATA_FILE: &str = "/var/tmp/ringlogdata";

/// Default interval between periodic timestamp records.
pub const DEFAULT_TIMESTAMP_INTERVAL: Duration = Duration::from_secs(10);

/// Backing medium behind the in-memory ring.
///
/// The ring and its access controller behave identically in both modes; the
/// mode only selects the lifecycle hooks the supervisor runs around them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackingMode {
    /// Append-only file recreated at start and removed at clean shutdown.
    /// The periodic timestamp annotator runs in this mode.
    EphemeralFile,
    /// Persistent device opened for append and left untouched at shutdown.
    /// The annotator is disabled in this mode.
    PersistentDevice,
}

/// Runtime configuration for one supervisor instance.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Local address the listener binds to.
    pub bind_addr: String,
    /// TCP port to listen on; 0 asks the OS for an ephemeral port.
    pub port: u16,
    /// Number of write commands the ring retains before evicting.
    pub capacity: usize,
    /// Path of the backing file or device.
    pub data_file: PathBuf,
    /// Which backing lifecycle to run.
    pub backing: BackingMode,
    /// Interval between timestamp records; zero disables the annotator.
    pub timestamp_interval: Duration,
    /// Reset the shared ring when a new session opens. Only meaningful for
    /// device deployments whose clients expect a clean slate per connection.
    pub clean_slate_per_session: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            capacity: DEFAULT_CAPACITY,
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            backing: BackingMode::EphemeralFile,
            timestamp_interval: DEFAULT_TIMESTAMP_INTERVAL,
            clean_slate_per_session: false,
        }
    }
}

impl ServerConfig {
    /// True when the periodic annotator should run.
    pub fn annotator_enabled(&self) -> bool {
        self.backing == BackingMode::EphemeralFile && !self.timestamp_interval.is_zero()
    }
}
