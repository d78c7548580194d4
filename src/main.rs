// Copyright © 2026 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Command-line entry point for the ringlogd daemon.
// Author: Lukas Bower

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use signal_hook::consts::{SIGINT, SIGTERM};

use ringlogd::{config, BackingMode, ServerConfig, Supervisor};

/// Ring-buffered socket log daemon.
///
/// Accepts newline-delimited write commands on a TCP port, retains the most
/// recent commands in a fixed-capacity ring, and answers every command with
/// the concatenated log content.
#[derive(Debug, Parser)]
#[command(name = "ringlogd", version)]
struct Cli {
    /// Local address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// TCP port to listen on.
    #[arg(short, long, default_value_t = config::DEFAULT_PORT)]
    port: u16,

    /// Number of write commands retained before the oldest is evicted.
    #[arg(long, default_value_t = config::DEFAULT_CAPACITY)]
    capacity: usize,

    /// Backing file (default mode) or device path (with --device).
    #[arg(long, default_value = config::DEFAULT_DATA_FILE)]
    data_file: PathBuf,

    /// Treat the backing path as a persistent device: open it for append,
    /// leave it in place at shutdown, and disable the timestamp annotator.
    #[arg(long)]
    device: bool,

    /// Seconds between timestamp records in file mode; 0 disables them.
    #[arg(long, default_value_t = 10)]
    timestamp_interval: u64,

    /// Reset the ring whenever a new session opens (device deployments only).
    #[arg(long, requires = "device")]
    clean_slate: bool,
}

impl Cli {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind,
            port: self.port,
            capacity: self.capacity,
            data_file: self.data_file,
            backing: if self.device {
                BackingMode::PersistentDevice
            } else {
                BackingMode::EphemeralFile
            },
            timestamp_interval: Duration::from_secs(self.timestamp_interval),
            clean_slate_per_session: self.clean_slate,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = Cli::parse().into_config();
    let supervisor = Supervisor::bind(config).context("failed to start ringlogd")?;
    let shutdown = supervisor.shutdown_flag();
    signal_hook::flag::register(SIGTERM, shutdown.clone())
        .context("failed to register SIGTERM handler")?;
    signal_hook::flag::register(SIGINT, shutdown).context("failed to register SIGINT handler")?;
    supervisor.run()?;
    Ok(())
}
