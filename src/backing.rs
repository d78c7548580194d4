// Copyright © 2026 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Run the backing-store lifecycle hooks around the in-memory ring.
// Author: Lukas Bower

//! Backing-store lifecycle hooks (ephemeral file vs persistent device).

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;

use log::{info, warn};

use crate::config::{BackingMode, ServerConfig};
use crate::error::RinglogError;

/// Open the backing writer for the configured mode.
///
/// Ephemeral-file mode recreates the data file from scratch (creating parent
/// directories as needed); device mode opens the existing device for append
/// and never creates or truncates it. The ring and its access controller
/// behave identically either way.
pub fn create(config: &ServerConfig) -> Result<File, RinglogError> {
    match config.backing {
        BackingMode::EphemeralFile => {
            if let Some(parent) = config.data_file.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&config.data_file)?;
            info!("created data file {}", config.data_file.display());
            Ok(file)
        }
        BackingMode::PersistentDevice => {
            let file = OpenOptions::new().append(true).open(&config.data_file)?;
            info!("opened backing device {}", config.data_file.display());
            Ok(file)
        }
    }
}

/// Tear down the backing store at clean shutdown.
///
/// Removes the ephemeral data file; a persistent device is left untouched.
pub fn remove_on_shutdown(config: &ServerConfig) {
    match config.backing {
        BackingMode::EphemeralFile => match fs::remove_file(&config.data_file) {
            Ok(()) => info!("removed data file {}", config.data_file.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                "failed to remove data file {}: {e}",
                config.data_file.display()
            ),
        },
        BackingMode::PersistentDevice => {}
    }
}
