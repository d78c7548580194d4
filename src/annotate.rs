// Copyright © 2026 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Inject periodic timestamp records through the shared log handle.
// Author: Lukas Bower

//! Periodic timestamp annotator for file-backed deployments.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, error};

use crate::store::SharedLog;

/// Prefix of every injected timestamp record.
pub const TIMESTAMP_PREFIX: &str = "timestamp:";

/// Granularity of the annotator's cancellation polling.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Background timer appending `timestamp:<RFC 2822>` records.
///
/// Records go through the same [`SharedLog`] lock as ordinary session
/// commands, so they are totally ordered with client appends and mirrored to
/// the backing file like any other command. Dropping the annotator stops the
/// timer and joins its thread.
pub struct Annotator {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Annotator {
    /// Start the timer thread with the given record interval.
    ///
    /// `shutdown` is the supervisor's cancellation flag; a failed timestamp
    /// append means the shared backing store died, so the annotator raises it
    /// to bring the whole server down.
    pub fn spawn(
        log: SharedLog,
        interval: Duration,
        shutdown: Arc<AtomicBool>,
    ) -> io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let running_loop = running.clone();
        let handle = thread::Builder::new()
            .name("ringlog-annotate".into())
            .spawn(move || annotate_loop(log, interval, running_loop, shutdown))?;
        Ok(Self {
            running,
            handle: Some(handle),
        })
    }
}

impl Drop for Annotator {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.join() {
                error!("annotator thread join error: {e:?}");
            }
        }
    }
}

fn annotate_loop(
    log: SharedLog,
    interval: Duration,
    running: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
) {
    let mut last = Instant::now();
    while running.load(Ordering::Relaxed) {
        thread::sleep(POLL_INTERVAL);
        if last.elapsed() < interval {
            continue;
        }
        let record = format!("{TIMESTAMP_PREFIX}{}\n", Utc::now().to_rfc2822());
        match log.append_command(record.into_bytes()) {
            Ok(outcome) => debug!("timestamp record appended, log at {}B", outcome.total_bytes),
            Err(e) => {
                // A dead shared backing store will not heal; every session
                // appends through the same handle.
                error!("failed to append timestamp record, requesting shutdown: {e}");
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
        }
        last = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_flag() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    #[test]
    fn timestamp_records_flow_through_the_shared_log() {
        let log = SharedLog::new(8);
        let annotator =
            Annotator::spawn(log.clone(), Duration::from_millis(100), idle_flag()).unwrap();
        thread::sleep(Duration::from_millis(450));
        drop(annotator);
        assert!(log.committed() >= 1, "no timestamp record appeared");
        let mut contents = Vec::new();
        log.stream_from(0, &mut contents).unwrap();
        let text = String::from_utf8(contents).unwrap();
        for line in text.lines() {
            assert!(line.starts_with(TIMESTAMP_PREFIX), "unexpected record {line:?}");
        }
    }

    #[test]
    fn drop_stops_the_timer() {
        let log = SharedLog::new(8);
        let annotator =
            Annotator::spawn(log.clone(), Duration::from_millis(50), idle_flag()).unwrap();
        thread::sleep(Duration::from_millis(200));
        drop(annotator);
        let committed = log.committed();
        thread::sleep(Duration::from_millis(200));
        assert_eq!(log.committed(), committed);
    }

    #[test]
    fn dead_backing_store_raises_the_shutdown_flag() {
        let path =
            std::env::temp_dir().join(format!("ringlog-annotate-dead-{}", std::process::id()));
        std::fs::write(&path, b"").unwrap();
        let backing = std::fs::File::open(&path).unwrap();
        let log = SharedLog::with_backing(8, backing);
        let shutdown = idle_flag();
        let annotator =
            Annotator::spawn(log.clone(), Duration::from_millis(50), shutdown.clone()).unwrap();
        thread::sleep(Duration::from_millis(300));
        drop(annotator);
        assert!(shutdown.load(Ordering::SeqCst));
        assert_eq!(log.committed(), 0);
        std::fs::remove_file(&path).unwrap();
    }
}
