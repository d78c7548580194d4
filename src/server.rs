// Copyright © 2026 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Supervise the accept loop, session threads, and shutdown order.
// Author: Lukas Bower

//! Connection supervisor: accept loop, thread registry, shutdown.

use std::io::{self, ErrorKind};
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::annotate::Annotator;
use crate::backing;
use crate::config::ServerConfig;
use crate::error::RinglogError;
use crate::session::SessionHandler;
use crate::store::SharedLog;

/// Poll interval of the non-blocking accept loop.
const ACCEPT_POLL: Duration = Duration::from_millis(50);

/// Accept-loop supervisor owning the shared log and all session threads.
///
/// Lifecycle: bind (create the backing store, bind the listener), run the
/// accept loop until the shutdown flag is raised or a fatal accept error
/// occurs, then stop accepting, join every in-flight session to completion,
/// and tear the backing store down. Sessions are never forcibly cancelled.
pub struct Supervisor {
    config: ServerConfig,
    log: SharedLog,
    listener: Option<TcpListener>,
    shutdown: Arc<AtomicBool>,
    sessions: Vec<JoinHandle<()>>,
    annotator: Option<Annotator>,
}

impl Supervisor {
    /// Create the backing store and bind the listening socket.
    pub fn bind(config: ServerConfig) -> Result<Self, RinglogError> {
        let store = backing::create(&config)?;
        let log = SharedLog::with_backing(config.capacity, store);
        let listener = TcpListener::bind((config.bind_addr.as_str(), config.port))?;
        listener.set_nonblocking(true)?;
        info!("listening on {}", listener.local_addr()?);
        Ok(Self {
            config,
            log,
            listener: Some(listener),
            shutdown: Arc::new(AtomicBool::new(false)),
            sessions: Vec::new(),
            annotator: None,
        })
    }

    /// Address the listener actually bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        match &self.listener {
            Some(listener) => listener.local_addr(),
            None => Err(ErrorKind::NotConnected.into()),
        }
    }

    /// Cancellation flag; storing `true` requests an orderly shutdown.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Clone of the shared log handle.
    pub fn log(&self) -> SharedLog {
        self.log.clone()
    }

    /// Run the accept loop to completion.
    ///
    /// Returns `Ok` after a requested shutdown and `Err` when a fatal error
    /// forced one; either way every session has been joined and the backing
    /// store torn down before this returns. Sessions and the annotator hold
    /// a clone of the shutdown flag and raise it when the shared backing
    /// store fails, so that failure also ends the loop.
    pub fn run(mut self) -> Result<(), RinglogError> {
        let mut fatal = None;
        if self.config.annotator_enabled() {
            match Annotator::spawn(
                self.log.clone(),
                self.config.timestamp_interval,
                self.shutdown.clone(),
            ) {
                Ok(annotator) => self.annotator = Some(annotator),
                Err(e) => {
                    error!("failed to start annotator: {e}");
                    fatal = Some(RinglogError::Io(e));
                }
            }
        }
        while fatal.is_none() && !self.shutdown.load(Ordering::Relaxed) {
            let accepted = match &self.listener {
                Some(listener) => listener.accept(),
                None => break,
            };
            match accepted {
                Ok((stream, peer)) => self.spawn_session(stream, peer),
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    self.reap_finished();
                    thread::sleep(ACCEPT_POLL);
                }
                Err(ref e)
                    if matches!(
                        e.kind(),
                        ErrorKind::ConnectionAborted | ErrorKind::Interrupted
                    ) =>
                {
                    debug!("transient accept error: {e}");
                }
                Err(e) => {
                    error!("listener failed, shutting down: {e}");
                    fatal = Some(RinglogError::Io(e));
                    break;
                }
            }
        }
        if fatal.is_none() {
            info!("Caught signal, exiting");
        }
        self.stop();
        match fatal {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn spawn_session(&mut self, stream: std::net::TcpStream, peer: SocketAddr) {
        // The accepted socket must block; only the listener polls.
        if let Err(e) = stream.set_nonblocking(false) {
            warn!("failed to configure socket for {peer}: {e}");
            return;
        }
        let log = self.log.clone();
        let clean_slate = self.config.clean_slate_per_session;
        let shutdown = self.shutdown.clone();
        let spawned = thread::Builder::new()
            .name(format!("ringlog-session-{peer}"))
            .spawn(move || SessionHandler::new(stream, peer, log, clean_slate, shutdown).run());
        match spawned {
            Ok(handle) => self.sessions.push(handle),
            Err(e) => error!("failed to spawn session thread for {peer}: {e}"),
        }
        self.reap_finished();
    }

    /// Join already-finished sessions so the registry stays bounded.
    fn reap_finished(&mut self) {
        let mut live = Vec::with_capacity(self.sessions.len());
        for handle in self.sessions.drain(..) {
            if handle.is_finished() {
                if let Err(e) = handle.join() {
                    error!("session thread panicked: {e:?}");
                }
            } else {
                live.push(handle);
            }
        }
        self.sessions = live;
    }

    /// Stop accepting, drain sessions, and release resources in order.
    fn stop(&mut self) {
        // Closing the listener first guarantees no new session can start
        // while the drain below runs.
        self.listener = None;
        if !self.sessions.is_empty() {
            info!("waiting for {} open session(s)", self.sessions.len());
        }
        for handle in self.sessions.drain(..) {
            if let Err(e) = handle.join() {
                error!("session thread panicked: {e:?}");
            }
        }
        self.annotator = None;
        self.log.reset();
        backing::remove_on_shutdown(&self.config);
        info!("stopped");
    }
}
