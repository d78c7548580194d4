// Copyright © 2026 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Drive one client connection from framing through response delivery.
// Author: Lukas Bower

//! Per-connection session handler.

use std::io::Read;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::error::RinglogError;
use crate::framer::CommandFramer;
use crate::protocol::{self, Dispatch};
use crate::store::SharedLog;

/// Size of the socket receive buffer handed to the framer per read.
const RECV_BUF_SIZE: usize = 1024;

/// Per-connection state machine.
///
/// Loops framing, dispatching, and responding for every completed command
/// until the peer closes the connection or a session-local error occurs.
/// Each completed command triggers exactly one response: the then-current
/// log content, or the seek-adjusted view when a cursor is pending.
pub struct SessionHandler {
    stream: TcpStream,
    peer: SocketAddr,
    log: SharedLog,
    framer: CommandFramer,
    /// Pending read origin resolved by a seek, consumed by the next response.
    cursor: Option<u64>,
    clean_slate: bool,
    shutdown: Arc<AtomicBool>,
}

impl SessionHandler {
    /// Wrap an accepted connection.
    pub fn new(
        stream: TcpStream,
        peer: SocketAddr,
        log: SharedLog,
        clean_slate: bool,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            stream,
            peer,
            log,
            framer: CommandFramer::new(),
            cursor: None,
            clean_slate,
            shutdown,
        }
    }

    /// Serve the connection to completion.
    ///
    /// Session-local failures are caught here: logged with the peer identity,
    /// they close only this session. A process-fatal error (the shared
    /// backing store died) additionally raises the supervisor's shutdown flag
    /// so the whole server winds down instead of killing every later client.
    pub fn run(mut self) {
        info!("Accepted connection from {}", self.peer.ip());
        if self.clean_slate {
            self.log.reset();
            debug!("ring reset for clean-slate session {}", self.peer);
        }
        match self.serve() {
            Ok(()) => info!("Closed connection from {}", self.peer.ip()),
            Err(e) if e.is_process_fatal() => {
                error!("session {}: shared log failed, requesting shutdown: {e}", self.peer);
                self.shutdown.store(true, Ordering::SeqCst);
            }
            Err(e) => warn!("session {} aborted: {e}", self.peer),
        }
        let _ = self.stream.shutdown(Shutdown::Both);
    }

    fn serve(&mut self) -> Result<(), RinglogError> {
        let mut chunk = [0u8; RECV_BUF_SIZE];
        loop {
            let received = self.stream.read(&mut chunk)?;
            if received == 0 {
                return Ok(());
            }
            self.framer.push_bytes(&chunk[..received])?;
            while let Some(command) = self.framer.next_command() {
                self.dispatch(command)?;
                self.respond()?;
            }
        }
    }

    /// Classify and apply one completed command.
    fn dispatch(&mut self, command: Vec<u8>) -> Result<(), RinglogError> {
        match protocol::classify(&command) {
            Dispatch::Seek(request) => {
                // A bad seek is fatal for the session, mirroring a failed
                // device ioctl; nothing is appended either way.
                let offset = self.log.resolve_seek(&request)?;
                debug!(
                    "session {} seek to command {} offset {} -> global {offset}",
                    self.peer, request.command_index, request.command_offset
                );
                self.cursor = Some(offset);
            }
            Dispatch::Append => {
                let outcome = self.log.append_command(command)?;
                if outcome.evicted_bytes > 0 {
                    debug!(
                        "session {} append evicted {}B, log at {}B",
                        self.peer, outcome.evicted_bytes, outcome.total_bytes
                    );
                }
            }
        }
        Ok(())
    }

    /// Stream the log back from the effective cursor, then clear it.
    fn respond(&mut self) -> Result<(), RinglogError> {
        let origin = self.cursor.take().unwrap_or(0);
        let sent = self.log.stream_from(origin, &mut self.stream)?;
        debug!("session {} sent {sent}B from offset {origin}", self.peer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;

    fn session_pair(
        log: SharedLog,
        clean_slate: bool,
    ) -> (TcpStream, thread::JoinHandle<()>, Arc<AtomicBool>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = shutdown.clone();
        let server = thread::spawn(move || {
            let (stream, peer) = listener.accept().unwrap();
            SessionHandler::new(stream, peer, log, clean_slate, flag).run();
        });
        (TcpStream::connect(addr).unwrap(), server, shutdown)
    }

    #[test]
    fn each_command_gets_the_full_log_back() {
        let log = SharedLog::new(4);
        let (mut client, server, _) = session_pair(log, false);
        client.write_all(b"hello\n").unwrap();
        let mut buf = [0u8; 6];
        client.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello\n");
        client.write_all(b"world\n").unwrap();
        let mut buf = [0u8; 12];
        client.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello\nworld\n");
        drop(client);
        server.join().unwrap();
    }

    #[test]
    fn invalid_seek_closes_the_session_without_appending() {
        let log = SharedLog::new(4);
        let (mut client, server, shutdown) = session_pair(log.clone(), false);
        client.write_all(b"SEEKTO:7,0\n").unwrap();
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).unwrap();
        assert!(rest.is_empty());
        server.join().unwrap();
        assert_eq!(log.committed(), 0);
        // Session-local: the rest of the server is not condemned.
        assert!(!shutdown.load(Ordering::SeqCst));
    }

    #[test]
    fn dead_backing_store_raises_the_shutdown_flag() {
        let path =
            std::env::temp_dir().join(format!("ringlog-session-dead-{}", std::process::id()));
        std::fs::write(&path, b"").unwrap();
        // Read-only handle: every mirror write fails, for every session.
        let backing = std::fs::File::open(&path).unwrap();
        let log = SharedLog::with_backing(4, backing);
        let (mut client, server, shutdown) = session_pair(log.clone(), false);
        client.write_all(b"hello\n").unwrap();
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).unwrap();
        assert!(rest.is_empty());
        server.join().unwrap();
        assert_eq!(log.committed(), 0);
        assert!(shutdown.load(Ordering::SeqCst), "shared log death must stop the server");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn clean_slate_session_starts_from_an_empty_ring() {
        let log = SharedLog::new(4);
        log.append_command(b"stale\n".to_vec()).unwrap();
        let (mut client, server, _) = session_pair(log.clone(), true);
        client.write_all(b"fresh\n").unwrap();
        let mut buf = [0u8; 6];
        client.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"fresh\n");
        drop(client);
        server.join().unwrap();
        assert_eq!(log.committed(), 1);
    }
}
