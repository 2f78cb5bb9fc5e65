//! Control server accept loop
//!
//! Owns the listening socket on a dedicated background thread. The accept
//! loop polls a non-blocking listener so the stop flag is observed within
//! one poll interval, handles one connection at a time, and dispatches every
//! parsed request through the owner-thread executor. Per-request failures
//! are answered with error tokens; only a faulted listener ends the loop.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use stage_core::ServerConfig;
use stage_protocol::{http_response, tokens, ControlRequest, HEADER_TERMINATOR};

use crate::executor::OwnerThreadExecutor;
use crate::registry::CommandRegistry;

/// How long `stop()` waits for the accept loop to wind down
const JOIN_TIMEOUT: Duration = Duration::from_millis(1000);

/// Consecutive accept failures after which the listener is considered faulted
const MAX_ACCEPT_FAILURES: u32 = 10;

struct Running {
    stop: Arc<AtomicBool>,
    done_rx: Receiver<()>,
    handle: JoinHandle<()>,
}

/// TCP control server for the embedded control plane
pub struct ControlServer {
    config: ServerConfig,
    executor: Arc<OwnerThreadExecutor>,
    registry: Arc<CommandRegistry>,
    running: Mutex<Option<Running>>,
}

impl ControlServer {
    /// Create a server; call [`start`](Self::start) to begin listening
    pub fn new(
        config: ServerConfig,
        executor: OwnerThreadExecutor,
        registry: Arc<CommandRegistry>,
    ) -> Self {
        Self {
            config,
            executor: Arc::new(executor),
            registry,
            running: Mutex::new(None),
        }
    }

    /// Bind the listener and start the accept loop on a background thread.
    ///
    /// A bind conflict is a launch precondition failure and is returned to
    /// the caller. Calling `start` while already listening is a no-op.
    pub fn start(&self) -> std::io::Result<()> {
        let mut running = self.lock_running();
        if running.is_some() {
            return Ok(());
        }

        let address = self.config.endpoint.bind_address();
        let listener = TcpListener::bind(&address)?;
        listener.set_nonblocking(true)?;

        tracing::info!("Control server listening on {}", address);

        let stop = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = mpsc::channel();

        let stop_flag = Arc::clone(&stop);
        let executor = Arc::clone(&self.executor);
        let registry = Arc::clone(&self.registry);
        let config = self.config.clone();

        let handle = thread::Builder::new()
            .name("control-server".to_string())
            .spawn(move || {
                accept_loop(listener, &config, &executor, &registry, &stop_flag);
                let _ = done_tx.send(());
            })?;

        *running = Some(Running {
            stop,
            done_rx,
            handle,
        });
        Ok(())
    }

    /// Whether the accept loop is running.
    ///
    /// A loop that exited on its own (faulted listener) is observed here and
    /// the server reports as stopped from then on.
    pub fn is_running(&self) -> bool {
        let mut running = self.lock_running();
        let exited = match &*running {
            Some(active) => active.done_rx.try_recv().is_ok(),
            None => return false,
        };

        if exited {
            if let Some(active) = running.take() {
                if active.handle.join().is_err() {
                    tracing::error!("Control server thread panicked");
                }
            }
            return false;
        }
        true
    }

    /// Stop the accept loop and release the socket.
    ///
    /// Idempotent and callable from any thread; the background thread is
    /// joined within a bounded budget.
    pub fn stop(&self) {
        let Some(running) = self.lock_running().take() else {
            return;
        };

        running.stop.store(true, Ordering::Relaxed);

        match running.done_rx.recv_timeout(JOIN_TIMEOUT) {
            Ok(()) => {
                if running.handle.join().is_err() {
                    tracing::error!("Control server thread panicked");
                }
            }
            Err(_) => {
                tracing::warn!("Control server thread did not stop within {:?}", JOIN_TIMEOUT);
            }
        }
    }

    fn lock_running(&self) -> std::sync::MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for ControlServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept_loop(
    listener: TcpListener,
    config: &ServerConfig,
    executor: &OwnerThreadExecutor,
    registry: &Arc<CommandRegistry>,
    stop: &AtomicBool,
) {
    let mut consecutive_failures = 0u32;

    while !stop.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, peer)) => {
                consecutive_failures = 0;
                if !peer.ip().is_loopback() {
                    tracing::warn!("Rejected non-localhost connection from {}", peer);
                    continue;
                }
                if let Err(e) = handle_connection(stream, config, executor, registry) {
                    tracing::warn!("Connection error: {}", e);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(config.accept_poll_interval);
            }
            Err(e) => {
                tracing::error!("Accept failed: {}", e);
                consecutive_failures += 1;
                if consecutive_failures >= MAX_ACCEPT_FAILURES {
                    tracing::error!("Listener faulted; control server loop exiting");
                    break;
                }
                thread::sleep(config.accept_poll_interval);
            }
        }
    }

    tracing::info!("Control server stopped");
}

fn handle_connection(
    mut stream: TcpStream,
    config: &ServerConfig,
    executor: &OwnerThreadExecutor,
    registry: &Arc<CommandRegistry>,
) -> std::io::Result<()> {
    stream.set_read_timeout(Some(config.read_timeout))?;
    stream.set_write_timeout(Some(config.read_timeout))?;

    let raw = read_request(&mut stream, config.read_timeout);
    if raw.is_empty() {
        stream.write_all(tokens::ERROR_EMPTY_REQUEST.as_bytes())?;
        return stream.flush();
    }

    let request = ControlRequest::parse(&raw);
    tracing::debug!(command = %request.command, "Dispatching control request");

    let registry = Arc::clone(registry);
    let body = executor.run_with_timeout(
        move || registry.dispatch(&request.command, &request.argument),
        config.dispatch_timeout,
    );

    stream.write_all(http_response(&body).as_bytes())?;
    stream.flush()
}

/// Read until the header terminator, bounded by the read timeout.
///
/// Returns whatever was collected; an empty string means the peer sent
/// nothing before closing or the deadline.
fn read_request(stream: &mut TcpStream, budget: Duration) -> String {
    let started = Instant::now();
    let mut collected = Vec::new();
    let mut buffer = [0u8; 1024];

    loop {
        match stream.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                collected.extend_from_slice(&buffer[..n]);
                if String::from_utf8_lossy(&collected).contains(HEADER_TERMINATOR) {
                    break;
                }
            }
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                break;
            }
            Err(e) => {
                tracing::warn!("Read error: {}", e);
                break;
            }
        }

        if started.elapsed() > budget {
            break;
        }
    }

    String::from_utf8_lossy(&collected).into_owned()
}
