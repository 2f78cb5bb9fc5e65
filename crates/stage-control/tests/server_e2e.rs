//! End-to-end control server tests
//!
//! Drives the full embedded stack over a real socket: accept loop,
//! owner-thread executor, command registry, session. A ticker thread stands
//! in for the host's owner loop.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use stage_control::{build, ControlPlane, Session};
use stage_core::{ControlEndpoint, ServerConfig};

/// Base port for test servers - each test gets a unique offset
static PORT_COUNTER: AtomicU16 = AtomicU16::new(0);

fn get_test_port() -> u16 {
    let offset = PORT_COUNTER.fetch_add(1, Ordering::SeqCst);
    42300 + offset
}

struct TestHost {
    plane: ControlPlane,
    port: u16,
    stop: Arc<AtomicBool>,
    ticker: Option<thread::JoinHandle<()>>,
}

impl TestHost {
    fn start() -> Self {
        let port = get_test_port();
        let config = ServerConfig {
            endpoint: ControlEndpoint {
                host: "127.0.0.1".to_string(),
                port,
            },
            read_timeout: Duration::from_millis(500),
            dispatch_timeout: Duration::from_millis(500),
            accept_poll_interval: Duration::from_millis(10),
        };

        let session = Session::new(vec![
            "Scenes/Boot.scene".to_string(),
            "Scenes/Main.scene".to_string(),
            "Scenes/Arena.scene".to_string(),
        ]);

        let (plane, tick) = build(config, session);
        plane.server.start().expect("server should bind");

        // Owner loop stand-in
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);
        let ticker = thread::spawn(move || {
            while !stop_clone.load(Ordering::Relaxed) {
                tick.tick();
                thread::sleep(Duration::from_millis(5));
            }
        });

        Self {
            plane,
            port,
            stop,
            ticker: Some(ticker),
        }
    }

    fn request(&self, line: &str) -> String {
        let mut stream = TcpStream::connect(("127.0.0.1", self.port)).expect("connect");
        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        stream
            .write_all(format!("{}\r\n\r\n", line).as_bytes())
            .expect("write request");

        let mut response = String::new();
        stream.read_to_string(&mut response).expect("read response");
        response
    }

    fn body(&self, line: &str) -> String {
        let response = self.request(line);
        match response.split_once("\r\n\r\n") {
            Some((_, body)) => body.to_string(),
            None => response,
        }
    }

    fn wait_for_tick(&self) {
        thread::sleep(Duration::from_millis(30));
    }
}

impl Drop for TestHost {
    fn drop(&mut self) {
        self.plane.server.stop();
        self.stop.store(true, Ordering::Relaxed);
        if let Some(ticker) = self.ticker.take() {
            let _ = ticker.join();
        }
    }
}

#[test]
fn test_start_status_stop_cycle() {
    let host = TestHost::start();

    assert_eq!(host.body("GET /start/2 HTTP/1.1"), "ok:started");
    assert_eq!(host.body("GET /status HTTP/1.1"), "status:playing");

    assert_eq!(host.body("GET /stop HTTP/1.1"), "ok:stopped");
    host.wait_for_tick();
    assert_eq!(host.body("GET /status HTTP/1.1"), "status:stopped");
}

#[test]
fn test_response_is_http_shaped() {
    let host = TestHost::start();
    let response = host.request("GET /status HTTP/1.1");

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("Content-Type: text/plain; charset=utf-8\r\n"));
    assert!(response.contains("Connection: close\r\n"));
    assert!(response.ends_with("status:stopped"));
}

#[test]
fn test_unknown_command_token() {
    let host = TestHost::start();
    assert_eq!(host.body("GET /frobnicate HTTP/1.1"), "error:unknown_command");
}

#[test]
fn test_empty_path_defaults_to_status() {
    let host = TestHost::start();
    assert_eq!(host.body("GET / HTTP/1.1"), "status:stopped");
}

#[test]
fn test_empty_request_token() {
    let host = TestHost::start();

    let mut stream = TcpStream::connect(("127.0.0.1", host.port)).expect("connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    // Close the write side without sending anything
    stream.shutdown(std::net::Shutdown::Write).unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).expect("read response");
    assert_eq!(response, "error:empty_request");
}

#[test]
fn test_percent_encoded_scene_name() {
    let host = TestHost::start();
    // "Main" matched case-insensitively after percent-decoding
    assert_eq!(host.body("POST /start/mAin HTTP/1.1"), "ok:started");
    assert_eq!(
        host.plane.session.open_scene_path().as_deref(),
        Some("Scenes/Main.scene")
    );
}

#[test]
fn test_config_applied_through_owner_thread() {
    let host = TestHost::start();

    assert_eq!(
        host.body("POST /config/%7B%22speed%22%3A3%7D HTTP/1.1"),
        "ok"
    );
    host.wait_for_tick();
    assert_eq!(
        host.plane.config_store.current(),
        Some(serde_json::json!({"speed": 3}))
    );

    assert_eq!(host.body("POST /config HTTP/1.1"), "error:empty_body");
}

#[test]
fn test_health_endpoints() {
    let host = TestHost::start();

    assert_eq!(host.body("GET /editor-health HTTP/1.1"), "healthy");
    assert_eq!(host.body("GET /playmode-health HTTP/1.1"), "unhealthy");

    host.body("GET /start/0 HTTP/1.1");
    assert_eq!(host.body("GET /playmode-health HTTP/1.1"), "healthy");
    assert_eq!(host.body("GET /health HTTP/1.1"), "healthy");
}
