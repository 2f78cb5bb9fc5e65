//! Control response rendering
//!
//! A response is a single status token, optionally namespaced with a colon
//! (`ok:started`, `error:timeout`, `status:playing`). On the wire the token
//! travels as the body of a minimal `HTTP/1.1 200 OK` response so any HTTP
//! client can speak the protocol.

/// Request/response header terminator
pub const HEADER_TERMINATOR: &str = "\r\n\r\n";

/// Well-known response tokens shared by both sides of the control plane
pub mod tokens {
    pub const OK: &str = "ok";
    pub const OK_STARTED: &str = "ok:started";
    pub const OK_STOPPED: &str = "ok:stopped";
    pub const OK_TOGGLED: &str = "ok:toggled";
    pub const STATUS_PLAYING: &str = "status:playing";
    pub const STATUS_STOPPED: &str = "status:stopped";
    pub const HEALTHY: &str = "healthy";
    pub const UNHEALTHY: &str = "unhealthy";
    pub const ERROR_EMPTY_REQUEST: &str = "error:empty_request";
    pub const ERROR_EMPTY_COMMAND: &str = "error:empty_command";
    pub const ERROR_UNKNOWN_COMMAND: &str = "error:unknown_command";
    pub const ERROR_TIMEOUT: &str = "error:timeout";
    pub const ERROR_COMMAND_EXCEPTION: &str = "error:command_exception";
    pub const ERROR_EMPTY_BODY: &str = "error:empty_body";
    pub const ERROR_SCENE_NOT_FOUND: &str = "error:scene_not_found";
    pub const ERROR_OPEN_SCENE_FAILED: &str = "error:open_scene_failed";
    pub const ERROR_START_FAILED: &str = "error:start_failed";
}

/// Wrap a response token in the HTTP envelope the control server writes
pub fn http_response(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n\
         {}",
        body.len(),
        body
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_response_envelope() {
        let res = http_response(tokens::OK_STARTED);
        assert!(res.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(res.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(res.contains("Content-Length: 10\r\n"));
        assert!(res.contains("Connection: close\r\n"));
        assert!(res.ends_with("\r\n\r\nok:started"));
    }

    #[test]
    fn test_http_response_empty_body() {
        let res = http_response("");
        assert!(res.contains("Content-Length: 0\r\n"));
        assert!(res.ends_with(HEADER_TERMINATOR));
    }
}
