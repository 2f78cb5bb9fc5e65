//! Control request parsing
//!
//! A request is the first line of an HTTP-shaped exchange,
//! `METHOD /<command>/<argument>`. Only that line matters: the command is the
//! first path segment (lower-cased), the argument is the percent-decoded
//! remainder. Anything that does not parse falls back to a `status` request
//! so a curious `GET /` still gets a meaningful answer.

use percent_encoding::percent_decode_str;

/// A parsed control-plane request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlRequest {
    /// Command name, always lower-case
    pub command: String,
    /// Percent-decoded argument, possibly empty
    pub argument: String,
}

impl ControlRequest {
    /// Create a request directly (used by tests and the client side)
    pub fn new(command: impl Into<String>, argument: impl Into<String>) -> Self {
        Self {
            command: command.into().to_lowercase(),
            argument: argument.into(),
        }
    }

    /// Parse a raw request buffer into a command and argument.
    ///
    /// Looks only at the first line. A missing method, empty path, or
    /// otherwise malformed line yields the default `status` request.
    pub fn parse(raw: &str) -> Self {
        let Some(line) = raw.lines().next() else {
            return Self::default();
        };

        let mut parts = line.split(' ');
        let _method = parts.next();
        let Some(target) = parts.next() else {
            return Self::default();
        };

        let path = target.trim_start_matches('/');
        if path.is_empty() {
            return Self::default();
        }

        let (command, rest) = match path.split_once('/') {
            Some((cmd, rest)) => (cmd, rest),
            None => (path, ""),
        };

        let argument = percent_decode_str(rest).decode_utf8_lossy().into_owned();

        Self {
            command: command.to_lowercase(),
            argument,
        }
    }

    /// Render the request path for the wire, percent-encoding the argument
    pub fn to_path(&self) -> String {
        if self.argument.is_empty() {
            format!("/{}", self.command)
        } else {
            let encoded = percent_encoding::utf8_percent_encode(
                &self.argument,
                percent_encoding::NON_ALPHANUMERIC,
            );
            format!("/{}/{}", self.command, encoded)
        }
    }
}

impl Default for ControlRequest {
    /// The default request is a read-only status query
    fn default() -> Self {
        Self {
            command: "status".to_string(),
            argument: String::new(),
        }
    }
}
