//! Minimal STOMP 1.2 frame codec for the live results channel.
//!
//! The server exposes a simple pub/sub broker over the WebSocket at `/ws`:
//! the client sends `CONNECT`, waits for `CONNECTED`, then one `SUBSCRIBE`
//! per topic. Result updates arrive as `MESSAGE` frames whose body is a JSON
//! mapping of option label to vote count.

use crate::error::{Error, Result};
use crate::types::PollId;

pub const TOPIC_PREFIX: &str = "/topic/results/";

/// A single STOMP frame: command line, header lines, blank line, body,
/// NUL terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Client handshake frame.
    pub fn connect() -> Self {
        Frame::new("CONNECT").with_header("accept-version", "1.2")
    }

    /// Subscription frame for one topic.
    pub fn subscribe(id: &str, destination: &str) -> Self {
        Frame::new("SUBSCRIBE")
            .with_header("id", id)
            .with_header("destination", destination)
    }

    /// First header with the given name, if any.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(self.body.len() + 64);
        out.push_str(&self.command);
        out.push('\n');
        for (name, value) in &self.headers {
            out.push_str(name);
            out.push(':');
            out.push_str(value);
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parse a frame off the wire. The trailing NUL is optional so that
    /// brokers which omit it on the final frame still parse.
    pub fn parse(raw: &str) -> Result<Frame> {
        let raw = raw.strip_suffix('\0').unwrap_or(raw);
        let (head, body) = match raw.split_once("\n\n") {
            Some((head, body)) => (head, body),
            None => (raw, ""),
        };

        let mut lines = head.lines();
        let command = lines
            .next()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .ok_or_else(|| Error::Stomp("frame missing command".to_string()))?;

        let mut headers = Vec::new();
        for line in lines {
            if line.is_empty() {
                continue;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| Error::Stomp(format!("malformed header line: {line:?}")))?;
            headers.push((name.to_string(), value.to_string()));
        }

        Ok(Frame {
            command: command.to_string(),
            headers,
            body: body.to_string(),
        })
    }
}

/// Topic carrying result updates for one poll.
pub fn results_topic(poll_id: PollId) -> String {
    format!("{TOPIC_PREFIX}{poll_id}")
}

/// Reverse of [`results_topic`]; `None` for foreign destinations.
pub fn poll_id_from_topic(destination: &str) -> Option<PollId> {
    destination.strip_prefix(TOPIC_PREFIX)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_subscribe() {
        let frame = Frame::subscribe("sub-1", "/topic/results/1");
        let wire = frame.encode();
        assert_eq!(wire, "SUBSCRIBE\nid:sub-1\ndestination:/topic/results/1\n\n\0");
    }

    #[test]
    fn test_parse_message_frame() {
        let wire = "MESSAGE\ndestination:/topic/results/4\nsubscription:sub-4\n\n{\"Red\":3}\0";
        let frame = Frame::parse(wire).unwrap();
        assert_eq!(frame.command, "MESSAGE");
        assert_eq!(frame.header("destination"), Some("/topic/results/4"));
        assert_eq!(frame.body, "{\"Red\":3}");
    }

    #[test]
    fn test_round_trip() {
        let frame = Frame::connect();
        let parsed = Frame::parse(&frame.encode()).unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn test_parse_without_trailing_nul() {
        let frame = Frame::parse("CONNECTED\nversion:1.2\n\n").unwrap();
        assert_eq!(frame.command, "CONNECTED");
        assert_eq!(frame.header("version"), Some("1.2"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Frame::parse("").is_err());
        assert!(Frame::parse("\0").is_err());
        assert!(Frame::parse("MESSAGE\nno-colon-here\n\nbody\0").is_err());
    }

    #[test]
    fn test_header_colon_in_value() {
        let frame = Frame::parse("MESSAGE\ndestination:/topic/results/1\ntime:12:30\n\n\0").unwrap();
        assert_eq!(frame.header("time"), Some("12:30"));
    }

    #[test]
    fn test_topic_helpers() {
        assert_eq!(results_topic(42), "/topic/results/42");
        assert_eq!(poll_id_from_topic("/topic/results/42"), Some(42));
        assert_eq!(poll_id_from_topic("/topic/results/"), None);
        assert_eq!(poll_id_from_topic("/topic/results/x"), None);
        assert_eq!(poll_id_from_topic("/queue/other"), None);
    }
}
