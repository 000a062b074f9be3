//! Transport-neutral response.

use std::io::Read;

use crate::utils::mime::types::PLAIN;

/// Response body.
pub enum Body {
    Empty,
    Bytes(Vec<u8>),
    /// Reader yielding exactly `len` bytes.
    Reader {
        reader: Box<dyn Read + Send>,
        len: u64,
    },
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Bytes(b) => write!(f, "Bytes({})", b.len()),
            Self::Reader { len, .. } => write!(f, "Reader({len})"),
        }
    }
}

/// Status, headers and body of one response.
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Body,
}

impl Reply {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Body::Empty,
        }
    }

    /// Plain-text error reply; the body is `message` plus a newline.
    pub fn error(status: u16, message: &str) -> Self {
        Self::new(status)
            .with_header("Content-Type", PLAIN)
            .with_header("X-Content-Type-Options", "nosniff")
            .with_body(format!("{message}\n").into_bytes())
    }

    /// Turn `self` into a plain-text error, keeping the headers already set.
    ///
    /// `Content-Encoding` and `Content-Length` described the original body
    /// and are dropped.
    #[must_use]
    pub fn into_error(self, status: u16, message: &str) -> Self {
        let mut reply = Self::error(status, message);
        for (name, value) in self.headers {
            if reply.header(name).is_none()
                && !name.eq_ignore_ascii_case("Content-Encoding")
                && !name.eq_ignore_ascii_case("Content-Length")
            {
                reply.headers.push((name, value));
            }
        }
        reply
    }

    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Body::Bytes(body);
        self
    }

    /// Set `name`, replacing any previous value.
    pub fn set_header(&mut self, name: &'static str, value: impl Into<String>) {
        self.remove_header(name);
        self.headers.push((name, value.into()));
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Drain the body into memory.
    #[cfg(test)]
    pub fn into_bytes(self) -> std::io::Result<Vec<u8>> {
        match self.body {
            Body::Empty => Ok(Vec::new()),
            Body::Bytes(bytes) => Ok(bytes),
            Body::Reader { mut reader, .. } => {
                let mut out = Vec::new();
                reader.read_to_end(&mut out)?;
                Ok(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_header_replaces() {
        let mut reply = Reply::new(200).with_header("Content-Type", "text/css");
        reply.set_header("content-type", "text/html");
        assert_eq!(reply.headers.len(), 1);
        assert_eq!(reply.header("Content-Type"), Some("text/html"));
    }

    #[test]
    fn test_error_reply() {
        let reply = Reply::error(404, "open dist/x.js: file does not exist");
        assert_eq!(reply.status, 404);
        assert_eq!(reply.header("Content-Type"), Some(PLAIN));
        assert_eq!(
            reply.into_bytes().unwrap(),
            b"open dist/x.js: file does not exist\n"
        );
    }

    #[test]
    fn test_into_error_keeps_headers() {
        let reply = Reply::new(200)
            .with_header("Cache-Control", "public")
            .with_header("Content-Encoding", "br")
            .with_header("Content-Type", "text/css")
            .with_header("Content-Length", "42")
            .into_error(412, "Precondition Failed");

        assert_eq!(reply.status, 412);
        assert_eq!(reply.header("Cache-Control"), Some("public"));
        assert_eq!(reply.header("Content-Type"), Some(PLAIN));
        assert!(reply.header("Content-Encoding").is_none());
        assert!(reply.header("Content-Length").is_none());
        assert_eq!(reply.into_bytes().unwrap(), b"Precondition Failed\n");
    }
}
