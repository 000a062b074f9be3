//! tiny_http adapter: requests in, replies out.

use std::io::{self, Cursor, Read};

use tiny_http::{Header, Request, Response, StatusCode};

use super::reply::{Body, Reply};
use super::request::{HttpRequest, Method};

impl From<&Request> for HttpRequest {
    fn from(request: &Request) -> Self {
        let mut req = Self::new(Method::parse(request.method().as_str()), request.url());
        for header in request.headers() {
            req = req.with_header(header.field.as_str().as_str(), header.value.as_str());
        }
        req
    }
}

/// Write `reply` to the client.
///
/// tiny_http derives the framing from the body length and drops the body
/// of `HEAD` responses on its own.
pub fn respond(request: Request, reply: Reply) -> io::Result<()> {
    let Reply {
        status,
        headers,
        body,
    } = reply;

    let headers: Vec<Header> = headers
        .iter()
        .filter_map(|(name, value)| Header::from_bytes(name.as_bytes(), value.as_bytes()).ok())
        .collect();

    let (reader, len): (Box<dyn Read + Send>, usize) = match body {
        Body::Empty => (Box::new(io::empty()), 0),
        Body::Bytes(bytes) => {
            let len = bytes.len();
            (Box::new(Cursor::new(bytes)), len)
        }
        Body::Reader { reader, len } => (reader, usize::try_from(len).unwrap_or(usize::MAX)),
    };

    // A Content-Length header (HEAD replies) overrides `len`
    let response = Response::new(StatusCode(status), headers, reader, Some(len), None);
    request.respond(response)
}
