//! Conditional and range request handling.
//!
//! Mirrors what standard HTTP servers do for static content: validators
//! (`ETag`, `Last-Modified`) are checked in the order `If-Match`,
//! `If-Unmodified-Since`, `If-None-Match`, `If-Modified-Since`, then a
//! single `Range` is honoured if `If-Range` still holds.

use std::io::{Read, Seek, SeekFrom};

use super::reply::{Body, Reply};
use super::request::HttpRequest;
use crate::asset::source::ReadSeek;
use crate::utils::date::DateTimeUtc;

/// Validators and type of the entity being served.
#[derive(Debug, Clone, Copy)]
pub struct Entity<'a> {
    pub content_type: &'a str,
    pub last_modified: DateTimeUtc,
    pub etag: Option<&'a str>,
}

/// Outcome of evaluating preconditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Precondition {
    Proceed,
    NotModified,
    Failed,
}

/// A byte range `start..start + len` within the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ByteRange {
    start: u64,
    len: u64,
}

/// What a `Range` header asks for once resolved against the size.
#[derive(Debug, PartialEq, Eq)]
enum RangeRequest {
    Full,
    Partial(ByteRange),
    Unsatisfiable,
}

/// Serve `body` for `request`, starting from the headers already on `reply`.
pub fn serve(
    request: &HttpRequest,
    entity: &Entity<'_>,
    mut reply: Reply,
    mut body: Box<dyn ReadSeek>,
) -> Reply {
    reply.set_header("Last-Modified", entity.last_modified.to_http_date());
    if let Some(etag) = entity.etag {
        reply.set_header("ETag", etag);
    }

    match check_preconditions(request, entity) {
        Precondition::Proceed => {}
        Precondition::NotModified => {
            reply.status = 304;
            reply.remove_header("Content-Type");
            reply.remove_header("Content-Encoding");
            reply.body = Body::Empty;
            return reply;
        }
        Precondition::Failed => {
            return reply.into_error(412, "Precondition Failed");
        }
    }

    reply.set_header("Content-Type", entity.content_type);

    let size = match body.seek(SeekFrom::End(0)).and_then(|size| {
        body.seek(SeekFrom::Start(0))?;
        Ok(size)
    }) {
        Ok(size) => size,
        Err(_) => return reply.into_error(500, "seeker can't seek"),
    };

    reply.set_header("Accept-Ranges", "bytes");

    let range = request
        .header("Range")
        .filter(|_| if_range_holds(request, entity))
        .map_or(RangeRequest::Full, |header| parse_range(header, size));

    let (start, len) = match range {
        RangeRequest::Full => {
            reply.status = 200;
            (0, size)
        }
        RangeRequest::Partial(r) => {
            reply.status = 206;
            reply.set_header(
                "Content-Range",
                format!("bytes {}-{}/{size}", r.start, r.start + r.len - 1),
            );
            (r.start, r.len)
        }
        RangeRequest::Unsatisfiable => {
            let mut reply = reply.into_error(416, "invalid range: failed to overlap");
            reply.set_header("Content-Range", format!("bytes */{size}"));
            return reply;
        }
    };

    reply.set_header("Content-Length", len.to_string());
    if request.is_head() {
        reply.body = Body::Empty;
        return reply;
    }

    if start > 0 && body.seek(SeekFrom::Start(start)).is_err() {
        return reply.into_error(500, "seeker can't seek");
    }
    reply.body = Body::Reader {
        reader: Box::new(body.take(len)),
        len,
    };
    reply
}

fn check_preconditions(request: &HttpRequest, entity: &Entity<'_>) -> Precondition {
    let mut verdict = check_if_match(request, entity);
    if verdict.is_none() {
        verdict = check_if_unmodified_since(request, entity);
    }
    if verdict == Some(false) {
        return Precondition::Failed;
    }

    match check_if_none_match(request, entity) {
        Some(false) if request.method.is_get_or_head() => Precondition::NotModified,
        Some(false) => Precondition::Failed,
        Some(true) => Precondition::Proceed,
        None if check_if_modified_since(request, entity) == Some(false) => {
            Precondition::NotModified
        }
        None => Precondition::Proceed,
    }
}

/// `Some(true)` if the condition holds, `Some(false)` if it fails, `None`
/// if the header is absent or unusable.
fn check_if_match(request: &HttpRequest, entity: &Entity<'_>) -> Option<bool> {
    let header = request.header("If-Match")?;
    Some(etag_list(header).any(|tag| tag == "*" || entity.etag.is_some_and(|e| strong_eq(tag, e))))
}

fn check_if_unmodified_since(request: &HttpRequest, entity: &Entity<'_>) -> Option<bool> {
    let since = DateTimeUtc::parse_http_date(request.header("If-Unmodified-Since")?)?;
    Some(entity.last_modified.to_unix() <= since.to_unix())
}

fn check_if_none_match(request: &HttpRequest, entity: &Entity<'_>) -> Option<bool> {
    let header = request.header("If-None-Match")?;
    let matched =
        etag_list(header).any(|tag| tag == "*" || entity.etag.is_some_and(|e| weak_eq(tag, e)));
    Some(!matched)
}

fn check_if_modified_since(request: &HttpRequest, entity: &Entity<'_>) -> Option<bool> {
    if !request.method.is_get_or_head() {
        return None;
    }
    let since = DateTimeUtc::parse_http_date(request.header("If-Modified-Since")?)?;
    Some(entity.last_modified.to_unix() > since.to_unix())
}

/// `If-Range` absent, or naming the current entity.
fn if_range_holds(request: &HttpRequest, entity: &Entity<'_>) -> bool {
    let Some(value) = request.header("If-Range").map(str::trim) else {
        return true;
    };
    if value.starts_with('"') || value.starts_with("W/") {
        return entity.etag.is_some_and(|e| strong_eq(value, e));
    }
    DateTimeUtc::parse_http_date(value)
        .is_some_and(|date| date.to_unix() == entity.last_modified.to_unix())
}

fn etag_list(header: &str) -> impl Iterator<Item = &str> {
    header.split(',').map(str::trim).filter(|t| !t.is_empty())
}

fn strong_eq(a: &str, b: &str) -> bool {
    !a.starts_with("W/") && !b.starts_with("W/") && a == b
}

fn weak_eq(a: &str, b: &str) -> bool {
    a.trim_start_matches("W/") == b.trim_start_matches("W/")
}

/// Resolve a `Range` header against an entity of `size` bytes.
///
/// Only a single range is served; several ranges fall back to the full
/// entity. Malformed or non-overlapping ranges are unsatisfiable.
fn parse_range(header: &str, size: u64) -> RangeRequest {
    let Some(range_set) = header.trim().strip_prefix("bytes=") else {
        return RangeRequest::Unsatisfiable;
    };

    let mut ranges = Vec::new();
    for part in range_set.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((start, end)) = part.split_once('-') else {
            return RangeRequest::Unsatisfiable;
        };
        let (start, end) = (start.trim(), end.trim());

        if start.is_empty() {
            // Suffix range: the last `n` bytes
            let Ok(n) = end.parse::<u64>() else {
                return RangeRequest::Unsatisfiable;
            };
            if n == 0 || size == 0 {
                continue;
            }
            let n = n.min(size);
            ranges.push(ByteRange {
                start: size - n,
                len: n,
            });
            continue;
        }

        let Ok(first) = start.parse::<u64>() else {
            return RangeRequest::Unsatisfiable;
        };
        let last = if end.is_empty() {
            size.saturating_sub(1)
        } else {
            match end.parse::<u64>() {
                Ok(last) if last >= first => last.min(size.saturating_sub(1)),
                _ => return RangeRequest::Unsatisfiable,
            }
        };
        if first >= size {
            continue;
        }
        ranges.push(ByteRange {
            start: first,
            len: last - first + 1,
        });
    }

    match ranges.as_slice() {
        [] => RangeRequest::Unsatisfiable,
        [single] => RangeRequest::Partial(*single),
        _ => RangeRequest::Full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::serve::request::Method;
    use std::io::Cursor;

    const MODIFIED: DateTimeUtc = DateTimeUtc::new(2024, 6, 15, 14, 30, 45);
    const MODIFIED_HTTP: &str = "Sat, 15 Jun 2024 14:30:45 GMT";

    fn entity(etag: Option<&str>) -> Entity<'_> {
        Entity {
            content_type: "text/css; charset=utf-8",
            last_modified: MODIFIED,
            etag,
        }
    }

    fn run(request: &HttpRequest, etag: Option<&str>) -> Reply {
        let body = Box::new(Cursor::new(b"0123456789".to_vec()));
        serve(request, &entity(etag), Reply::new(200), body)
    }

    #[test]
    fn test_full_response() {
        let reply = run(&HttpRequest::get("/a.css"), Some("\"abc\""));
        assert_eq!(reply.status, 200);
        assert_eq!(reply.header("Content-Length"), Some("10"));
        assert_eq!(reply.header("Accept-Ranges"), Some("bytes"));
        assert_eq!(reply.header("Last-Modified"), Some(MODIFIED_HTTP));
        assert_eq!(reply.header("ETag"), Some("\"abc\""));
        assert_eq!(reply.into_bytes().unwrap(), b"0123456789");
    }

    #[test]
    fn test_head_has_length_without_body() {
        let req = HttpRequest::new(Method::Head, "/a.css");
        let reply = run(&req, None);
        assert_eq!(reply.status, 200);
        assert_eq!(reply.header("Content-Length"), Some("10"));
        assert!(matches!(reply.body, Body::Empty));
    }

    #[test]
    fn test_if_modified_since() {
        let req = HttpRequest::get("/").with_header("If-Modified-Since", MODIFIED_HTTP);
        let reply = run(&req, None);
        assert_eq!(reply.status, 304);
        assert!(reply.header("Content-Type").is_none());

        let req = HttpRequest::get("/").with_header("If-Modified-Since", "Fri, 14 Jun 2024 00:00:00 GMT");
        assert_eq!(run(&req, None).status, 200);

        // Unparsable dates are ignored
        let req = HttpRequest::get("/").with_header("If-Modified-Since", "yesterday");
        assert_eq!(run(&req, None).status, 200);
    }

    #[test]
    fn test_if_none_match_wins_over_date() {
        let req = HttpRequest::get("/")
            .with_header("If-None-Match", "\"other\"")
            .with_header("If-Modified-Since", MODIFIED_HTTP);
        assert_eq!(run(&req, Some("\"abc\"")).status, 200);

        let req = HttpRequest::get("/").with_header("If-None-Match", "\"x\", W/\"abc\"");
        assert_eq!(run(&req, Some("\"abc\"")).status, 304);

        let req = HttpRequest::get("/").with_header("If-None-Match", "*");
        assert_eq!(run(&req, None).status, 304);
    }

    #[test]
    fn test_if_match_and_unmodified_since() {
        let req = HttpRequest::get("/").with_header("If-Match", "\"other\"");
        assert_eq!(run(&req, Some("\"abc\"")).status, 412);

        let req = HttpRequest::get("/").with_header("If-Match", "\"abc\"");
        assert_eq!(run(&req, Some("\"abc\"")).status, 200);

        let req = HttpRequest::get("/")
            .with_header("If-Unmodified-Since", "Fri, 14 Jun 2024 00:00:00 GMT");
        assert_eq!(run(&req, None).status, 412);

        let req = HttpRequest::get("/").with_header("If-Unmodified-Since", MODIFIED_HTTP);
        assert_eq!(run(&req, None).status, 200);
    }

    #[test]
    fn test_single_range() {
        let req = HttpRequest::get("/").with_header("Range", "bytes=2-4");
        let reply = run(&req, None);
        assert_eq!(reply.status, 206);
        assert_eq!(reply.header("Content-Range"), Some("bytes 2-4/10"));
        assert_eq!(reply.header("Content-Length"), Some("3"));
        assert_eq!(reply.into_bytes().unwrap(), b"234");

        let req = HttpRequest::get("/").with_header("Range", "bytes=-3");
        assert_eq!(run(&req, None).into_bytes().unwrap(), b"789");

        let req = HttpRequest::get("/").with_header("Range", "bytes=7-");
        assert_eq!(run(&req, None).into_bytes().unwrap(), b"789");

        let req = HttpRequest::get("/").with_header("Range", "bytes=8-100");
        let reply = run(&req, None);
        assert_eq!(reply.header("Content-Range"), Some("bytes 8-9/10"));
    }

    #[test]
    fn test_unsatisfiable_range() {
        let req = HttpRequest::get("/").with_header("Range", "bytes=20-30");
        let reply = run(&req, None);
        assert_eq!(reply.status, 416);
        assert_eq!(reply.header("Content-Range"), Some("bytes */10"));

        let req = HttpRequest::get("/").with_header("Range", "items=0-1");
        assert_eq!(run(&req, None).status, 416);
    }

    #[test]
    fn test_multiple_ranges_serve_full() {
        let req = HttpRequest::get("/").with_header("Range", "bytes=0-1,4-5");
        let reply = run(&req, None);
        assert_eq!(reply.status, 200);
        assert_eq!(reply.into_bytes().unwrap(), b"0123456789");
    }

    #[test]
    fn test_if_range() {
        let req = HttpRequest::get("/")
            .with_header("Range", "bytes=0-1")
            .with_header("If-Range", "\"stale\"");
        assert_eq!(run(&req, Some("\"abc\"")).status, 200);

        let req = HttpRequest::get("/")
            .with_header("Range", "bytes=0-1")
            .with_header("If-Range", MODIFIED_HTTP);
        assert_eq!(run(&req, None).status, 206);
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(
            parse_range("bytes=0-0", 10),
            RangeRequest::Partial(ByteRange { start: 0, len: 1 })
        );
        assert_eq!(parse_range("bytes=5-2", 10), RangeRequest::Unsatisfiable);
        assert_eq!(parse_range("bytes=-0", 10), RangeRequest::Unsatisfiable);
        assert_eq!(parse_range("bytes=0-", 0), RangeRequest::Unsatisfiable);
        assert_eq!(
            parse_range("bytes=-20", 10),
            RangeRequest::Partial(ByteRange { start: 0, len: 10 })
        );
    }
}
