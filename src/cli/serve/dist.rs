//! Build output handler with precompressed variant negotiation.

use std::io;

use super::ServeState;
use super::content::{self, Entity};
use super::reply::Reply;
use super::request::HttpRequest;
use crate::asset::compress::Encoding;
use crate::asset::source::{AssetFile, ReadSeek};
use crate::utils::mime;

/// Assets are content-hashed, so they never change under a given name.
pub const CACHE_CONTROL: &str = "public, max-age=31535996";

/// Serve the asset at `logical` (e.g. `dist/index-ab12cd34.js`).
///
/// Precompressed siblings are preferred, brotli first. The raw file is the
/// fallback and its lookup error becomes the 404 body.
pub fn serve(state: &ServeState, request: &HttpRequest, logical: &str) -> Reply {
    let (file, encoding) = match open_preferred(state, request, logical) {
        Ok(found) => found,
        Err(e) => {
            state.counters.not_found.inc();
            return Reply::error(404, &e.to_string());
        }
    };

    let body: Box<dyn ReadSeek> = match file {
        AssetFile::Seekable(body) => body,
        AssetFile::Stream(_) => {
            state.counters.errors.inc();
            return Reply::error(500, "Not seekable");
        }
    };

    let mut reply = Reply::new(200)
        .with_header("Cache-Control", CACHE_CONTROL)
        .with_header("Vary", "Accept-Encoding");
    if let Some(encoding) = encoding {
        reply.set_header("Content-Encoding", encoding.token());
    }

    let entity = Entity {
        content_type: mime::from_path(logical),
        last_modified: state.started,
        etag: None,
    };
    state.counters.dist.inc();
    content::serve(request, &entity, reply, body)
}

fn open_preferred(
    state: &ServeState,
    request: &HttpRequest,
    logical: &str,
) -> io::Result<(AssetFile, Option<Encoding>)> {
    for encoding in [Encoding::Brotli, Encoding::Gzip] {
        if !request.accepts_encoding(encoding.token()) {
            continue;
        }
        let variant = format!("{logical}{}", encoding.suffix());
        if let Ok(file) = state.source.open(&variant) {
            return Ok((file, Some(encoding)));
        }
    }
    state.source.open(logical).map(|file| (file, None))
}
