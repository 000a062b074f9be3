//! `/debug/` endpoints: process vars and the loaded entry-point map.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::json;

use super::ServeState;
use super::reply::Reply;
use crate::utils::mime::types::{HTML, JSON};

/// Monotonic request counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    #[inline]
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-route request counts exposed at `/debug/vars`.
#[derive(Debug, Default)]
pub struct RequestCounters {
    pub index: Counter,
    pub dist: Counter,
    pub not_found: Counter,
    pub errors: Counter,
}

const INDEX_HTML: &str = "<!DOCTYPE html>
<html><head><title>hashdist debug</title></head><body>
<h1>hashdist debug</h1>
<ul>
<li><a href=\"/debug/vars\">vars</a></li>
<li><a href=\"/debug/entry-points\">entry-points</a></li>
</ul>
</body></html>
";

/// Route a request under `/debug/`. `rest` is the path after `debug/`.
pub fn serve(state: &ServeState, rest: &str) -> Reply {
    match rest.trim_end_matches('/') {
        "" => Reply::new(200)
            .with_header("Content-Type", HTML)
            .with_body(INDEX_HTML.as_bytes().to_vec()),
        "vars" => json_reply(&vars(state)),
        "entry-points" => json_reply(&serde_json::to_value(&state.entry_points).unwrap_or_default()),
        _ => {
            state.counters.not_found.inc();
            Reply::error(404, "404 page not found")
        }
    }
}

fn vars(state: &ServeState) -> serde_json::Value {
    let counters = &state.counters;
    json!({
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.uptime().as_secs(),
        "started": state.started.to_http_date(),
        "requests": {
            "index": counters.index.get(),
            "dist": counters.dist.get(),
            "not_found": counters.not_found.get(),
            "errors": counters.errors.get(),
        },
    })
}

fn json_reply(value: &serde_json::Value) -> Reply {
    let body = serde_json::to_vec_pretty(value).unwrap_or_default();
    Reply::new(200)
        .with_header("Content-Type", JSON)
        .with_header("Cache-Control", "no-cache")
        .with_body(body)
}
