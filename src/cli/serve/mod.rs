//! Static server for the rendered index and the build output.
//!
//! Routing:
//!
//! | Path          | Handler                                            |
//! |---------------|----------------------------------------------------|
//! | `/<output>/*` | [`dist::serve`]: precompressed variant negotiation |
//! | `/debug/*`    | [`debug::serve`] (unless `serve.debug = false`)    |
//! | anything      | rendered index document                            |
//!
//! `<output>` is `build.output` relative to the project root, `dist` by
//! default. All handlers share one immutable [`ServeState`] built before
//! binding.

mod content;
mod debug;
mod dist;
mod lifecycle;
mod reply;
mod request;
mod response;

pub use reply::{Body, Reply};
pub use request::{HttpRequest, Method};

use crate::{
    asset::{AssetSource, DiskSource, EntryPointMap, IndexDocument, MemorySource},
    config::ProjectConfig,
    core::is_shutdown,
    debug, log,
    utils::{date::DateTimeUtc, mime::types::HTML, path::url::logical_path, plural_count},
};
use anyhow::{Context, Result, bail};
use debug::RequestCounters;
use std::path::{Component, Path};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tiny_http::Request;

/// Everything a request handler reads. Built once at startup.
pub struct ServeState {
    pub index: IndexDocument,
    pub entry_points: EntryPointMap,
    pub source: Box<dyn AssetSource>,
    /// Logical prefix of the build output, e.g. `dist/`.
    pub asset_prefix: String,
    /// Process start, second precision. `Last-Modified` of every response.
    pub started: DateTimeUtc,
    started_at: Instant,
    /// Mount `/debug/`.
    pub debug: bool,
    pub counters: RequestCounters,
}

impl ServeState {
    pub fn new(
        index: IndexDocument,
        entry_points: EntryPointMap,
        source: Box<dyn AssetSource>,
        asset_prefix: impl Into<String>,
        debug: bool,
    ) -> Self {
        Self {
            index,
            entry_points,
            source,
            asset_prefix: asset_prefix.into(),
            started: DateTimeUtc::from_system_time(SystemTime::now()),
            started_at: Instant::now(),
            debug,
            counters: RequestCounters::default(),
        }
    }

    /// Load the entry-point map, render the index and open the asset source.
    ///
    /// Any failure here is fatal: there is nothing useful to serve.
    pub fn init(config: &ProjectConfig) -> Result<Self> {
        let asset_prefix = asset_prefix(&config.root, &config.build.output)?;
        debug!("serve"; "assets under /{asset_prefix}");

        let map_path = config.entry_point_map_path();
        let entry_points = EntryPointMap::load(&map_path)
            .context("entry-point map missing or invalid, run `hashdist build` first")?;
        let index = IndexDocument::generate(&config.serve.template, &entry_points)?;
        debug!("serve"; "index rendered, etag {}", index.etag);

        let source: Box<dyn AssetSource> = if config.serve.preload {
            let snapshot = MemorySource::from_dir(&config.root, &config.build.output)
                .with_context(|| format!("cannot load `{}`", config.build.output.display()))?;
            log!(
                "serve";
                "preloaded {} ({} bytes)",
                plural_count(snapshot.len(), "file"),
                snapshot.total_bytes()
            );
            Box::new(snapshot)
        } else {
            Box::new(DiskSource::new(&config.root))
        };

        Ok(Self::new(
            index,
            entry_points,
            source,
            asset_prefix,
            config.serve.debug,
        ))
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// `output` relative to `root` as a logical prefix with a trailing `/`.
///
/// The output directory must be a proper subdirectory of the root, since
/// requests can only reach files below it.
fn asset_prefix(root: &Path, output: &Path) -> Result<String> {
    let Ok(relative) = output.strip_prefix(root) else {
        bail!(
            "output directory `{}` is not inside the project root `{}`",
            output.display(),
            root.display()
        );
    };

    let mut prefix = String::new();
    for component in relative.components() {
        let Component::Normal(name) = component else {
            bail!("output directory `{}` cannot be served", output.display());
        };
        let Some(name) = name.to_str() else {
            bail!("output directory `{}` is not valid UTF-8", output.display());
        };
        prefix.push_str(name);
        prefix.push('/');
    }
    if prefix.is_empty() {
        bail!("output directory cannot be the project root itself");
    }
    Ok(prefix)
}

/// Route one request.
pub fn handle(state: &ServeState, request: &HttpRequest) -> Reply {
    if !request.method.is_get_or_head() {
        return Reply::error(405, "Method Not Allowed").with_header("Allow", "GET, HEAD");
    }

    let Some(logical) = logical_path(&request.url) else {
        state.counters.errors.inc();
        return Reply::error(400, "Bad Request");
    };

    if logical.starts_with(state.asset_prefix.as_str()) {
        return dist::serve(state, request, &logical);
    }
    if state.debug
        && let Some(rest) = logical
            .strip_prefix("debug/")
            .or_else(|| (logical == "debug").then_some(""))
    {
        return debug::serve(state, rest);
    }
    serve_index(state, request)
}

fn serve_index(state: &ServeState, request: &HttpRequest) -> Reply {
    state.counters.index.inc();
    let entity = content::Entity {
        content_type: HTML,
        last_modified: state.started,
        etag: Some(state.index.etag.as_str()),
    };
    let body = Box::new(std::io::Cursor::new(state.index.bytes.clone()));
    content::serve(request, &entity, Reply::new(200), body)
}

/// Bind and serve until Ctrl+C.
pub fn serve(config: &ProjectConfig) -> Result<()> {
    let state = Arc::new(ServeState::init(config)?);
    let pool = lifecycle::worker_pool(config.serve.workers)?;
    let addr = config.serve.addr();
    let server = lifecycle::bind(addr)?;

    log!("serve"; "http://{}", addr);
    for request in server.incoming_requests() {
        if is_shutdown() {
            break;
        }
        let state = Arc::clone(&state);
        pool.spawn(move || handle_request(&state, request));
    }
    Ok(())
}

fn handle_request(state: &ServeState, request: Request) {
    let req = HttpRequest::from(&request);
    let reply = handle(state, &req);
    debug!(
        "serve";
        "{} {} {} {}",
        request.method(),
        req.url,
        reply.status,
        reply.header("Content-Encoding").unwrap_or("identity")
    );
    if let Err(e) = response::respond(request, reply) {
        state.counters.errors.inc();
        log!("serve"; "request error: {e}");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::asset::MemorySource;

    /// State with a fixed index and entry-point map around `source`.
    pub fn state_with(source: impl AssetSource + 'static) -> ServeState {
        let mut map = EntryPointMap::new();
        map.insert("src/index.js", "dist/index-ab12cd34.js");
        let index = IndexDocument::new(b"<script src=\"/dist/index-ab12cd34.js\"></script>".to_vec());
        ServeState::new(index, map, Box::new(source), "dist/", true)
    }

    fn assets() -> MemorySource {
        let mut source = MemorySource::new();
        source.insert("dist/index-ab12cd34.js", b"let a=1".to_vec());
        source.insert("dist/index-ab12cd34.js.gz", b"gz".to_vec());
        source
    }

    #[test]
    fn test_root_serves_index() {
        let state = state_with(assets());
        let reply = handle(&state, &HttpRequest::get("/"));
        assert_eq!(reply.status, 200);
        assert_eq!(reply.header("Content-Type"), Some(HTML));
        assert_eq!(reply.header("ETag"), Some(state.index.etag.as_str()));
        assert!(reply.header("Cache-Control").is_none());
        assert_eq!(reply.into_bytes().unwrap(), state.index.bytes);
        assert_eq!(state.counters.index.get(), 1);
    }

    #[test]
    fn test_unknown_paths_serve_index() {
        let state = state_with(assets());
        for url in ["/app/settings", "/dist", "/index.html?x=1"] {
            let reply = handle(&state, &HttpRequest::get(url));
            assert_eq!(reply.status, 200, "{url}");
            assert_eq!(reply.header("Content-Type"), Some(HTML), "{url}");
        }
    }

    #[test]
    fn test_index_etag_revalidation() {
        let state = state_with(assets());
        let req = HttpRequest::get("/").with_header("If-None-Match", state.index.etag.clone());
        let reply = handle(&state, &req);
        assert_eq!(reply.status, 304);
        assert!(matches!(reply.body, Body::Empty));
    }

    #[test]
    fn test_dist_routing() {
        let state = state_with(assets());
        let req = HttpRequest::get("/dist/index-ab12cd34.js").with_header("Accept-Encoding", "br, gzip");
        let reply = handle(&state, &req);
        assert_eq!(reply.status, 200);
        assert_eq!(reply.header("Content-Encoding"), Some("gzip"));
        assert_eq!(reply.header("Cache-Control"), Some(dist::CACHE_CONTROL));

        let reply = handle(&state, &HttpRequest::get("/dist/missing.js"));
        assert_eq!(reply.status, 404);
    }

    #[test]
    fn test_percent_encoded_dist_path() {
        let mut source = MemorySource::new();
        source.insert("dist/a b.css", b"body{}".to_vec());
        let state = state_with(source);
        let reply = handle(&state, &HttpRequest::get("/dist/a%20b.css?v=2"));
        assert_eq!(reply.status, 200);
        assert_eq!(reply.into_bytes().unwrap(), b"body{}");
    }

    #[test]
    fn test_head_request() {
        let state = state_with(assets());
        let req = HttpRequest::new(Method::Head, "/dist/index-ab12cd34.js");
        let reply = handle(&state, &req);
        assert_eq!(reply.status, 200);
        assert_eq!(reply.header("Content-Length"), Some("7"));
        assert!(matches!(reply.body, Body::Empty));
    }

    #[test]
    fn test_method_not_allowed() {
        let state = state_with(assets());
        let reply = handle(&state, &HttpRequest::new(Method::parse("POST"), "/"));
        assert_eq!(reply.status, 405);
        assert_eq!(reply.header("Allow"), Some("GET, HEAD"));
    }

    #[test]
    fn test_debug_toggle() {
        let mut state = state_with(assets());
        let reply = handle(&state, &HttpRequest::get("/debug/vars"));
        assert_eq!(reply.header("Content-Type"), Some(crate::utils::mime::types::JSON));

        state.debug = false;
        let reply = handle(&state, &HttpRequest::get("/debug/vars"));
        assert_eq!(reply.header("Content-Type"), Some(HTML));
    }

    #[test]
    fn test_init_from_build_output() {
        use crate::asset::metafile::ENTRY_POINT_MAP_FILE;
        use std::fs;
        use tempfile::TempDir;

        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir(root.join("dist")).unwrap();
        fs::write(root.join("dist/index-ab12cd34.js"), "let a=1").unwrap();
        fs::write(
            root.join("dist").join(ENTRY_POINT_MAP_FILE),
            r#"{"src/index.js":"dist/index-ab12cd34.js"}"#,
        )
        .unwrap();
        fs::write(root.join("index.html"), r#"<script src="/dist/index.js"></script>"#).unwrap();

        let mut config = ProjectConfig::default();
        config.root = root.clone();
        config.build.output = root.join("dist");
        config.serve.template = root.join("index.html");

        for preload in [true, false] {
            config.serve.preload = preload;
            let state = ServeState::init(&config).unwrap();
            assert_eq!(
                state.index.bytes,
                br#"<script src="/dist/index-ab12cd34.js"></script>"#
            );
            let reply = handle(&state, &HttpRequest::get("/dist/index-ab12cd34.js"));
            assert_eq!(reply.into_bytes().unwrap(), b"let a=1", "preload={preload}");
        }

        fs::remove_file(root.join("dist").join(ENTRY_POINT_MAP_FILE)).unwrap();
        assert!(ServeState::init(&config).is_err());
    }

    #[test]
    fn test_asset_prefix() {
        let root = Path::new("/p");
        assert_eq!(asset_prefix(root, Path::new("/p/dist")).unwrap(), "dist/");
        assert_eq!(asset_prefix(root, Path::new("/p/web/public")).unwrap(), "web/public/");
        assert!(asset_prefix(root, Path::new("/p")).is_err());
        assert!(asset_prefix(root, Path::new("/elsewhere/dist")).is_err());
        assert!(asset_prefix(root, Path::new("/p/../dist")).is_err());
    }

    #[test]
    fn test_build_then_serve_custom_output() {
        use crate::utils::mime::types::JAVASCRIPT;
        use std::fs;
        use tempfile::TempDir;

        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir(root.join("src")).unwrap();
        fs::write(root.join("src/index.js"), "export const answer = 40 + 2;\n").unwrap();
        fs::write(root.join("src/index.css"), "body {\n  margin: 0px;\n}\n").unwrap();
        fs::write(
            root.join("index.html"),
            r#"<link href="/dist/index.css"><script src="/dist/index.js"></script>"#,
        )
        .unwrap();

        let mut config = ProjectConfig::default();
        config.build.output = root.join("public");
        config.serve.template = root.join("index.html");
        config.root = root.clone();

        let map = crate::cli::build::build_all(&config).unwrap();
        let script = map.get("src/index.js").unwrap().to_string();
        assert!(script.starts_with("public/index-"), "{script}");

        for preload in [true, false] {
            config.serve.preload = preload;
            let state = ServeState::init(&config).unwrap();
            assert_eq!(state.asset_prefix, "public/");

            let html = String::from_utf8(state.index.bytes.clone()).unwrap();
            assert!(html.contains(&format!("\"/{script}\"")), "{html}");

            let req = HttpRequest::get(format!("/{script}")).with_header("Accept-Encoding", "gzip");
            let reply = handle(&state, &req);
            assert_eq!(reply.status, 200, "preload={preload}");
            assert_eq!(reply.header("Content-Type"), Some(JAVASCRIPT));
            assert_eq!(reply.header("Content-Encoding"), Some("gzip"));

            // The default prefix is not an asset route any more
            let reply = handle(&state, &HttpRequest::get("/dist/index.js"));
            assert_eq!(reply.header("Content-Type"), Some(HTML));
        }
    }

    #[test]
    fn test_init_rejects_output_outside_root() {
        use tempfile::TempDir;

        let project = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let mut config = ProjectConfig::default();
        config.root = project.path().to_path_buf();
        config.build.output = elsewhere.path().to_path_buf();

        let err = ServeState::init(&config).err().unwrap();
        assert!(err.to_string().contains("not inside the project root"), "{err}");
    }
}
